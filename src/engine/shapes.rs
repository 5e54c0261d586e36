//! Shape assembly
//!
//! Terminal stage: turns the resolved loop hierarchy into oriented
//! shapes-with-holes. Also hosts the two large-document special cases:
//! the dense-perforated fast path (which bypasses hierarchy resolution
//! entirely) and the artifact-overlay filter for multi-shape outputs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::config::{DenseConfig, OverlayConfig};
use crate::engine::hierarchy::children_by_parent;
use crate::engine::loops::{interior_sample, Loop};
use crate::geometry::{point_in_ring, signed_area, BBox, Point};

/// A planar region: CCW outer ring plus CW hole rings, all simple
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub outer: Vec<Point>,
    pub holes: Vec<Vec<Point>>,
}

impl Shape {
    /// |area| of the outer ring
    pub fn outer_area(&self) -> f64 {
        signed_area(&self.outer).abs()
    }
}

/// Force CCW orientation (reverse when the ring winds CW)
fn orient_ccw(mut ring: Vec<Point>) -> Vec<Point> {
    if signed_area(&ring) < 0.0 {
        ring.reverse();
    }
    ring
}

/// Force CW orientation
fn orient_cw(mut ring: Vec<Point>) -> Vec<Point> {
    if signed_area(&ring) > 0.0 {
        ring.reverse();
    }
    ring
}

/// Emit one shape per non-skipped even-depth loop, with its non-skipped
/// odd-depth children as holes.
pub fn assemble_shapes(loops: &[Loop]) -> Vec<Shape> {
    let children = children_by_parent(loops);
    let mut shapes = Vec::new();

    for (i, l) in loops.iter().enumerate() {
        if l.skip || l.depth % 2 != 0 {
            continue;
        }
        if l.points.len() < 3 {
            continue;
        }

        let outer = orient_ccw(l.points.clone());
        let holes: Vec<Vec<Point>> = children[i]
            .iter()
            .filter(|&&c| !loops[c].skip && loops[c].depth % 2 == 1 && loops[c].points.len() >= 3)
            .map(|&c| orient_cw(loops[c].points.clone()))
            .collect();

        shapes.push(Shape { outer, holes });
    }

    shapes
}

/// Dense-perforation fast path.
///
/// A sheet with hundreds of hole loops does not need full hierarchy
/// resolution: pick the biggest loop as the outer, everything small and
/// strictly inside it is a hole, dedup superimposed hole copies by
/// center. Returns `None` when the document doesn't fit the profile.
pub fn try_dense_fast_path(loops: &[Loop], source_area: f64, cfg: &DenseConfig) -> Option<Shape> {
    if loops.len() < cfg.min_candidates || source_area <= 0.0 {
        return None;
    }

    let outer_idx = loops
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.area.partial_cmp(&b.area).unwrap())
        .map(|(i, _)| i)?;
    let outer = &loops[outer_idx];
    if outer.area < source_area * cfg.outer_area_ratio {
        return None;
    }

    let child_cap = source_area * cfg.child_area_ratio;
    let children: Vec<&Loop> = loops
        .iter()
        .enumerate()
        .filter(|&(i, l)| {
            i != outer_idx && l.area <= child_cap && outer.contains(l.sample)
        })
        .map(|(_, l)| l)
        .collect();
    if children.len() < cfg.min_children {
        return None;
    }

    // Quantize hole centers at a fraction of the typical hole size and
    // keep the biggest loop per cell: superimposed duplicate holes
    // collapse to one.
    let mut min_dims: Vec<f64> = children.iter().map(|l| l.bbox.min_side()).collect();
    min_dims.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median_min_dim = min_dims[min_dims.len() / 2];
    let quant = (median_min_dim * cfg.center_quant_factor)
        .clamp(cfg.center_quant_min, cfg.center_quant_max);

    let mut by_center: IndexMap<(i64, i64), &Loop> = IndexMap::new();
    for child in children {
        let center = child.center();
        let key = (
            (center.x / quant).round() as i64,
            (center.y / quant).round() as i64,
        );
        let replace = by_center
            .get(&key)
            .is_none_or(|existing| existing.area < child.area);
        if replace {
            by_center.insert(key, child);
        }
    }
    if by_center.len() < cfg.min_deduped {
        return None;
    }

    debug!(
        holes = by_center.len(),
        outer_area = outer.area,
        "dense-perforation fast path taken"
    );
    Some(Shape {
        outer: orient_ccw(outer.points.clone()),
        holes: by_center
            .into_values()
            .map(|l| orient_cw(l.points.clone()))
            .collect(),
    })
}

/// Per-shape metrics for the overlay filter
struct ShapeStats {
    area: f64,
    bbox: BBox,
    sample: Point,
    holes: usize,
    density: f64,
}

impl ShapeStats {
    fn of(shape: &Shape) -> ShapeStats {
        let area = shape.outer_area().max(1e-12);
        ShapeStats {
            area,
            bbox: BBox::from_points(&shape.outer),
            sample: interior_sample(&shape.outer),
            holes: shape.holes.len(),
            density: shape.holes.len() as f64 / area,
        }
    }
}

/// Drop artifact overlays that ghost on top of a dominant perforated
/// sheet, and collapse to the dominant shape alone when the remainder is
/// clearly residue.
pub fn filter_artifact_overlays(
    shapes: Vec<Shape>,
    source_area: f64,
    cfg: &OverlayConfig,
) -> Vec<Shape> {
    if shapes.len() < 2 {
        return shapes;
    }

    let stats: Vec<ShapeStats> = shapes.iter().map(ShapeStats::of).collect();
    let dominant_idx = stats
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.area.partial_cmp(&b.area).unwrap())
        .map(|(i, _)| i)
        .unwrap();
    let dom = &stats[dominant_idx];

    // Only a genuinely perforated dominant sheet arms the filter
    if dom.holes < cfg.min_dominant_holes || dom.area < source_area * cfg.dominant_area_ratio {
        return shapes;
    }

    let is_artifact = |s: &ShapeStats| -> bool {
        let ratio = s.area / dom.area;
        if ratio < cfg.area_ratio_min || ratio > cfg.area_ratio_max {
            return false;
        }
        let density_ratio = s.density / dom.density;
        if density_ratio >= cfg.density_ratio && s.holes > cfg.few_holes {
            return false;
        }
        let overlap = dom.bbox.intersection_area(&s.bbox) / s.bbox.area().max(1e-12);
        ratio >= cfg.area_ratio_floor || overlap >= cfg.bbox_overlap || s.holes <= cfg.single_hole
    };

    let mut keep = vec![true; shapes.len()];
    for (i, s) in stats.iter().enumerate() {
        if i == dominant_idx {
            continue;
        }
        if point_in_ring(s.sample, &shapes[dominant_idx].outer) && is_artifact(s) {
            debug!(
                shape = i,
                area_ratio = s.area / dom.area,
                "dropping artifact overlay"
            );
            keep[i] = false;
        }
    }

    // Collapse: everything left inside the dominant sheet, at least one
    // sizable low-density resident, and the sheet itself very dense.
    let survivors: Vec<usize> = (0..shapes.len())
        .filter(|&i| keep[i] && i != dominant_idx)
        .collect();
    if !survivors.is_empty() && dom.holes >= cfg.collapse_holes {
        let all_inside = survivors
            .iter()
            .all(|&i| point_in_ring(stats[i].sample, &shapes[dominant_idx].outer));
        let any_residue = survivors.iter().any(|&i| {
            let s = &stats[i];
            s.area / dom.area >= cfg.collapse_area_ratio
                && s.density / dom.density < cfg.collapse_density_ratio
        });
        if all_inside && any_residue {
            debug!("collapsing output to the dominant shape");
            return vec![shapes[dominant_idx].clone()];
        }
    }

    shapes
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep[*i])
        .map(|(_, s)| s)
        .collect()
}
