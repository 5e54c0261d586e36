//! Compound-loop splitting
//!
//! Some CAD exports encode a hole as two superimposed traversals of the
//! same path. Triangulating such a loop under the even-odd fill rule
//! paints half the hole solid. This stage detects self-retracing /
//! auto-intersecting loops, explodes them back into simple subloops, and
//! deduplicates the result by hole center.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::engine::config::CompoundConfig;
use crate::engine::loops::{extract_loops, Loop};
use crate::geometry::{Point, Segment};

/// Split every suspicious loop in the set; well-formed loops pass through
/// untouched.
pub fn split_compound_loops(loops: Vec<Loop>, cfg: &CompoundConfig) -> Vec<Loop> {
    let mut result = Vec::with_capacity(loops.len());
    for l in loops {
        if is_suspicious(&l, cfg) {
            let split = explode(&l, cfg);
            if split.is_empty() {
                result.push(l);
            } else {
                debug!(
                    subloops = split.len(),
                    area = l.area,
                    "compound loop split"
                );
                result.extend(split);
            }
        } else {
            result.push(l);
        }
    }
    result
}

/// A loop is suspicious when a non-adjacent vertex repeats, or its fill
/// ratio (area over bbox area) falls outside the plausible band.
fn is_suspicious(l: &Loop, cfg: &CompoundConfig) -> bool {
    let bbox_area = l.bbox.area();
    if bbox_area > 0.0 {
        let fill = l.area / bbox_area;
        if fill < cfg.fill_ratio_min || fill > cfg.fill_ratio_max {
            return true;
        }
    }
    has_nonadjacent_repeat(&l.points, cfg.repeat_tolerance)
}

/// Detect a repeated vertex among non-neighbors via a coarse hash grid;
/// neighboring cells are probed so near-misses across a cell boundary
/// still count.
fn has_nonadjacent_repeat(ring: &[Point], tol: f64) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }

    let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    let cell = |p: Point| -> (i64, i64) { ((p.x / tol).floor() as i64, (p.y / tol).floor() as i64) };

    for (i, p) in ring.iter().enumerate() {
        let (cx, cy) = cell(*p);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(indices) = grid.get(&(cx + dx, cy + dy)) {
                    for &j in indices {
                        let gap = i - j;
                        let adjacent = gap <= 1 || (j == 0 && i == n - 1);
                        if !adjacent && ring[j].dist(*p) <= tol {
                            return true;
                        }
                    }
                }
            }
        }
        grid.entry((cx, cy)).or_default().push(i);
    }
    false
}

/// Feed a suspicious loop's own segments back through the extractor and
/// dedup the resulting subloops by quantized center, keeping the
/// largest-area representative per cell. Empty result means "no split".
fn explode(l: &Loop, cfg: &CompoundConfig) -> Vec<Loop> {
    let closed = l.closed_points();
    let segments: Vec<Segment> = closed
        .windows(2)
        .map(|w| Segment { a: w[0], b: w[1] })
        .filter(|s| s.length() > 1e-9)
        .collect();

    let rings = extract_loops(&segments, &cfg.snap_tolerances);
    let candidates: Vec<Loop> = rings.into_iter().filter_map(Loop::from_points).collect();
    if candidates.len() < 2 {
        return Vec::new();
    }

    // Quantization scale follows the typical subloop size
    let mut min_dims: Vec<f64> = candidates.iter().map(|c| c.bbox.min_side()).collect();
    min_dims.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median_min_dim = min_dims[min_dims.len() / 2];
    let quant = (median_min_dim * cfg.center_quant_factor)
        .clamp(cfg.center_quant_min, cfg.center_quant_max);

    let mut by_center: IndexMap<(i64, i64), Loop> = IndexMap::new();
    for cand in candidates {
        let center = cand.center();
        let key = (
            (center.x / quant).round() as i64,
            (center.y / quant).round() as i64,
        );
        let replace = by_center.get(&key).is_none_or(|existing| existing.area < cand.area);
        if replace {
            by_center.insert(key, cand);
        }
    }

    let mut deduped: Vec<Loop> = by_center.into_values().collect();
    deduped.sort_by(|a, b| b.area.partial_cmp(&a.area).unwrap());
    deduped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(points: &[(f64, f64)]) -> Vec<Point> {
        points.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    fn square_loop(size: f64) -> Loop {
        Loop::from_points(ring(&[
            (0.0, 0.0),
            (size, 0.0),
            (size, size),
            (0.0, size),
        ]))
        .unwrap()
    }

    #[test]
    fn simple_square_is_not_suspicious() {
        let l = square_loop(10.0);
        assert!(!is_suspicious(&l, &CompoundConfig::default()));
    }

    #[test]
    fn retraced_ring_is_suspicious() {
        // The same square traversed twice: every vertex repeats
        let l = Loop::from_points(ring(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ]));
        // Signed area doubles while the bbox stays put, so the fill
        // ratio alone gives it away even before the vertex-repeat check.
        let l = l.expect("retraced ring still has nonzero signed area");
        assert!(is_suspicious(&l, &CompoundConfig::default()));
    }

    #[test]
    fn thin_diagonal_sliver_is_suspicious() {
        let l = Loop::from_points(ring(&[
            (0.0, 0.0),
            (100.0, 99.0),
            (100.0, 100.0),
            (0.0, 1.0),
        ]))
        .unwrap();
        assert!(is_suspicious(&l, &CompoundConfig::default()));
    }

    #[test]
    fn split_collapses_double_traversal_to_single_loop() {
        let l = Loop::from_points(ring(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
        ]))
        .unwrap();
        let original_area = l.area;
        let out = split_compound_loops(vec![l], &CompoundConfig::default());
        assert_eq!(out.len(), 1, "double traversal must dedup to one loop");
        assert!((out[0].area - 100.0).abs() < 1e-9);
        // Cumulative area never exceeds the original signed area
        let total: f64 = out.iter().map(|l| l.area).sum();
        assert!(total <= original_area + 1e-6);
    }

    #[test]
    fn split_preserves_untouched_loops() {
        let a = square_loop(10.0);
        let b = square_loop(20.0);
        let out = split_compound_loops(vec![a, b], &CompoundConfig::default());
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn figure_eight_splits_into_two_loops() {
        // Two CCW squares sharing the vertex (10, 0), traced as one loop
        let l = Loop::from_points(ring(&[
            (10.0, 0.0),
            (20.0, 0.0),
            (20.0, 10.0),
            (10.0, 10.0),
            (10.0, 0.0),
            (0.0, 0.0),
            (0.0, -10.0),
            (10.0, -10.0),
        ]))
        .unwrap();
        let out = split_compound_loops(vec![l], &CompoundConfig::default());
        assert_eq!(out.len(), 2, "figure eight should split at the shared vertex");
    }
}
