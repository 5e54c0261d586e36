//! Convex-hull fallback
//!
//! When a drawing carries no usable outer boundary, the engine can inject
//! the convex hull of all input points as a synthetic outer loop. The
//! gate is deliberately conservative: thin curved parts whose true
//! outline already exists must not get a spurious hull overlay.

use tracing::debug;

use crate::engine::config::HullConfig;
use crate::engine::loops::Loop;
use crate::geometry::{convex_hull, BBox, Point};

/// What the fallback stage did to the loop set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HullAction {
    /// Loop set untouched
    None,
    /// Hull appended as an extra root loop
    Injected,
    /// Fragmented sheet: loop set replaced by tiny loops + hull
    ReplacedFragmented,
}

/// Run both hull triggers against a resolved loop set.
///
/// The caller must re-resolve the hierarchy when anything changed. The
/// hull only ever ADDS an outer; an existing primary loop is never
/// replaced.
pub fn apply_hull_fallback(
    loops: &mut Vec<Loop>,
    all_points: &[Point],
    width: f64,
    height: f64,
    cfg: &HullConfig,
) -> HullAction {
    let source_area = width * height;
    if source_area <= 0.0 || all_points.len() < 3 {
        return HullAction::None;
    }

    if try_fragmented_sheet(loops, all_points, width, height, source_area, cfg) {
        return HullAction::ReplacedFragmented;
    }

    let max_area = loops.iter().map(|l| l.area).fold(0.0, f64::max);

    // A likely outer already exists: leave the loop set alone.
    if max_area > source_area * cfg.likely_outer_ratio {
        return HullAction::None;
    }

    // With anything but vanishingly small loops, a strong container
    // contour vetoes the hull: the part's true outline is already there.
    if max_area > source_area * cfg.tiny_outer_ratio
        && has_strong_container(loops, source_area, cfg)
    {
        return HullAction::None;
    }

    let Some(hull) = hull_loop(all_points) else {
        return HullAction::None;
    };
    debug!(hull_points = hull.points.len(), "injecting convex hull outer");
    loops.push(hull);
    HullAction::Injected
}

/// Convex hull of a point cloud as a loop, if it has any area
pub fn hull_loop(points: &[Point]) -> Option<Loop> {
    Loop::from_points(convex_hull(points))
}

/// A strong container contour encloses most other loops' samples and
/// dwarfs the rest of the loop set.
fn has_strong_container(loops: &[Loop], source_area: f64, cfg: &HullConfig) -> bool {
    if loops.is_empty() {
        return false;
    }
    let need = cfg.container_sample_count.min(loops.len() - 1);

    for (i, l) in loops.iter().enumerate() {
        let contained = loops
            .iter()
            .enumerate()
            .filter(|&(j, other)| j != i && l.contains(other.sample))
            .count();
        if contained < need {
            continue;
        }
        let second_largest = loops
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, o)| o.area)
            .fold(0.0, f64::max);
        let floor = (second_largest * cfg.container_area_factor)
            .max(source_area * cfg.container_area_ratio);
        if l.area >= floor {
            return true;
        }
    }
    false
}

/// Fragmented-sheet detection: several border-touching roots plus a swarm
/// of tiny loops, with no root big enough to be the sheet itself. The cut
/// sheet outline is gone; rebuild it as (tiny loops + hull).
fn try_fragmented_sheet(
    loops: &mut Vec<Loop>,
    all_points: &[Point],
    width: f64,
    height: f64,
    source_area: f64,
    cfg: &HullConfig,
) -> bool {
    let roots: Vec<&Loop> = loops
        .iter()
        .filter(|l| !l.skip && l.parent.is_none())
        .collect();
    if roots.len() < cfg.fragment_roots {
        return false;
    }

    let touch_tol = cfg
        .fragment_touch_abs
        .max(width.min(height) * cfg.fragment_touch_factor);
    let source_bbox = BBox {
        min_x: 0.0,
        min_y: 0.0,
        max_x: width,
        max_y: height,
    };
    if !roots
        .iter()
        .all(|l| touches_border(&l.bbox, &source_bbox, touch_tol))
    {
        return false;
    }

    let largest_root = roots.iter().map(|l| l.area).fold(0.0, f64::max);
    if largest_root >= source_area * cfg.fragment_largest_ratio {
        return false;
    }

    let tiny: Vec<Loop> = loops
        .iter()
        .filter(|l| l.area <= source_area * cfg.fragment_tiny_ratio)
        .cloned()
        .collect();
    if tiny.len() < cfg.fragment_tiny_count {
        return false;
    }

    let Some(hull) = hull_loop(all_points) else {
        return false;
    };

    debug!(
        roots = roots.len(),
        tiny = tiny.len(),
        "fragmented sheet: rebuilding as tiny loops + hull"
    );
    let mut replacement = tiny;
    for l in &mut replacement {
        l.parent = None;
        l.depth = 0;
        l.skip = false;
    }
    replacement.push(hull);
    *loops = replacement;
    true
}

/// At least one side of `bbox` lies within `tol` of the source border
fn touches_border(bbox: &BBox, source: &BBox, tol: f64) -> bool {
    bbox.min_x - source.min_x <= tol
        || source.max_x - bbox.max_x <= tol
        || bbox.min_y - source.min_y <= tol
        || source.max_y - bbox.max_y <= tol
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Loop {
        Loop::from_points(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
        .unwrap()
    }

    fn grid_points(width: f64, height: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(width, 0.0),
            Point::new(width, height),
            Point::new(0.0, height),
        ]
    }

    #[test]
    fn existing_outer_vetoes_hull() {
        // One loop covering most of the document: no hull
        let mut loops = vec![square(0.0, 0.0, 90.0)];
        let pts = grid_points(100.0, 100.0);
        let action =
            apply_hull_fallback(&mut loops, &pts, 100.0, 100.0, &HullConfig::default());
        assert_eq!(action, HullAction::None);
        assert_eq!(loops.len(), 1);
    }

    #[test]
    fn tiny_loops_only_get_hull() {
        // A handful of tiny loops, nothing outer-like: hull injected
        let mut loops = vec![
            square(10.0, 10.0, 2.0),
            square(50.0, 50.0, 2.0),
            square(80.0, 30.0, 2.0),
        ];
        let pts = grid_points(100.0, 100.0);
        let action =
            apply_hull_fallback(&mut loops, &pts, 100.0, 100.0, &HullConfig::default());
        assert_eq!(action, HullAction::Injected);
        assert_eq!(loops.len(), 4);
        let hull = loops.last().unwrap();
        assert!((hull.area - 10000.0).abs() < 1e-6);
    }

    #[test]
    fn strong_container_vetoes_hull() {
        // A mid-size outline (2% of the source bbox) containing three
        // small loops: its own outline already exists, no hull.
        let mut loops = vec![
            square(0.0, 0.0, 45.0), // area 2025 = 0.02 of 100k, above tiny_outer
            square(5.0, 5.0, 3.0),
            square(15.0, 15.0, 3.0),
            square(25.0, 25.0, 3.0),
        ];
        let pts = grid_points(1000.0, 100.0);
        let action =
            apply_hull_fallback(&mut loops, &pts, 1000.0, 100.0, &HullConfig::default());
        assert_eq!(action, HullAction::None);
        assert_eq!(loops.len(), 4);
    }

    #[test]
    fn fragmented_sheet_rebuilds_loop_set() {
        // Three border-touching fragments carrying eight tiny holes,
        // largest fragment well under the sheet size.
        let mut loops = vec![
            square(0.0, 0.0, 30.0),
            square(70.0, 0.0, 30.0),
            square(0.0, 70.0, 30.0),
        ];
        for i in 0..8 {
            loops.push(square(
                5.0 + (i % 4) as f64 * 5.0,
                5.0 + (i / 4) as f64 * 5.0,
                0.5,
            ));
        }
        crate::engine::hierarchy::resolve_hierarchy(
            &mut loops,
            &crate::engine::config::HierarchyConfig::default(),
        );
        let pts = grid_points(100.0, 100.0);
        let action =
            apply_hull_fallback(&mut loops, &pts, 100.0, 100.0, &HullConfig::default());
        assert_eq!(action, HullAction::ReplacedFragmented);
        // 8 tiny loops + hull
        assert_eq!(loops.len(), 9);
        assert!(loops.last().unwrap().area > 9000.0);
    }
}
