//! Loop hierarchy resolution
//!
//! Assigns every loop its smallest enclosing parent, derives depths
//! (even = outer, odd = hole), and flattens pseudo-holes: duplicated
//! border offsets that sit between a true outer and its real cutouts.

use tracing::debug;

use crate::engine::config::HierarchyConfig;
use crate::engine::loops::Loop;
use crate::geometry::{build_region_index, regions_containing};

/// Assign parents and depths for the whole arena.
///
/// Parent of `i` is the smallest-area loop `j` with
/// `area(j) > area(i) + margin` whose ring strictly contains `i`'s
/// interior sample. Roots keep `parent = None`.
pub fn resolve_hierarchy(loops: &mut [Loop], cfg: &HierarchyConfig) {
    let tree = build_region_index(
        loops
            .iter()
            .enumerate()
            .filter(|(_, l)| !l.skip)
            .map(|(i, l)| (i, &l.bbox)),
    );

    for i in 0..loops.len() {
        loops[i].parent = None;
        if loops[i].skip {
            continue;
        }
        let sample = loops[i].sample;
        let mut best: Option<usize> = None;
        for j in regions_containing(&tree, sample, cfg.bbox_tolerance) {
            if j == i || loops[j].skip {
                continue;
            }
            if loops[j].area <= loops[i].area + cfg.area_margin {
                continue;
            }
            if best.is_some_and(|b| loops[b].area <= loops[j].area) {
                continue;
            }
            if loops[j].contains(sample) {
                best = Some(j);
            }
        }
        loops[i].parent = best;
    }

    rebuild_depths(loops);
}

/// Recompute depths from the parent assignments.
///
/// Iterative over an area-descending order: a parent is always strictly
/// larger than its child, so its depth lands first. No recursion, no
/// stack depth proportional to nesting.
pub fn rebuild_depths(loops: &mut [Loop]) {
    let mut order: Vec<usize> = (0..loops.len()).collect();
    order.sort_by(|&a, &b| loops[b].area.partial_cmp(&loops[a].area).unwrap());

    for i in order {
        let depth = match loops[i].parent {
            Some(p) => loops[p].depth + 1,
            None => 0,
        };
        loops[i].depth = depth;
    }
}

/// Children lists indexed by parent, skipped loops excluded
pub fn children_by_parent(loops: &[Loop]) -> Vec<Vec<usize>> {
    let mut children = vec![Vec::new(); loops.len()];
    for (i, l) in loops.iter().enumerate() {
        if l.skip {
            continue;
        }
        if let Some(p) = l.parent {
            children[p].push(i);
        }
    }
    children
}

/// Subtree sizes (descendants only, not counting the loop itself)
fn descendant_counts(loops: &[Loop], children: &[Vec<usize>]) -> Vec<usize> {
    // Process smallest-area first so every child's count is final before
    // its parent sums it.
    let mut order: Vec<usize> = (0..loops.len()).collect();
    order.sort_by(|&a, &b| loops[a].area.partial_cmp(&loops[b].area).unwrap());

    let mut counts = vec![0usize; loops.len()];
    for i in order {
        let total = children[i].iter().map(|&c| counts[c] + 1).sum();
        counts[i] = total;
    }
    counts
}

/// Flatten duplicated inner borders so their descendants re-attach to the
/// true parent. Bounded passes; depths and children maps are rebuilt
/// after every pass so parity stays correct for the surviving cutouts.
pub fn normalize_pseudo_holes(loops: &mut [Loop], cfg: &HierarchyConfig) {
    for _pass in 0..cfg.max_passes {
        rebuild_depths(loops);
        let children = children_by_parent(loops);
        let descendants = descendant_counts(loops, &children);

        let mut skipped_any = false;
        for p in 0..loops.len() {
            if loops[p].skip || loops[p].depth % 2 != 0 {
                continue;
            }

            let kids: Vec<usize> = children[p]
                .iter()
                .copied()
                .filter(|&c| loops[c].depth % 2 == 1)
                .collect();
            let tiny_siblings = kids
                .iter()
                .filter(|&&c| loops[c].area / loops[p].area < cfg.tiny_area_ratio)
                .count();

            for &c in &kids {
                if loops[c].skip {
                    continue;
                }
                if should_skip_as_pseudo_hole(
                    &loops[p],
                    &loops[c],
                    tiny_siblings,
                    descendants[c],
                    cfg,
                ) {
                    debug!(
                        parent = p,
                        child = c,
                        area_ratio = loops[c].area / loops[p].area,
                        "flattening pseudo-hole"
                    );
                    // Grandchildren re-attach to the true parent; the
                    // pseudo-hole itself leaves the tree.
                    for g in 0..loops.len() {
                        if loops[g].parent == Some(c) {
                            loops[g].parent = Some(p);
                        }
                    }
                    loops[c].parent = None;
                    loops[c].skip = true;
                    skipped_any = true;
                }
            }
        }

        if !skipped_any {
            break;
        }
    }

    rebuild_depths(loops);
}

/// Border-offset test: is `c` a duplicated inset of `p` rather than a
/// real cutout?
fn should_skip_as_pseudo_hole(
    p: &Loop,
    c: &Loop,
    tiny_siblings: usize,
    descendants: usize,
    cfg: &HierarchyConfig,
) -> bool {
    let area_ratio = c.area / p.area;
    if area_ratio <= cfg.pseudo_area_ratio {
        return false;
    }

    if tiny_siblings >= cfg.tiny_siblings {
        return true;
    }

    // All four insets must sit in a narrow band along the parent border
    let cap = cfg
        .inset_cap_abs
        .max(p.bbox.width().min(p.bbox.height()) * cfg.inset_cap_factor);
    let insets = [
        c.bbox.min_x - p.bbox.min_x,
        p.bbox.max_x - c.bbox.max_x,
        c.bbox.min_y - p.bbox.min_y,
        p.bbox.max_y - c.bbox.max_y,
    ];
    if !insets
        .iter()
        .all(|&v| v >= -cfg.inset_slack && v <= cap)
    {
        return false;
    }

    descendants >= cfg.min_descendants
        || tiny_siblings >= cfg.tiny_siblings_strong
        || (area_ratio > cfg.pseudo_area_ratio_strong && tiny_siblings >= cfg.tiny_siblings_soft)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn square(x: f64, y: f64, size: f64) -> Loop {
        Loop::from_points(vec![
            Point::new(x, y),
            Point::new(x + size, y),
            Point::new(x + size, y + size),
            Point::new(x, y + size),
        ])
        .unwrap()
    }

    #[test]
    fn nested_squares_resolve_depths() {
        let mut loops = vec![
            square(0.0, 0.0, 100.0),
            square(10.0, 10.0, 50.0),
            square(20.0, 20.0, 10.0),
        ];
        resolve_hierarchy(&mut loops, &HierarchyConfig::default());
        assert_eq!(loops[0].parent, None);
        assert_eq!(loops[1].parent, Some(0));
        assert_eq!(loops[2].parent, Some(1));
        assert_eq!(
            (loops[0].depth, loops[1].depth, loops[2].depth),
            (0, 1, 2)
        );
    }

    #[test]
    fn parent_is_smallest_enclosing() {
        let mut loops = vec![
            square(0.0, 0.0, 100.0),
            square(5.0, 5.0, 80.0),
            square(10.0, 10.0, 10.0),
        ];
        resolve_hierarchy(&mut loops, &HierarchyConfig::default());
        // The 10-square picks the 80-square, not the 100-square
        assert_eq!(loops[2].parent, Some(1));
    }

    #[test]
    fn siblings_do_not_nest() {
        let mut loops = vec![
            square(0.0, 0.0, 10.0),
            square(20.0, 0.0, 10.0),
        ];
        resolve_hierarchy(&mut loops, &HierarchyConfig::default());
        assert_eq!(loops[0].parent, None);
        assert_eq!(loops[1].parent, None);
    }

    #[test]
    fn parent_must_be_strictly_larger() {
        // Two identical coincident squares: neither may parent the other
        let mut loops = vec![square(0.0, 0.0, 10.0), square(0.0, 0.0, 10.0)];
        resolve_hierarchy(&mut loops, &HierarchyConfig::default());
        assert_eq!(loops[0].parent, None);
        assert_eq!(loops[1].parent, None);
    }

    #[test]
    fn duplicated_border_offset_is_flattened() {
        // 100x100 outer, 98x98 inner offset by 1, eight tiny holes inside
        // the inner square. The inner border is a pseudo-hole: the tiny
        // holes must re-attach to the outer.
        let mut loops = vec![square(0.0, 0.0, 100.0), square(1.0, 1.0, 98.0)];
        for i in 0..8 {
            loops.push(square(10.0 + (i as f64) * 10.0, 48.0, 2.0));
        }

        let cfg = HierarchyConfig::default();
        resolve_hierarchy(&mut loops, &cfg);
        assert_eq!(loops[1].parent, Some(0));
        assert_eq!(loops[2].parent, Some(1));

        normalize_pseudo_holes(&mut loops, &cfg);

        assert!(loops[1].skip, "inner border must be flattened");
        for i in 2..10 {
            assert_eq!(loops[i].parent, Some(0), "hole {i} re-attached to outer");
            assert_eq!(loops[i].depth, 1, "hole {i} must sit at odd depth");
        }
    }

    #[test]
    fn real_cutout_is_not_flattened() {
        // A big hole without border-offset signature: only one child, no
        // tiny siblings, not hugging the border on all sides.
        let mut loops = vec![square(0.0, 0.0, 100.0), square(10.0, 10.0, 75.0)];
        let cfg = HierarchyConfig::default();
        resolve_hierarchy(&mut loops, &cfg);
        normalize_pseudo_holes(&mut loops, &cfg);
        assert!(!loops[1].skip);
        assert_eq!(loops[1].depth, 1);
    }

    #[test]
    fn descendant_counts_sum_subtrees() {
        let mut loops = vec![
            square(0.0, 0.0, 100.0),
            square(10.0, 10.0, 50.0),
            square(20.0, 20.0, 10.0),
            square(40.0, 40.0, 10.0),
        ];
        resolve_hierarchy(&mut loops, &HierarchyConfig::default());
        let children = children_by_parent(&loops);
        let counts = descendant_counts(&loops, &children);
        assert_eq!(counts[0], 3);
        assert_eq!(counts[1], 2);
        assert_eq!(counts[2], 0);
    }
}
