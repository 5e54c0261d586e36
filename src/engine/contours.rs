//! Contour cleaning and stitching
//!
//! Deduplicates vertices, drops degenerate contours, chains near-touching
//! open polylines back together, suppresses detached artifact clusters,
//! and finally translates everything to a local origin.
//!
//! CAD exports routinely carry stray registration marks, dimension
//! artifacts, and detached labels far away from the part; the cluster
//! filter drops them on geometry alone, without any layer metadata.

use tracing::debug;

use crate::engine::config::StitchConfig;
use crate::engine::error::EngineError;
use crate::geometry::{polyline_length, BBox, Contour, Point};

/// Result of the cleaning/stitching stage
#[derive(Debug)]
pub struct CleanOutcome {
    pub contours: Vec<Contour>,
    /// Contours dropped as degenerate
    pub dropped: usize,
    /// The stitcher closed at least one open chain
    pub auto_closed: bool,
}

/// Clean, stitch, and (unless `raw_mode`) cluster-filter a contour set.
///
/// `raw_mode` preserves borders built entirely from LINE/ARC primitives
/// that the cluster filter would otherwise discard.
pub fn clean_contours(contours: Vec<Contour>, cfg: &StitchConfig, raw_mode: bool) -> CleanOutcome {
    let mut dropped = 0usize;
    let mut cleaned: Vec<Contour> = Vec::with_capacity(contours.len());

    for contour in contours {
        match clean_single(contour, cfg) {
            Some(c) => cleaned.push(c),
            None => dropped += 1,
        }
    }

    let mut auto_closed = false;
    if cleaned.len() >= 2 {
        let (stitched, closed_any) = stitch_continuity(cleaned, cfg);
        cleaned = stitched;
        auto_closed = closed_any;
    }

    if !raw_mode && cleaned.len() >= 2 {
        cleaned = cluster_filter(cleaned, cfg);
    }

    CleanOutcome {
        contours: cleaned,
        dropped,
        auto_closed,
    }
}

/// Per-contour vertex dedup and degeneracy rules
fn clean_single(contour: Contour, cfg: &StitchConfig) -> Option<Contour> {
    let mut pts: Vec<Point> = Vec::with_capacity(contour.points.len());
    for p in contour.points {
        if pts
            .last()
            .is_none_or(|last| last.dist(p) > cfg.dedup_tolerance)
        {
            pts.push(p);
        }
    }

    // A closed ring may still carry a trailing duplicate of its first point
    if contour.closed && pts.len() > 1 && pts[0].dist(pts[pts.len() - 1]) <= cfg.dedup_tolerance {
        pts.pop();
    }

    let cleaned = Contour {
        points: pts,
        closed: contour.closed,
    };

    if cleaned.closed {
        if cleaned.points.len() < 3 || cleaned.perimeter() <= cfg.min_closed_perimeter {
            return None;
        }
    } else if cleaned.points.len() < 2 {
        return None;
    }

    Some(cleaned)
}

/// How an unused polyline attaches to the working chain
#[derive(Clone, Copy, PartialEq)]
enum Attach {
    /// chain tail -> candidate head
    Append,
    /// chain tail -> candidate tail (candidate reversed)
    AppendReversed,
    /// candidate tail -> chain head
    Prepend,
    /// candidate head -> chain head (candidate reversed)
    PrependReversed,
}

/// Chain near-touching open polylines into continuous runs.
///
/// Greedy: the working chain always absorbs the nearest-endpoint unused
/// polyline while the gap stays within `join_tol`; a chain whose own
/// endpoints come within `close_tol` becomes a closed contour.
fn stitch_continuity(contours: Vec<Contour>, cfg: &StitchConfig) -> (Vec<Contour>, bool) {
    let overall = contours
        .iter()
        .fold(BBox::empty(), |acc, c| acc.union(&c.bbox()));
    let min_side = overall.min_side().max(1.0);
    let join_tol = (min_side * cfg.join_tol_factor).clamp(cfg.join_tol_min, cfg.join_tol_max);
    let close_tol = (join_tol * cfg.close_tol_factor).max(cfg.close_tol_min);
    stitch_with(contours, join_tol, close_tol, cfg)
}

/// Re-run the stitcher at an explicit tolerance.
///
/// Used by the loop extractor as a last resort when segment extraction
/// finds nothing at any snapping tolerance.
pub fn restitch_open(contours: Vec<Contour>, tol: f64, cfg: &StitchConfig) -> (Vec<Contour>, bool) {
    stitch_with(contours, tol, tol, cfg)
}

fn stitch_with(
    contours: Vec<Contour>,
    join_tol: f64,
    close_tol: f64,
    cfg: &StitchConfig,
) -> (Vec<Contour>, bool) {
    let mut result: Vec<Contour> = Vec::with_capacity(contours.len());
    let mut pool: Vec<Vec<Point>> = Vec::new();
    for c in contours {
        if c.closed {
            result.push(c);
        } else {
            pool.push(c.points);
        }
    }

    let mut auto_closed = false;
    while let Some(mut chain) = pool.pop() {
        loop {
            let head = chain[0];
            let tail = chain[chain.len() - 1];

            let mut best: Option<(usize, Attach, f64)> = None;
            for (i, cand) in pool.iter().enumerate() {
                let c_head = cand[0];
                let c_tail = cand[cand.len() - 1];
                let options = [
                    (Attach::Append, tail.dist(c_head)),
                    (Attach::AppendReversed, tail.dist(c_tail)),
                    (Attach::Prepend, head.dist(c_tail)),
                    (Attach::PrependReversed, head.dist(c_head)),
                ];
                for (mode, gap) in options {
                    if gap <= join_tol && best.is_none_or(|(_, _, g)| gap < g) {
                        best = Some((i, mode, gap));
                    }
                }
            }

            let Some((idx, mode, _)) = best else { break };
            let mut cand = pool.swap_remove(idx);
            match mode {
                Attach::Append => extend_dedup(&mut chain, cand, cfg.dedup_tolerance),
                Attach::AppendReversed => {
                    cand.reverse();
                    extend_dedup(&mut chain, cand, cfg.dedup_tolerance);
                }
                Attach::Prepend => {
                    extend_dedup(&mut cand, std::mem::take(&mut chain), cfg.dedup_tolerance);
                    chain = cand;
                }
                Attach::PrependReversed => {
                    cand.reverse();
                    extend_dedup(&mut cand, std::mem::take(&mut chain), cfg.dedup_tolerance);
                    chain = cand;
                }
            }
        }

        let closes = chain.len() >= 3 && chain[0].dist(chain[chain.len() - 1]) <= close_tol;
        if closes {
            if chain[0].dist(chain[chain.len() - 1]) <= cfg.dedup_tolerance {
                chain.pop();
            }
            if chain.len() >= 3 {
                let contour = Contour::closed(chain);
                if contour.perimeter() > cfg.min_closed_perimeter {
                    auto_closed = true;
                    result.push(contour);
                }
                continue;
            }
        }
        result.push(Contour::open(chain));
    }

    (result, auto_closed)
}

/// Append `extra` to `chain`, skipping a duplicated junction vertex
fn extend_dedup(chain: &mut Vec<Point>, extra: Vec<Point>, tol: f64) {
    for p in extra {
        if chain.last().is_none_or(|last| last.dist(p) > tol) {
            chain.push(p);
        }
    }
}

#[derive(Debug)]
struct Cluster {
    members: Vec<usize>,
    bbox: BBox,
    total_length: f64,
}

impl Cluster {
    fn score(&self) -> f64 {
        self.total_length * self.bbox.area().sqrt()
    }
}

/// Keep only the dominant contour cluster when it clearly outweighs the
/// rest; otherwise keep everything.
fn cluster_filter(contours: Vec<Contour>, cfg: &StitchConfig) -> Vec<Contour> {
    let bboxes: Vec<BBox> = contours.iter().map(Contour::bbox).collect();
    let overall = bboxes
        .iter()
        .fold(BBox::empty(), |acc, b| acc.union(b));
    let min_side = overall.min_side().max(1.0);
    let join_gap = (min_side * cfg.cluster_gap_factor).clamp(cfg.cluster_gap_min, cfg.cluster_gap_max);

    // BFS over bbox adjacency
    let mut cluster_of = vec![usize::MAX; contours.len()];
    let mut clusters: Vec<Cluster> = Vec::new();
    for start in 0..contours.len() {
        if cluster_of[start] != usize::MAX {
            continue;
        }
        let id = clusters.len();
        let mut members = vec![start];
        cluster_of[start] = id;
        let mut queue = vec![start];
        while let Some(i) = queue.pop() {
            for j in 0..contours.len() {
                if cluster_of[j] == usize::MAX && bboxes[i].within_gap(&bboxes[j], join_gap) {
                    cluster_of[j] = id;
                    members.push(j);
                    queue.push(j);
                }
            }
        }
        let bbox = members
            .iter()
            .fold(BBox::empty(), |acc, &m| acc.union(&bboxes[m]));
        let total_length: f64 = members
            .iter()
            .map(|&m| {
                let c = &contours[m];
                let mut len = polyline_length(&c.points);
                if c.closed && c.points.len() > 1 {
                    len += c.points[c.points.len() - 1].dist(c.points[0]);
                }
                len
            })
            .sum();
        clusters.push(Cluster {
            members,
            bbox,
            total_length,
        });
    }

    if clusters.len() < 2 {
        return contours;
    }

    clusters.sort_by(|a, b| b.score().partial_cmp(&a.score()).unwrap());
    let main = &clusters[0];
    let alt = &clusters[1];
    let overall_area = overall.area();

    let dominant = (main.score() > alt.score() * cfg.cluster_score_ratio
        && main.bbox.area() > alt.bbox.area() * cfg.cluster_area_ratio)
        || (overall_area > main.bbox.area() * cfg.cluster_spread_ratio
            && main.score() > alt.score() * cfg.cluster_soft_score_ratio);

    if !dominant {
        return contours;
    }

    debug!(
        kept = main.members.len(),
        suppressed = contours.len() - main.members.len(),
        "cluster filter kept dominant cluster only"
    );

    let keep: std::collections::HashSet<usize> = main.members.iter().copied().collect();
    contours
        .into_iter()
        .enumerate()
        .filter(|(i, _)| keep.contains(i))
        .map(|(_, c)| c)
        .collect()
}

/// Translate all contours to a (0, 0) origin and report the extent.
///
/// Fails with [`EngineError::EmptyDocument`] when nothing survives or the
/// extent collapses.
pub fn normalize_origin(contours: &mut [Contour]) -> Result<(f64, f64), EngineError> {
    let mut overall = BBox::empty();
    for c in contours.iter() {
        for p in &c.points {
            overall.include(*p);
        }
    }
    if contours.is_empty() || !overall.is_valid() {
        return Err(EngineError::EmptyDocument);
    }

    let width = overall.width();
    let height = overall.height();
    if width <= 1e-6 || height <= 1e-6 {
        return Err(EngineError::EmptyDocument);
    }

    for c in contours.iter_mut() {
        for p in &mut c.points {
            p.x -= overall.min_x;
            p.y -= overall.min_y;
        }
    }

    Ok((width, height))
}
