//! Closed-loop reconstruction
//!
//! The `Loop` arena entry caches everything the hierarchy stages ask for
//! repeatedly (area, bbox, interior sample), and the extractor rebuilds
//! closed loops from loose segments via graph traversal over quantized
//! endpoints with a progressive snapping ladder.

use std::collections::HashMap;

use crate::geometry::{centroid, point_in_ring, signed_area, BBox, Contour, Point, Segment};

/// A loop's signed area must clear this to enter the arena
const MIN_LOOP_AREA: f64 = 1e-8;

/// A closed loop with cached derived data
///
/// `points` is the open ring (first point not repeated). Parent/child
/// relationships are arena indices; the tree is recomputable from the
/// parent assignments alone.
#[derive(Debug, Clone)]
pub struct Loop {
    pub points: Vec<Point>,
    pub signed_area: f64,
    /// |signed_area|
    pub area: f64,
    pub bbox: BBox,
    /// A point strictly inside the ring, used for containment tests
    pub sample: Point,
    pub parent: Option<usize>,
    pub depth: u32,
    /// Flattened as a pseudo-hole; excluded from assembly
    pub skip: bool,
}

impl Loop {
    /// Build a loop from an open ring, rejecting degenerate input.
    ///
    /// A trailing duplicate of the first point is tolerated and dropped.
    pub fn from_points(mut points: Vec<Point>) -> Option<Loop> {
        while points.len() > 1 && points[0].dist(points[points.len() - 1]) <= 1e-9 {
            points.pop();
        }
        if points.len() < 3 {
            return None;
        }

        let sa = signed_area(&points);
        if sa.abs() <= MIN_LOOP_AREA {
            return None;
        }

        let bbox = BBox::from_points(&points);
        let sample = interior_sample(&points);
        Some(Loop {
            points,
            signed_area: sa,
            area: sa.abs(),
            bbox,
            sample,
            parent: None,
            depth: 0,
            skip: false,
        })
    }

    /// The ring with the first point repeated at the end
    pub fn closed_points(&self) -> Vec<Point> {
        let mut pts = self.points.clone();
        pts.push(self.points[0]);
        pts
    }

    /// Strict containment of a point (on-edge counts as outside)
    pub fn contains(&self, p: Point) -> bool {
        point_in_ring(p, &self.points)
    }

    /// Bbox center, used for center-quantized dedup
    pub fn center(&self) -> Point {
        self.bbox.center()
    }
}

/// Pick an interior sample for a ring.
///
/// Candidates in order: shoelace centroid, vertex mean, first-edge
/// midpoint, first vertex. The first one strictly inside wins; the first
/// vertex is the unconditional fallback for degenerate rings.
pub fn interior_sample(ring: &[Point]) -> Point {
    let mut candidates: Vec<Point> = Vec::with_capacity(4);
    if let Some(c) = centroid(ring) {
        candidates.push(c);
    }

    let n = ring.len() as f64;
    let mean = Point::new(
        ring.iter().map(|p| p.x).sum::<f64>() / n,
        ring.iter().map(|p| p.y).sum::<f64>() / n,
    );
    candidates.push(mean);

    if ring.len() >= 2 {
        candidates.push(Point::new(
            (ring[0].x + ring[1].x) * 0.5,
            (ring[0].y + ring[1].y) * 0.5,
        ));
    }

    for c in candidates {
        if point_in_ring(c, ring) {
            return c;
        }
    }
    ring[0]
}

/// Split open contours into segments, dropping near-zero-length edges
pub fn segments_from_contours(contours: &[Contour], min_length: f64) -> Vec<Segment> {
    let mut segments = Vec::new();
    for c in contours {
        if c.closed {
            continue;
        }
        for w in c.points.windows(2) {
            let seg = Segment { a: w[0], b: w[1] };
            if seg.length() > min_length {
                segments.push(seg);
            }
        }
    }
    segments
}

/// Quantized endpoint key
fn quantize(p: Point, eps: f64) -> (i64, i64) {
    ((p.x / eps).round() as i64, (p.y / eps).round() as i64)
}

/// Reconstruct closed loops from segments, trying each snapping tolerance
/// in turn and stopping at the first that yields at least one loop.
pub fn extract_loops(segments: &[Segment], snap_tolerances: &[f64]) -> Vec<Vec<Point>> {
    for &eps in snap_tolerances {
        let loops = extract_at(segments, eps);
        if !loops.is_empty() {
            return loops;
        }
    }
    Vec::new()
}

/// Single-tolerance extraction: walk the endpoint multigraph, avoiding
/// immediate backtracking, until the walk returns to its start key.
fn extract_at(segments: &[Segment], eps: f64) -> Vec<Vec<Point>> {
    // Two parallel arrays (segments, used) plus a key -> indices map;
    // traversal is index-based, no back-pointers.
    let mut adjacency: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        adjacency.entry(quantize(seg.a, eps)).or_default().push(i);
        adjacency.entry(quantize(seg.b, eps)).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut loops: Vec<Vec<Point>> = Vec::new();

    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let start_key = quantize(segments[start].a, eps);
        let mut prev_key = start_key;
        let mut cur_key = quantize(segments[start].b, eps);
        let mut path = vec![segments[start].a, segments[start].b];

        loop {
            if cur_key == start_key {
                // Walk returned to its origin: drop the re-entrant point
                path.pop();
                if path.len() >= 3 {
                    loops.push(path);
                }
                break;
            }

            let Some(next) = pick_next(&adjacency, segments, &used, cur_key, prev_key, eps)
            else {
                break; // dead end, discard the walk
            };

            used[next] = true;
            let seg = segments[next];
            let (exit, next_key) = if quantize(seg.a, eps) == cur_key {
                (seg.b, quantize(seg.b, eps))
            } else {
                (seg.a, quantize(seg.a, eps))
            };
            path.push(exit);
            prev_key = cur_key;
            cur_key = next_key;
        }
    }

    loops
}

/// Choose the next unused segment at `cur_key`, preferring one that does
/// not walk straight back to `prev_key`.
fn pick_next(
    adjacency: &HashMap<(i64, i64), Vec<usize>>,
    segments: &[Segment],
    used: &[bool],
    cur_key: (i64, i64),
    prev_key: (i64, i64),
    eps: f64,
) -> Option<usize> {
    let candidates = adjacency.get(&cur_key)?;
    let mut fallback = None;

    for &i in candidates {
        if used[i] {
            continue;
        }
        let seg = segments[i];
        let ka = quantize(seg.a, eps);
        let kb = quantize(seg.b, eps);
        // The segment must actually touch the current node
        let other = if ka == cur_key {
            kb
        } else if kb == cur_key {
            ka
        } else {
            continue;
        };
        if other != prev_key {
            return Some(i);
        }
        fallback = Some(i);
    }

    fallback
}
