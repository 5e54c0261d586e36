//! Planar polygon predicates and ring math
//!
//! Free functions over point slices: signed area, perimeter, shoelace
//! centroid, strict point-in-polygon, and convex hull. Rings are passed
//! as open sequences (first point not repeated at the end); the closing
//! edge is implicit.

use super::types::Point;

/// Shoelace signed area of an open ring. Positive for CCW winding.
pub fn signed_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Total edge length of an open polyline
pub fn polyline_length(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].dist(w[1])).sum()
}

/// Shoelace centroid of an open ring.
///
/// Returns `None` when the ring area degenerates (collinear points),
/// where the formula divides by ~zero.
pub fn centroid(ring: &[Point]) -> Option<Point> {
    if ring.len() < 3 {
        return None;
    }
    let mut area2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        let cross = a.x * b.y - b.x * a.y;
        area2 += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    if area2.abs() < 1e-12 {
        return None;
    }
    let factor = 1.0 / (3.0 * area2);
    Some(Point::new(cx * factor, cy * factor))
}

/// Distance band used for the on-edge rejection in [`point_in_ring`]
const ON_EDGE_EPS: f64 = 1e-9;

/// Strict point-in-polygon test over an open ring.
///
/// Even-odd ray casting; a point lying on an edge counts as OUTSIDE.
/// The strictness matters for hierarchy resolution: a loop must never be
/// classified as inside a sibling it merely touches.
pub fn point_in_ring(p: Point, ring: &[Point]) -> bool {
    if ring.len() < 3 {
        return false;
    }

    // On-edge rejection first, so the crossing count can stay simple.
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        if point_on_segment(p, a, b) {
            return false;
        }
    }

    let mut inside = false;
    for i in 0..ring.len() {
        let a = ring[i];
        let b = ring[(i + 1) % ring.len()];
        if (a.y > p.y) != (b.y > p.y) {
            let t = (p.y - a.y) / (b.y - a.y);
            let x = a.x + t * (b.x - a.x);
            if x > p.x {
                inside = !inside;
            }
        }
    }
    inside
}

/// True when `p` lies on segment a-b within a tight band
fn point_on_segment(p: Point, a: Point, b: Point) -> bool {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let apx = p.x - a.x;
    let apy = p.y - a.y;

    let cross = abx * apy - aby * apx;
    let len = abx.hypot(aby);
    if len < ON_EDGE_EPS {
        return p.dist(a) < ON_EDGE_EPS;
    }
    if (cross / len).abs() > ON_EDGE_EPS {
        return false;
    }
    let dot = apx * abx + apy * aby;
    dot >= -ON_EDGE_EPS * len && dot <= len * len + ON_EDGE_EPS * len
}

/// Convex hull via Andrew's monotone chain. Returns a CCW open ring.
///
/// Duplicate input points are tolerated; fewer than 3 distinct points
/// yield a degenerate (possibly empty) result.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = points.iter().copied().filter(Point::is_finite).collect();
    pts.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap()
            .then(a.y.partial_cmp(&b.y).unwrap())
    });
    pts.dedup_by(|a, b| a.dist_sq(*b) < 1e-18);

    if pts.len() < 3 {
        return pts;
    }

    let cross = |o: Point, a: Point, b: Point| -> f64 {
        (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
    };

    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(p);
    }

    // Last point of each chain repeats the first point of the other.
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}
