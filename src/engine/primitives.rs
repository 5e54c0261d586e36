//! Primitive normalization
//!
//! Converts typed input primitives (from an external DXF tokenizer) into a
//! uniform set of open/closed contours, with all curvature discretized to
//! line segments. Non-finite coordinates, non-positive radii and empty
//! vertex lists are rejected here at the boundary; nothing downstream has
//! to re-check.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::config::DiscretizeConfig;
use crate::geometry::{Contour, Point};

/// Endpoint-coincidence tolerance for implicit closure
const CLOSE_EPS: f64 = 1e-6;
/// Consecutive-duplicate tolerance during emission
const EMIT_DEDUP_EPS: f64 = 1e-7;

/// A polyline vertex with its bulge factor
///
/// A non-zero bulge encodes a circular arc to the next vertex; the central
/// angle is `4 * atan(bulge)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolyVertex {
    pub point: Point,
    pub bulge: f64,
}

impl PolyVertex {
    pub fn new(x: f64, y: f64, bulge: f64) -> Self {
        PolyVertex {
            point: Point::new(x, y),
            bulge,
        }
    }
}

/// Typed geometric primitives as produced by the DXF tokenizer
///
/// Only ENTITIES-section geometry matters; layer, color, and style fields
/// never reach the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Primitive {
    Line {
        start: Point,
        end: Point,
    },
    Arc {
        center: Point,
        radius: f64,
        start_deg: f64,
        end_deg: f64,
    },
    Circle {
        center: Point,
        radius: f64,
    },
    Polyline {
        vertices: Vec<PolyVertex>,
        closed: bool,
    },
    Spline {
        control_points: Vec<Point>,
        fit_points: Vec<Point>,
        closed: bool,
    },
}

/// Discretize a batch of primitives into contours.
///
/// Returns the surviving contours plus the count of primitives dropped as
/// invalid or degenerate.
pub fn normalize_primitives(
    primitives: &[Primitive],
    cfg: &DiscretizeConfig,
) -> (Vec<Contour>, usize) {
    let mut contours = Vec::with_capacity(primitives.len());
    let mut dropped = 0usize;

    for prim in primitives {
        match normalize_primitive(prim, cfg) {
            Some(contour) => contours.push(contour),
            None => {
                debug!(?prim, "dropping invalid or degenerate primitive");
                dropped += 1;
            }
        }
    }

    (contours, dropped)
}

fn normalize_primitive(prim: &Primitive, cfg: &DiscretizeConfig) -> Option<Contour> {
    match prim {
        Primitive::Line { start, end } => {
            if !start.is_finite() || !end.is_finite() {
                return None;
            }
            finish_contour(vec![*start, *end], false)
        }
        Primitive::Arc {
            center,
            radius,
            start_deg,
            end_deg,
        } => {
            if !center.is_finite() || !radius.is_finite() || *radius <= 0.0 {
                return None;
            }
            let pts = arc_points(*center, *radius, *start_deg, *end_deg, cfg);
            // Closure only for full circles: a 360-degree sweep lands the
            // last point back on the first.
            let full_turn = pts.len() > 2 && pts[0].dist(pts[pts.len() - 1]) <= CLOSE_EPS;
            finish_contour(pts, full_turn)
        }
        Primitive::Circle { center, radius } => {
            if !center.is_finite() || !radius.is_finite() || *radius <= 0.0 {
                return None;
            }
            finish_contour(circle_points(*center, *radius, cfg), true)
        }
        Primitive::Polyline { vertices, closed } => {
            let verts: Vec<PolyVertex> = vertices
                .iter()
                .filter(|v| v.point.is_finite() && v.bulge.is_finite())
                .copied()
                .collect();
            if verts.len() < 2 {
                return None;
            }

            let seg_count = if *closed { verts.len() } else { verts.len() - 1 };
            let mut pts = vec![verts[0].point];
            for i in 0..seg_count {
                let next = (i + 1) % verts.len();
                let seg = bulge_points(verts[i].point, verts[next].point, verts[i].bulge, cfg);
                pts.extend_from_slice(&seg[1..]);
            }
            finish_contour(pts, *closed)
        }
        Primitive::Spline {
            control_points,
            fit_points,
            closed,
        } => {
            // Control points polylined directly; no knot/weight math.
            // Fit points are only a fallback when control points are
            // missing.
            let source = if control_points.len() >= 2 {
                control_points
            } else {
                fit_points
            };
            let pts: Vec<Point> = source.iter().filter(|p| p.is_finite()).copied().collect();
            if pts.len() < 2 {
                return None;
            }
            finish_contour(pts, *closed)
        }
    }
}

/// Dedup, resolve implicit closure, and enforce minimum point counts
fn finish_contour(raw: Vec<Point>, closed_flag: bool) -> Option<Contour> {
    let mut pts: Vec<Point> = Vec::with_capacity(raw.len());
    for p in raw {
        if !p.is_finite() {
            continue;
        }
        if pts.last().is_none_or(|last| last.dist(p) > EMIT_DEDUP_EPS) {
            pts.push(p);
        }
    }

    // Closed when the source says so OR the endpoints coincide; either way
    // the trailing duplicate of the first point is dropped.
    let mut closed = closed_flag;
    if pts.len() > 2 && pts[0].dist(pts[pts.len() - 1]) <= CLOSE_EPS {
        pts.pop();
        closed = true;
    }

    let min_pts = if closed { 3 } else { 2 };
    if pts.len() < min_pts {
        return None;
    }

    Some(Contour { points: pts, closed })
}

/// Effective sagitta for a given radius: `min(max(tol, 0.05), r/2)`
fn sagitta(cfg: &DiscretizeConfig, radius: f64) -> f64 {
    cfg.chord_tolerance.max(0.05).min(radius * 0.5)
}

/// Step angle in degrees that keeps the chord sagitta within `s`
fn sagitta_step_deg(cfg: &DiscretizeConfig, radius: f64) -> f64 {
    let s = sagitta(cfg, radius);
    let step = 2.0 * (1.0 - s / radius).clamp(-1.0, 1.0).acos();
    step.to_degrees().max(cfg.min_step_deg)
}

/// Discretize an arc by sweep angle, endpoints exact
fn arc_points(center: Point, radius: f64, start_deg: f64, end_deg: f64, cfg: &DiscretizeConfig) -> Vec<Point> {
    let mut sweep = end_deg - start_deg;
    while sweep <= 0.0 {
        sweep += 360.0;
    }

    let step_deg = sagitta_step_deg(cfg, radius);
    let steps = ((sweep / step_deg).ceil() as usize).clamp(cfg.min_arc_steps, cfg.max_arc_steps);

    let start = start_deg.to_radians();
    let sweep_rad = sweep.to_radians();
    (0..=steps)
        .map(|i| {
            let a = start + sweep_rad * (i as f64 / steps as f64);
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Discretize a full circle as an open ring (first point not repeated)
fn circle_points(center: Point, radius: f64, cfg: &DiscretizeConfig) -> Vec<Point> {
    let sagitta_steps = (360.0 / sagitta_step_deg(cfg, radius)).ceil() as usize;
    let steps = cfg.circle_steps.max(sagitta_steps).clamp(12, cfg.max_arc_steps);

    (0..steps)
        .map(|i| {
            let a = std::f64::consts::TAU * (i as f64 / steps as f64);
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect()
}

/// Expand one bulged polyline segment into arc points, endpoints exact
fn bulge_points(p1: Point, p2: Point, bulge: f64, cfg: &DiscretizeConfig) -> Vec<Point> {
    if bulge.abs() < 1e-12 {
        return vec![p1, p2];
    }

    let chord = p1.dist(p2);
    if chord < CLOSE_EPS {
        return vec![p1, p2];
    }

    let theta = 4.0 * bulge.atan();
    let sin_half = (theta.abs() / 2.0).sin();
    if sin_half.abs() < CLOSE_EPS {
        return vec![p1, p2];
    }

    let radius = chord / (2.0 * sin_half);
    let mid_x = (p1.x + p2.x) * 0.5;
    let mid_y = (p1.y + p2.y) * 0.5;
    let normal_x = -(p2.y - p1.y) / chord;
    let normal_y = (p2.x - p1.x) / chord;
    let offset = (radius * radius - (chord * 0.5).powi(2)).max(0.0).sqrt();
    let sign = if bulge > 0.0 { 1.0 } else { -1.0 };
    let cx = mid_x + normal_x * offset * sign;
    let cy = mid_y + normal_y * offset * sign;

    let start = (p1.y - cy).atan2(p1.x - cx);
    let arc_len = theta.abs() * radius;
    let steps = ((arc_len / sagitta(cfg, radius).max(0.05)).ceil() as usize).max(2);

    let mut pts = Vec::with_capacity(steps + 1);
    pts.push(p1);
    for i in 1..=steps {
        let a = start + theta * (i as f64 / steps as f64);
        pts.push(Point::new(cx + radius * a.cos(), cy + radius * a.sin()));
    }
    // Kill accumulated rounding on the final endpoint
    *pts.last_mut().unwrap() = p2;
    pts
}
