//! Core geometry types for contour reconstruction
//!
//! This module contains the fundamental value types used throughout the
//! engine: points, axis-aligned bounding boxes, contours, and segments.

use serde::{Deserialize, Serialize};

/// A 2D point in document coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    /// Euclidean distance to another point
    pub fn dist(&self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Squared distance, for comparisons that don't need the sqrt
    pub fn dist_sq(&self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Both coordinates are finite (no NaN/Inf)
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    /// An inverted box that unions correctly with any point
    pub fn empty() -> Self {
        BBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn from_points(points: &[Point]) -> Self {
        let mut bbox = BBox::empty();
        for p in points {
            bbox.include(*p);
        }
        bbox
    }

    pub fn include(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn width(&self) -> f64 {
        (self.max_x - self.min_x).max(0.0)
    }

    pub fn height(&self) -> f64 {
        (self.max_y - self.min_y).max(0.0)
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn min_side(&self) -> f64 {
        self.width().min(self.height())
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    /// Point containment with a symmetric tolerance band around the edges
    pub fn contains_point(&self, p: Point, tol: f64) -> bool {
        p.x >= self.min_x - tol
            && p.x <= self.max_x + tol
            && p.y >= self.min_y - tol
            && p.y <= self.max_y + tol
    }

    /// Whole-box containment with tolerance
    pub fn contains_bbox(&self, other: &BBox, tol: f64) -> bool {
        other.min_x >= self.min_x - tol
            && other.min_y >= self.min_y - tol
            && other.max_x <= self.max_x + tol
            && other.max_y <= self.max_y + tol
    }

    /// True when the boxes are within `gap` of each other on both axes
    pub fn within_gap(&self, other: &BBox, gap: f64) -> bool {
        self.min_x - gap <= other.max_x
            && other.min_x - gap <= self.max_x
            && self.min_y - gap <= other.max_y
            && other.min_y - gap <= self.max_y
    }

    /// Area of the intersection with another box (0 when disjoint)
    pub fn intersection_area(&self, other: &BBox) -> f64 {
        let w = self.max_x.min(other.max_x) - self.min_x.max(other.min_x);
        let h = self.max_y.min(other.max_y) - self.min_y.max(other.min_y);
        if w > 0.0 && h > 0.0 {
            w * h
        } else {
            0.0
        }
    }
}

/// An ordered point sequence with an open/closed flag
///
/// For closed contours the closing edge is implicit: the first point is
/// never repeated at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contour {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl Contour {
    pub fn open(points: Vec<Point>) -> Self {
        Contour {
            points,
            closed: false,
        }
    }

    pub fn closed(points: Vec<Point>) -> Self {
        Contour {
            points,
            closed: true,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::from_points(&self.points)
    }

    /// Polyline length, including the implicit closing edge when closed
    pub fn perimeter(&self) -> f64 {
        if self.points.len() < 2 {
            return 0.0;
        }
        let mut total: f64 = self
            .points
            .windows(2)
            .map(|w| w[0].dist(w[1]))
            .sum();
        if self.closed {
            total += self.points[self.points.len() - 1].dist(self.points[0]);
        }
        total
    }
}

/// A single line segment derived from an open contour
#[derive(Debug, Clone, Copy)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.a.dist(self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bbox_from_points() {
        let pts = vec![
            Point::new(1.0, 2.0),
            Point::new(-3.0, 7.0),
            Point::new(4.0, 0.5),
        ];
        let bbox = BBox::from_points(&pts);
        assert_eq!(bbox.min_x, -3.0);
        assert_eq!(bbox.max_x, 4.0);
        assert_eq!(bbox.min_y, 0.5);
        assert_eq!(bbox.max_y, 7.0);
        assert!((bbox.area() - 7.0 * 6.5).abs() < 1e-12);
    }

    #[test]
    fn bbox_gap_test() {
        let a = BBox {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
        };
        let b = BBox {
            min_x: 2.0,
            min_y: 0.0,
            max_x: 3.0,
            max_y: 1.0,
        };
        assert!(!a.within_gap(&b, 0.5));
        assert!(a.within_gap(&b, 1.0));
    }

    #[test]
    fn closed_perimeter_includes_closing_edge() {
        let square = Contour::closed(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert!((square.perimeter() - 8.0).abs() < 1e-12);

        let open = Contour::open(square.points.clone());
        assert!((open.perimeter() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn intersection_area_disjoint_is_zero() {
        let a = BBox {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
        };
        let b = BBox {
            min_x: 5.0,
            min_y: 5.0,
            max_x: 6.0,
            max_y: 6.0,
        };
        assert_eq!(a.intersection_area(&b), 0.0);
        let c = BBox {
            min_x: 0.5,
            min_y: 0.5,
            max_x: 1.5,
            max_y: 1.5,
        };
        assert!((a.intersection_area(&c) - 0.25).abs() < 1e-12);
    }
}
