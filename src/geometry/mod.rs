//! Geometry module for contour reconstruction
//!
//! All planar primitives and predicates used by the engine.
//!
//! # Submodules
//! - `types` - Core value types (Point, BBox, Contour, Segment)
//! - `polygon` - Ring math: signed area, centroid, point-in-polygon, hull
//! - `spatial` - R-tree indexing over loop bounding boxes

mod polygon;
mod spatial;
mod types;

pub use types::{BBox, Contour, Point, Segment};

pub use polygon::{centroid, convex_hull, point_in_ring, polyline_length, signed_area};

pub use spatial::{build_region_index, regions_containing, LoopRegion};
