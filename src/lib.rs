//! 2D contour reconstruction for DXF-derived geometry
//!
//! This crate ingests typed geometric primitives extracted from a
//! DXF-style CAD drawing (lines, arcs, circles, bulged polylines,
//! splines) and recovers clean planar shapes-with-holes suitable for
//! extrusion into 3D meshes.
//!
//! Real CAD output is messy: open polylines with endpoint gaps, loops
//! that retrace themselves, duplicated border-offset contours, dense
//! perforation patterns. The pipeline stitches, splits, and classifies
//! its way back to valid even-odd regions:
//!
//! 1. Discretize primitives into contours
//! 2. Clean, stitch near-touching polylines, suppress detached artifacts
//! 3. Reconstruct closed loops from loose segments (progressive snapping)
//! 4. Split compound (self-retracing) loops
//! 5. Resolve the nesting hierarchy (even depth = outer, odd = hole)
//! 6. Flatten duplicated border offsets, gate a convex-hull fallback
//! 7. Assemble oriented shapes (outer CCW, holes CW)
//!
//! ```
//! use contour_engine::{reconstruct, EngineConfig, Point, Primitive};
//!
//! let square = [
//!     Primitive::Line { start: Point::new(0.0, 0.0), end: Point::new(10.0, 0.0) },
//!     Primitive::Line { start: Point::new(10.0, 0.0), end: Point::new(10.0, 10.0) },
//!     Primitive::Line { start: Point::new(10.0, 10.0), end: Point::new(0.0, 10.0) },
//!     Primitive::Line { start: Point::new(0.0, 10.0), end: Point::new(0.0, 0.0) },
//! ];
//! let outcome = reconstruct(&square, &EngineConfig::default()).unwrap();
//! assert_eq!(outcome.document.shapes.len(), 1);
//! ```

pub mod engine;
pub mod geometry;

pub use engine::config::{
    CompoundConfig, DenseConfig, DiscretizeConfig, EngineConfig, ExtractConfig, HierarchyConfig,
    HullConfig, OverlayConfig, StitchConfig,
};
pub use engine::error::{Diagnostic, EngineError};
pub use engine::primitives::{PolyVertex, Primitive};
pub use engine::shapes::Shape;
pub use engine::{reconstruct, reconstruct_batch, Document, Outcome};

pub use geometry::{Contour, Point};
