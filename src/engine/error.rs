//! Error taxonomy and diagnostic codes
//!
//! The engine never fails on bad geometry: invalid primitives and
//! degenerate contours are dropped locally and counted. The only failure
//! that propagates is an empty document. Everything else surfaces as
//! diagnostics on the outcome without altering the output contract.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Typed failures that propagate out of the pipeline
#[derive(Debug, Error)]
pub enum EngineError {
    /// Zero valid contours survived normalization, or the document extent
    /// collapsed below tolerance
    #[error("document contains no usable geometry")]
    EmptyDocument,
}

/// Non-fatal pipeline observations, reported alongside the output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Diagnostic {
    /// The input contained no closed entity; every loop had to be
    /// reconstructed from open geometry
    NoClosedEntity,
    /// The continuity stitcher closed one or more open polyline chains
    AutoClosedOpenPolylines,
    /// The orchestrator re-ran cleaning in raw LINE/ARC mode
    ReparsedAsRawLineArc,
    /// A convex hull was injected as the outer boundary
    UsedHullFallback,
    /// The dense-perforation fast path produced the output
    DenseFastPathTaken,
}
