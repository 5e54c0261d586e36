//! Contour reconstruction engine
//!
//! Orchestrates the full pipeline: primitive normalization, contour
//! cleaning and stitching, loop extraction, compound-loop splitting,
//! hierarchy resolution, pseudo-hole flattening, hull fallback, and shape
//! assembly. One invocation per document, no shared state; batches fan
//! out over rayon.
//!
//! # Submodules
//! - `config` - All tunables with fixed defaults
//! - `error` - Typed failures and diagnostic codes
//! - `primitives` - Primitive enum + discretizing normalizer
//! - `contours` - Cleaner, continuity stitcher, cluster filter
//! - `loops` - Loop arena and segment-graph extraction
//! - `compound` - Self-retracing loop splitter
//! - `hierarchy` - Parent resolution and pseudo-hole flattening
//! - `hull` - Convex-hull fallback gating
//! - `shapes` - Assembly, dense fast path, overlay filter

pub mod compound;
pub mod config;
pub mod contours;
pub mod error;
pub mod hierarchy;
pub mod hull;
pub mod loops;
pub mod primitives;
pub mod shapes;

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{convex_hull, signed_area, Contour, Point};

use compound::split_compound_loops;
use config::EngineConfig;
use contours::{clean_contours, normalize_origin, restitch_open, CleanOutcome};
use error::{Diagnostic, EngineError};
use hierarchy::{normalize_pseudo_holes, resolve_hierarchy};
use hull::{apply_hull_fallback, HullAction};
use loops::{extract_loops, segments_from_contours, Loop};
use primitives::{normalize_primitives, Primitive};
use shapes::{assemble_shapes, filter_artifact_overlays, try_dense_fast_path, Shape};

/// Terminal output for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub width: f64,
    pub height: f64,
    pub shapes: Vec<Shape>,
    /// Outline of the largest shape, or the hull of all points when the
    /// shape set came out empty
    pub primary_selection: Option<Vec<Point>>,
}

/// Document plus run metadata
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
    /// Primitives rejected at the boundary (non-finite, r <= 0, empty)
    pub dropped_primitives: usize,
    /// Contours dropped as degenerate during cleaning
    pub dropped_contours: usize,
    pub elapsed_ms: f64,
}

/// Reconstruct shapes-with-holes from one document's primitives.
///
/// The only propagated failure is [`EngineError::EmptyDocument`]; all
/// other degeneracies are dropped locally and surface as counters and
/// diagnostics on the outcome.
pub fn reconstruct(primitives: &[Primitive], cfg: &EngineConfig) -> Result<Outcome, EngineError> {
    let started = Instant::now();

    let (raw_contours, dropped_primitives) = normalize_primitives(primitives, &cfg.discretize);

    let first = clean_contours(raw_contours.clone(), &cfg.stitch, false);
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut dropped_contours = first.dropped;

    // Raw LINE/ARC reparse: a border assembled purely from open
    // primitives has no large closed contour yet, and the cluster filter
    // could throw parts of it away. Skip the filter for such documents.
    let raw_mode = wants_raw_reparse(&first, &raw_contours, cfg);
    let cleaned = if raw_mode {
        push_unique(&mut diagnostics, Diagnostic::ReparsedAsRawLineArc);
        let redone = clean_contours(raw_contours.clone(), &cfg.stitch, true);
        dropped_contours = redone.dropped;
        redone
    } else {
        first
    };

    let mut result = run_core(cleaned, cfg, &mut diagnostics)?;

    // No closed region: retry once in raw mode before giving up, in case
    // the cluster filter discarded the geometry that would have closed.
    if result.shapes.is_empty() && !raw_mode {
        debug!("empty shape set, retrying in raw LINE/ARC mode");
        let redone = clean_contours(raw_contours, &cfg.stitch, true);
        let mut retry_diags = Vec::new();
        if let Ok(retry) = run_core(redone, cfg, &mut retry_diags) {
            if !retry.shapes.is_empty() {
                push_unique(&mut diagnostics, Diagnostic::ReparsedAsRawLineArc);
                for d in retry_diags {
                    push_unique(&mut diagnostics, d);
                }
                result = retry;
            }
        }
    }

    Ok(Outcome {
        document: result,
        diagnostics,
        dropped_primitives,
        dropped_contours,
        elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
    })
}

/// Reconstruct a batch of independent documents in parallel.
///
/// Each document gets its own engine invocation; nothing is shared, so
/// results are identical to calling [`reconstruct`] serially.
pub fn reconstruct_batch(
    documents: &[Vec<Primitive>],
    cfg: &EngineConfig,
) -> Vec<Result<Outcome, EngineError>> {
    documents
        .par_iter()
        .map(|primitives| reconstruct(primitives, cfg))
        .collect()
}

/// Reparse trigger: at least two open contours and no closed contour of
/// meaningful size
fn wants_raw_reparse(first: &CleanOutcome, raw_contours: &[Contour], cfg: &EngineConfig) -> bool {
    let open_count = first.contours.iter().filter(|c| !c.closed).count();
    if open_count < 2 {
        return false;
    }

    let src_bbox = raw_contours
        .iter()
        .fold(crate::geometry::BBox::empty(), |acc, c| acc.union(&c.bbox()));
    if !src_bbox.is_valid() {
        return false;
    }

    let max_closed_area = first
        .contours
        .iter()
        .filter(|c| c.closed)
        .map(|c| signed_area(&c.points).abs())
        .fold(0.0, f64::max);

    max_closed_area < src_bbox.area() * cfg.stitch.reparse_closed_ratio
}

/// The per-document pipeline after cleaning
fn run_core(
    cleaned: CleanOutcome,
    cfg: &EngineConfig,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Document, EngineError> {
    let mut contours = cleaned.contours;
    let (width, height) = normalize_origin(&mut contours)?;
    let source_area = width * height;

    if cleaned.auto_closed {
        push_unique(diagnostics, Diagnostic::AutoClosedOpenPolylines);
    }
    if !contours.iter().any(|c| c.closed) {
        push_unique(diagnostics, Diagnostic::NoClosedEntity);
    }

    let all_points: Vec<Point> = contours.iter().flat_map(|c| c.points.clone()).collect();

    // Closed contours enter the loop set directly; the open remainder
    // goes through segment extraction.
    let mut arena: Vec<Loop> = contours
        .iter()
        .filter(|c| c.closed)
        .filter_map(|c| Loop::from_points(c.points.clone()))
        .collect();

    let open: Vec<Contour> = contours.iter().filter(|c| !c.closed).cloned().collect();
    if !open.is_empty() {
        let segments = segments_from_contours(&open, cfg.extract.min_segment_length);
        let rings = extract_loops(&segments, &cfg.extract.snap_tolerances);
        if rings.is_empty() {
            // Last resort: re-stitch the open contours at a coarser,
            // extent-scaled tolerance.
            let min_side = width.min(height).max(1.0);
            let tol = (min_side * cfg.extract.restitch_factor)
                .clamp(cfg.extract.restitch_min, cfg.extract.restitch_max);
            let (restitched, closed_any) = restitch_open(open, tol, &cfg.stitch);
            if closed_any {
                push_unique(diagnostics, Diagnostic::AutoClosedOpenPolylines);
            }
            arena.extend(
                restitched
                    .iter()
                    .filter(|c| c.closed)
                    .filter_map(|c| Loop::from_points(c.points.clone())),
            );
        } else {
            arena.extend(rings.into_iter().filter_map(Loop::from_points));
        }
    }

    arena = split_compound_loops(arena, &cfg.compound);

    // Dense perforation short-circuits everything downstream
    if let Some(shape) = try_dense_fast_path(&arena, source_area, &cfg.dense) {
        push_unique(diagnostics, Diagnostic::DenseFastPathTaken);
        let primary = Some(shape.outer.clone());
        return Ok(Document {
            width,
            height,
            shapes: vec![shape],
            primary_selection: primary,
        });
    }

    resolve_hierarchy(&mut arena, &cfg.hierarchy);

    match apply_hull_fallback(&mut arena, &all_points, width, height, &cfg.hull) {
        HullAction::None => {}
        HullAction::Injected | HullAction::ReplacedFragmented => {
            push_unique(diagnostics, Diagnostic::UsedHullFallback);
            resolve_hierarchy(&mut arena, &cfg.hierarchy);
        }
    }

    normalize_pseudo_holes(&mut arena, &cfg.hierarchy);

    let mut shapes = assemble_shapes(&arena);
    if shapes.len() > 1 {
        shapes = filter_artifact_overlays(shapes, source_area, &cfg.overlay);
    }

    let primary_selection = primary_selection(&shapes, &all_points);
    Ok(Document {
        width,
        height,
        shapes,
        primary_selection,
    })
}

/// Largest shape outline, falling back to the hull of all points
fn primary_selection(shapes: &[Shape], all_points: &[Point]) -> Option<Vec<Point>> {
    if let Some(best) = shapes
        .iter()
        .max_by(|a, b| a.outer_area().partial_cmp(&b.outer_area()).unwrap())
    {
        return Some(best.outer.clone());
    }
    let hull = convex_hull(all_points);
    if hull.len() >= 3 {
        Some(hull)
    } else {
        None
    }
}

fn push_unique(diagnostics: &mut Vec<Diagnostic>, d: Diagnostic) {
    if !diagnostics.contains(&d) {
        diagnostics.push(d);
    }
}
