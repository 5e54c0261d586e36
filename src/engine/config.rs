//! Engine configuration
//!
//! Every tolerance and threshold in the pipeline lives here, grouped per
//! stage, with fixed defaults tuned for CAD-scale drawings. The whole tree is
//! serde round-trippable and `#[serde(default)]` so partial overrides from
//! JSON only need to name the fields they change. The engine itself holds
//! no static tunables.

use serde::{Deserialize, Serialize};

/// Root configuration for one engine invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub discretize: DiscretizeConfig,
    pub stitch: StitchConfig,
    pub extract: ExtractConfig,
    pub compound: CompoundConfig,
    pub hierarchy: HierarchyConfig,
    pub dense: DenseConfig,
    pub overlay: OverlayConfig,
    pub hull: HullConfig,
}

/// Curvature discretization (arcs, circles, bulges)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscretizeConfig {
    /// Sagitta cap before the per-radius clamp `min(max(tol, 0.05), r/2)`
    pub chord_tolerance: f64,
    /// Baseline step count for full circles (raised when the sagitta
    /// formula wants more)
    pub circle_steps: usize,
    /// Arc step-count clamp
    pub min_arc_steps: usize,
    pub max_arc_steps: usize,
    /// Minimum step angle in degrees
    pub min_step_deg: f64,
}

impl Default for DiscretizeConfig {
    fn default() -> Self {
        DiscretizeConfig {
            chord_tolerance: 0.35,
            circle_steps: 72,
            min_arc_steps: 6,
            max_arc_steps: 2048,
            min_step_deg: 3.0,
        }
    }
}

/// Contour cleaning, continuity stitching, and cluster filtering
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Consecutive-vertex dedup distance
    pub dedup_tolerance: f64,
    /// Closed contours at or below this perimeter are dropped
    pub min_closed_perimeter: f64,
    /// join_tol = clamp(min_side * factor, min, max)
    pub join_tol_factor: f64,
    pub join_tol_min: f64,
    pub join_tol_max: f64,
    /// close_tol = max(join_tol * factor, min)
    pub close_tol_factor: f64,
    pub close_tol_min: f64,
    /// Cluster adjacency gap = clamp(min_side * factor, min, max)
    pub cluster_gap_factor: f64,
    pub cluster_gap_min: f64,
    pub cluster_gap_max: f64,
    /// Dominance test: main.score > alt.score * score_ratio AND
    /// main.area > alt.area * area_ratio
    pub cluster_score_ratio: f64,
    pub cluster_area_ratio: f64,
    /// Alternate dominance test: overall_area > main.area * spread_ratio
    /// AND main.score > alt.score * soft_score_ratio
    pub cluster_spread_ratio: f64,
    pub cluster_soft_score_ratio: f64,
    /// Raw LINE/ARC reparse triggers when the biggest closed contour
    /// stays below this fraction of the source bbox
    pub reparse_closed_ratio: f64,
}

impl Default for StitchConfig {
    fn default() -> Self {
        StitchConfig {
            dedup_tolerance: 1e-5,
            min_closed_perimeter: 0.10,
            join_tol_factor: 0.0018,
            join_tol_min: 0.03,
            join_tol_max: 0.45,
            close_tol_factor: 1.35,
            close_tol_min: 0.05,
            cluster_gap_factor: 0.05,
            cluster_gap_min: 0.5,
            cluster_gap_max: 20.0,
            cluster_score_ratio: 2.4,
            cluster_area_ratio: 1.8,
            cluster_spread_ratio: 1.45,
            cluster_soft_score_ratio: 1.6,
            reparse_closed_ratio: 0.02,
        }
    }
}

/// Segment-graph loop extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Progressive endpoint-snapping ladder; the extractor stops at the
    /// first tolerance that yields at least one loop
    pub snap_tolerances: Vec<f64>,
    /// Segments shorter than this never enter the graph
    pub min_segment_length: f64,
    /// Open-contour re-stitch fallback tolerance =
    /// clamp(min_side * factor, min, max)
    pub restitch_factor: f64,
    pub restitch_min: f64,
    pub restitch_max: f64,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            snap_tolerances: vec![1e-4, 1e-2, 5e-2],
            min_segment_length: 1e-9,
            restitch_factor: 0.005,
            restitch_min: 0.05,
            restitch_max: 0.6,
        }
    }
}

/// Compound (self-retracing) loop detection and splitting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompoundConfig {
    /// Non-adjacent vertices closer than this mark a loop suspicious
    pub repeat_tolerance: f64,
    /// |signed area| / bbox area band for a plausible simple loop
    pub fill_ratio_min: f64,
    pub fill_ratio_max: f64,
    /// Snapping ladder for re-extracting a suspicious loop's segments
    pub snap_tolerances: Vec<f64>,
    /// Subloop center dedup quant = clamp(median_min_dim * factor, min, max)
    pub center_quant_factor: f64,
    pub center_quant_min: f64,
    pub center_quant_max: f64,
}

impl Default for CompoundConfig {
    fn default() -> Self {
        CompoundConfig {
            repeat_tolerance: 1e-4,
            fill_ratio_min: 0.42,
            fill_ratio_max: 1.08,
            snap_tolerances: vec![1e-4, 5e-4],
            center_quant_factor: 0.15,
            center_quant_min: 1e-4,
            center_quant_max: 0.5,
        }
    }
}

/// Parent resolution and pseudo-hole flattening
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HierarchyConfig {
    /// A parent must be bigger than the child by at least this margin
    pub area_margin: f64,
    /// Bbox tolerance for the parent/child candidate tests
    pub bbox_tolerance: f64,
    /// Pseudo-hole normalizer pass bound
    pub max_passes: usize,
    /// child/parent area ratio above which a child may be a border offset
    pub pseudo_area_ratio: f64,
    /// Siblings below this area ratio count as tiny holes
    pub tiny_area_ratio: f64,
    /// Tiny-sibling count that alone flags a pseudo-hole
    pub tiny_siblings: usize,
    /// Inset band: each of the four insets must be >= -slack and
    /// <= max(cap_abs, min(parent w, h) * cap_factor)
    pub inset_slack: f64,
    pub inset_cap_abs: f64,
    pub inset_cap_factor: f64,
    /// Border-offset corroboration thresholds
    pub min_descendants: usize,
    pub tiny_siblings_strong: usize,
    pub pseudo_area_ratio_strong: f64,
    pub tiny_siblings_soft: usize,
}

impl Default for HierarchyConfig {
    fn default() -> Self {
        HierarchyConfig {
            area_margin: 1e-8,
            bbox_tolerance: 1e-4,
            max_passes: 8,
            pseudo_area_ratio: 0.70,
            tiny_area_ratio: 0.02,
            tiny_siblings: 6,
            inset_slack: 1e-4,
            inset_cap_abs: 4.0,
            inset_cap_factor: 0.06,
            min_descendants: 6,
            tiny_siblings_strong: 8,
            pseudo_area_ratio_strong: 0.82,
            tiny_siblings_soft: 4,
        }
    }
}

/// Dense-perforated fast path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DenseConfig {
    /// Candidate loop count that arms the fast path
    pub min_candidates: usize,
    /// Outer loop must cover this fraction of the source bbox
    pub outer_area_ratio: f64,
    /// Loops at or below this fraction of the source bbox count as holes
    pub child_area_ratio: f64,
    pub min_children: usize,
    /// Hole center dedup quant = clamp(median_min_dim * factor, min, max)
    pub center_quant_factor: f64,
    pub center_quant_min: f64,
    pub center_quant_max: f64,
    pub min_deduped: usize,
}

impl Default for DenseConfig {
    fn default() -> Self {
        DenseConfig {
            min_candidates: 220,
            outer_area_ratio: 0.30,
            child_area_ratio: 0.02,
            min_children: 120,
            center_quant_factor: 0.03,
            center_quant_min: 1e-4,
            center_quant_max: 0.25,
            min_deduped: 90,
        }
    }
}

/// Artifact-overlay filtering of multi-shape outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// The dominant shape must look perforated before the filter runs
    pub min_dominant_holes: usize,
    pub dominant_area_ratio: f64,
    /// Candidate area ratio band
    pub area_ratio_min: f64,
    pub area_ratio_max: f64,
    /// Hole-density ratio below which a candidate looks like an overlay
    pub density_ratio: f64,
    /// ...or the candidate simply has very few holes of its own
    pub few_holes: usize,
    /// Corroboration: sizable area, heavy bbox overlap, or nearly hole-free
    pub area_ratio_floor: f64,
    pub bbox_overlap: f64,
    pub single_hole: usize,
    /// Collapse-to-dominant thresholds
    pub collapse_area_ratio: f64,
    pub collapse_density_ratio: f64,
    pub collapse_holes: usize,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            min_dominant_holes: 80,
            dominant_area_ratio: 0.35,
            area_ratio_min: 0.04,
            area_ratio_max: 0.98,
            density_ratio: 0.35,
            few_holes: 2,
            area_ratio_floor: 0.16,
            bbox_overlap: 0.45,
            single_hole: 1,
            collapse_area_ratio: 0.10,
            collapse_density_ratio: 0.45,
            collapse_holes: 160,
        }
    }
}

/// Convex-hull fallback gating
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HullConfig {
    /// A loop above this fraction of the source bbox counts as a likely
    /// outer and vetoes hull injection
    pub likely_outer_ratio: f64,
    /// Below this fraction, injection happens without the container check
    pub tiny_outer_ratio: f64,
    /// Strong container: contains >= min(this, loops-1) other samples...
    pub container_sample_count: usize,
    /// ...and its area >= max(factor * second largest, ratio * source bbox)
    pub container_area_factor: f64,
    pub container_area_ratio: f64,
    /// Fragmented sheet: this many roots touching the source bbox within
    /// max(touch_abs, min_side * touch_factor)
    pub fragment_roots: usize,
    pub fragment_touch_abs: f64,
    pub fragment_touch_factor: f64,
    /// ...plus this many tiny loops, with the largest root small
    pub fragment_tiny_ratio: f64,
    pub fragment_tiny_count: usize,
    pub fragment_largest_ratio: f64,
}

impl Default for HullConfig {
    fn default() -> Self {
        HullConfig {
            likely_outer_ratio: 0.05,
            tiny_outer_ratio: 0.01,
            container_sample_count: 3,
            container_area_factor: 6.0,
            container_area_ratio: 0.002,
            fragment_roots: 3,
            fragment_touch_abs: 4.0,
            fragment_touch_factor: 0.06,
            fragment_tiny_ratio: 0.002,
            fragment_tiny_count: 6,
            fragment_largest_ratio: 0.45,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_constants() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.discretize.chord_tolerance, 0.35);
        assert_eq!(cfg.stitch.join_tol_factor, 0.0018);
        assert_eq!(cfg.extract.snap_tolerances, vec![1e-4, 1e-2, 5e-2]);
        assert_eq!(cfg.compound.fill_ratio_min, 0.42);
        assert_eq!(cfg.hierarchy.max_passes, 8);
        assert_eq!(cfg.dense.min_candidates, 220);
        assert_eq!(cfg.overlay.min_dominant_holes, 80);
        assert_eq!(cfg.hull.likely_outer_ratio, 0.05);
    }
}
