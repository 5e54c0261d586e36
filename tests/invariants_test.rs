// Output-contract invariants checked over a spread of documents:
// orientation, hole containment, coordinate range, idempotence, and
// serialization round-trips.
use contour_engine::geometry::{point_in_ring, signed_area};
use contour_engine::{
    reconstruct, Document, EngineConfig, Point, PolyVertex, Primitive, Shape,
};

fn closed_polyline(points: &[(f64, f64)]) -> Primitive {
    Primitive::Polyline {
        vertices: points
            .iter()
            .map(|&(x, y)| PolyVertex::new(x, y, 0.0))
            .collect(),
        closed: true,
    }
}

/// A mixed document exercising most pipeline stages
fn mixed_document() -> Vec<Primitive> {
    let mut primitives = vec![
        // Outer plate
        closed_polyline(&[(0.0, 0.0), (120.0, 0.0), (120.0, 80.0), (0.0, 80.0)]),
        // A rectangular cutout
        closed_polyline(&[(10.0, 10.0), (40.0, 10.0), (40.0, 30.0), (10.0, 30.0)]),
        // A circular cutout
        Primitive::Circle {
            center: Point::new(80.0, 40.0),
            radius: 12.0,
        },
        // An island inside the rectangular cutout
        closed_polyline(&[(18.0, 15.0), (32.0, 15.0), (32.0, 25.0), (18.0, 25.0)]),
    ];
    // A bulged slot
    primitives.push(Primitive::Polyline {
        vertices: vec![
            PolyVertex::new(55.0, 60.0, 1.0),
            PolyVertex::new(65.0, 60.0, 1.0),
        ],
        closed: true,
    });
    primitives
}

fn assert_shape_invariants(doc: &Document) {
    for (si, shape) in doc.shapes.iter().enumerate() {
        assert!(
            signed_area(&shape.outer) > 0.0,
            "shape {si}: outer must have positive signed area"
        );
        for (hi, hole) in shape.holes.iter().enumerate() {
            assert!(
                signed_area(hole) < 0.0,
                "shape {si} hole {hi}: negative signed area required"
            );
            // An interior sample of the hole must sit strictly inside
            // the outer ring
            let sample = contour_engine::engine::loops::interior_sample(hole);
            assert!(
                point_in_ring(sample, &shape.outer),
                "shape {si} hole {hi}: sample {sample:?} escaped the outer"
            );
        }
        for p in shape.outer.iter().chain(shape.holes.iter().flatten()) {
            assert!(
                p.x >= -1e-6 && p.x <= doc.width + 1e-6,
                "x coordinate {} outside [0, {}]",
                p.x,
                doc.width
            );
            assert!(
                p.y >= -1e-6 && p.y <= doc.height + 1e-6,
                "y coordinate {} outside [0, {}]",
                p.y,
                doc.height
            );
        }
    }
}

#[test]
fn orientation_and_range_invariants() {
    let outcome = reconstruct(&mixed_document(), &EngineConfig::default()).unwrap();
    let doc = &outcome.document;
    assert!(!doc.shapes.is_empty());
    assert_shape_invariants(doc);

    // Structure: plate with two cutouts, island as its own shape
    let plate = doc
        .shapes
        .iter()
        .max_by(|a, b| a.outer_area().partial_cmp(&b.outer_area()).unwrap())
        .unwrap();
    assert_eq!(plate.holes.len(), 3, "rect + circle + slot cutouts");
    assert_eq!(doc.shapes.len(), 2, "the island is a separate shape");
}

/// Lift a document's shapes back into closed polyline primitives
fn lift(doc: &Document) -> Vec<Primitive> {
    let ring_to_polyline = |ring: &[Point]| Primitive::Polyline {
        vertices: ring
            .iter()
            .map(|p| PolyVertex {
                point: *p,
                bulge: 0.0,
            })
            .collect(),
        closed: true,
    };

    let mut primitives = Vec::new();
    for shape in &doc.shapes {
        primitives.push(ring_to_polyline(&shape.outer));
        for hole in &shape.holes {
            primitives.push(ring_to_polyline(hole));
        }
    }
    primitives
}

/// Rotate a ring so it starts at its lexicographically smallest vertex,
/// for order-insensitive comparison
fn canonical(ring: &[Point]) -> Vec<(i64, i64)> {
    let quantized: Vec<(i64, i64)> = ring
        .iter()
        .map(|p| ((p.x * 1e6).round() as i64, (p.y * 1e6).round() as i64))
        .collect();
    let start = quantized
        .iter()
        .enumerate()
        .min_by_key(|(_, q)| **q)
        .map(|(i, _)| i)
        .unwrap();
    let mut rotated = Vec::with_capacity(quantized.len());
    rotated.extend_from_slice(&quantized[start..]);
    rotated.extend_from_slice(&quantized[..start]);
    rotated
}

fn canonical_shapes(shapes: &[Shape]) -> Vec<(Vec<(i64, i64)>, Vec<Vec<(i64, i64)>>)> {
    let mut out: Vec<(Vec<(i64, i64)>, Vec<Vec<(i64, i64)>>)> = shapes
        .iter()
        .map(|s| {
            let mut holes: Vec<Vec<(i64, i64)>> =
                s.holes.iter().map(|h| canonical(h)).collect();
            holes.sort();
            (canonical(&s.outer), holes)
        })
        .collect();
    out.sort();
    out
}

#[test]
fn pipeline_is_idempotent_on_its_output() {
    let cfg = EngineConfig::default();
    let first = reconstruct(&mixed_document(), &cfg).unwrap();
    let second = reconstruct(&lift(&first.document), &cfg).unwrap();

    assert_eq!(
        canonical_shapes(&first.document.shapes),
        canonical_shapes(&second.document.shapes),
        "re-running the pipeline on its own output must be a fixpoint"
    );
}

#[test]
fn document_survives_json_round_trip() -> anyhow::Result<()> {
    let outcome = reconstruct(&mixed_document(), &EngineConfig::default())?;
    let json = serde_json::to_string(&outcome.document)?;
    let back: Document = serde_json::from_str(&json)?;
    assert_eq!(outcome.document, back);
    Ok(())
}

#[test]
fn config_partial_override_from_json() {
    // Only the named field changes; everything else keeps its default
    let cfg: EngineConfig =
        serde_json::from_str(r#"{ "dense": { "min_candidates": 500 } }"#).unwrap();
    assert_eq!(cfg.dense.min_candidates, 500);
    assert_eq!(cfg.dense.min_children, EngineConfig::default().dense.min_children);
    assert_eq!(cfg.stitch.join_tol_factor, 0.0018);
}

#[test]
fn dropped_counts_are_reported() {
    let primitives = vec![
        closed_polyline(&[(0.0, 0.0), (50.0, 0.0), (50.0, 50.0), (0.0, 50.0)]),
        Primitive::Circle {
            center: Point::new(25.0, 25.0),
            radius: -1.0, // invalid
        },
        Primitive::Line {
            start: Point::new(f64::INFINITY, 0.0),
            end: Point::new(1.0, 1.0),
        }, // invalid
        closed_polyline(&[(10.0, 10.0), (10.01, 10.0), (10.01, 10.01)]), // degenerate
    ];
    let outcome = reconstruct(&primitives, &EngineConfig::default()).unwrap();
    assert_eq!(outcome.dropped_primitives, 2);
    assert_eq!(outcome.dropped_contours, 1);
    assert_eq!(outcome.document.shapes.len(), 1);
}
