use luthcam_core::error::{GeometryError, GeometryOverflowError, PlanError};
use luthcam_core::geometry::{PocketInput, Point, Polygon};
use luthcam_core::CancelToken;
use luthcam_toolpath::backend::{BackendError, Contour, JoinSpec, OffsetBackend};
use luthcam_toolpath::config::{GeometryLimits, JoinStyle, RingParams};
use luthcam_toolpath::rings::{build_rings, iteration_bound, GeometryOffsetEngine};

fn params(tool: f64, margin: f64, join: JoinStyle) -> RingParams {
    RingParams {
        tool_diameter: tool,
        stepover_fraction: 0.45,
        margin,
        join_style: join,
        arc_tolerance: 0.01,
        miter_limit: 2.0,
        limits: GeometryLimits::default(),
    }
}

fn rect_100x60() -> Polygon {
    Polygon::rectangle(0.0, 0.0, 100.0, 60.0).unwrap()
}

#[test]
fn test_rectangle_ring_count() {
    let rings = build_rings(&rect_100x60(), &[], 6.0, 0.45, 0.0, JoinStyle::Round, 0.01).unwrap();
    let expected = ((30.0f64 - 3.0) / 2.7).ceil() as usize + 1;
    assert_eq!(rings.len(), expected);

    let first = rings[0].loops()[0].bounds();
    assert!((first.min_x - 3.0).abs() < 1e-6);
    assert!((first.max_y - 57.0).abs() < 1e-6);

    let last = rings.last().unwrap();
    assert!((last.offset() - 28.65).abs() < 1e-9);
    let center = last.loops()[0].centroid();
    assert!(center.distance_to(&Point::new(50.0, 30.0)) < 1e-6);
}

#[test]
fn test_offsets_strictly_increase() {
    let rings = build_rings(&rect_100x60(), &[], 6.0, 0.45, 0.0, JoinStyle::Round, 0.01).unwrap();
    for (i, pair) in rings.windows(2).enumerate() {
        assert!(pair[1].offset() > pair[0].offset(), "ring {} did not shrink", i + 1);
        assert!(pair[1].loops()[0].area() < pair[0].loops()[0].area());
        assert_eq!(pair[1].index(), pair[0].index() + 1);
    }
}

#[test]
fn test_island_keeps_margin() {
    let island = Polygon::rectangle(40.0, 20.0, 20.0, 20.0).unwrap();
    let rings = build_rings(
        &rect_100x60(),
        std::slice::from_ref(&island),
        6.0,
        0.45,
        1.0,
        JoinStyle::Round,
        0.01,
    )
    .unwrap();
    assert!(!rings.is_empty());
    for ring in &rings {
        for polygon in ring.loops() {
            for p in polygon.points() {
                assert!(!island.contains_point(p));
                assert!(island.distance_to_point(p) >= 1.0);
            }
        }
    }
    assert!(rings.iter().any(|r| r.loops().len() == 2));
}

#[test]
fn test_island_near_wall_trims_first_ring() {
    let center = Polygon::rectangle(40.0, 20.0, 20.0, 20.0).unwrap();
    let near_wall = Polygon::rectangle(10.0, 1.5, 4.0, 4.0).unwrap();
    let islands = [center, near_wall];
    let rings = build_rings(&rect_100x60(), &islands, 6.0, 0.45, 1.0, JoinStyle::Round, 0.01)
        .unwrap();

    // Tool radius 3 plus margin 1, less the arc tolerance.
    let required = 4.0 - 0.01 - 1e-6;
    for ring in &rings {
        for polygon in ring.loops() {
            for p in polygon.points() {
                for island in &islands {
                    assert!(island.distance_to_point(p) >= required);
                }
            }
        }
    }

    // Ring 0 runs along y = 4, through the island's keepout, and must bend
    // around it instead of vanishing.
    assert_eq!(rings[0].offset(), 4.0);
    assert_eq!(rings[0].loops().len(), 1);
    let closest = rings[0]
        .points()
        .iter()
        .map(|p| islands[1].distance_to_point(p))
        .fold(f64::INFINITY, f64::min);
    assert!(closest < 4.0 + 1e-6);
    assert!(rings[0].loops()[0].area() < 92.0 * 52.0);

    // Once the offset passes y = 16 the center island splits the ring in two.
    assert!(rings.iter().any(|r| r.loops().len() == 2));
    assert!(rings.last().unwrap().offset() > 25.0);
}

#[test]
fn test_join_styles_all_succeed() {
    let island = Polygon::rectangle(40.0, 20.0, 20.0, 20.0).unwrap();
    let pocket = PocketInput::new(rect_100x60(), vec![island]).unwrap();
    let engine = GeometryOffsetEngine::new();
    let mut counts = Vec::new();
    for join in [JoinStyle::Round, JoinStyle::Square, JoinStyle::Miter] {
        let rings = engine.build_rings(&pocket, &params(6.0, 1.0, join)).unwrap();
        counts.push(rings.iter().map(|r| r.vertex_count()).sum::<usize>());
    }
    // Round keepout corners are flattened into many more vertices.
    assert!(counts[0] > counts[1]);
    assert!(counts[0] > counts[2]);
}

#[test]
fn test_too_few_points_rejected() {
    let err = Polygon::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]).unwrap_err();
    assert!(matches!(err, GeometryError::TooFewPoints { count: 2, .. }));

    let err = PocketInput::from_points(
        vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
        Vec::new(),
    )
    .unwrap_err();
    assert!(matches!(err, GeometryError::TooFewPoints { .. }));
}

#[test]
fn test_tool_too_large() {
    let outer = Polygon::rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
    let err = build_rings(&outer, &[], 12.0, 0.45, 0.0, JoinStyle::Round, 0.01).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Geometry(GeometryError::NoClearableArea { .. })
    ));
}

#[test]
fn test_stepover_out_of_range() {
    let err = build_rings(&rect_100x60(), &[], 6.0, 1.5, 0.0, JoinStyle::Round, 0.01).unwrap_err();
    assert!(matches!(err, PlanError::Parameter(_)));
}

fn dense_pocket(cols: usize, rows: usize) -> PocketInput {
    let mut islands = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let (x, y) = (5.0 + c as f64 * 4.0, 5.0 + r as f64 * 4.0);
            islands.push(Polygon::rectangle(x, y, 1.0, 1.0).unwrap());
        }
    }
    let outer = Polygon::rectangle(
        0.0,
        0.0,
        10.37 + cols as f64 * 4.0,
        10.37 + rows as f64 * 4.0,
    )
    .unwrap();
    PocketInput::new(outer, islands).unwrap()
}

#[test]
fn test_dense_islands_rejected_up_front() {
    let pocket = dense_pocket(25, 20);
    assert_eq!(pocket.islands().len(), 500);

    let mut p = params(6.0, 0.0, JoinStyle::Square);
    p.limits.max_ring_iterations = 100;
    assert!(iteration_bound(&pocket, &p) > 100);
    let err = GeometryOffsetEngine::new().build_rings(&pocket, &p).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Overflow(GeometryOverflowError::IterationBoundExceeded { cap: 100, .. })
    ));

    let mut p = params(6.0, 0.0, JoinStyle::Square);
    p.limits.max_islands = 100;
    let err = GeometryOffsetEngine::new().build_rings(&pocket, &p).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Overflow(GeometryOverflowError::TooManyIslands { count: 500, limit: 100 })
    ));
}

#[test]
fn test_dense_islands_at_default_limits() {
    let pocket = dense_pocket(25, 20);
    let p = params(6.0, 0.0, JoinStyle::Square);
    match GeometryOffsetEngine::new().build_rings(&pocket, &p) {
        Ok(rings) => {
            assert!(!rings.is_empty());
            assert!(rings.len() <= iteration_bound(&pocket, &p) + 1);
            for ring in &rings {
                for polygon in ring.loops() {
                    for q in polygon.points() {
                        assert!(pocket.islands().iter().all(|i| !i.contains_point(q)));
                    }
                }
            }
        }
        Err(e) => assert!(e.is_overflow(), "unexpected error: {e}"),
    }
}

#[test]
fn test_dense_islands_complete_within_bound() {
    let pocket = dense_pocket(6, 6);
    let p = params(2.0, 0.0, JoinStyle::Square);
    match GeometryOffsetEngine::new().build_rings(&pocket, &p) {
        Ok(rings) => assert!(rings.len() <= iteration_bound(&pocket, &p) + 1),
        Err(e) => assert!(e.is_overflow(), "unexpected error: {e}"),
    }
}

#[test]
fn test_cancelled_before_first_ring() {
    let pocket = PocketInput::new(rect_100x60(), Vec::new()).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = GeometryOffsetEngine::new()
        .build_rings_with_cancel(&pocket, &params(6.0, 0.0, JoinStyle::Round), &cancel)
        .unwrap_err();
    assert_eq!(err, PlanError::Cancelled);
}

struct FailingBackend;

impl OffsetBackend for FailingBackend {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn offset_polygon(&self, _: &[Point], _: f64, _: &JoinSpec) -> Result<Vec<Contour>, BackendError> {
        Err(BackendError("offset unavailable".to_string()))
    }

    fn difference_polygons(&self, _: &[Contour], _: &[Contour]) -> Result<Vec<Contour>, BackendError> {
        Err(BackendError("difference unavailable".to_string()))
    }
}

#[test]
fn test_backend_failure_is_reported() {
    let pocket = PocketInput::new(rect_100x60(), Vec::new()).unwrap();
    let err = GeometryOffsetEngine::with_backend(FailingBackend)
        .build_rings(&pocket, &params(6.0, 0.0, JoinStyle::Round))
        .unwrap_err();
    match err {
        PlanError::Geometry(GeometryError::Backend { ring, reason }) => {
            assert_eq!(ring, 0);
            assert!(reason.contains("offset unavailable"));
        }
        other => panic!("unexpected error: {other}"),
    }
}
