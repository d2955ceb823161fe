use luthcam_core::error::{GeometryError, PlanError};
use luthcam_core::geometry::{PocketInput, Point, Polygon};
use luthcam_toolpath::config::{PathStrategy, PlanConfig};
use luthcam_toolpath::linker::{canonical_start, link_rings, LinkerState, PathLinker};
use luthcam_toolpath::rings::{GeometryOffsetEngine, OffsetRing};
use luthcam_toolpath::segment::{Motion, MoveKind, ToolpathSegment};

fn config(strategy: PathStrategy, fit_arcs: bool) -> PlanConfig {
    PlanConfig {
        strategy,
        fit_arcs,
        margin: 1.0,
        ..PlanConfig::default()
    }
}

fn pocket_with_island() -> PocketInput {
    PocketInput::new(
        Polygon::rectangle(0.0, 0.0, 100.0, 60.0).unwrap(),
        vec![Polygon::rectangle(40.0, 20.0, 20.0, 20.0).unwrap()],
    )
    .unwrap()
}

fn rings_for(pocket: &PocketInput, config: &PlanConfig) -> Vec<OffsetRing> {
    GeometryOffsetEngine::new()
        .build_rings(pocket, &config.ring_params())
        .unwrap()
}

fn count(segments: &[ToolpathSegment], kind: MoveKind) -> usize {
    segments.iter().filter(|s| s.kind == kind).count()
}

#[test]
fn test_spiral_has_single_plunge_and_retract() {
    let pocket = PocketInput::new(Polygon::rectangle(0.0, 0.0, 100.0, 60.0).unwrap(), Vec::new())
        .unwrap();
    let config = config(PathStrategy::Spiral, false);
    let rings = rings_for(&pocket, &config);
    let path = link_rings(&pocket, &rings, &config.ring_params(), config.link_config(5000.0)).unwrap();
    let segments = path.segments();

    assert_eq!(segments[0].kind, MoveKind::Plunge);
    assert_eq!(segments.last().unwrap().kind, MoveKind::Retract);
    assert_eq!(count(segments, MoveKind::Plunge), 1);
    assert_eq!(count(segments, MoveKind::Rapid), 0);
    assert_eq!(path.retract_count(), 1);
    assert!(count(segments, MoveKind::Transition) >= rings.len() - 1);

    // Entry at the lowest-left vertex of ring 0.
    let start = rings[0].points()[canonical_start(rings[0].points())];
    // Tool radius 3 plus margin 1.
    assert!(segments[0].start.distance_to(&Point::new(4.0, 4.0)) < 1e-6);
    assert_eq!(segments[0].start, start);
}

#[test]
fn test_path_is_continuous() {
    let pocket = pocket_with_island();
    for strategy in [PathStrategy::Spiral, PathStrategy::Lane] {
        let config = config(strategy, true);
        let rings = rings_for(&pocket, &config);
        let path =
            link_rings(&pocket, &rings, &config.ring_params(), config.link_config(5000.0)).unwrap();
        for pair in path.segments().windows(2) {
            assert!(
                pair[0].end.distance_to(&pair[1].start) < 1e-9,
                "gap between {:?} and {:?}",
                pair[0].kind,
                pair[1].kind
            );
        }
    }
}

#[test]
fn test_lane_retracts_between_loops() {
    let pocket = pocket_with_island();
    let config = config(PathStrategy::Lane, false);
    let rings = rings_for(&pocket, &config);
    let loops: usize = rings.iter().map(|r| r.loops().len()).sum();
    let path = link_rings(&pocket, &rings, &config.ring_params(), config.link_config(5000.0)).unwrap();

    assert_eq!(path.strategy(), PathStrategy::Lane);
    assert_eq!(path.retract_count(), loops);
    assert_eq!(count(path.segments(), MoveKind::Plunge), loops);
    assert_eq!(count(path.segments(), MoveKind::Transition), 0);
    assert_eq!(count(path.segments(), MoveKind::Rapid), loops - 1);
}

#[test]
fn test_cutting_moves_keep_margin() {
    let pocket = pocket_with_island();
    let island = &pocket.islands()[0];
    let config = config(PathStrategy::Spiral, true);
    let rings = rings_for(&pocket, &config);
    let path = link_rings(&pocket, &rings, &config.ring_params(), config.link_config(5000.0)).unwrap();
    for segment in path.segments().iter().filter(|s| s.is_cutting()) {
        for p in [segment.start, segment.end] {
            assert!(island.distance_to_point(&p) >= config.margin);
        }
        if let Motion::Arc {
            center,
            radius,
            clockwise,
        } = segment.motion
        {
            let dir = if clockwise { -1.0 } else { 1.0 };
            let a = segment.start.angle_from(&center) + dir * segment.sweep() / 2.0;
            let mid = Point::new(center.x + radius * a.cos(), center.y + radius * a.sin());
            assert!(island.distance_to_point(&mid) >= config.margin);
        }
    }
}

#[test]
fn test_round_pocket_fits_arcs() {
    let outer = Polygon::regular(Point::new(0.0, 0.0), 40.0, 256).unwrap();
    let pocket = PocketInput::new(outer, Vec::new()).unwrap();
    let with_arcs = config(PathStrategy::Spiral, true);
    let rings = rings_for(&pocket, &with_arcs);

    let fitted =
        link_rings(&pocket, &rings, &with_arcs.ring_params(), with_arcs.link_config(5000.0)).unwrap();
    let arcs: Vec<_> = fitted.segments().iter().filter(|s| s.is_arc()).collect();
    assert!(!arcs.is_empty());
    assert!(arcs.iter().all(|s| matches!(s.motion, Motion::Arc { clockwise: false, .. })));
    assert!(arcs.iter().all(|s| s.engagement_factor == 0.9));

    let lines = config(PathStrategy::Spiral, false);
    let plain = link_rings(&pocket, &rings, &lines.ring_params(), lines.link_config(5000.0)).unwrap();
    assert!(plain.segments().len() > fitted.segments().len());
}

#[test]
fn test_state_machine() {
    let pocket = pocket_with_island();
    let config = config(PathStrategy::Spiral, false);
    let rings = rings_for(&pocket, &config);
    let params = config.ring_params();
    let mut linker = PathLinker::new(&pocket, &params, config.link_config(5000.0));
    assert_eq!(linker.state(), LinkerState::NotStarted);

    let err = linker.finalize().unwrap_err();
    assert!(matches!(err, GeometryError::InvalidLinkerState { .. }));

    linker.link_rings(&rings).unwrap();
    assert_eq!(linker.state(), LinkerState::RingsLinked);
    assert!(!linker.segments().is_empty());

    let err = linker.link_rings(&rings).unwrap_err();
    assert!(matches!(
        err,
        PlanError::Geometry(GeometryError::InvalidLinkerState { .. })
    ));

    let path = linker.finalize().unwrap();
    assert_eq!(linker.state(), LinkerState::Finalized);
    assert!(linker.segments().is_empty());
    assert!(!path.segments().is_empty());

    match linker.finalize().unwrap_err() {
        GeometryError::InvalidLinkerState { current, operation } => {
            assert_eq!(current, "Finalized");
            assert_eq!(operation, "finalize");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_rings_outside_pocket_fail_finalize() {
    let pocket = pocket_with_island();
    let config = config(PathStrategy::Spiral, false);
    // Rings built for a larger pocket run through the island.
    let big = PocketInput::new(Polygon::rectangle(0.0, 0.0, 100.0, 60.0).unwrap(), Vec::new())
        .unwrap();
    let rings = rings_for(&big, &config);
    let err = link_rings(&pocket, &rings, &config.ring_params(), config.link_config(5000.0))
        .unwrap_err();
    assert!(matches!(
        err,
        PlanError::Geometry(GeometryError::SegmentCrossesKeepout { .. })
    ));
}
