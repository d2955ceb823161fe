use luthcam_core::data::{init_standard_library, MachineProfile, MaterialProfile};
use luthcam_core::error::PlanError;
use luthcam_core::geometry::{PocketInput, Point, Polygon};
use luthcam_core::{CancelToken, MaterialId};
use luthcam_toolpath::config::{PathStrategy, PlanConfig};
use luthcam_toolpath::plan::ToolpathAssembler;
use luthcam_toolpath::segment::{Motion, MoveKind, ToolpathSegment};

fn pocket() -> PocketInput {
    PocketInput::new(
        Polygon::rectangle(0.0, 0.0, 100.0, 60.0).unwrap(),
        vec![Polygon::rectangle(40.0, 20.0, 20.0, 20.0).unwrap()],
    )
    .unwrap()
}

fn maple() -> MaterialProfile {
    let library = init_standard_library().unwrap();
    library
        .get_material(&MaterialId("maple_hard".to_string()))
        .unwrap()
        .profile
}

#[test]
fn test_plan_is_deterministic() {
    let assembler = ToolpathAssembler::new(PlanConfig {
        margin: 1.0,
        ..PlanConfig::default()
    });
    let machine = MachineProfile::desktop_router();
    let material = maple();
    let first = assembler.plan(&pocket(), &machine, &material).unwrap();
    let second = assembler.plan(&pocket(), &machine, &material).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
}

#[test]
fn test_summary_matches_segments() {
    let assembler = ToolpathAssembler::new(PlanConfig::default());
    let plan = assembler
        .plan(&pocket(), &MachineProfile::desktop_router(), &maple())
        .unwrap();
    let summary = plan.summary();

    assert_eq!(summary.segment_count, plan.segments().len());
    assert_eq!(summary.ring_count, plan.rings().len());
    assert_eq!(summary.bottlenecks.total(), summary.segment_count);

    let energy: f64 = plan.segments().iter().map(|s| s.energy.energy).sum();
    assert!((summary.total_energy - energy).abs() <= 1e-9 * energy);
    let time: f64 = plan.segments().iter().map(|s| s.time).sum();
    assert!((summary.total_time - time).abs() <= 1e-9 * time);
    assert!(summary.cutting_time > 0.0 && summary.cutting_time <= summary.total_time);
    assert!(summary.cutting_distance <= summary.total_distance);

    assert_eq!(plan.heat().bins(), 120);
    assert!(summary.peak_chip_power > summary.peak_tool_power);
    assert!(summary.peak_tool_power > summary.peak_work_power);
    assert!((plan.heat().chip_energy() - energy * maple().chip_fraction()).abs() < 1e-6 * energy);

    for pair in plan.segments().windows(2) {
        assert!(pair[1].energy.cumulative >= pair[0].energy.cumulative);
    }
    assert_eq!(plan.toolpath().next().unwrap().kind, MoveKind::Plunge);
}

#[test]
fn test_lane_has_more_retracts_than_spiral() {
    let machine = MachineProfile::desktop_router();
    let material = maple();
    let spiral = ToolpathAssembler::new(PlanConfig::default())
        .plan(&pocket(), &machine, &material)
        .unwrap();
    let lane = ToolpathAssembler::new(PlanConfig {
        strategy: PathStrategy::Lane,
        ..PlanConfig::default()
    })
    .plan(&pocket(), &machine, &material)
    .unwrap();

    assert_eq!(lane.strategy(), PathStrategy::Lane);
    assert!(lane.summary().retract_count > spiral.summary().retract_count);
    // Spiral links cut material; lane hops do not.
    assert!(spiral.summary().total_volume > lane.summary().total_volume);
}

#[test]
fn test_config_from_json() {
    let config = PlanConfig::from_json_str(
        r#"{"tool_diameter": 3.175, "stepover_fraction": 0.4, "strategy": "lane", "heat_bins": 60}"#,
    )
    .unwrap();
    let plan = ToolpathAssembler::new(config)
        .plan(&pocket(), &MachineProfile::production_router(), &maple())
        .unwrap();
    assert_eq!(plan.heat().bins(), 60);
    assert_eq!(plan.strategy(), PathStrategy::Lane);
}

#[test]
fn test_invalid_config_fails_before_geometry() {
    let assembler = ToolpathAssembler::new(PlanConfig {
        heat_bins: 5,
        ..PlanConfig::default()
    });
    let err = assembler
        .plan(&pocket(), &MachineProfile::desktop_router(), &maple())
        .unwrap_err();
    assert!(matches!(err, PlanError::Parameter(_)));

    let err = PlanConfig::from_json_str(r#"{"tool_diameter": "six"}"#).unwrap_err();
    assert!(matches!(err, PlanError::Config(_)));
}

#[test]
fn test_cancelled_plan_returns_nothing() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = ToolpathAssembler::new(PlanConfig::default())
        .plan_with_cancel(&pocket(), &MachineProfile::desktop_router(), &maple(), &cancel)
        .unwrap_err();
    assert_eq!(err, PlanError::Cancelled);
}

/// Points along the planar path of a move.
fn samples(segment: &ToolpathSegment) -> Vec<Point> {
    (0..=8)
        .map(|k| {
            let t = k as f64 / 8.0;
            match segment.motion {
                Motion::Line => segment.start.lerp(&segment.end, t),
                Motion::Arc {
                    center,
                    radius,
                    clockwise,
                } => {
                    let dir = if clockwise { -1.0 } else { 1.0 };
                    let a = segment.start.angle_from(&center) + dir * segment.sweep() * t;
                    Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
                }
            }
        })
        .collect()
}

#[test]
fn test_plan_clears_around_island_near_wall() {
    let islands = vec![
        Polygon::rectangle(40.0, 20.0, 20.0, 20.0).unwrap(),
        Polygon::rectangle(10.0, 1.5, 4.0, 4.0).unwrap(),
    ];
    let pocket =
        PocketInput::new(Polygon::rectangle(0.0, 0.0, 100.0, 60.0).unwrap(), islands.clone())
            .unwrap();
    let config = PlanConfig {
        margin: 1.0,
        ..PlanConfig::default()
    };
    let clearance = config.tool_diameter / 2.0 + config.margin;
    // Flattened keepout corners and fitted arcs may each sit one tolerance in.
    let required = clearance - 2.0 * config.arc_tolerance;

    for strategy in [PathStrategy::Spiral, PathStrategy::Lane] {
        let plan = ToolpathAssembler::new(PlanConfig {
            strategy,
            ..config.clone()
        })
        .plan(&pocket, &MachineProfile::desktop_router(), &maple())
        .unwrap();

        assert!(plan.rings().iter().any(|r| r.loops().len() >= 2));
        for segment in plan.toolpath().filter(|s| s.kind != MoveKind::Rapid) {
            for p in samples(segment) {
                for island in &islands {
                    assert!(
                        island.distance_to_point(&p) >= required,
                        "{:?} move passes {:.4}mm from an island",
                        segment.kind,
                        island.distance_to_point(&p)
                    );
                }
            }
        }

        // The first ring bends around the island next to the wall.
        let closest = plan.rings()[0]
            .points()
            .iter()
            .map(|p| islands[1].distance_to_point(p))
            .fold(f64::INFINITY, f64::min);
        assert!(closest < clearance + 1e-6);
    }
}
