use luthcam_core::data::MaterialProfile;
use luthcam_core::error::TimelineError;
use luthcam_core::geometry::Point;
use luthcam_toolpath::energy::{compute_energy, compute_heat_timeseries, EnergyHeatModel};
use luthcam_toolpath::motion::{MotionBranch, SegmentTime};
use luthcam_toolpath::segment::{MoveKind, ToolpathSegment};

fn material() -> MaterialProfile {
    MaterialProfile::from_parts(0.55, 0.70, 0.20, 0.10).unwrap()
}

fn cut(length: f64) -> ToolpathSegment {
    ToolpathSegment::line(
        MoveKind::Cut,
        Point::new(0.0, 0.0),
        Point::new(length, 0.0),
        1200.0,
    )
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * b.abs().max(1.0)
}

#[test]
fn test_line_segment_energy() {
    let energies = compute_energy(&[cut(50.0)], 6.0, 0.45, 1.5, &material());
    let e = energies[0];
    assert!(close(e.volume, 202.5));
    assert!(close(e.energy, 111.375));
    assert!(close(e.chip, 77.9625));
    assert!(close(e.tool, 22.275));
    assert!(close(e.work, 11.1375));
    assert!(close(e.chip + e.tool + e.work, e.energy));
    assert!(close(e.cumulative, e.energy));
}

#[test]
fn test_arc_engagement_and_non_cutting_moves() {
    let m = material();
    let model = EnergyHeatModel::new(&m, 6.0, 0.45, 1.5);
    let arc = ToolpathSegment::arc(
        MoveKind::Cut,
        Point::new(10.0, 0.0),
        Point::new(-10.0, 0.0),
        Point::new(0.0, 0.0),
        false,
        1200.0,
    );
    let expected = 10.0 * std::f64::consts::PI * 4.05 * 0.9;
    assert!(close(model.volume(&arc), expected));

    let rapid = ToolpathSegment::rapid(Point::new(0.0, 0.0), Point::new(50.0, 0.0), 5000.0);
    let plunge = ToolpathSegment::plunge(Point::new(0.0, 0.0), 5.0, 400.0);
    assert_eq!(model.volume(&rapid), 0.0);
    assert_eq!(model.volume(&plunge), 0.0);

    let transition = ToolpathSegment::line(
        MoveKind::Transition,
        Point::new(0.0, 0.0),
        Point::new(2.0, 0.0),
        1200.0,
    );
    assert!(close(model.volume(&transition), 8.1));
}

#[test]
fn test_cumulative_is_running_sum() {
    let segments = [
        cut(10.0),
        ToolpathSegment::rapid(Point::new(0.0, 0.0), Point::new(5.0, 0.0), 5000.0),
        cut(5.0),
        cut(20.0),
    ];
    let energies = compute_energy(&segments, 6.0, 0.45, 1.5, &material());
    let mut running = 0.0;
    for e in &energies {
        running += e.energy;
        assert!(close(e.cumulative, running));
    }
    assert_eq!(energies[1].cumulative, energies[0].cumulative);
}

fn time(t: f64) -> SegmentTime {
    SegmentTime {
        time: t,
        branch: MotionBranch::Cruise,
    }
}

#[test]
fn test_degenerate_timeline() {
    let energies = compute_energy(&[cut(0.0)], 6.0, 0.45, 1.5, &material());
    let err = compute_heat_timeseries(&energies, &[time(0.0)], 120).unwrap_err();
    assert_eq!(err, TimelineError::DegenerateTimeline);
}

#[test]
fn test_bin_range() {
    let energies = compute_energy(&[cut(10.0)], 6.0, 0.45, 1.5, &material());
    for bins in [0, 9, 2001] {
        assert!(matches!(
            compute_heat_timeseries(&energies, &[time(1.0)], bins),
            Err(TimelineError::BinsOutOfRange { .. })
        ));
    }
    assert_eq!(compute_heat_timeseries(&energies, &[time(1.0)], 10).unwrap().bins(), 10);
    assert_eq!(compute_heat_timeseries(&energies, &[time(1.0)], 2000).unwrap().bins(), 2000);
}

#[test]
fn test_heat_series_peaks() {
    let energies = compute_energy(&[cut(50.0), cut(10.0)], 6.0, 0.45, 1.5, &material());
    // First half of the timeline carries 111.375 J, second half 22.275 J.
    let series = compute_heat_timeseries(&energies, &[time(1.0), time(1.0)], 10).unwrap();
    assert!(close(series.bin_width, 0.2));
    assert!(close(series.peak_chip(), 77.9625));
    assert!(close(series.peak_tool(), 22.275));
    assert!(close(series.peak_work(), 11.1375));
    assert!(close(series.p_chip[9], 22.275 * 0.7));
    assert!(close(series.chip_energy(), (111.375 + 22.275) * 0.7));
}
