use luthcam_core::data::MachineProfile;
use luthcam_core::geometry::Point;
use luthcam_toolpath::motion::{estimate_times, segment_time, MotionBranch, MotionProfileEstimator};
use luthcam_toolpath::segment::{MoveKind, ToolpathSegment};

fn machine(max_feed: f64) -> MachineProfile {
    MachineProfile::new(max_feed, 500.0, 5000.0, max_feed).unwrap()
}

fn line(length: f64, feed: f64) -> ToolpathSegment {
    ToolpathSegment::line(
        MoveKind::Cut,
        Point::new(0.0, 0.0),
        Point::new(length, 0.0),
        feed,
    )
}

#[test]
fn test_cruise_branch() {
    // t_a = 0.1 s, s_a = 2.5 mm, v = 20 mm/s
    let t = segment_time(10.0, 1200.0, &machine(3000.0));
    assert_eq!(t.branch, MotionBranch::Cruise);
    assert!((t.time - 0.45).abs() < 1e-12);
}

#[test]
fn test_jerk_limited_branch() {
    let t = segment_time(4.0, 1200.0, &machine(3000.0));
    assert_eq!(t.branch, MotionBranch::JerkLimited);
    assert!((t.time - 2.0 * (4.0f64 / 500.0).sqrt()).abs() < 1e-12);
    assert!((t.time - 0.178885).abs() < 1e-6);
}

#[test]
fn test_reach_limited_branch() {
    // v_reach = sqrt(1000) ~ 31.6 mm/s < 0.9 * 100 mm/s
    let t = segment_time(6.0, 6000.0, &machine(6000.0));
    assert_eq!(t.branch, MotionBranch::ReachLimited);
    assert!((t.time - 0.219089).abs() < 1e-6);
}

#[test]
fn test_zero_length_segment() {
    let estimator_machine = machine(3000.0);
    let times = estimate_times(&[line(0.0, 1200.0)], &estimator_machine);
    assert_eq!(times[0].time, 0.0);
    assert_eq!(times[0].branch, MotionBranch::Idle);
}

#[test]
fn test_feed_clamped_to_machine() {
    let m = machine(1200.0);
    let estimator = MotionProfileEstimator::new(&m);
    let fast = estimator.estimate(&line(10.0, 9000.0));
    let nominal = estimator.estimate(&line(10.0, 1200.0));
    assert_eq!(fast, nominal);
}

#[test]
fn test_vertical_moves_use_z_travel() {
    let m = machine(3000.0);
    let plunge = ToolpathSegment::plunge(Point::new(1.0, 1.0), 10.0, 1200.0);
    let times = estimate_times(&[plunge, line(10.0, 1200.0)], &m);
    assert_eq!(times.len(), 2);
    assert!((times[0].time - times[1].time).abs() < 1e-12);
}
