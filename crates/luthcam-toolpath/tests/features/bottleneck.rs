use luthcam_core::data::MachineProfile;
use luthcam_core::geometry::Point;
use luthcam_toolpath::bottleneck::{classify, classify_move, Bottleneck, BottleneckClassifier};
use luthcam_toolpath::segment::{MoveKind, ToolpathSegment};

fn slow_jerk_machine() -> MachineProfile {
    MachineProfile::new(6000.0, 500.0, 50.0, 6000.0).unwrap()
}

#[test]
fn test_priority_chain() {
    let m = slow_jerk_machine();
    // 40 mm/s: accel distance 1.6 mm, jerk distance 2.56 mm
    assert_eq!(classify_move(1.0, 2400.0, &m), Bottleneck::Accel);
    assert_eq!(classify_move(2.0, 2400.0, &m), Bottleneck::Jerk);
    assert_eq!(classify_move(3.0, 2400.0, &m), Bottleneck::None);
}

#[test]
fn test_feed_cap_wins() {
    let m = MachineProfile::new(3000.0, 500.0, 5000.0, 5000.0).unwrap();
    assert_eq!(classify_move(0.1, 2900.0, &m), Bottleneck::FeedCap);
    assert_eq!(classify_move(500.0, 2850.0, &m), Bottleneck::FeedCap);
    assert_ne!(classify_move(500.0, 2849.0, &m), Bottleneck::FeedCap);
}

#[test]
fn test_classify_segments() {
    let m = slow_jerk_machine();
    let a = Point::new(0.0, 0.0);
    let segments = [
        ToolpathSegment::line(MoveKind::Cut, a, Point::new(1.0, 0.0), 2400.0),
        ToolpathSegment::line(MoveKind::Cut, a, Point::new(0.0, 2.0), 2400.0),
        ToolpathSegment::rapid(a, Point::new(30.0, 40.0), 6000.0),
    ];
    let labels = BottleneckClassifier::new(&m).classify_all(&segments);
    assert_eq!(labels, vec![Bottleneck::Accel, Bottleneck::Jerk, Bottleneck::FeedCap]);
    assert_eq!(classify(&segments[0], &m), Bottleneck::Accel);
}

#[test]
fn test_serialized_labels() {
    let json = serde_json::to_string(&[Bottleneck::FeedCap, Bottleneck::None]).unwrap();
    assert_eq!(json, r#"["feed_cap","none"]"#);
}
