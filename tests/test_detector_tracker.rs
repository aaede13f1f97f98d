//! Integration tests for detector-based vehicle counting.
//!
//! Tests cover:
//! - Counting a detection once while it lingers in the band
//! - Pruning counted centroids that left the scene
//! - Exact versus proximity deduplication
//! - Detector failures leaving the frame and state untouched
//! - Replay detector filtering and exhaustion

mod common;

use parkwatch::detection::overlay::GREEN;
use parkwatch::detection::{
    DedupPolicy, DetectorOutcome, DetectorTracker, ReplayDetector, TrackerParams, VehicleDetector,
    VehicleFilter,
};

use common::*;

#[test]
fn test_lingering_detection_counts_once() {
    let tracker = DetectorTracker::default();
    let detections = [car(100, 390, 140, 410)];

    let first = tracker.track(black_frame(640, 480), &detections, &[], 0);
    assert_eq!(first.crossed, 1);
    assert_eq!(first.counter, 1);
    assert_eq!(first.pool, vec![Centroid::new(120, 400)]);

    let second = tracker.track(black_frame(640, 480), &detections, &first.pool, first.counter);
    assert_eq!(second.crossed, 0);
    assert_eq!(second.counter, 1);
    assert_eq!(second.pool, first.pool);
    assert_eq!(*second.frame.get_pixel(630, 400), GREEN);
}

#[test]
fn test_counted_centroid_pruned_when_vehicle_leaves() {
    let tracker = DetectorTracker::default();
    let pool = [Centroid::new(120, 400)];

    // Moved 30px: still matched
    let near = tracker.track(black_frame(640, 480), &[car(130, 410, 170, 430)], &pool, 1);
    assert_eq!(near.pool, pool.to_vec());

    // Nothing within 50px any more
    let gone = tracker.track(black_frame(640, 480), &[car(380, 80, 420, 120)], &pool, 1);
    assert!(gone.pool.is_empty());
    assert_eq!(gone.counter, 1);
}

#[test]
fn test_exact_and_proximity_dedup() {
    let pool = [Centroid::new(120, 400)];
    let nudged = [car(103, 392, 143, 412)]; // centroid (123, 402)

    let exact = DetectorTracker::default();
    let counted = exact.track(black_frame(640, 480), &nudged, &pool, 1);
    assert_eq!(counted.crossed, 1);
    assert_eq!(counted.counter, 2);

    let proximity = DetectorTracker::new(TrackerParams {
        dedup: DedupPolicy::Proximity { radius: 10.0 },
        ..TrackerParams::default()
    });
    let deduped = proximity.track(black_frame(640, 480), &nudged, &pool, 1);
    assert_eq!(deduped.crossed, 0);
    assert_eq!(deduped.counter, 1);
}

#[test]
fn test_detector_failure_returns_untouched_frame() {
    let tracker = DetectorTracker::default();
    let frame = frame_with_square(64, 48, 10, 10, 20);
    let pool = [Centroid::new(5, 5)];

    match tracker.process(frame.clone(), &mut FailingDetector, &pool, 3) {
        DetectorOutcome::DetectorFailed { frame: returned, reason } => {
            assert_eq!(returned, frame);
            assert!(reason.contains("model not loaded"));
        }
        DetectorOutcome::Tracked(_) => panic!("failure was swallowed"),
    }
}

#[test]
fn test_process_tracks_detector_output() {
    let tracker = DetectorTracker::default();
    let mut detector = ScriptedDetector::new(vec![Ok(vec![car(100, 390, 140, 410)])]);

    match tracker.process(black_frame(640, 480), &mut detector, &[], 0) {
        DetectorOutcome::Tracked(tracked) => {
            assert_eq!(tracked.counter, 1);
            assert_eq!(tracked.detections.len(), 1);
        }
        DetectorOutcome::DetectorFailed { reason, .. } => panic!("unexpected failure: {}", reason),
    }
}

#[test]
fn test_vehicle_filter() {
    let filter = VehicleFilter::default();
    assert!(filter.accepts(&car(0, 0, 10, 10)));

    let at_threshold = Detection { score: 0.6, ..car(0, 0, 10, 10) };
    assert!(!filter.accepts(&at_threshold));

    let person = Detection { label: 1, ..car(0, 0, 10, 10) };
    assert!(!filter.accepts(&person));
}

#[test]
fn test_replay_detector_filters_and_exhausts() -> anyhow::Result<()> {
    let json = r#"[
        [[100, 390, 140, 410, 0.9, 3], [0, 0, 10, 10, 0.5, 3], [0, 0, 10, 10, 0.9, 1]],
        []
    ]"#;
    let mut detector = ReplayDetector::from_json(json, VehicleFilter::default())?;
    let frame = black_frame(640, 480);

    assert_eq!(detector.remaining(), 2);
    assert_eq!(detector.detect(&frame)?, vec![car(100, 390, 140, 410)]);
    assert!(detector.detect(&frame)?.is_empty());
    assert!(detector.detect(&frame).is_err());
    Ok(())
}
