//! Integration tests for motion-based vehicle counting.
//!
//! Tests cover:
//! - Motion mask and moving object extraction
//! - Counting line clamping and the open crossing band
//! - Crossing counts and pool bookkeeping
//! - Full tracking steps, including centroid eviction

mod common;

use parkwatch::detection::motion::{count_crossings, MotionParams, MotionPool, PoolLimits};
use parkwatch::detection::overlay::GREEN;
use parkwatch::detection::MotionTracker;

use common::*;

fn tracker_with_line(line_height: i32, limits: PoolLimits) -> MotionTracker {
    MotionTracker::new(MotionParams {
        line_height,
        limits,
        ..MotionParams::default()
    })
}

#[test]
fn test_moving_square_yields_one_object() -> anyhow::Result<()> {
    let tracker = MotionTracker::default();
    let prev = black_frame(100, 100);
    let curr = frame_with_square(100, 100, 30, 30, 40);

    let mask = tracker.motion_mask(&prev, &curr, 0)?;
    let objects = tracker.moving_objects(&mask);

    assert_eq!(objects.len(), 1);
    let object = objects[0];
    assert!(object.width() >= 40 && object.height() >= 40);
    let centroid = object.centroid();
    assert!((centroid.x - 50).abs() <= 2, "centroid {:?}", centroid);
    assert!((centroid.y - 50).abs() <= 2, "centroid {:?}", centroid);
    Ok(())
}

#[test]
fn test_identical_frames_have_no_motion() -> anyhow::Result<()> {
    let tracker = MotionTracker::default();
    let frame = frame_with_square(100, 100, 30, 30, 40);

    let mask = tracker.motion_mask(&frame, &frame.clone(), 0)?;

    assert!(mask.pixels().all(|p| p[0] == 0));
    assert!(tracker.moving_objects(&mask).is_empty());
    Ok(())
}

#[test]
fn test_small_motion_is_ignored() -> anyhow::Result<()> {
    let tracker = MotionTracker::default();
    let mask = tracker.motion_mask(&black_frame(100, 100), &frame_with_square(100, 100, 40, 40, 10), 0)?;
    assert!(tracker.moving_objects(&mask).is_empty());
    Ok(())
}

#[test]
fn test_frame_size_mismatch_is_an_error() {
    let tracker = MotionTracker::default();
    assert!(tracker.motion_mask(&black_frame(100, 100), &black_frame(80, 100), 0).is_err());
}

#[test]
fn test_counting_line_clamp() {
    assert_eq!(CountingLine::resolve(1000, 10, 480).y, 430);
    assert_eq!(CountingLine::resolve(480, 10, 480).y, 430);
    assert_eq!(CountingLine::resolve(479, 10, 480).y, 479);
    assert_eq!(CountingLine::resolve(400, 10, 30).y, 0);
}

#[test]
fn test_crossing_band_is_open() {
    let line = CountingLine { y: 100, offset: 10 };
    assert!(!line.in_band(90));
    assert!(line.in_band(91));
    assert!(line.in_band(100));
    assert!(line.in_band(109));
    assert!(!line.in_band(110));
}

#[test]
fn test_count_crossings_removes_counted_centroids() {
    let mut pool = MotionPool::from_centroids([
        Centroid::new(0, 395),
        Centroid::new(0, 420),
        Centroid::new(0, 405),
    ]);
    let line = CountingLine { y: 400, offset: 10 };

    let crossed = count_crossings(&mut pool, &line);

    assert_eq!(crossed, 2);
    assert_eq!(pool.centroids(), vec![Centroid::new(0, 420)]);
    // Already-counted centroids are gone, so a second pass counts nothing
    assert_eq!(count_crossings(&mut pool, &line), 0);
}

#[test]
fn test_track_counts_object_on_line() -> anyhow::Result<()> {
    let tracker = tracker_with_line(50, PoolLimits::default());
    let prev = black_frame(100, 100);
    let curr = frame_with_square(100, 100, 30, 30, 40);

    let report = tracker.track(prev, &curr, MotionPool::new(), 7, 1)?;

    assert_eq!(report.objects.len(), 1);
    assert_eq!(report.crossed, 1);
    assert_eq!(report.counter, 8);
    assert!(report.pool.is_empty());
    assert_eq!(report.line.y, 50);
    // The earlier frame carries the annotations
    assert_eq!(*report.frame.get_pixel(95, 50), GREEN);
    Ok(())
}

#[test]
fn test_track_pools_object_away_from_line() -> anyhow::Result<()> {
    let tracker = tracker_with_line(90, PoolLimits::default());
    let prev = black_frame(100, 100);
    let curr = frame_with_square(100, 100, 30, 10, 40);

    let report = tracker.track(prev, &curr, MotionPool::new(), 0, 1)?;

    assert_eq!(report.crossed, 0);
    assert_eq!(report.counter, 0);
    assert_eq!(report.pool.len(), 1);
    assert_eq!(report.pool.entries()[0].age, 0);
    Ok(())
}

#[test]
fn test_stale_centroids_are_evicted() -> anyhow::Result<()> {
    let limits = PoolLimits {
        max_age: Some(1),
        max_len: None,
    };
    let tracker = tracker_with_line(50, limits);
    let still = black_frame(100, 100);
    let pool = MotionPool::from_centroids([Centroid::new(20, 5)]);

    let first = tracker.track(still.clone(), &still, pool, 0, 1)?;
    assert_eq!(first.pool.len(), 1);
    assert_eq!(first.pool.entries()[0].age, 1);
    assert_eq!(first.evicted, 0);

    let second = tracker.track(still.clone(), &still, first.pool, first.counter, 2)?;
    assert!(second.pool.is_empty());
    assert_eq!(second.evicted, 1);
    Ok(())
}

#[test]
fn test_pool_length_limit_drops_oldest() {
    let mut pool = MotionPool::from_centroids((0..5).map(|i| Centroid::new(i, 0)));
    let evicted = pool.evict(&PoolLimits {
        max_age: None,
        max_len: Some(3),
    });

    assert_eq!(evicted, 2);
    assert_eq!(
        pool.centroids(),
        vec![Centroid::new(2, 0), Centroid::new(3, 0), Centroid::new(4, 0)]
    );
}

#[test]
fn test_unbounded_pool_keeps_everything() {
    let mut pool = MotionPool::from_centroids((0..300).map(|i| Centroid::new(i, 0)));
    assert_eq!(pool.evict(&PoolLimits::unbounded()), 0);
    assert_eq!(pool.len(), 300);
}

#[test]
fn test_motion_cutoff_uses_bt601_luma() -> anyhow::Result<()> {
    let tracker = MotionTracker::default();
    let prev = black_frame(100, 100);

    // Green change of 34 is luma 20, not above the cutoff
    let green = frame_with_colored_square(100, 100, 25, 25, 50, image::Rgb([0, 34, 0]));
    let mask = tracker.motion_mask(&prev, &green, 0)?;
    assert!(mask.pixels().all(|p| p[0] == 0));
    assert!(tracker.moving_objects(&mask).is_empty());

    // Red change of 80 is luma 24, above the cutoff
    let red = frame_with_colored_square(100, 100, 25, 25, 50, image::Rgb([80, 0, 0]));
    let mask = tracker.motion_mask(&prev, &red, 0)?;
    assert_eq!(mask.get_pixel(50, 50)[0], 255);
    assert_eq!(tracker.moving_objects(&mask).len(), 1);
    Ok(())
}
