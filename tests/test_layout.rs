//! Integration tests for region layout editing.

mod common;

use parkwatch::RegionLayout;

use common::*;

#[test]
fn test_drag_normalizes_corners() {
    let mut layout = RegionLayout::new();

    let added = layout.add_from_drag((80, 70), (10, 20));

    assert_eq!(added, Some(Region::new(10, 20, 70, 50)));
    assert_eq!(layout.len(), 1);
}

#[test]
fn test_small_drags_are_rejected() {
    let mut layout = RegionLayout::new();

    assert!(layout.add_from_drag((0, 0), (20, 100)).is_none());
    assert!(layout.add_from_drag((0, 0), (100, 20)).is_none());
    assert!(layout.add_from_drag((0, 0), (21, 21)).is_some());
    assert_eq!(layout.len(), 1);
}

#[test]
fn test_remove_first_containing_region_shifts_indices() {
    let mut layout = RegionLayout::from_regions(vec![
        Region::new(0, 0, 50, 50),
        Region::new(40, 40, 50, 50),
        Region::new(200, 200, 30, 30),
    ]);

    // Overlap point belongs to the first region
    let removed = layout.remove_at(45, 45);
    assert_eq!(removed, Some(Region::new(0, 0, 50, 50)));
    assert_eq!(layout.regions()[0], Region::new(40, 40, 50, 50));

    // Edges are inclusive
    assert_eq!(layout.remove_at(230, 230), Some(Region::new(200, 200, 30, 30)));
    assert_eq!(layout.remove_at(500, 500), None);
    assert_eq!(layout.len(), 1);
}

#[test]
fn test_clear() {
    let mut layout = RegionLayout::from_regions(vec![Region::new(0, 0, 50, 50)]);
    layout.clear();
    assert!(layout.is_empty());
    assert_eq!((&layout).into_iter().count(), 0);
}
