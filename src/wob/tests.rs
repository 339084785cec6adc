/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;
use crate::geometry::ScreenRegion;

fn region(rect: Rect, t: usize, dt: usize, label: usize) -> ScreenRegion {
    let frames = (0..dt)
        .map(|_| {
            let mut p = Plane::new(rect.dx as usize, rect.dy as usize);
            p.data.fill(1);
            p
        })
        .collect();
    ScreenRegion { rect, t, dt, label, frames }
}

#[test]
fn test_window_hull_of_regions() {

    let wob = WindowOnBuffer::new(
        vec![
            region(Rect::new(10, 20, 30, 12), 0, 2, 0),
            region(Rect::new(50, 16, 20, 10), 1, 3, 1),
        ],
        4,
    );

    assert_eq!(wob.window(), Rect::new(10, 16, 60, 16));
}

#[test]
fn test_window_pads_to_hardware_minimum() {

    let wob = WindowOnBuffer::new(vec![region(Rect::new(5, 5, 3, 2), 0, 1, 0)], 1);
    let window = wob.window();

    assert_eq!(window.dx, 8);
    assert_eq!(window.dy, 8);
    assert_eq!(wob.area(), 64);
}

#[test]
fn test_event_mask_boolean_and_counted() {

    let wob = WindowOnBuffer::new(
        vec![
            region(Rect::new(0, 0, 4, 4), 0, 2, 0),
            region(Rect::new(8, 0, 4, 4), 1, 2, 1),
        ],
        4,
    );

    assert_eq!(wob.event_mask(true), vec![1, 1, 1, 0]);
    assert_eq!(wob.event_mask(false), vec![1, 2, 1, 0]);
}

#[test]
fn test_update_mask_marks_region_starts() {

    let wob = WindowOnBuffer::new(
        vec![
            region(Rect::new(0, 0, 4, 4), 0, 3, 0),
            region(Rect::new(8, 0, 4, 4), 2, 2, 1),
        ],
        4,
    );

    assert_eq!(wob.update_mask(), vec![1, 0, 1, 0]);
}

#[test]
fn test_bitmap_update_mask_disjoint_regions_share_buffer() {

    // A disjoint region starting while the first is still within the active
    // horizon reuses the buffer without a refresh.
    let main = Rect::new(0, 0, 16, 8);
    let wob = WindowOnBuffer::new(
        vec![
            region(Rect::new(0, 0, 4, 4), 0, 1, 0),
            region(Rect::new(12, 0, 4, 4), 1, 1, 1),
        ],
        2,
    );

    let mask = wob.bitmap_update_mask(&main, 0.9);

    assert_eq!(mask, vec![1, 0]);
}

#[test]
fn test_bitmap_update_mask_collision_forces_refresh() {

    // The second region lands on pixels the first one already wrote.
    let main = Rect::new(0, 0, 16, 8);
    let wob = WindowOnBuffer::new(
        vec![
            region(Rect::new(0, 0, 4, 4), 0, 3, 0),
            region(Rect::new(2, 0, 4, 4), 2, 1, 1),
        ],
        3,
    );

    let mask = wob.bitmap_update_mask(&main, 0.4);

    assert_eq!(mask[0], 1);
    assert_eq!(mask[2], 1);
}

#[test]
fn test_bitmap_update_mask_zero_threshold_marks_every_active_frame() {

    let main = Rect::new(0, 0, 8, 8);
    let wob = WindowOnBuffer::new(vec![region(Rect::new(0, 0, 4, 4), 0, 3, 0)], 3);

    assert_eq!(wob.bitmap_update_mask(&main, 0.0), vec![1, 1, 1]);
}

#[test]
#[should_panic(expected = "overlap threshold")]
fn test_bitmap_update_mask_rejects_bad_threshold() {

    let wob = WindowOnBuffer::new(vec![], 0);
    wob.bitmap_update_mask(&Rect::new(0, 0, 8, 8), 1.5);
}
