/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;
use crate::raster::RgbaImage;

fn blob_event(
    x: u16,
    y: u16,
    width: usize,
    height: usize,
    tc_in: u32,
    tc_out: u32,
    blobs: &[Rect],
) -> Event {
    let mut img = RgbaImage::new(width, height);
    for rect in blobs {
        for by in rect.y..rect.y2() {
            for bx in rect.x..rect.x2() {
                img.set_pixel(bx as usize, by as usize, [255, 255, 255, 255]);
            }
        }
    }
    Event { x, y, tc_in, tc_out, img }
}

fn engine() -> GroupingEngine {
    GroupingEngine::new(2, 25, LayoutMode::SmallestWindows, 1.1, 1.5)
}

#[test]
fn test_empty_run_is_an_error() {

    assert!(matches!(engine().group(&[]), Err(GroupError::EmptyEventRun)));
}

#[test]
fn test_single_blob_single_window() {

    let event = blob_event(260, 400, 200, 40, 0, 60, &[Rect::new(0, 0, 200, 40)]);
    let (wobs, bbox) = engine().group(&[event]).unwrap();

    assert_eq!(bbox, Rect::new(260, 400, 200, 40));
    assert_eq!(wobs.len(), 1);
    // The blob fills the box, so the tight window covers it all.
    assert_eq!(wobs[0].window(), Rect::new(0, 0, 200, 40));
}

#[test]
fn test_window_tightens_to_alpha() {

    // Content only occupies the right half of the bitmap.
    let event = blob_event(100, 100, 200, 40, 0, 10, &[Rect::new(120, 8, 60, 20)]);
    let (wobs, _) = engine().group(&[event]).unwrap();

    assert_eq!(wobs.len(), 1);
    let window = wobs[0].window();
    assert_eq!(window, Rect::new(120, 8, 60, 20));
}

#[test]
fn test_two_distant_blobs_two_windows() {

    let event = blob_event(
        50,
        400,
        650,
        40,
        0,
        48,
        &[Rect::new(0, 0, 200, 40), Rect::new(450, 0, 200, 40)],
    );
    let (wobs, bbox) = engine().group(&[event]).unwrap();

    assert_eq!(bbox, Rect::new(50, 400, 650, 40));
    assert_eq!(wobs.len(), 2);
    assert_eq!(wobs[0].window(), Rect::new(0, 0, 200, 40));
    assert_eq!(wobs[1].window(), Rect::new(450, 0, 200, 40));

    // Two small windows beat one spanning window.
    let total: u64 = wobs.iter().map(|w| w.area()).sum();
    assert!(total < 650 * 40);
}

#[test]
fn test_single_group_mode_merges_everything() {

    let event = blob_event(
        50,
        400,
        650,
        40,
        0,
        48,
        &[Rect::new(0, 0, 200, 40), Rect::new(450, 0, 200, 40)],
    );
    let engine = GroupingEngine::new(1, 25, LayoutMode::SmallestWindows, 1.1, 1.5);
    let (wobs, _) = engine.group(&[event]).unwrap();

    assert_eq!(wobs.len(), 1);
    assert_eq!(wobs[0].window(), Rect::new(0, 0, 650, 40));
}

#[test]
fn test_least_acquisitions_mode_returns_layout() {

    let event = blob_event(
        50,
        400,
        650,
        40,
        0,
        48,
        &[Rect::new(0, 0, 200, 40), Rect::new(450, 0, 200, 40)],
    );
    let engine =
        GroupingEngine::new(2, 25, LayoutMode::LeastAcquisitions, 1.1, 1.5);
    let (wobs, _) = engine.group(&[event]).unwrap();

    assert!(!wobs.is_empty());
    assert!(wobs.len() <= 2);
}

#[test]
fn test_speck_overflow_retries_and_covers_everything() {

    // 20 isolated specks overflow the 16-component limit; growing blur must
    // collapse them, or the engine degrades to a single window.
    let specks: Vec<Rect> = (0..20)
        .map(|k| Rect::new(k * 40, 4, 3, 3))
        .collect();
    let event = blob_event(0, 0, 20 * 40, 12, 0, 10, &specks);
    let (wobs, _) = engine().group(&[event]).unwrap();

    assert!(!wobs.is_empty());
    assert!(wobs.len() <= 2);

    // Every speck must land inside some window.
    for speck in &specks {
        let covered = wobs
            .iter()
            .any(|wob| wob.window().intersect(speck).area() == speck.area());
        assert!(covered, "speck {:?} left uncovered", speck);
    }
}

#[test]
fn test_temporally_disjoint_blobs_same_spot_share_region_bounds() {

    // The same area used by two consecutive events produces regions that the
    // flat projection folds into one window.
    let first = blob_event(100, 100, 64, 16, 0, 5, &[Rect::new(0, 0, 64, 16)]);
    let second = blob_event(100, 100, 64, 16, 5, 10, &[Rect::new(0, 0, 64, 16)]);
    let (wobs, _) = engine().group(&[first, second]).unwrap();

    assert_eq!(wobs.len(), 1);
    assert_eq!(wobs[0].window(), Rect::new(0, 0, 64, 16));
    assert_eq!(wobs[0].event_mask(true), vec![1, 1]);
}
