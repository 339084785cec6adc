/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;

fn blob(width: usize, height: usize, rect: Rect, px: [u8; 4]) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for y in rect.y..rect.y2() {
        for x in rect.x..rect.x2() {
            img.set_pixel(x as usize, y as usize, px);
        }
    }
    img
}

#[test]
fn test_identical_frames_chain_into_one_object() {

    let mut analyzer = WindowAnalyzer::new(32, 16);
    let frame = blob(32, 16, Rect::new(4, 2, 10, 8), [200, 10, 10, 255]);

    assert!(analyzer.push(Some(frame.clone())).is_none());
    assert!(analyzer.push(Some(frame.clone())).is_none());
    let pgo = analyzer.push(None).expect("pending run must flush");

    assert_eq!(pgo.gfx.len(), 2);
    assert_eq!(pgo.mask, vec![true, true]);
    assert_eq!(pgo.f, 0);
    assert_eq!(pgo.bbox, Rect::new(4, 2, 10, 8));
}

#[test]
fn test_dissimilar_frame_splits_runs() {

    let mut analyzer = WindowAnalyzer::new(32, 16);
    // Same alpha footprint, inverted luma: overlap is perfect on alpha but
    // the content is different enough to fail the similarity gate.
    let a = blob(32, 16, Rect::new(4, 2, 20, 12), [250, 250, 250, 255]);
    let mut b = blob(32, 16, Rect::new(4, 2, 20, 12), [5, 5, 5, 255]);
    // A second blob breaks the perfect-overlap shortcut.
    for y in 2..14usize {
        for x in 26..30usize {
            b.set_pixel(x, y, [5, 5, 5, 255]);
        }
    }

    assert!(analyzer.push(Some(a)).is_none());
    let first = analyzer.push(Some(b)).expect("split must emit the first run");

    assert_eq!(first.gfx.len(), 1);
    assert_eq!(first.f, 0);

    let second = analyzer.push(None).expect("seeded run must flush");
    assert_eq!(second.gfx.len(), 1);
    assert_eq!(second.f, 1);
}

#[test]
fn test_leading_empty_frames_are_skipped() {

    let mut analyzer = WindowAnalyzer::new(16, 16);

    assert!(analyzer.push(Some(RgbaImage::new(16, 16))).is_none());
    assert!(analyzer.push(Some(RgbaImage::new(16, 16))).is_none());
    let frame = blob(16, 16, Rect::new(0, 0, 8, 8), [9, 9, 9, 255]);
    assert!(analyzer.push(Some(frame)).is_none());
    let pgo = analyzer.push(None).unwrap();

    assert_eq!(pgo.f, 2);
    assert_eq!(pgo.mask, vec![true]);
}

#[test]
fn test_trailing_empty_frames_are_trimmed() {

    let mut analyzer = WindowAnalyzer::new(16, 16);
    let frame = blob(16, 16, Rect::new(0, 0, 8, 8), [9, 9, 9, 255]);

    assert!(analyzer.push(Some(frame)).is_none());
    assert!(analyzer.push(Some(RgbaImage::new(16, 16))).is_none());
    assert!(analyzer.push(Some(RgbaImage::new(16, 16))).is_none());
    let pgo = analyzer.push(None).unwrap();

    assert_eq!(pgo.mask, vec![true]);
    assert_eq!(pgo.gfx.len(), 1);
}

#[test]
fn test_interior_empty_frames_stay_masked() {

    let mut analyzer = WindowAnalyzer::new(16, 16);
    let frame = blob(16, 16, Rect::new(0, 0, 8, 8), [9, 9, 9, 255]);

    assert!(analyzer.push(Some(frame.clone())).is_none());
    assert!(analyzer.push(Some(RgbaImage::new(16, 16))).is_none());
    assert!(analyzer.push(Some(frame)).is_none());
    let pgo = analyzer.push(None).unwrap();

    assert_eq!(pgo.mask, vec![true, false, true]);
    assert_eq!(pgo.gfx.len(), 3);
}

#[test]
fn test_empty_stream_yields_nothing() {

    let mut analyzer = WindowAnalyzer::new(8, 8);

    assert!(analyzer.push(Some(RgbaImage::new(8, 8))).is_none());
    assert!(analyzer.push(None).is_none());
}

#[test]
fn test_object_activity_and_visibility() {

    let pgo = PgObject {
        gfx: vec![RgbaImage::new(8, 8); 3],
        bbox: Rect::new(0, 0, 4, 4),
        mask: vec![true, false, true],
        f: 5,
    };

    assert!(!pgo.is_active(4));
    assert!(pgo.is_active(5));
    assert!(pgo.is_active(7));
    assert!(!pgo.is_active(8));
    assert!(pgo.is_visible(5));
    assert!(!pgo.is_visible(6));
    assert_eq!(pgo.area(), 64);
}
