/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;

#[test]
fn test_transparent_pixel_maps_to_canonical_entry() {

    let entry = rgba_to_entry([90, 12, 34, 0], Colorspace::Bt709);

    assert_eq!(entry, PaletteEntry::TRANSPARENT);
}

#[test]
fn test_white_maps_to_studio_peak() {

    let entry = rgba_to_entry([255, 255, 255, 255], Colorspace::Bt709);

    assert_eq!(entry.y, 235);
    assert_eq!(entry.cb, 128);
    assert_eq!(entry.cr, 128);
    assert_eq!(entry.alpha, 255);
}

#[test]
fn test_black_maps_to_studio_floor() {

    let entry = rgba_to_entry([0, 0, 0, 255], Colorspace::Bt601);

    assert_eq!(entry.y, 16);
    assert_eq!(entry.cb, 128);
    assert_eq!(entry.cr, 128);
}

#[test]
fn test_red_chroma_differs_per_matrix() {

    let bt601 = rgba_to_entry([255, 0, 0, 255], Colorspace::Bt601);
    let bt709 = rgba_to_entry([255, 0, 0, 255], Colorspace::Bt709);

    assert!(bt601.y > bt709.y);
    assert!(bt601.cr > 128 && bt709.cr > 128);
}

#[test]
fn test_merge_overlays_slots() {

    let mut a = Palette {
        entries: [(0u8, PaletteEntry { y: 50, cr: 128, cb: 128, alpha: 255 })]
            .into_iter()
            .collect(),
    };
    let b = Palette {
        entries: [
            (0u8, PaletteEntry { y: 90, cr: 128, cb: 128, alpha: 255 }),
            (1u8, PaletteEntry::TRANSPARENT),
        ]
        .into_iter()
        .collect(),
    };
    a.merge(&b);

    assert_eq!(a.len(), 2);
    assert_eq!(a.entries[&0].y, 90);
}

#[test]
fn test_offset_moves_indices() {

    let mut p = Palette::transparent_range(0, 3);
    p.offset(128);

    assert_eq!(p.max_index(), Some(131));
    assert!(p.entries.contains_key(&128));
    assert!(!p.entries.contains_key(&0));
}

#[test]
fn test_diff_keeps_only_changes() {

    let prev = Palette {
        entries: [
            (0u8, PaletteEntry { y: 50, cr: 128, cb: 128, alpha: 255 }),
            (1u8, PaletteEntry { y: 60, cr: 128, cb: 128, alpha: 255 }),
        ]
        .into_iter()
        .collect(),
    };
    let next = Palette {
        entries: [
            (0u8, PaletteEntry { y: 50, cr: 128, cb: 128, alpha: 255 }),
            (1u8, PaletteEntry { y: 60, cr: 128, cb: 128, alpha: 128 }),
        ]
        .into_iter()
        .collect(),
    };
    let diff = next.diff(&prev);

    assert_eq!(diff.len(), 1);
    assert_eq!(diff.entries[&1].alpha, 128);
}

#[test]
fn test_transparent_range_spans_inclusive() {

    let p = Palette::transparent_range(128, 255);

    assert_eq!(p.len(), 128);
    assert_eq!(p.max_index(), Some(255));
    assert!(p.entries.values().all(|e| *e == PaletteEntry::TRANSPARENT));
}
