/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;

fn two_tone(width: usize, height: usize) -> RgbaImage {
    let mut img = RgbaImage::new(width, height);
    for y in 0..height {
        for x in 0..width / 2 {
            img.set_pixel(x, y, [255, 0, 0, 255]);
        }
        for x in width / 2..width {
            img.set_pixel(x, y, [0, 0, 255, 255]);
        }
    }
    img
}

#[test]
fn test_quantize_exact_palette() {

    let img = two_tone(8, 4);
    let (bitmap, palette) = quantize(&img, 256);

    assert_eq!(palette.len(), 2);
    assert_eq!(palette[bitmap.data[0] as usize], [255, 0, 0, 255]);
    assert_eq!(palette[bitmap.data[7] as usize], [0, 0, 255, 255]);
}

#[test]
fn test_quantize_respects_color_budget() {

    // A gradient of 64 distinct colors squeezed into 16 entries.
    let mut img = RgbaImage::new(64, 1);
    for x in 0..64 {
        img.set_pixel(x, 0, [x as u8 * 4, 0, 0, 255]);
    }
    let (bitmap, palette) = quantize(&img, 16);

    assert!(palette.len() <= 16);
    assert!(bitmap.data.iter().all(|&i| (i as usize) < palette.len()));
}

#[test]
fn test_quantize_collapses_transparency() {

    let mut img = RgbaImage::new(4, 1);
    img.set_pixel(0, 0, [9, 9, 9, 0]);
    img.set_pixel(1, 0, [200, 100, 50, 0]);
    img.set_pixel(2, 0, [10, 20, 30, 255]);
    img.set_pixel(3, 0, [10, 20, 30, 255]);
    let (bitmap, palette) = quantize(&img, 256);

    assert_eq!(palette.len(), 2);
    assert_eq!(bitmap.data[0], bitmap.data[1]);
    assert_eq!(palette[bitmap.data[0] as usize], [0, 0, 0, 0]);
}

#[test]
fn test_quantize_with_padding_appends_transparent() {

    let img = two_tone(8, 4); // fully opaque
    let (_, palette, padding) = quantize_with_padding(&img, 256);

    assert_eq!(palette.len(), 3);
    assert_eq!(palette[padding as usize], [0, 0, 0, 0]);
}

#[test]
fn test_quantize_with_padding_reuses_existing_slot() {

    let mut img = two_tone(8, 4);
    img.set_pixel(0, 0, [0, 0, 0, 0]);
    let (_, palette, padding) = quantize_with_padding(&img, 256);

    assert_eq!(palette[padding as usize][3], 0);
    assert_eq!(palette.iter().filter(|c| c[3] == 0).count(), 1);
}

#[test]
fn test_solve_sequence_static_chain_single_palette_per_frame() {

    let img = two_tone(8, 4);
    let frames = vec![img.clone(), img.clone(), img];
    let seq = solve_sequence(&frames, 256);

    assert_eq!(seq.palettes.len(), 3);
    assert_eq!(seq.palettes[0], seq.palettes[1]);
    assert_eq!(seq.palettes[1], seq.palettes[2]);
}

#[test]
fn test_solve_sequence_fade_keeps_bitmap_constant() {

    // The same two-tone image fading out: one bitmap, animated palettes.
    let mut frames = Vec::new();
    for alpha in [255u8, 170, 85] {
        let mut img = two_tone(8, 4);
        for px in img.data.chunks_exact_mut(4) {
            px[3] = alpha;
        }
        frames.push(img);
    }
    let seq = solve_sequence(&frames, 256);

    assert!(seq.palettes[0].iter().any(|c| c[3] == 255));
    assert!(seq.palettes[2].iter().all(|c| c[3] == 85));
    // Pixels sharing a trajectory share an index across all frames.
    assert_eq!(seq.bitmap.data[0], seq.bitmap.data[1]);
    assert_ne!(seq.bitmap.data[0], seq.bitmap.data[7]);
}

#[test]
fn test_solve_sequence_single_frame_degenerates() {

    let seq = solve_sequence(&[two_tone(8, 4)], 64);

    assert_eq!(seq.palettes.len(), 1);
    // The padding contract guarantees a transparent entry.
    assert!(seq.palettes[0].iter().any(|c| c[3] == 0));
}

#[test]
fn test_diff_cluts_first_full_then_diffs() {

    let frame0 = vec![[255, 0, 0, 255], [0, 0, 255, 255]];
    let frame1 = vec![[255, 0, 0, 255], [0, 0, 255, 128]];
    let frame2 = frame1.clone();
    let cluts = diff_cluts(&[frame0, frame1, frame2], Colorspace::Bt709);

    assert_eq!(cluts.len(), 3);
    assert_eq!(cluts[0].len(), 2);
    // Only index 1 changed alpha between frames 0 and 1.
    assert_eq!(cluts[1].len(), 1);
    assert_eq!(cluts[1].entries[&1].alpha, 128);
    // Nothing changed between frames 1 and 2.
    assert!(cluts[2].is_empty());
}
