/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Palette quantization. Single images quantize to at most `n_colors` RGBA
//! entries; frame chains quantize temporally, clustering pixels by their color
//! trajectory so a static bitmap can animate through palette updates alone.

#[cfg(test)]
mod tests;

use std::collections::HashMap;

use crate::palette::{rgba_to_entry, Colorspace, Palette};
use crate::raster::RgbaImage;

/// A bitmap of 8-bit palette indices.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IndexedBitmap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl IndexedBitmap {

    /// Shifts every index up by `offset`, moving the bitmap into the upper
    /// half of a shared CLUT.
    pub fn offset(&mut self, offset: u8) {
        for v in self.data.iter_mut() {
            *v += offset;
        }
    }
}

/// The outcome of temporal quantization over a frame chain.
#[derive(Clone, Debug)]
pub struct SequenceQuant {
    pub bitmap: IndexedBitmap,
    /// One palette per frame; `palettes[f][i]` colors index `i` at frame `f`.
    pub palettes: Vec<Vec<[u8; 4]>>,
}

fn canonical(px: [u8; 4]) -> [u8; 4] {
    if px[3] == 0 { [0, 0, 0, 0] } else { px }
}

fn posterize(px: [u8; 4], shift: u32) -> [u8; 4] {
    let m = 0xFFu8 << shift.min(7) as u8;
    if shift >= 8 {
        return [0, 0, 0, 0];
    }
    canonical([px[0] & m, px[1] & m, px[2] & m, px[3] & m])
}

/// Quantizes one RGBA image down to at most `n_colors` entries.
///
/// Exact colors are kept when they fit; otherwise channel precision is shaved
/// until the count fits, and each bucket takes the average of the original
/// colors it absorbed. Fully transparent pixels always collapse to one
/// `(0,0,0,0)` bucket. The result is deterministic: indices are assigned in
/// first-seen scan order.
pub fn quantize(img: &RgbaImage, n_colors: usize) -> (IndexedBitmap, Vec<[u8; 4]>) {

    debug_assert!(n_colors >= 1);

    for shift in 0..=8u32 {
        let mut order: Vec<[u8; 4]> = Vec::new();
        let mut slots: HashMap<[u8; 4], u8> = HashMap::new();
        let mut indices = Vec::with_capacity(img.width * img.height);
        let mut overflow = false;

        for px in img.data.chunks_exact(4) {
            let key = posterize([px[0], px[1], px[2], px[3]], shift);
            let next = order.len();
            let slot = *slots.entry(key).or_insert_with(|| {
                order.push(key);
                next as u8
            });
            if order.len() > n_colors {
                overflow = true;
                break;
            }
            indices.push(slot);
        }
        if overflow {
            continue;
        }

        // Average the absorbed colors per bucket.
        let mut sums = vec![[0u64; 4]; order.len()];
        let mut counts = vec![0u64; order.len()];
        for (px, &slot) in img.data.chunks_exact(4).zip(indices.iter()) {
            let c = canonical([px[0], px[1], px[2], px[3]]);
            for k in 0..4 {
                sums[slot as usize][k] += c[k] as u64;
            }
            counts[slot as usize] += 1;
        }
        let palette = order
            .iter()
            .enumerate()
            .map(|(slot, key)| {
                if *key == [0, 0, 0, 0] {
                    return [0, 0, 0, 0];
                }
                let n = counts[slot].max(1);
                [
                    ((sums[slot][0] + n / 2) / n) as u8,
                    ((sums[slot][1] + n / 2) / n) as u8,
                    ((sums[slot][2] + n / 2) / n) as u8,
                    ((sums[slot][3] + n / 2) / n) as u8,
                ]
            })
            .collect();

        let bitmap =
            IndexedBitmap { width: img.width, height: img.height, data: indices };
        return (bitmap, palette);
    }
    unreachable!("posterization always converges to a single bucket")
}

/// Quantizes an image while guaranteeing a fully transparent padding entry.
///
/// Quantizers are not assumed to reserve transparency: when the palette comes
/// back full without a transparent slot, the image is re-quantized with one
/// color less until a slot can be found or appended. Returns the bitmap, the
/// palette and the index of the transparent entry.
pub fn quantize_with_padding(
    img: &RgbaImage,
    n_colors: usize,
) -> (IndexedBitmap, Vec<[u8; 4]>, u8) {

    let mut k = 0;
    loop {
        let (bitmap, mut palette) = quantize(img, n_colors - k);
        if let Some(idx) = palette.iter().position(|c| c[3] == 0) {
            return (bitmap, palette, idx as u8);
        }
        if palette.len() < n_colors {
            palette.push([0, 0, 0, 0]);
            let idx = (palette.len() - 1) as u8;
            return (bitmap, palette, idx);
        }
        k += 1;
    }
}

/// Temporally quantizes a chain of equally sized frames.
///
/// Pixels are clustered by their color trajectory across the chain; every
/// cluster becomes one palette index whose per-frame colors replay the
/// trajectory. A single-frame chain degenerates to plain quantization with a
/// guaranteed transparent entry.
pub fn solve_sequence(frames: &[RgbaImage], n_colors: usize) -> SequenceQuant {

    debug_assert!(!frames.is_empty());
    let (width, height) = (frames[0].width, frames[0].height);
    debug_assert!(frames.iter().all(|f| f.width == width && f.height == height));

    if frames.len() == 1 {
        let (bitmap, palette, _) = quantize_with_padding(&frames[0], n_colors);
        return SequenceQuant { bitmap, palettes: vec![palette] };
    }

    for shift in 0..=8u32 {
        let mut order: Vec<Vec<[u8; 4]>> = Vec::new();
        let mut slots: HashMap<Vec<[u8; 4]>, u8> = HashMap::new();
        let mut indices = Vec::with_capacity(width * height);
        let mut overflow = false;

        for p in 0..width * height {
            let key: Vec<[u8; 4]> = frames
                .iter()
                .map(|f| {
                    let px = [
                        f.data[p * 4],
                        f.data[p * 4 + 1],
                        f.data[p * 4 + 2],
                        f.data[p * 4 + 3],
                    ];
                    posterize(px, shift)
                })
                .collect();
            let next = order.len();
            let slot = *slots.entry(key.clone()).or_insert_with(|| {
                order.push(key);
                next as u8
            });
            if order.len() > n_colors {
                overflow = true;
                break;
            }
            indices.push(slot);
        }
        if overflow {
            continue;
        }

        // Per-frame bucket averages over the original colors.
        let n_frames = frames.len();
        let mut sums = vec![[0u64; 4]; order.len() * n_frames];
        let mut counts = vec![0u64; order.len()];
        for (p, &slot) in indices.iter().enumerate() {
            counts[slot as usize] += 1;
            for (f, frame) in frames.iter().enumerate() {
                let c = canonical([
                    frame.data[p * 4],
                    frame.data[p * 4 + 1],
                    frame.data[p * 4 + 2],
                    frame.data[p * 4 + 3],
                ]);
                let s = &mut sums[slot as usize * n_frames + f];
                for k in 0..4 {
                    s[k] += c[k] as u64;
                }
            }
        }

        let palettes = (0..n_frames)
            .map(|f| {
                (0..order.len())
                    .map(|slot| {
                        let n = counts[slot].max(1);
                        let s = sums[slot * n_frames + f];
                        let avg = [
                            ((s[0] + n / 2) / n) as u8,
                            ((s[1] + n / 2) / n) as u8,
                            ((s[2] + n / 2) / n) as u8,
                            ((s[3] + n / 2) / n) as u8,
                        ];
                        canonical(avg)
                    })
                    .collect()
            })
            .collect();

        let bitmap = IndexedBitmap { width, height, data: indices };
        return SequenceQuant { bitmap, palettes };
    }
    unreachable!("posterization always converges to a single trajectory")
}

/// Converts a chain of absolute RGBA palettes into CLUT updates: the first
/// palette in full, then per-frame diffs against the preceding frame.
pub fn diff_cluts(palettes: &[Vec<[u8; 4]>], matrix: Colorspace) -> Vec<Palette> {

    let mut out: Vec<Palette> = Vec::with_capacity(palettes.len());
    let mut prev: Option<Palette> = None;

    for rgba in palettes {
        let full = Palette {
            entries: rgba
                .iter()
                .enumerate()
                .map(|(i, &c)| (i as u8, rgba_to_entry(c, matrix)))
                .collect(),
        };
        match &prev {
            None => out.push(full.clone()),
            Some(p) => out.push(full.diff(p)),
        }
        prev = Some(full);
    }
    out
}
