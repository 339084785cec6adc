/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Temporal object segmentation. One analyzer per window consumes cropped
//! frames and chains perceptually similar ones into objects that share a
//! single object definition and animate through palette updates.

#[cfg(test)]
mod tests;

use crate::geometry::Rect;
use crate::raster::{ssim, RgbaImage};

/// A run of window-sized frames sharing one decoded object.
#[derive(Clone, Debug)]
pub struct PgObject {
    /// Stacked RGBA frames, all of window dimensions.
    pub gfx: Vec<RgbaImage>,
    /// Tight bounding box of non-transparent content across the run, relative
    /// to the window.
    pub bbox: Rect,
    /// Per-frame on-screen visibility; same length as `gfx`.
    pub mask: Vec<bool>,
    /// Index of the first frame of the run within the event run.
    pub f: usize,
}

impl PgObject {

    pub fn is_active(&self, frame: usize) -> bool {
        frame >= self.f && frame < self.f + self.mask.len()
    }

    pub fn is_visible(&self, frame: usize) -> bool {
        self.is_active(frame) && self.mask[frame - self.f]
    }

    /// Full decoded area of one frame (window dimensions).
    pub fn area(&self) -> u64 {
        self.gfx
            .first()
            .map(|g| (g.width * g.height) as u64)
            .unwrap_or(0)
    }
}

const DEFAULT_SSIM_THRESHOLD: f64 = 0.95;
const DEFAULT_OVERLAP_THRESHOLD: f64 = 0.995;

/// Streaming analyzer for one window, driven one frame per step.
///
/// Feed `Some(frame)` per event frame and a final `None`; whenever a run
/// boundary is detected the finished [PgObject] comes back. The analyzer
/// holds an alpha-composited accumulator of the current run against which
/// each new frame is scored.
pub struct WindowAnalyzer {
    ssim_threshold: f64,
    overlap_threshold: f64,
    alpha_compo: RgbaImage,
    width: usize,
    height: usize,
    frames: Vec<RgbaImage>,
    mask: Vec<bool>,
    f_start: usize,
    unseen: usize,
    event_cnt: usize,
}

impl WindowAnalyzer {

    pub fn new(width: usize, height: usize) -> Self {
        Self::with_thresholds(
            width,
            height,
            DEFAULT_SSIM_THRESHOLD,
            DEFAULT_OVERLAP_THRESHOLD,
        )
    }

    pub fn with_thresholds(
        width: usize,
        height: usize,
        ssim_threshold: f64,
        overlap_threshold: f64,
    ) -> Self {
        assert!(ssim_threshold < 1.0, "not a valid SSIM threshold");
        assert!(
            0.0 < overlap_threshold && overlap_threshold < 1.0,
            "not a valid overlap threshold"
        );
        Self {
            ssim_threshold,
            overlap_threshold,
            alpha_compo: RgbaImage::new(width, height),
            width,
            height,
            frames: Vec::new(),
            mask: Vec::new(),
            f_start: 0,
            unseen: 0,
            event_cnt: 0,
        }
    }

    /// Advances the analyzer by one frame; `None` terminates the stream and
    /// flushes the pending run, if any.
    pub fn push(&mut self, frame: Option<RgbaImage>) -> Option<PgObject> {

        let rgba = match frame {
            Some(rgba) => rgba,
            None => return self.flush(self.mask.len().saturating_sub(self.unseen)),
        };
        debug_assert!(rgba.width == self.width && rgba.height == self.height);

        let has_content = rgba.has_content();
        if !has_content && self.mask.is_empty() {
            // Nothing on screen and no open run.
            self.event_cnt += 1;
            return None;
        }

        if self.mask.is_empty() {
            self.f_start = self.event_cnt;
        }
        self.mask.push(has_content);

        let (score, cross_percentage) = self.compare(&rgba);
        let threshold = (self.ssim_threshold
            + (1.0 - self.ssim_threshold) * (1.0 - cross_percentage))
            .max(1.0);

        let emitted = if score >= threshold {
            self.alpha_compo.alpha_composite(&rgba);
            self.frames.push(rgba);
            None
        } else {
            // Run boundary: emit everything before the current frame, which
            // seeds the next run.
            let keep = self.mask.len() - 1 - self.unseen;
            let current_mask = self.mask[self.mask.len() - 1];
            let pgo = self.flush(keep);
            self.mask = vec![current_mask];
            self.f_start = self.event_cnt;
            self.alpha_compo = rgba.clone();
            self.frames = vec![rgba];
            pgo
        };

        self.unseen = if has_content { 0 } else { self.unseen + 1 };
        self.event_cnt += 1;
        emitted
    }

    fn flush(&mut self, mask_len: usize) -> Option<PgObject> {

        if self.frames.is_empty() {
            return None;
        }
        let bbox = self.alpha_compo.alpha_bbox().unwrap_or_default();
        let mut gfx = std::mem::take(&mut self.frames);
        let mut mask = std::mem::take(&mut self.mask);
        mask.truncate(mask_len);
        gfx.truncate(mask.len());
        self.alpha_compo = RgbaImage::new(self.width, self.height);
        self.unseen = 0;
        Some(PgObject { gfx, bbox, mask, f: self.f_start })
    }

    /// Scores the new frame against the accumulator: the fraction of pixels
    /// agreeing on alpha presence, and SSIM on the luma of the crossing area
    /// when that fraction is inconclusive.
    fn compare(&self, current: &RgbaImage) -> (f64, f64) {

        let n = (self.width * self.height) as f64;
        let mut inters = 0u64;
        let mut inters_inv = 0u64;
        for (a, b) in self
            .alpha_compo
            .data
            .chunks_exact(4)
            .zip(current.data.chunks_exact(4))
        {
            match (a[3] != 0, b[3] != 0) {
                (true, true) => inters += 1,
                (false, false) => inters_inv += 1,
                _ => {}
            }
        }
        let overlap = if inters > 0 {
            (inters + inters_inv) as f64 / n
        } else {
            0.0
        };

        if overlap >= self.overlap_threshold || overlap == 0.0 {
            // Perfect or zero overlap: the frame fits the previous bitmap.
            return (1.0, 1.0);
        }

        // Mask the accumulator by the crossing alpha before comparing luma.
        let mut masked = self.alpha_compo.clone();
        for (m, c) in masked
            .data
            .chunks_exact_mut(4)
            .zip(current.data.chunks_exact(4))
        {
            if m[3] == 0 || c[3] == 0 {
                m.fill(0);
            }
        }
        let score = ssim(&masked.grayscale(), &current.grayscale());
        let cross_percentage = inters as f64 / n;
        (score, cross_percentage)
    }
}
