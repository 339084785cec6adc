/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! A window-on-buffer bundles the screen regions that share one decoder
//! window over the lifetime of an event run.

#[cfg(test)]
mod tests;

use crate::geometry::{Rect, ScreenRegion};
use crate::raster::Plane;

/// Hardware minimum window dimension.
pub const MIN_WINDOW_DIM: i32 = 8;

#[derive(Clone, Debug)]
pub struct WindowOnBuffer {
    pub srs: Vec<ScreenRegion>,
    pub duration: usize,
}

impl WindowOnBuffer {

    pub fn new(mut srs: Vec<ScreenRegion>, duration: usize) -> Self {
        srs.sort_by_key(|sr| sr.t);
        Self { srs, duration }
    }

    /// Tight hull of the contained regions, padded up to the hardware minimum
    /// of 8x8.
    pub fn window(&self) -> Rect {
        let hull = self
            .srs
            .iter()
            .fold(Rect::default(), |acc, sr| acc.union(&sr.rect));
        hull.pad_min(MIN_WINDOW_DIM)
    }

    pub fn area(&self) -> u64 {
        self.window().area()
    }

    /// Earliest frame at which any region becomes active.
    pub fn first_frame(&self) -> usize {
        self.srs.iter().map(|sr| sr.t).min().unwrap_or(0)
    }

    /// Per-frame composition presence. With `boolean`, frames are 0/1;
    /// otherwise each frame counts the active regions.
    pub fn event_mask(&self, boolean: bool) -> Vec<u16> {
        let mut mask = vec![0u16; self.duration];
        for sr in &self.srs {
            for frame in sr.t..sr.t2().min(self.duration) {
                if boolean {
                    mask[frame] = 1;
                } else {
                    mask[frame] += 1;
                }
            }
        }
        mask
    }

    /// Per-frame flag marking frames where at least one region starts. Rough:
    /// it catches false positives that the bitmap simulation filters out.
    pub fn update_mask(&self) -> Vec<u16> {
        let mut mask = vec![0u16; self.duration];
        for sr in &self.srs {
            debug_assert!(sr.dt > 0, "caught an empty event");
            if sr.t < self.duration {
                mask[sr.t] = 1;
            }
        }
        mask
    }

    /// Simulates per-frame compositing to find the frames where the window
    /// bitmap must be refreshed. Regions that never collide on the buffer can
    /// share a bitmap without artifacts.
    ///
    /// The running OR-buffer covers `main_box`. For each frame, a region whose
    /// start lies beyond the tracked `active_until` horizon, or whose pixels
    /// overlap the buffer by at least `overlap_threshold`, marks the frame and
    /// clears the buffer before being OR-ed back in.
    pub fn bitmap_update_mask(&self, main_box: &Rect, overlap_threshold: f64) -> Vec<u16> {

        assert!(
            (0.0..=1.0).contains(&overlap_threshold),
            "overlap threshold not within [0;1], got '{overlap_threshold}'"
        );

        let mut update_mask = vec![0u16; self.duration];
        let mut buffer = Plane::new(main_box.dx as usize, main_box.dy as usize);

        // Regions are kept ordered by time of appearance.
        let mut active_until: i64 = -1;
        for ctime in 0..self.duration {
            for sr in &self.srs {
                if !sr.active_at(ctime) {
                    continue;
                }
                let frame = sr.frame(ctime);
                let ox = (sr.rect.x - main_box.x) as usize;
                let oy = (sr.rect.y - main_box.y) as usize;

                let mut inter = 0u64;
                let mut total = 0u64;
                for y in 0..frame.height {
                    for x in 0..frame.width {
                        if frame.get(x, y) != 0 {
                            total += 1;
                            if buffer.get(ox + x, oy + y) != 0 {
                                inter += 1;
                            }
                        }
                    }
                }
                let percentage =
                    if total > 0 { inter as f64 / total as f64 } else { 0.0 };

                if sr.t as i64 > active_until || percentage >= overlap_threshold {
                    update_mask[ctime] = 1;
                    buffer.data.fill(0);
                }
                active_until = active_until.max(sr.t2() as i64);
                for y in 0..frame.height {
                    for x in 0..frame.width {
                        if frame.get(x, y) != 0 {
                            buffer.set(ox + x, oy + y, 1);
                        }
                    }
                }
            }
        }
        update_mask
    }
}
