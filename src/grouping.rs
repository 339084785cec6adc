/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Window layout discovery. From the temporal stack of event alpha masks,
//! derive at most two windows covering all visible pixels, minimizing either
//! the total window area or the number of full refreshes.

#[cfg(test)]
mod tests;

use log::warn;

use crate::compile::Event;
use crate::geometry::{Rect, ScreenRegion};
use crate::raster::{gaussian_blur, label_plane, label_volume, Component3, Plane, Volume};
use crate::wob::WindowOnBuffer;
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for layout discovery.
pub type GroupResult<T> = Result<T, GroupError>;

/// The error type for [GroupingEngine].
#[derive(ThisError, Debug)]
pub enum GroupError {
    /// The event run is empty; the caller fed a hollow epoch.
    #[error("no events given")]
    EmptyEventRun,
}

/// Window selection strategy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LayoutMode {
    /// Keep the pair of windows with the minimum summed area.
    #[default]
    SmallestWindows,
    /// Among the smallest candidates, keep the pair refreshing the least
    /// pixels over the run.
    LeastAcquisitions,
}

const MAX_FLAT_REGIONS: usize = 16;
const MAX_TRIALS: usize = 15;
const BLUR_GROWTH: f64 = 1.5;
const BLUR_THRESHOLD: f64 = 0.25;

/// Derives window layouts for an event run.
pub struct GroupingEngine {
    n_groups: usize,
    candidates: usize,
    mode: LayoutMode,
    blur_mul: f64,
    blur_const: f64,
}

impl GroupingEngine {

    pub fn new(
        n_groups: usize,
        candidates: usize,
        mode: LayoutMode,
        blur_mul: f64,
        blur_const: f64,
    ) -> Self {
        assert!(
            (1..=2).contains(&n_groups),
            "grouping engine expects 1 or 2 groups, not '{n_groups}'"
        );
        Self { n_groups, candidates, mode, blur_mul, blur_const }
    }

    /// Groups an event run into window-on-buffer sets, plus the run's union
    /// bounding box in screen coordinates. Regions and windows inside the
    /// returned sets are expressed relative to that box.
    pub fn group(&self, events: &[Event]) -> GroupResult<(Vec<WindowOnBuffer>, Rect)> {

        if events.is_empty() {
            return Err(GroupError::EmptyEventRun);
        }

        let bbox = events
            .iter()
            .fold(Rect::default(), |acc, ev| acc.union(&ev.rect()));
        let duration = events.len();

        let mut blur_mul = self.blur_mul;
        let mut blur_const = self.blur_const;
        let mut layouts = None;
        let mut last_regions = Vec::new();

        for _ in 0..MAX_TRIALS {
            let (components, origs) = coarse_grouping(events, &bbox, blur_const, blur_mul);
            let regions: Vec<ScreenRegion> = components
                .into_iter()
                .map(|component| tighten(component, &origs))
                .collect();
            last_regions = regions.clone();

            match self.group_and_sort_flat(regions, &bbox, duration) {
                Some(found) => {
                    layouts = Some(found);
                    break;
                }
                None => {
                    // Too many flat regions; larger blur merges nearby specks.
                    blur_mul *= BLUR_GROWTH;
                    blur_const *= BLUR_GROWTH;
                }
            }
        }

        let layouts = match layouts {
            Some(layouts) => layouts,
            None => {
                warn!("grouping engine giving up optimising layout, using a single window");
                vec![vec![WindowOnBuffer::new(last_regions, duration)]]
            }
        };

        Ok((self.select_best(layouts, &bbox), bbox))
    }

    /// Projects the regions onto the screen plane and buckets them by flat
    /// connected component, then enumerates the two-window partitions.
    /// `None` signals an overflow of flat components.
    fn group_and_sort_flat(
        &self,
        regions: Vec<ScreenRegion>,
        bbox: &Rect,
        duration: usize,
    ) -> Option<Vec<Vec<WindowOnBuffer>>> {

        let mut screen = Plane::new(bbox.dx as usize, bbox.dy as usize);
        for sr in &regions {
            for y in sr.rect.y..sr.rect.y2() {
                for x in sr.rect.x..sr.rect.x2() {
                    screen.set(x as usize, y as usize, 1);
                }
            }
        }

        let (labels, components) = label_plane(&screen);

        if components.len() == 1 {
            return Some(vec![vec![WindowOnBuffer::new(regions, duration)]]);
        }
        if components.len() > MAX_FLAT_REGIONS {
            return None;
        }

        let mut buckets: Vec<Vec<ScreenRegion>> = vec![Vec::new(); components.len()];
        for sr in regions {
            let lbl =
                labels[sr.rect.y as usize * screen.width + sr.rect.x as usize];
            debug_assert!(lbl != 0, "region projects outside every flat component");
            buckets[lbl as usize - 1].push(sr);
        }

        Some(self.partitions(buckets, duration))
    }

    /// All two-subset partitions of the flat buckets, ascending by summed
    /// hull area. Each unordered partition appears once: the subset holding
    /// bucket 0 stands for the pair.
    fn partitions(
        &self,
        buckets: Vec<Vec<ScreenRegion>>,
        duration: usize,
    ) -> Vec<Vec<WindowOnBuffer>> {

        let n = buckets.len();
        if n == 1 || self.n_groups == 1 {
            let srs = buckets.into_iter().flatten().collect();
            return vec![vec![WindowOnBuffer::new(srs, duration)]];
        }

        let mut layouts: Vec<(u64, Vec<WindowOnBuffer>)> = Vec::new();
        for mask in 0..(1u32 << n) - 1 {
            if mask & 1 == 0 {
                continue;
            }
            let mut first: Vec<ScreenRegion> = Vec::new();
            let mut second: Vec<ScreenRegion> = Vec::new();
            for (k, bucket) in buckets.iter().enumerate() {
                let target = if mask & (1 << k) != 0 { &mut first } else { &mut second };
                target.extend(bucket.iter().cloned());
            }
            let pair = vec![
                WindowOnBuffer::new(first, duration),
                WindowOnBuffer::new(second, duration),
            ];
            let area: u64 = pair.iter().map(|wob| wob.area()).sum();
            layouts.push((area, pair));
        }

        layouts.sort_by_key(|(area, _)| *area);
        layouts.into_iter().map(|(_, pair)| pair).collect()
    }

    /// Applies the configured selection mode over the sorted candidates.
    fn select_best(
        &self,
        layouts: Vec<Vec<WindowOnBuffer>>,
        bbox: &Rect,
    ) -> Vec<WindowOnBuffer> {

        match self.mode {
            LayoutMode::SmallestWindows => {
                let mut best = layouts.into_iter().next().unwrap_or_default();
                best.sort_by_key(|wob| wob.first_frame());
                best
            }
            LayoutMode::LeastAcquisitions => {
                let main = Rect::new(0, 0, bbox.dx, bbox.dy);
                let mut best: Option<(u64, Vec<WindowOnBuffer>)> = None;
                for layout in layouts.into_iter().take(self.candidates.max(1)) {
                    let refreshed: u64 = layout
                        .iter()
                        .map(|wob| {
                            let updates: u64 = wob
                                .bitmap_update_mask(&main, 0.0)
                                .iter()
                                .map(|&v| v as u64)
                                .sum();
                            wob.area() * updates
                        })
                        .sum();
                    if best.as_ref().map_or(true, |(score, _)| refreshed < *score) {
                        best = Some((refreshed, layout));
                    }
                }
                best.map(|(_, layout)| layout).unwrap_or_default()
            }
        }
    }
}

/// Blurs, thresholds and stacks the event alpha masks, then extracts the 3-D
/// connected components. Also returns the un-blurred alpha volume used for
/// tightening. All coordinates are relative to `bbox`.
fn coarse_grouping(
    events: &[Event],
    bbox: &Rect,
    blur_const: f64,
    blur_mul: f64,
) -> (Vec<Component3>, Volume) {

    let (w, h) = (bbox.dx as usize, bbox.dy as usize);
    let ratio_woh = (w as f64 / h as f64).min(1.3);
    let ratio_how = (h as f64 / w as f64).min(1.0);
    let sigma_y = blur_const + blur_mul * ratio_how;
    let sigma_x = blur_const + blur_mul * ratio_woh;

    let mut graph = Volume::new(events.len(), w, h);
    let mut origs = Volume::new(events.len(), w, h);

    for (k, event) in events.iter().enumerate() {
        let alpha = event.img.alpha_plane();
        let blurred = gaussian_blur(&alpha, sigma_y, sigma_x);
        let ox = (event.x as i32 - bbox.x) as usize;
        let oy = (event.y as i32 - bbox.y) as usize;
        for y in 0..alpha.height {
            for x in 0..alpha.width {
                if blurred[y * alpha.width + x] * 255.0 > BLUR_THRESHOLD {
                    graph.set(k, ox + x, oy + y, 1);
                }
                origs.set(k, ox + x, oy + y, alpha.get(x, y));
            }
        }
    }

    (label_volume(&graph), origs)
}

/// Crops a component's bounds inward to the un-blurred alpha and replaces its
/// mask with the intersection of the blurred mask and that alpha.
fn tighten(component: Component3, origs: &Volume) -> ScreenRegion {

    let rect = component.rect;
    let (t0, t1) = (component.t0, component.t1);

    // Blur halo masked out against the original alpha.
    let masked: Vec<Plane> = component
        .frames
        .iter()
        .enumerate()
        .map(|(i, frame)| {
            let mut plane = Plane::new(rect.dx as usize, rect.dy as usize);
            for y in 0..plane.height {
                for x in 0..plane.width {
                    let ax = rect.x as usize + x;
                    let ay = rect.y as usize + y;
                    if frame.get(x, y) != 0 && origs.get(t0 + i, ax, ay) != 0 {
                        plane.set(x, y, 1);
                    }
                }
            }
            plane
        })
        .collect();

    let col_empty = |x: usize| {
        masked.iter().all(|p| (0..p.height).all(|y| p.get(x, y) == 0))
    };
    let row_empty = |y: usize| {
        masked.iter().all(|p| (0..p.width).all(|x| p.get(x, y) == 0))
    };

    let w = rect.dx as usize;
    let h = rect.dy as usize;
    let mut x0 = 0;
    while x0 + 1 < w && col_empty(x0) {
        x0 += 1;
    }
    let mut x1 = w;
    while x1 > x0 + 1 && col_empty(x1 - 1) {
        x1 -= 1;
    }
    let mut y0 = 0;
    while y0 + 1 < h && row_empty(y0) {
        y0 += 1;
    }
    let mut y1 = h;
    while y1 > y0 + 1 && row_empty(y1 - 1) {
        y1 -= 1;
    }

    let tight = Rect::new(
        rect.x + x0 as i32,
        rect.y + y0 as i32,
        (x1 - x0) as i32,
        (y1 - y0) as i32,
    );
    let crop = Rect::new(x0 as i32, y0 as i32, tight.dx, tight.dy);
    let frames = masked.iter().map(|p| p.crop(&crop)).collect();

    ScreenRegion {
        rect: tight,
        t: t0,
        dt: t1 - t0,
        label: component.label,
        frames,
    }
}
