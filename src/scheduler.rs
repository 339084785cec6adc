/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Acquisition scheduling: for every event decide whether the decoder has
//! time to re-define objects in full, or whether only the palette can change.

#[cfg(test)]
mod tests;

use crate::compile::Event;
use crate::geometry::Rect;
use crate::segment::CompositionState;
use crate::segmenter::PgObject;
use crate::timing::PgDecoder;

/// Per-event frame timing: the event's length and its gap from the previous
/// event's end, both in frames.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct EventTiming {
    pub dt: u32,
    pub delay: u32,
}

/// Frame lengths and inter-event gaps for an event run.
pub fn durations(events: &[Event]) -> Vec<EventTiming> {

    let mut top = events.first().map(|ev| ev.tc_in).unwrap_or(0);
    let mut out = Vec::with_capacity(events.len());
    for event in events {
        out.push(EventTiming {
            dt: event.tc_out - event.tc_in,
            delay: event.tc_in - top,
        });
        top = event.tc_out;
    }
    out
}

/// The raw feasibility scan over an event run.
#[derive(Clone, Debug, Default)]
pub struct AcquisitionScan {
    /// Whether a full acquisition fits the margin before each event.
    pub valid: Vec<bool>,
    /// Whether a new object forces an acquisition at each event.
    pub absolutes: Vec<bool>,
    /// Timing slack `1 - td/margin` per event.
    pub dtl: Vec<f64>,
}

/// Scans the per-window objects against the decoder model.
///
/// The margin before event `k` is the gap plus the previous event's length;
/// the decode-display time covers a wipe of all windows, the decode of every
/// on-screen object and the copy of its visible area (its full area in
/// compatibility mode).
pub fn find_acquisitions(
    pgobjs: &[Vec<PgObject>],
    windows: &[Rect],
    timings: &[EventTiming],
    fps: f64,
    compat_mode: bool,
) -> AcquisitionScan {

    let gp_clear_dur =
        PgDecoder::copy_gp_duration(windows.iter().map(|w| w.area()).sum());

    let mut scan = AcquisitionScan {
        valid: vec![false; timings.len()],
        absolutes: vec![false; timings.len()],
        dtl: vec![0.0; timings.len()],
    };

    let mut pending: Vec<&[PgObject]> = pgobjs.iter().map(|objs| objs.as_slice()).collect();
    let mut current: Vec<Option<&PgObject>> = vec![None; pgobjs.len()];

    let mut prev_dt = 6u32;
    for (k, timing) in timings.iter().enumerate() {
        let margin = (timing.delay + prev_dt) as f64 / fps;
        let mut force_acq = false;

        for wid in 0..windows.len() {
            if current[wid].map_or(false, |obj| !obj.is_active(k)) {
                current[wid] = None;
            }
            if let Some((head, rest)) = pending[wid].split_first() {
                if current[wid].is_none() && head.is_active(k) {
                    current[wid] = Some(head);
                    pending[wid] = rest;
                    force_acq = true;
                }
            }
        }

        let active: Vec<&PgObject> =
            current.iter().flatten().copied().collect();
        let areas: Vec<u64> = active
            .iter()
            .map(|obj| obj.area() * obj.is_visible(k) as u64)
            .collect();
        let copy_areas: Vec<u64> = if compat_mode {
            areas.clone()
        } else {
            active
                .iter()
                .map(|obj| obj.bbox.area() * obj.is_visible(k) as u64)
                .collect()
        };

        let td = PgDecoder::decode_display_duration(gp_clear_dur, &areas, &copy_areas);
        scan.valid[k] = td < margin;
        scan.dtl[k] = 1.0 - td / margin;
        scan.absolutes[k] = force_acq;
        prev_dt = timing.dt;
    }
    scan
}

/// Decides each event's composition state.
///
/// The first event opens the epoch. Later events acquire when forced by a new
/// object, or when the slack clears a quality bar that decays with every
/// palette-only update (the drought), so long refresh-less stretches
/// eventually re-acquire.
pub fn schedule(
    scan: &AcquisitionScan,
    quality_factor: f64,
    dquality_factor: f64,
    refresh_rate: f64,
) -> Vec<CompositionState> {

    let refresh_rate = refresh_rate.clamp(0.0, 1.0);
    let mut states = vec![CompositionState::Normal; scan.valid.len()];
    if states.is_empty() {
        return states;
    }
    states[0] = CompositionState::EpochStart;

    let mut drought = 0.0f64;
    for k in 1..states.len() {
        let bar = (quality_factor - dquality_factor * drought).max(0.0);
        if scan.absolutes[k] || (scan.valid[k] && scan.dtl[k] > bar) {
            states[k] = CompositionState::AcquisitionPoint;
            drought = 0.0;
        } else {
            // Hold back acquisitions to keep the stream small.
            drought += refresh_rate;
        }
    }
    states
}
