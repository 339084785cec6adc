/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! The fixed PG decoder model and timestamp assignment. Decode and copy
//! durations derive from the patent's transfer rates; all segment-level
//! durations round up to whole 90 kHz ticks.


use std::collections::BTreeMap;

use crate::displayset::DisplaySet;
use crate::segment::{CompositionState, Crop, Segment};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for timestamping.
pub type TimingResult<T> = Result<T, TimingError>;

/// The error type for timestamp assignment. All of these mark
/// stream-construction bugs.
#[derive(ThisError, Debug)]
pub enum TimingError {
    /// An object ID is bound twice with different dimensions, or the decoded
    /// object buffer capacity is exhausted.
    #[error("object buffer allocation conflict for object {object_id}")]
    BufferAllocationConflict {
        object_id: u16,
    },
    /// A composition references an object absent from the buffer.
    #[error("composition references unknown object {object_id}")]
    UnknownObject {
        object_id: u16,
    },
    /// A palette update display set carries object definitions.
    #[error("palette update display set carries object definitions")]
    MalformedDisplaySet,
    /// A computed DTS exceeds its segment's PTS.
    #[error("computed DTS exceeds PTS")]
    InconsistentTimestamps,
}

/// The PG decoder's fixed rates and buffer sizes.
pub struct PgDecoder;

impl PgDecoder {

    /// The segment clock, in Hz.
    pub const FREQ: f64 = 90_000.0;
    /// Transport rate into the coded buffer, bytes per second.
    pub const RX: f64 = (16 * 1024 * 1024) as f64;
    /// Decode rate out of the coded buffer, pixels per second.
    pub const RD: f64 = (16 * 1024 * 1024) as f64;
    /// Graphics-plane copy rate, pixels per second.
    pub const RC: f64 = (32 * 1024 * 1024) as f64;
    /// Decoded object buffer capacity, bytes.
    pub const DECODED_BUF_SIZE: u64 = 4 * 1024 * 1024;
    /// Coded object buffer capacity, bytes.
    pub const CODED_BUF_SIZE: u64 = 1024 * 1024;

    /// Seconds needed to clear `area` pixels of graphics plane.
    pub fn copy_gp_duration(area: u64) -> f64 {
        area as f64 / Self::RC
    }

    /// Seconds needed to decode the given object areas and copy the visible
    /// areas to the plane, starting from a plane wipe of `gp_clear_dur`.
    pub fn decode_display_duration(
        gp_clear_dur: f64,
        areas: &[u64],
        copy_areas: &[u64],
    ) -> f64 {
        let decode: f64 = areas.iter().map(|&a| a as f64 / Self::RD).sum();
        let copy: f64 = copy_areas.iter().map(|&a| a as f64 / Self::RC).sum();
        gp_clear_dur.max(decode) + copy
    }
}

/// Maps a frame rate to the PCS frame-rate code.
pub fn frame_rate_code(fps: f64) -> u8 {
    const LUT: [(f64, u8); 7] = [
        (23.976, 0x10),
        (24.0, 0x20),
        (25.0, 0x30),
        (29.97, 0x40),
        (30.0, 0x50),
        (50.0, 0x60),
        (59.94, 0x70),
    ];
    LUT.iter()
        .find(|(rate, _)| (fps - rate).abs() < 0.01)
        .map(|&(_, code)| code)
        .unwrap_or(0x10)
}

/// Tracks the decoder's per-epoch object allocations: object ID to decoded
/// dimensions, bounded by [`PgDecoder::DECODED_BUF_SIZE`].
#[derive(Debug, Default)]
pub struct PgObjectBuffer {
    slots: BTreeMap<u16, (u16, u16)>,
}

impl PgObjectBuffer {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u16) -> Option<(u16, u16)> {
        self.slots.get(&id).copied()
    }

    fn used(&self) -> u64 {
        self.slots
            .values()
            .map(|&(h, w)| h as u64 * w as u64)
            .sum()
    }

    /// Binds `id` to `(height, width)`. Fails when the id is already bound to
    /// a different shape or the buffer would overflow.
    pub fn allocate_id(&mut self, id: u16, height: u16, width: u16) -> TimingResult<()> {
        if let Some(shape) = self.get(id) {
            if shape != (height, width) {
                return Err(TimingError::BufferAllocationConflict { object_id: id });
            }
            return Ok(());
        }
        let area = height as u64 * width as u64;
        if self.used() + area > PgDecoder::DECODED_BUF_SIZE {
            return Err(TimingError::BufferAllocationConflict { object_id: id });
        }
        self.slots.insert(id, (height, width));
        Ok(())
    }
}

fn ticks(seconds_area_rate: f64) -> i64 {
    seconds_area_rate.ceil() as i64
}

fn decode_ticks(height: u16, width: u16) -> i64 {
    ticks(height as f64 * width as f64 * PgDecoder::FREQ / PgDecoder::RD)
}

fn copy_ticks(area: u64) -> i64 {
    ticks(area as f64 * PgDecoder::FREQ / PgDecoder::RC)
}

/// Assigns decode and presentation timestamps to a display set.
///
/// On entry every segment's PTS holds the desired on-screen time in 90 kHz
/// ticks; the function shifts decode times backwards from there under the
/// decoder model. `single_plane_write` selects the patent's reading that two
/// objects sharing a window are written to the plane in one pass; otherwise
/// both copy durations are charged.
pub fn set_pts_dts(
    ds: &mut DisplaySet,
    buffer: &mut PgObjectBuffer,
    single_plane_write: bool,
) -> TimingResult<()> {

    let pcs = ds.pcs().clone();
    let presentation_pts = pcs.pts as i64;

    if pcs.palette_update_only {
        if ds.ods().next().is_some() {
            return Err(TimingError::MalformedDisplaySet);
        }
        // Palette-only updates re-evaluate the plane through a new CLUT; no
        // decode or copy time is charged.
        for seg in ds.segments.iter_mut() {
            seg.set_pts_dts(pcs.pts, pcs.pts);
        }
        return Ok(());
    }

    // Decode durations per object, keyed by the first portion of each
    // sequence; allocation happens here so shape conflicts surface early.
    let mut ddurs: BTreeMap<u16, i64> = BTreeMap::new();
    for ods in ds.ods() {
        if ods.is_first() {
            if ddurs.contains_key(&ods.id) {
                return Err(TimingError::BufferAllocationConflict { object_id: ods.id });
            }
            if let Some(shape) = buffer.get(ods.id) {
                if shape != (ods.height, ods.width) {
                    return Err(TimingError::BufferAllocationConflict {
                        object_id: ods.id,
                    });
                }
            } else {
                buffer.allocate_id(ods.id, ods.height, ods.width)?;
            }
            ddurs.insert(ods.id, decode_ticks(ods.height, ods.width));
        }
    }

    let mut t_copy_window: i64 = 0;
    let mut t_decoding: i64 = 0;
    let mut decode_duration: i64;

    if let Some(wds) = ds.wds() {
        let windows: BTreeMap<u8, (u16, u16)> = wds
            .windows
            .iter()
            .map(|wd| (wd.id, (wd.height, wd.width)))
            .collect();

        // An epoch start wipes the whole graphics plane; later refreshes only
        // wipe the windows.
        let wipe_duration = if pcs.composition_state == CompositionState::EpochStart {
            ticks(pcs.width as f64 * pcs.height as f64 * PgDecoder::FREQ / PgDecoder::RC)
        } else {
            windows
                .values()
                .map(|&(h, w)| copy_ticks(h as u64 * w as u64))
                .sum()
        };

        decode_duration = wipe_duration;
        let mut object_decode_duration = ddurs.clone();
        let two_same_window = pcs.composition_objects.len() == 2
            && pcs.composition_objects[0].window_id
                == pcs.composition_objects[1].window_id;

        for (k, cobj) in pcs.composition_objects.iter().enumerate() {
            let (h, w) = buffer
                .get(cobj.object_id)
                .ok_or(TimingError::UnknownObject { object_id: cobj.object_id })?;
            let area = match &cobj.crop {
                Some(Crop { width, height, .. }) => *width as u64 * *height as u64,
                None => h as u64 * w as u64,
            };
            // The plane takes at most the window area.
            let window_area = windows
                .get(&cobj.window_id)
                .map(|&(wh, ww)| wh as u64 * ww as u64)
                .unwrap_or(area);
            let copy_dur = copy_ticks(area.min(window_area));

            t_decoding += object_decode_duration.remove(&cobj.object_id).unwrap_or(0);

            if two_same_window && single_plane_write && k == 0 {
                // Patent reading: one plane write covers both objects.
                continue;
            }
            t_copy_window += copy_dur;
            decode_duration = decode_duration.max(t_decoding) + copy_dur;
        }

        if two_same_window && !single_plane_write {
            // Worst-case reading: both copies are charged back to back, so
            // any overlapping area is counted twice.
            decode_duration = t_decoding + t_copy_window;
        }

        // Objects defined now but composed later still spend decode time.
        if !object_decode_duration.is_empty() {
            t_decoding += object_decode_duration.values().sum::<i64>();
            decode_duration = decode_duration.max(t_decoding);
        }
    } else if ds.ods().next().is_some() {
        // Definitions without a display refresh.
        decode_duration = ddurs.values().sum();
        t_decoding = decode_duration;
    } else {
        decode_duration = 0;
    }

    let pcs_dts = presentation_pts - decode_duration;
    let mut end_of_block = pcs_dts;
    let ods_pairs: Vec<(i64, i64)> = ds
        .ods()
        .map(|ods| {
            if ods.is_first() {
                let block_dts = end_of_block;
                end_of_block = block_dts + ddurs.get(&ods.id).copied().unwrap_or(0);
                (end_of_block, block_dts)
            } else {
                (end_of_block, end_of_block - ddurs.get(&ods.id).copied().unwrap_or(0))
            }
        })
        .collect();

    let end_ts = pcs_dts + t_decoding;
    let mut ods_iter = ods_pairs.into_iter();
    for seg in ds.segments.iter_mut() {
        match seg {
            Segment::PresentationComposition(pcs) => {
                pcs.dts = pcs_dts as u32;
            }
            Segment::WindowDefinition(wds) => {
                wds.dts = pcs_dts as u32;
                wds.pts = (presentation_pts - t_copy_window) as u32;
            }
            Segment::PaletteDefinition(pds) => {
                pds.pts = pcs_dts as u32;
                pds.dts = pcs_dts as u32;
            }
            Segment::ObjectDefinition(ods) => {
                let (pts, dts) = ods_iter.next().unwrap_or((pcs_dts, pcs_dts));
                ods.pts = pts as u32;
                ods.dts = dts as u32;
            }
            Segment::End(es) => {
                es.pts = end_ts as u32;
                es.dts = end_ts as u32;
            }
        }
    }

    // The decoder model guarantees PTS >= DTS; anything else is a bug here.
    for seg in &ds.segments {
        if (seg.pts() as i64) < (seg.dts() as i64) {
            return Err(TimingError::InconsistentTimestamps);
        }
    }

    Ok(())
}
