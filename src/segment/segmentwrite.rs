/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use super::{
    CompositionState,
    ObjectDefinitionSegment,
    ObjectSequence,
    PaletteDefinitionSegment,
    PresentationCompositionSegment,
    Segment,
    WindowDefinitionSegment,
};
use std::io::{Error as IoError, Write};
use byteorder::{BigEndian, WriteBytesExt};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for segment-writing operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// The error type for [WriteSegmentExt].
#[derive(ThisError, Debug)]
pub enum WriteError {
    /// The segment could not be written because of an underlying I/O error.
    #[error("segment IO error")]
    IoError {
        /// The underlying I/O error.
        #[from]
        source: IoError,
    },
    /// A presentation composition segment declares more than 255 composition objects.
    #[error("too many composition objects in presentation composition segment")]
    TooManyCompositionObjects,
    /// A window definition segment declares more than 255 windows.
    #[error("too many window definitions")]
    TooManyWindowDefinitions,
    /// A segment body does not fit the 16-bit segment size field.
    #[error("segment payload is too large")]
    PayloadTooLarge,
}

/// Allows writing segments to a sink.
pub trait WriteSegmentExt {
    /// Writes one segment to a sink.
    fn write_segment(&mut self, segment: &Segment) -> WriteResult<()>;
}

impl<T: Write> WriteSegmentExt for T {

    fn write_segment(&mut self, segment: &Segment) -> WriteResult<()> {

        let (kind, payload) = match &segment {
            Segment::PresentationComposition(pcs) => (0x16, generate_pcs(pcs)?),
            Segment::WindowDefinition(wds) => (0x17, generate_wds(wds)?),
            Segment::PaletteDefinition(pds) => (0x14, generate_pds(pds)?),
            Segment::ObjectDefinition(ods) => (0x15, generate_ods(ods)?),
            Segment::End(_) => (0x80, vec![]),
        };

        if payload.len() > u16::MAX as usize {
            return Err(WriteError::PayloadTooLarge)
        }

        self.write_u16::<BigEndian>(0x5047)?;
        self.write_u32::<BigEndian>(segment.pts())?;
        self.write_u32::<BigEndian>(segment.dts())?;
        self.write_u8(kind)?;
        self.write_u16::<BigEndian>(payload.len() as u16)?;
        self.write_all(&payload)?;

        Ok(())
    }
}

fn generate_pcs(pcs: &PresentationCompositionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    payload.write_u16::<BigEndian>(pcs.width)?;
    payload.write_u16::<BigEndian>(pcs.height)?;
    payload.write_u8(pcs.frame_rate)?;
    payload.write_u16::<BigEndian>(pcs.composition_number)?;
    payload.write_u8(
        match pcs.composition_state {
            CompositionState::Normal => 0x00,
            CompositionState::AcquisitionPoint => 0x40,
            CompositionState::EpochStart => 0x80,
        }
    )?;
    payload.write_u8(if pcs.palette_update_only { 0x80 } else { 0x00 })?;
    payload.write_u8(pcs.palette_id)?;

    if pcs.composition_objects.len() > 255 {
        return Err(WriteError::TooManyCompositionObjects)
    }
    payload.write_u8(pcs.composition_objects.len() as u8)?;

    for comp_obj in &pcs.composition_objects {

        payload.write_u16::<BigEndian>(comp_obj.object_id)?;
        payload.write_u8(comp_obj.window_id)?;

        let mut flags = 0x00;
        if comp_obj.crop.is_some() {
            flags |= 0x80;
        }
        if comp_obj.forced {
            flags |= 0x40;
        }
        payload.write_u8(flags)?;
        payload.write_u16::<BigEndian>(comp_obj.x)?;
        payload.write_u16::<BigEndian>(comp_obj.y)?;

        if let Some(crop) = &comp_obj.crop {
            payload.write_u16::<BigEndian>(crop.x)?;
            payload.write_u16::<BigEndian>(crop.y)?;
            payload.write_u16::<BigEndian>(crop.width)?;
            payload.write_u16::<BigEndian>(crop.height)?;
        }
    }

    Ok(payload)
}

fn generate_wds(wds: &WindowDefinitionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    if wds.windows.len() > 255 {
        return Err(WriteError::TooManyWindowDefinitions)
    }
    payload.write_u8(wds.windows.len() as u8)?;

    for window in wds.windows.iter() {
        payload.write_u8(window.id)?;
        payload.write_u16::<BigEndian>(window.x)?;
        payload.write_u16::<BigEndian>(window.y)?;
        payload.write_u16::<BigEndian>(window.width)?;
        payload.write_u16::<BigEndian>(window.height)?;
    }

    Ok(payload)
}

fn generate_pds(pds: &PaletteDefinitionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    payload.write_u8(pds.id)?;
    payload.write_u8(pds.version)?;

    for (index, entry) in &pds.entries {
        payload.write_u8(*index)?;
        payload.write_u8(entry.y)?;
        payload.write_u8(entry.cr)?;
        payload.write_u8(entry.cb)?;
        payload.write_u8(entry.alpha)?;
    }

    Ok(payload)
}

fn generate_ods(ods: &ObjectDefinitionSegment) -> WriteResult<Vec<u8>> {

    let mut payload = vec![];

    payload.write_u16::<BigEndian>(ods.id)?;
    payload.write_u8(ods.version)?;
    payload.write_u8(
        match &ods.sequence {
            Some(ObjectSequence::Last) => 0x40,
            Some(ObjectSequence::First) => 0x80,
            Some(ObjectSequence::Both) => 0xC0,
            None => 0x00,
        }
    )?;

    if ods.is_first() {
        payload.write_u24::<BigEndian>(ods.length)?;
        payload.write_u16::<BigEndian>(ods.width)?;
        payload.write_u16::<BigEndian>(ods.height)?;
    }
    payload.write_all(&ods.data)?;

    Ok(payload)
}
