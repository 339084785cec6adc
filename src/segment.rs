/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! The five PGS segment kinds and their wire representation. Timestamps are
//! 90 kHz clock values.

#[cfg(test)]
mod tests;

mod segmentread;
mod segmentwrite;

pub use segmentread::*;
pub use segmentwrite::*;

use crate::palette::PaletteEntry;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Segment {
    PresentationComposition(PresentationCompositionSegment),
    WindowDefinition(WindowDefinitionSegment),
    PaletteDefinition(PaletteDefinitionSegment),
    ObjectDefinition(ObjectDefinitionSegment),
    End(EndSegment),
}

impl Segment {

    pub fn pts(&self) -> u32 {
        match self {
            Segment::PresentationComposition(pcs) => pcs.pts,
            Segment::WindowDefinition(wds) => wds.pts,
            Segment::PaletteDefinition(pds) => pds.pts,
            Segment::ObjectDefinition(ods) => ods.pts,
            Segment::End(es) => es.pts,
        }
    }

    pub fn dts(&self) -> u32 {
        match self {
            Segment::PresentationComposition(pcs) => pcs.dts,
            Segment::WindowDefinition(wds) => wds.dts,
            Segment::PaletteDefinition(pds) => pds.dts,
            Segment::ObjectDefinition(ods) => ods.dts,
            Segment::End(es) => es.dts,
        }
    }

    pub fn set_pts_dts(&mut self, pts: u32, dts: u32) {
        match self {
            Segment::PresentationComposition(pcs) => {
                pcs.pts = pts;
                pcs.dts = dts;
            }
            Segment::WindowDefinition(wds) => {
                wds.pts = pts;
                wds.dts = dts;
            }
            Segment::PaletteDefinition(pds) => {
                pds.pts = pts;
                pds.dts = dts;
            }
            Segment::ObjectDefinition(ods) => {
                ods.pts = pts;
                ods.dts = dts;
            }
            Segment::End(es) => {
                es.pts = pts;
                es.dts = dts;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum CompositionState {
    Normal,
    AcquisitionPoint,
    #[default]
    EpochStart,
}

/// Placement of an object definition segment within a multi-segment object.
/// `None` marks a middle portion.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ObjectSequence {
    Last,
    First,
    Both,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct PresentationCompositionSegment {
    pub pts: u32,
    pub dts: u32,
    pub width: u16,
    pub height: u16,
    pub frame_rate: u8,
    pub composition_number: u16,
    pub composition_state: CompositionState,
    pub palette_update_only: bool,
    pub palette_id: u8,
    pub composition_objects: Vec<CompositionObject>,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct CompositionObject {
    pub object_id: u16,
    pub window_id: u8,
    pub x: u16,
    pub y: u16,
    pub forced: bool,
    pub crop: Option<Crop>,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Crop {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct WindowDefinitionSegment {
    pub pts: u32,
    pub dts: u32,
    pub windows: Vec<WindowDefinition>,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct WindowDefinition {
    pub id: u8,
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct PaletteDefinitionSegment {
    pub pts: u32,
    pub dts: u32,
    pub id: u8,
    pub version: u8,
    pub entries: Vec<(u8, PaletteEntry)>,
}

/// One portion of an object's RLE data. `length`, `width` and `height` are
/// only carried on the wire by `First`/`Both` portions; `length` covers the
/// data of the whole sequence plus the 4-byte header quirk.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ObjectDefinitionSegment {
    pub pts: u32,
    pub dts: u32,
    pub id: u16,
    pub version: u8,
    pub sequence: Option<ObjectSequence>,
    pub length: u32,
    pub width: u16,
    pub height: u16,
    pub data: Vec<u8>,
}

impl ObjectDefinitionSegment {

    pub fn is_first(&self) -> bool {
        matches!(self.sequence, Some(ObjectSequence::First | ObjectSequence::Both))
    }

    pub fn is_last(&self) -> bool {
        matches!(self.sequence, Some(ObjectSequence::Last | ObjectSequence::Both))
    }
}

/// Data bytes the first portion of an object sequence can carry.
pub const ODS_FIRST_MAX_DATA: usize = 65_524;
/// Data bytes any later portion can carry.
pub const ODS_NEXT_MAX_DATA: usize = 65_531;

/// Splits one object's RLE data into a wire-sized segment sequence.
pub fn split_object(
    id: u16,
    version: u8,
    width: u16,
    height: u16,
    data: Vec<u8>,
    pts: u32,
) -> Vec<ObjectDefinitionSegment> {

    let length = data.len() as u32 + 4;

    if data.len() <= ODS_FIRST_MAX_DATA {
        return vec![ObjectDefinitionSegment {
            pts,
            dts: 0,
            id,
            version,
            sequence: Some(ObjectSequence::Both),
            length,
            width,
            height,
            data,
        }];
    }

    let mut out = Vec::new();
    let mut rest = data.as_slice();
    let first;
    (first, rest) = rest.split_at(ODS_FIRST_MAX_DATA);
    out.push(ObjectDefinitionSegment {
        pts,
        dts: 0,
        id,
        version,
        sequence: Some(ObjectSequence::First),
        length,
        width,
        height,
        data: first.to_vec(),
    });
    while rest.len() > ODS_NEXT_MAX_DATA {
        let chunk;
        (chunk, rest) = rest.split_at(ODS_NEXT_MAX_DATA);
        out.push(ObjectDefinitionSegment {
            pts,
            dts: 0,
            id,
            version,
            sequence: None,
            length: 0,
            width: 0,
            height: 0,
            data: chunk.to_vec(),
        });
    }
    out.push(ObjectDefinitionSegment {
        pts,
        dts: 0,
        id,
        version,
        sequence: Some(ObjectSequence::Last),
        length: 0,
        width: 0,
        height: 0,
        data: rest.to_vec(),
    });
    out
}

#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct EndSegment {
    pub pts: u32,
    pub dts: u32,
}
