/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Display sets and epochs. A display set is an ordered run of segments
//! `[PCS, WDS?, PDS*, ODS*, END]`; an epoch is a run of display sets opened by
//! an `EpochStart` composition.


mod displaysetread;
mod displaysetwrite;

pub use displaysetread::*;
pub use displaysetwrite::*;

use crate::segment::{
    CompositionState,
    EndSegment,
    ObjectDefinitionSegment,
    PaletteDefinitionSegment,
    PresentationCompositionSegment,
    Segment,
    WindowDefinitionSegment,
};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for display set validation.
pub type ValidateResult<T> = Result<T, ValidateError>;

/// The error type for structurally invalid display sets. Streams carrying any
/// of these defects will typically crash a hardware decoder, so construction
/// bugs are surfaced as errors rather than warnings.
#[derive(ThisError, Debug)]
pub enum ValidateError {
    /// The display set contains no segments.
    #[error("no segments")]
    NoSegments,
    /// The first segment is not a presentation composition segment (PCS).
    #[error("first segment is not a presentation composition segment")]
    MissingPresentationCompositionSegment,
    /// The display set does not finish with an end segment (ES).
    #[error("display set contains no end segment")]
    MissingEndSegment,
    /// A segment has been encountered after the end segment (ES).
    #[error("segment encountered after end segment")]
    SegmentAfterEnd,
    /// A presentation composition segment (PCS) appears outside the first position.
    #[error("unexpected presentation composition segment within display set")]
    UnexpectedPresentationCompositionSegment,
    /// A palette update display set deviates from the `[PCS, PDS, END]` shape.
    #[error("palette update display set must be exactly [PCS, PDS, END]")]
    MalformedPaletteUpdate,
    /// A palette update is flagged on an epoch start or acquisition point.
    #[error("palette update flagged outside a normal composition")]
    PaletteUpdateOnAcquisition,
    /// More than two windows are defined.
    #[error("more than two windows defined")]
    TooManyWindows,
    /// More than two composition objects are referenced.
    #[error("more than two composition objects")]
    TooManyCompositionObjects,
    /// A palette definition uses an ID outside `0..8`.
    #[error("palette ID out of range")]
    PaletteIdOutOfRange,
    /// A palette definition carries more than 256 entries.
    #[error("palette carries more than 256 entries")]
    TooManyPaletteEntries,
    /// Object sequence FIRST/LAST portions are unbalanced.
    #[error("object sequence first/last flags are unbalanced")]
    UnbalancedObjectSequence,
    /// A segment decodes after it presents.
    #[error("segment DTS exceeds its PTS")]
    InconsistentTimestamps,
    /// DTS decreases across the display set in emission order.
    #[error("DTS is not monotonic within the display set")]
    NonMonotonicDts,
    /// The first display set of an epoch does not declare `EpochStart`.
    #[error("epoch is not opened by an epoch start composition")]
    EpochNotOpened,
}

/// One atomic presentation unit, in emission order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DisplaySet {
    pub segments: Vec<Segment>,
}

impl DisplaySet {

    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// The presentation composition opening the display set.
    pub fn pcs(&self) -> &PresentationCompositionSegment {
        match self.segments.first() {
            Some(Segment::PresentationComposition(pcs)) => pcs,
            _ => panic!("display set does not start with a PCS"),
        }
    }

    pub fn pcs_mut(&mut self) -> &mut PresentationCompositionSegment {
        match self.segments.first_mut() {
            Some(Segment::PresentationComposition(pcs)) => pcs,
            _ => panic!("display set does not start with a PCS"),
        }
    }

    pub fn wds(&self) -> Option<&WindowDefinitionSegment> {
        self.segments.iter().find_map(|seg| match seg {
            Segment::WindowDefinition(wds) => Some(wds),
            _ => None,
        })
    }

    pub fn pds(&self) -> impl Iterator<Item = &PaletteDefinitionSegment> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::PaletteDefinition(pds) => Some(pds),
            _ => None,
        })
    }

    pub fn ods(&self) -> impl Iterator<Item = &ObjectDefinitionSegment> {
        self.segments.iter().filter_map(|seg| match seg {
            Segment::ObjectDefinition(ods) => Some(ods),
            _ => None,
        })
    }

    pub fn end(&self) -> Option<&EndSegment> {
        self.segments.iter().find_map(|seg| match seg {
            Segment::End(es) => Some(es),
            _ => None,
        })
    }

    /// Checks the structural rules a hardware decoder depends on.
    pub fn validate(&self) -> ValidateResult<()> {

        if self.segments.is_empty() {
            return Err(ValidateError::NoSegments)
        }
        if !matches!(self.segments[0], Segment::PresentationComposition(_)) {
            return Err(ValidateError::MissingPresentationCompositionSegment)
        }
        if !matches!(self.segments.last(), Some(Segment::End(_))) {
            match self.segments.iter().any(|s| matches!(s, Segment::End(_))) {
                true => return Err(ValidateError::SegmentAfterEnd),
                false => return Err(ValidateError::MissingEndSegment),
            }
        }
        if self.segments[1..self.segments.len() - 1]
            .iter()
            .any(|s| matches!(s, Segment::End(_)))
        {
            return Err(ValidateError::SegmentAfterEnd)
        }
        if self.segments[1..]
            .iter()
            .any(|s| matches!(s, Segment::PresentationComposition(_)))
        {
            return Err(ValidateError::UnexpectedPresentationCompositionSegment)
        }

        let pcs = self.pcs();

        if pcs.palette_update_only {
            if pcs.composition_state != CompositionState::Normal {
                return Err(ValidateError::PaletteUpdateOnAcquisition)
            }
            let shape_ok = self.segments.len() == 3
                && matches!(self.segments[1], Segment::PaletteDefinition(_));
            if !shape_ok {
                return Err(ValidateError::MalformedPaletteUpdate)
            }
        }

        if pcs.composition_objects.len() > 2 {
            return Err(ValidateError::TooManyCompositionObjects)
        }
        if let Some(wds) = self.wds() {
            if wds.windows.len() > 2 {
                return Err(ValidateError::TooManyWindows)
            }
        }
        for pds in self.pds() {
            if pds.id >= 8 {
                return Err(ValidateError::PaletteIdOutOfRange)
            }
            if pds.entries.len() > 256 {
                return Err(ValidateError::TooManyPaletteEntries)
            }
        }

        let firsts = self.ods().filter(|ods| ods.is_first()).count();
        let lasts = self.ods().filter(|ods| ods.is_last()).count();
        if firsts != lasts {
            return Err(ValidateError::UnbalancedObjectSequence)
        }

        let mut last_dts = None;
        for seg in &self.segments {
            if seg.pts() < seg.dts() {
                return Err(ValidateError::InconsistentTimestamps)
            }
            if let Some(prev) = last_dts {
                if seg.dts() < prev {
                    return Err(ValidateError::NonMonotonicDts)
                }
            }
            last_dts = Some(seg.dts());
        }

        Ok(())
    }
}

/// A maximal run of display sets sharing one window layout.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Epoch {
    pub display_sets: Vec<DisplaySet>,
}

impl Epoch {

    pub fn new(display_sets: Vec<DisplaySet>) -> Self {
        Self { display_sets }
    }

    /// Validates every display set plus the epoch-level framing: the first
    /// composition must open the epoch and the last must tear it down.
    pub fn validate(&self) -> ValidateResult<()> {

        if self.display_sets.is_empty() {
            return Err(ValidateError::NoSegments)
        }
        for ds in &self.display_sets {
            ds.validate()?;
        }
        if self.display_sets[0].pcs().composition_state != CompositionState::EpochStart {
            return Err(ValidateError::EpochNotOpened)
        }
        Ok(())
    }
}
