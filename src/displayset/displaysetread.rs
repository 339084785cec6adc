/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

use super::{DisplaySet, Epoch};
use crate::segment::{
    CompositionState,
    ReadError as SegmentReadError,
    ReadSegmentExt,
    Segment,
};
use std::io::{ErrorKind as IoErrorKind, Read};
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for display set-reading operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// The error type for [ReadDisplaySetExt].
#[derive(ThisError, Debug)]
pub enum ReadError {
    /// The display set could not be read because of an underlying segment error.
    #[error("segment read error")]
    SegmentError {
        #[from]
        source: SegmentReadError,
    },
    /// The first segment in the display set was not a presentation composition segment (PCS).
    #[error("first segment is not a presentation composition segment")]
    MissingPresentationCompositionSegment,
    /// A second presentation composition segment was encountered before the end segment.
    #[error("unexpected presentation composition segment within display set")]
    UnexpectedPresentationCompositionSegment,
}

/// Allows reading display sets from an input source.
pub trait ReadDisplaySetExt {
    /// Reads the next display set from an input source, or `None` at a clean
    /// end of input.
    fn read_display_set(&mut self) -> ReadResult<Option<DisplaySet>>;
}

impl<T> ReadDisplaySetExt for T where
    T: Read,
{
    fn read_display_set(&mut self) -> ReadResult<Option<DisplaySet>> {

        let mut segments = Vec::<Segment>::new();

        match self.read_segment() {
            Ok(Segment::PresentationComposition(pcs)) => {
                segments.push(Segment::PresentationComposition(pcs));
            }
            Ok(_) => {
                return Err(ReadError::MissingPresentationCompositionSegment)
            }
            Err(SegmentReadError::IoError { source })
                if source.kind() == IoErrorKind::UnexpectedEof =>
            {
                return Ok(None)
            }
            Err(err) => return Err(err.into()),
        }

        loop {
            match self.read_segment()? {
                Segment::PresentationComposition(_) => {
                    return Err(ReadError::UnexpectedPresentationCompositionSegment)
                }
                Segment::End(es) => {
                    segments.push(Segment::End(es));
                    break
                }
                segment => {
                    segments.push(segment);
                }
            }
        }

        Ok(Some(DisplaySet::new(segments)))
    }
}

/// Reads every epoch from a source, splitting at `EpochStart` compositions.
pub fn read_epochs(input: &mut impl Read) -> ReadResult<Vec<Epoch>> {

    let mut epochs: Vec<Epoch> = Vec::new();

    while let Some(ds) = input.read_display_set()? {
        let starts_epoch =
            ds.pcs().composition_state == CompositionState::EpochStart;
        match epochs.last_mut() {
            Some(epoch) if !starts_epoch => epoch.display_sets.push(ds),
            _ => epochs.push(Epoch::new(vec![ds])),
        }
    }

    Ok(epochs)
}
