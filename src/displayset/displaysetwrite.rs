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
use crate::segment::{WriteError as SegmentWriteError, WriteSegmentExt};
use std::io::Write;
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for display set-writing operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// The error type for [WriteDisplaySetExt].
#[derive(ThisError, Debug)]
pub enum WriteError {
    /// The display set could not be written because of an underlying segment error.
    #[error("segment write error")]
    SegmentError {
        #[from]
        source: SegmentWriteError,
    },
}

/// Allows writing display sets to a sink.
pub trait WriteDisplaySetExt {
    /// Writes one display set to a sink, segment by segment in emission order.
    fn write_display_set(&mut self, ds: &DisplaySet) -> WriteResult<()>;
}

impl<T: Write> WriteDisplaySetExt for T {

    fn write_display_set(&mut self, ds: &DisplaySet) -> WriteResult<()> {

        for segment in &ds.segments {
            self.write_segment(segment)?;
        }
        Ok(())
    }
}

/// Writes a full epoch to a sink.
pub fn write_epoch(output: &mut impl Write, epoch: &Epoch) -> WriteResult<()> {

    for ds in &epoch.display_sets {
        output.write_display_set(ds)?;
    }
    Ok(())
}
