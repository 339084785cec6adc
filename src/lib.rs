/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! # Introduction
//!
//! This crate compiles a time-ordered sequence of rendered subtitle frames into Presentation
//! Graphics Stream epochs, the subtitle representation used on Blu-ray movie discs (often
//! referred to as SUP subtitles).
//!
//! PGS has no publicly available documentation. The behavior of this crate is therefore
//! defined by a hierarchy of sources:
//! [U.S. Patent US 20090185789A1](https://patents.google.com/patent/US20090185789/da) for the
//! decoder model and timing rules, cross-checked against
//! [a helpful blog post about PGS](http://blog.thescorpius.com/index.php/2017/07/15/presentation-graphic-stream-sup-files-bluray-subtitle-format/)
//! for the wire format, and against commercial Blu-ray discs where the two disagree.
//!
//! # PGS Overview
//!
//! PGS works by defining a screen area for all captions to use. Within this area, window
//! regions are defined. Objects are then placed within each window; each window may show no
//! more than two objects at a given time, and an epoch may define at most two windows here.
//! The process of rendering objects to the screen is known as composition.
//!
//! An epoch displays one or more captions to fixed areas of the screen. It is composed of
//! display sets (DS), each of which either initiates the epoch (defining windows, objects and
//! palettes), refreshes the decoder with a full redefinition (an acquisition point), or makes
//! an incremental change to the current composition (typically a palette-only update).
//!
//! # Compiling
//!
//! The input is a run of [`Event`](compile::Event)s, each carrying an RGBA bitmap with its
//! on-screen position and in/out times. [`Compiler::compile_epoch`](compile::Compiler) chains
//! the stages:
//!
//! 1. [`grouping`] — derive at most two rectangular windows covering all visible pixels;
//! 2. [`segmenter`] — chain successive bitmaps per window into objects that can share one
//!    object definition and animate through palette updates;
//! 3. [`scheduler`] — decide per event whether the decoder has time for a full acquisition
//!    or only a palette update;
//! 4. [`emitter`] — produce the display sets;
//! 5. [`timing`] — assign decode and presentation timestamps under the decoder model.
//!
//! [`compliance`] re-checks a finished stream against the decoder's bandwidth and buffer
//! limits. Non-compliant epochs are still emitted but flagged.

pub mod compile;
pub mod compliance;
pub mod displayset;
pub mod emitter;
pub mod geometry;
pub mod grouping;
pub mod palette;
pub mod quant;
pub mod raster;
pub mod rle;
pub mod scheduler;
pub mod segment;
pub mod segmenter;
pub mod timing;
pub mod wob;

/// Renders a 90 kHz clock value as `HH:MM:SS.mmm` for diagnostics.
pub fn ts_to_timestamp(ts: u32) -> String {

    let mut ms = ts / 90;
    let h = ms / 3_600_000;
    ms -= h * 3_600_000;
    let m = ms / 60_000;
    ms -= m * 60_000;
    let s = ms / 1_000;
    ms -= s * 1_000;

    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}
