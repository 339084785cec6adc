/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! The epoch compilation pipeline: events in, a timestamped epoch out.


use crate::displayset::{Epoch, ValidateError};
use crate::emitter::DisplaySetEmitter;
use crate::geometry::Rect;
use crate::grouping::{GroupError, GroupingEngine, LayoutMode};
use crate::palette::Colorspace;
use crate::raster::RgbaImage;
use crate::scheduler::{durations, find_acquisitions, schedule};
use crate::segmenter::{PgObject, WindowAnalyzer};
use crate::timing::{set_pts_dts, PgObjectBuffer, TimingError};
use crate::wob::WindowOnBuffer;
use thiserror::Error as ThisError;

/// A specialized [`Result`](std::result::Result) type for epoch compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// The error type for [Compiler].
#[derive(ThisError, Debug)]
pub enum CompileError {
    /// The event run is empty; the caller fed a hollow epoch.
    #[error("empty event run")]
    EmptyEventRun,
    /// Timestamp assignment found a stream-construction bug.
    #[error("timing error")]
    Timing {
        #[from]
        source: TimingError,
    },
    /// The emitted epoch is structurally invalid.
    #[error("invalid display set")]
    Validate {
        #[from]
        source: ValidateError,
    },
}

impl From<GroupError> for CompileError {
    fn from(err: GroupError) -> Self {
        match err {
            GroupError::EmptyEventRun => CompileError::EmptyEventRun,
        }
    }
}

/// One rendered subtitle event: an RGBA bitmap at a screen position, on
/// screen over the frame interval `[tc_in, tc_out)`. Events within an epoch
/// are time-ordered and non-overlapping.
#[derive(Clone, Debug)]
pub struct Event {
    pub x: u16,
    pub y: u16,
    pub tc_in: u32,
    pub tc_out: u32,
    pub img: RgbaImage,
}

impl Event {

    pub fn width(&self) -> usize {
        self.img.width
    }

    pub fn height(&self) -> usize {
        self.img.height
    }

    pub fn rect(&self) -> Rect {
        Rect::new(
            self.x as i32,
            self.y as i32,
            self.img.width as i32,
            self.img.height as i32,
        )
    }
}

/// Compilation parameters. Loading these from the command line or a file is
/// the caller's business.
#[derive(Clone, Debug)]
pub struct Config {
    pub fps: f64,
    pub screen_width: u16,
    pub screen_height: u16,
    /// Timing slack an acquisition must clear, in `[0, 1]`.
    pub quality_factor: f64,
    /// How much the bar drops per palette-only update.
    pub dquality_factor: f64,
    /// Drought growth per withheld acquisition, in `[0, 1]`.
    pub refresh_rate: f64,
    pub blur_mul: f64,
    pub blur_const: f64,
    /// Compose full objects instead of cropped visible areas, and apply the
    /// patent's single-plane-write timing for two objects in one window.
    pub pgs_compatibility: bool,
    pub colorspace: Colorspace,
    /// Candidate window layouts scored in least-acquisitions mode.
    pub candidates: usize,
    pub mode: LayoutMode,
    /// Window count ceiling, 1 or 2.
    pub max_windows: usize,
}

impl Default for Config {

    fn default() -> Self {
        Self {
            fps: 23.976,
            screen_width: 1920,
            screen_height: 1080,
            quality_factor: 0.8,
            dquality_factor: 0.035,
            refresh_rate: 1.0,
            blur_mul: 1.1,
            blur_const: 1.5,
            pgs_compatibility: false,
            colorspace: Colorspace::Bt709,
            candidates: 25,
            mode: LayoutMode::SmallestWindows,
            max_windows: 2,
        }
    }
}

/// Drives the full pipeline for event runs that each form one epoch.
pub struct Compiler {
    config: Config,
}

impl Compiler {

    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Compiles each event run into its own epoch. Runs are independent, so
    /// callers may fan them out over worker threads.
    pub fn compile(&self, runs: &[Vec<Event>]) -> CompileResult<Vec<Epoch>> {
        runs.iter().map(|run| self.compile_epoch(run)).collect()
    }

    /// Compiles one event run into a timestamped, validated epoch.
    pub fn compile_epoch(&self, events: &[Event]) -> CompileResult<Epoch> {

        if events.is_empty() {
            return Err(CompileError::EmptyEventRun);
        }

        let engine = GroupingEngine::new(
            self.config.max_windows,
            self.config.candidates,
            self.config.mode,
            self.config.blur_mul,
            self.config.blur_const,
        );
        let (wobs, bbox) = engine.group(events)?;

        let windows: Vec<Rect> = wobs.iter().map(|wob| wob.window()).collect();
        let pgobjs = self.segment_windows(events, &wobs, &bbox);

        let timings = durations(events);
        let scan = find_acquisitions(
            &pgobjs,
            &windows,
            &timings,
            self.config.fps,
            self.config.pgs_compatibility,
        );
        let states = schedule(
            &scan,
            self.config.quality_factor,
            self.config.dquality_factor,
            self.config.refresh_rate,
        );

        let mut emitter = DisplaySetEmitter::new(
            events,
            pgobjs,
            windows,
            bbox,
            states,
            timings,
            self.config.screen_width,
            self.config.screen_height,
            self.config.fps,
            self.config.pgs_compatibility,
            self.config.colorspace,
        );
        let mut epoch = emitter.emit();

        let mut buffer = PgObjectBuffer::new();
        for ds in epoch.display_sets.iter_mut() {
            set_pts_dts(ds, &mut buffer, self.config.pgs_compatibility)?;
        }

        epoch.validate()?;
        Ok(epoch)
    }

    /// Streams every event through one analyzer per window, yielding the
    /// object runs. Event bitmaps are masked into the window's slice of the
    /// working plane; events that miss the window contribute empty frames.
    fn segment_windows(
        &self,
        events: &[Event],
        wobs: &[WindowOnBuffer],
        bbox: &Rect,
    ) -> Vec<Vec<PgObject>> {

        let windows: Vec<Rect> = wobs.iter().map(|wob| wob.window()).collect();
        let mut analyzers: Vec<WindowAnalyzer> = windows
            .iter()
            .map(|win| WindowAnalyzer::new(win.dx as usize, win.dy as usize))
            .collect();
        let mut pgobjs: Vec<Vec<PgObject>> = vec![Vec::new(); windows.len()];

        for event in events {
            for (wid, window) in windows.iter().enumerate() {
                let frame = mask_event(event, window, bbox);
                if let Some(pgo) = analyzers[wid].push(Some(frame)) {
                    pgobjs[wid].push(pgo);
                }
            }
        }
        for (wid, analyzer) in analyzers.iter_mut().enumerate() {
            if let Some(pgo) = analyzer.push(None) {
                pgobjs[wid].push(pgo);
            }
        }
        pgobjs
    }
}

/// Composites an event bitmap into the working plane (the union box padded by
/// the hardware window minimum) and crops the window's slice.
fn mask_event(event: &Event, window: &Rect, bbox: &Rect) -> RgbaImage {

    let mut work_plane =
        RgbaImage::new(bbox.dx as usize + 8, bbox.dy as usize + 8);
    work_plane.blit(
        &event.img,
        (event.x as i32 - bbox.x) as usize,
        (event.y as i32 - bbox.y) as usize,
    );
    work_plane.crop(window)
}
