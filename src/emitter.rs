/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Display-set emission. Walks the scheduled composition states and turns
//! each acquisition run into one object-defining display set followed by
//! palette-only updates, inserting screen clears across event gaps.

use crate::compile::Event;
use crate::displayset::{DisplaySet, Epoch};
use crate::geometry::Rect;
use crate::palette::{Colorspace, Palette};
use crate::quant::{diff_cluts, solve_sequence};
use crate::rle;
use crate::scheduler::EventTiming;
use crate::segment::{
    CompositionObject,
    CompositionState,
    Crop,
    EndSegment,
    PaletteDefinitionSegment,
    PresentationCompositionSegment,
    Segment,
    WindowDefinition,
    WindowDefinitionSegment,
    split_object,
};
use crate::segmenter::PgObject;
use crate::timing::{frame_rate_code, PgDecoder};

/// Ticks the graphic plane is swapped ahead of the frame it must be on
/// screen for.
const PTS_EARLY_TICKS: i64 = 4;

/// Two low/high object-id pairs alternate across acquisitions so an in-flight
/// decode never lands on the pair currently composed to the screen.
const DOUBLE_BUFFER_STRIDE: u16 = 2;

/// Emits the display sets for one epoch. The produced segments carry the
/// desired on-screen PTS; decode timestamps are assigned afterwards.
pub struct DisplaySetEmitter<'a> {
    events: &'a [Event],
    pgobjs: Vec<Vec<PgObject>>,
    windows: Vec<Rect>,
    bbox: Rect,
    states: Vec<CompositionState>,
    timings: Vec<EventTiming>,
    screen_width: u16,
    screen_height: u16,
    fps: f64,
    compat_mode: bool,
    colorspace: Colorspace,

    pcs_id: u16,
    pal_vn: u16,
    pal_id: u8,
    double_buffering: u16,
    ods_reg: [u8; 64],
}

impl<'a> DisplaySetEmitter<'a> {

    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: &'a [Event],
        pgobjs: Vec<Vec<PgObject>>,
        windows: Vec<Rect>,
        bbox: Rect,
        states: Vec<CompositionState>,
        timings: Vec<EventTiming>,
        screen_width: u16,
        screen_height: u16,
        fps: f64,
        compat_mode: bool,
        colorspace: Colorspace,
    ) -> Self {
        Self {
            events,
            pgobjs,
            windows,
            bbox,
            states,
            timings,
            screen_width,
            screen_height,
            fps,
            compat_mode,
            colorspace,
            pcs_id: 0,
            pal_vn: 0,
            pal_id: 0,
            double_buffering: DOUBLE_BUFFER_STRIDE,
            ods_reg: [0; 64],
        }
    }

    /// The graphic plane must swap a few ticks before the frame's clock time.
    fn pts_of_frame(&self, frame: u32) -> u32 {
        let ticks = (frame as f64 * PgDecoder::FREQ / self.fps).round() as i64;
        (ticks - PTS_EARLY_TICKS).max(0) as u32
    }

    fn wds_base(&self, pts: u32) -> WindowDefinitionSegment {
        let windows = self
            .windows
            .iter()
            .enumerate()
            .map(|(k, win)| WindowDefinition {
                id: k as u8,
                x: (win.x + self.bbox.x) as u16,
                y: (win.y + self.bbox.y) as u16,
                width: win.dx as u16,
                height: win.dy as u16,
            })
            .collect();
        WindowDefinitionSegment { pts, dts: 0, windows }
    }

    fn pcs(
        &mut self,
        state: CompositionState,
        palette_update_only: bool,
        composition_objects: Vec<CompositionObject>,
        pts: u32,
    ) -> PresentationCompositionSegment {
        let pcs = PresentationCompositionSegment {
            pts,
            dts: 0,
            width: self.screen_width,
            height: self.screen_height,
            frame_rate: frame_rate_code(self.fps),
            composition_number: self.pcs_id,
            composition_state: state,
            palette_update_only,
            palette_id: self.pal_id,
            composition_objects,
        };
        self.pcs_id = self.pcs_id.wrapping_add(1);
        pcs
    }

    /// Bumps the palette version; a wrap moves to the next palette ID and
    /// forces the following update to carry the full palette.
    fn bump_palette_version(&mut self) -> bool {
        self.pal_vn += 1;
        if self.pal_vn >= 256 {
            self.pal_id = (self.pal_id + 1) & 0b111;
            self.pal_vn = 0;
            return true;
        }
        false
    }

    fn pds(&self, palette: &Palette, pts: u32) -> PaletteDefinitionSegment {
        PaletteDefinitionSegment {
            pts,
            dts: 0,
            id: self.pal_id,
            version: self.pal_vn as u8,
            entries: palette.to_entries(),
        }
    }

    /// A display set with an empty composition, taking everything off screen.
    fn undisplay(&mut self, pts: u32) -> DisplaySet {
        let pcs = self.pcs(CompositionState::Normal, false, vec![], pts);
        DisplaySet::new(vec![
            Segment::PresentationComposition(pcs),
            Segment::WindowDefinition(self.wds_base(pts)),
            Segment::End(EndSegment { pts, dts: 0 }),
        ])
    }

    pub fn emit(&mut self) -> Epoch {

        let n_actions = self.events.len();
        let mut displaysets: Vec<DisplaySet> = Vec::new();

        let mut i = 0;
        while i < n_actions {
            let mut k = i + 1;
            while k < n_actions && self.states[k] == CompositionState::Normal {
                k += 1;
            }

            if self.timings[i].delay != 0 && i > 0 {
                let pts = self.pts_of_frame(self.events[i - 1].tc_out);
                let ds = self.undisplay(pts);
                displaysets.push(ds);
            }

            self.emit_run(i, k, &mut displaysets);
            i = k;
        }

        // Final teardown once the last event leaves the screen.
        if let Some(last) = self.events.last() {
            let pts = self.pts_of_frame(last.tc_out);
            let ds = self.undisplay(pts);
            displaysets.push(ds);
        }

        Epoch::new(displaysets)
    }

    /// Emits the acquisition display set for the run `[i, k)` and the
    /// palette updates animating it.
    fn emit_run(&mut self, i: usize, k: usize, displaysets: &mut Vec<DisplaySet>) {

        let c_pts = self.pts_of_frame(self.events[i].tc_in);

        // Objects composed during this run: per window, the object active at
        // the run start, provided it shows up anywhere in the run.
        let run_objs: Vec<(usize, PgObject)> = self
            .pgobjs
            .iter()
            .enumerate()
            .filter_map(|(wid, objs)| {
                objs.iter()
                    .find(|obj| obj.is_active(i))
                    .filter(|obj| (i..k).any(|f| obj.is_visible(f)))
                    .map(|obj| (wid, obj.clone()))
            })
            .collect();
        let has_two_objs = run_objs.len() > 1;

        self.double_buffering = DOUBLE_BUFFER_STRIDE - self.double_buffering;

        if run_objs.is_empty() {
            if i > 0 {
                let pts = self.pts_of_frame(self.events[i - 1].tc_out);
                let ds = self.undisplay(pts);
                displaysets.push(ds);
            }
            return;
        }

        let n_colors = if has_two_objs { 128 } else { 256 };
        let mut cobjs: Vec<CompositionObject> = Vec::new();
        let mut cobjs_cropped: Vec<CompositionObject> = Vec::new();
        let mut pals: Vec<Vec<Palette>> = Vec::new();
        let mut off_screen: Vec<Option<usize>> = Vec::new();
        let mut o_ods: Vec<Segment> = Vec::new();

        for (wid, obj) in &run_objs {
            let oid = *wid as u16 + self.double_buffering;
            let window = self.windows[*wid];
            let start = i - obj.f;
            let end = (k - obj.f).min(obj.gfx.len());
            let chain = &obj.gfx[start..end];

            let last_visible = obj.mask[start..end]
                .iter()
                .rposition(|&v| v)
                .map(|rel| i + rel);
            off_screen.push(last_visible);

            let base_x = (window.x + self.bbox.x) as u16;
            let base_y = (window.y + self.bbox.y) as u16;
            cobjs.push(CompositionObject {
                object_id: oid,
                window_id: *wid as u8,
                x: base_x,
                y: base_y,
                forced: false,
                crop: None,
            });
            cobjs_cropped.push(CompositionObject {
                object_id: oid,
                window_id: *wid as u8,
                x: base_x + obj.bbox.x as u16,
                y: base_y + obj.bbox.y as u16,
                forced: false,
                crop: Some(Crop {
                    x: obj.bbox.x as u16,
                    y: obj.bbox.y as u16,
                    width: obj.bbox.dx as u16,
                    height: obj.bbox.dy as u16,
                }),
            });

            let mut seq = solve_sequence(chain, n_colors);
            let mut chain_pals = diff_cluts(&seq.palettes, self.colorspace);
            if *wid == 1 && has_two_objs {
                seq.bitmap.offset(128);
                for p in chain_pals.iter_mut() {
                    p.offset(128);
                }
            }
            pals.push(chain_pals);

            let data = rle::encode(seq.bitmap.width, seq.bitmap.height, &seq.bitmap.data);
            let version = self.ods_reg[oid as usize];
            self.ods_reg[oid as usize] = version.wrapping_add(1);
            o_ods.extend(
                split_object(
                    oid,
                    version,
                    seq.bitmap.width as u16,
                    seq.bitmap.height as u16,
                    data,
                    c_pts,
                )
                .into_iter()
                .map(Segment::ObjectDefinition),
            );
        }

        let mut pal = pals[0][0].clone();
        if has_two_objs {
            pal.merge(&pals[1][0]);
        } else {
            pals.push(vec![Palette::new(); pals[0].len()]);
            off_screen.push(None);
        }

        let composed = if self.compat_mode { &cobjs } else { &cobjs_cropped };
        let composed = composed.clone();

        let pcs = self.pcs(self.states[i], false, composed.clone(), c_pts);
        let pds = self.pds(&pal, c_pts);
        let mut segments = vec![
            Segment::PresentationComposition(pcs),
            Segment::WindowDefinition(self.wds_base(c_pts)),
            Segment::PaletteDefinition(pds),
        ];
        segments.extend(o_ods);
        segments.push(Segment::End(EndSegment { pts: c_pts, dts: 0 }));
        displaysets.push(DisplaySet::new(segments));

        let mut next_pal_full = self.bump_palette_version();

        if k - i <= 1 {
            return;
        }

        // An object leaving the screen before the run ends gets its half of
        // the CLUT blanked right after its last visible frame.
        let zip_length = pals[0].len().max(pals[1].len());
        for j in 0..2 {
            if off_screen[j].is_some() && pals[j].len() < zip_length {
                let half = (cobjs[j].object_id & 0x01) as u8;
                pals[j].push(Palette::transparent_range(
                    half * 128,
                    half * 128 + 127,
                ));
            }
        }

        for z in i + 1..k {
            let c_pts_z = self.pts_of_frame(self.events[z].tc_in);

            let mut step = pals[0].get(z - i).cloned().unwrap_or_default();
            step.merge(&pals[1].get(z - i).cloned().unwrap_or_default());
            pal.merge(&step);

            // A gap inside a palette run clears the screen through a fully
            // transparent palette rather than a new composition.
            if self.timings[z].delay != 0 {
                let pts_und = self.pts_of_frame(self.events[z - 1].tc_out);
                let clear =
                    Palette::transparent_range(0, pal.max_index().unwrap_or(0));
                let pcs = self.pcs(self.states[z], true, composed.clone(), pts_und);
                let pds = self.pds(&clear, pts_und);
                displaysets.push(DisplaySet::new(vec![
                    Segment::PresentationComposition(pcs),
                    Segment::PaletteDefinition(pds),
                    Segment::End(EndSegment { pts: pts_und, dts: 0 }),
                ]));
                self.bump_palette_version();
                next_pal_full = true;
            }

            let pds_pal = if next_pal_full { pal.clone() } else { step };
            let pcs = self.pcs(self.states[z], true, composed.clone(), c_pts_z);
            let pds = self.pds(&pds_pal, c_pts_z);
            displaysets.push(DisplaySet::new(vec![
                Segment::PresentationComposition(pcs),
                Segment::PaletteDefinition(pds),
                Segment::End(EndSegment { pts: c_pts_z, dts: 0 }),
            ]));
            next_pal_full = self.bump_palette_version();
        }
    }
}
