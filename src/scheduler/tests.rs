/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::*;
use crate::raster::RgbaImage;

fn event(tc_in: u32, tc_out: u32) -> Event {
    Event { x: 0, y: 0, tc_in, tc_out, img: RgbaImage::new(8, 8) }
}

fn object(width: usize, height: usize, f: usize, frames: usize) -> PgObject {
    PgObject {
        gfx: vec![RgbaImage::new(width, height); frames],
        bbox: Rect::new(0, 0, width as i32, height as i32),
        mask: vec![true; frames],
        f,
    }
}

#[test]
fn test_durations_contiguous_events() {

    let events = vec![event(0, 24), event(24, 48)];

    assert_eq!(
        durations(&events),
        vec![
            EventTiming { dt: 24, delay: 0 },
            EventTiming { dt: 24, delay: 0 },
        ]
    );
}

#[test]
fn test_durations_gap_between_events() {

    let events = vec![event(0, 24), event(30, 60)];

    assert_eq!(
        durations(&events),
        vec![
            EventTiming { dt: 24, delay: 0 },
            EventTiming { dt: 30, delay: 6 },
        ]
    );
}

#[test]
fn test_new_object_forces_acquisition_flag() {

    let windows = vec![Rect::new(0, 0, 208, 48)];
    let pgobjs = vec![vec![object(208, 48, 0, 2), object(208, 48, 2, 2)]];
    let timings = vec![EventTiming { dt: 1, delay: 0 }; 4];

    let scan = find_acquisitions(&pgobjs, &windows, &timings, 23.976, false);

    assert_eq!(scan.absolutes, vec![true, false, true, false]);
}

#[test]
fn test_small_object_fits_margin() {

    let windows = vec![Rect::new(0, 0, 208, 48)];
    let pgobjs = vec![vec![object(208, 48, 0, 2)]];
    let timings = vec![EventTiming { dt: 1, delay: 0 }; 2];

    let scan = find_acquisitions(&pgobjs, &windows, &timings, 23.976, false);

    // 208x48 decodes in well under a frame at RD.
    assert!(scan.valid[1]);
    assert!(scan.dtl[1] > 0.0);
}

#[test]
fn test_large_object_overruns_one_frame_margin() {

    // A 1280x400 object cannot be decoded and copied within a single frame.
    let windows = vec![Rect::new(0, 0, 1280, 400)];
    let pgobjs = vec![vec![object(1280, 400, 0, 2)]];
    let timings = vec![EventTiming { dt: 1, delay: 0 }; 2];

    let scan = find_acquisitions(&pgobjs, &windows, &timings, 23.976, false);

    assert!(!scan.valid[1]);
    assert!(scan.dtl[1] < 0.0);
}

#[test]
fn test_gap_widens_margin() {

    let windows = vec![Rect::new(0, 0, 1280, 400)];
    let pgobjs = vec![vec![object(1280, 400, 0, 2)]];
    // A 30-frame gap before the second event leaves ample time.
    let timings = vec![
        EventTiming { dt: 24, delay: 0 },
        EventTiming { dt: 24, delay: 30 },
    ];

    let scan = find_acquisitions(&pgobjs, &windows, &timings, 23.976, false);

    assert!(scan.valid[1]);
}

#[test]
fn test_schedule_first_event_opens_epoch() {

    let scan = AcquisitionScan {
        valid: vec![true; 3],
        absolutes: vec![true, false, false],
        dtl: vec![0.9; 3],
    };
    let states = schedule(&scan, 0.8, 0.035, 1.0);

    assert_eq!(states[0], CompositionState::EpochStart);
    // Ample slack clears the quality bar right away.
    assert_eq!(states[1], CompositionState::AcquisitionPoint);
    assert_eq!(states[2], CompositionState::AcquisitionPoint);
}

#[test]
fn test_schedule_forced_acquisition_ignores_margin() {

    let scan = AcquisitionScan {
        valid: vec![false; 2],
        absolutes: vec![true, true],
        dtl: vec![-1.0; 2],
    };
    let states = schedule(&scan, 0.8, 0.035, 1.0);

    assert_eq!(states[1], CompositionState::AcquisitionPoint);
}

#[test]
fn test_schedule_drought_lowers_the_bar() {

    // Slack of 0.75 stays under the 0.8 bar until two withheld updates
    // lower it to 0.73.
    let scan = AcquisitionScan {
        valid: vec![true; 4],
        absolutes: vec![false; 4],
        dtl: vec![0.75; 4],
    };
    let states = schedule(&scan, 0.8, 0.035, 1.0);

    assert_eq!(states[1], CompositionState::Normal);
    assert_eq!(states[2], CompositionState::Normal);
    assert_eq!(states[3], CompositionState::AcquisitionPoint);
}

#[test]
fn test_schedule_zero_refresh_rate_never_droughts() {

    let scan = AcquisitionScan {
        valid: vec![true; 6],
        absolutes: vec![false; 6],
        dtl: vec![0.75; 6],
    };
    let states = schedule(&scan, 0.8, 0.035, 0.0);

    assert!(states[1..]
        .iter()
        .all(|s| *s == CompositionState::Normal));
}
