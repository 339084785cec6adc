/*
 * Any copyright is dedicated to the Public Domain.
 *
 * Copyright 2026 pgsup Contributors
 *
 * SPDX-License-Identifier: CC0-1.0
 */

use super::{
    *,
    segmentread::ReadSegmentExt,
    segmentwrite::WriteSegmentExt,
};
use crate::palette::PaletteEntry;
use std::io::Cursor;
use rand::{thread_rng, Rng};

fn cycle(segment: &Segment) {

    let mut buffer = vec![];

    buffer.write_segment(segment).unwrap();

    let mut cursor = Cursor::new(buffer);

    assert_eq!(cursor.read_segment().unwrap(), *segment);
}

#[test]
fn test_pcs_cycle_no_pu_no_co() {

    let mut rng = thread_rng();
    let segment = Segment::PresentationComposition(
        PresentationCompositionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            width: rng.gen(),
            height: rng.gen(),
            frame_rate: rng.gen(),
            composition_number: rng.gen(),
            composition_state: CompositionState::Normal,
            palette_update_only: false,
            palette_id: rng.gen(),
            composition_objects: vec![],
        }
    );

    cycle(&segment);
}

#[test]
fn test_pcs_cycle_no_pu_co() {

    let mut rng = thread_rng();
    let segment = Segment::PresentationComposition(
        PresentationCompositionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            width: rng.gen(),
            height: rng.gen(),
            frame_rate: rng.gen(),
            composition_number: rng.gen(),
            composition_state: CompositionState::AcquisitionPoint,
            palette_update_only: false,
            palette_id: rng.gen(),
            composition_objects: vec![
                CompositionObject {
                    object_id: rng.gen(),
                    window_id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    forced: false,
                    crop: None,
                },
                CompositionObject {
                    object_id: rng.gen(),
                    window_id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    forced: true,
                    crop: Some(
                        Crop {
                            x: rng.gen(),
                            y: rng.gen(),
                            width: rng.gen(),
                            height: rng.gen(),
                        }
                    ),
                },
            ],
        }
    );

    cycle(&segment);
}

#[test]
fn test_pcs_cycle_pu_co() {

    let mut rng = thread_rng();
    let segment = Segment::PresentationComposition(
        PresentationCompositionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            width: rng.gen(),
            height: rng.gen(),
            frame_rate: rng.gen(),
            composition_number: rng.gen(),
            composition_state: CompositionState::Normal,
            palette_update_only: true,
            palette_id: rng.gen(),
            composition_objects: vec![
                CompositionObject {
                    object_id: rng.gen(),
                    window_id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    forced: false,
                    crop: None,
                },
            ],
        }
    );

    cycle(&segment);
}

#[test]
fn test_wds_cycle() {

    let mut rng = thread_rng();
    let segment = Segment::WindowDefinition(
        WindowDefinitionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            windows: vec![
                WindowDefinition {
                    id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    width: rng.gen(),
                    height: rng.gen(),
                },
                WindowDefinition {
                    id: rng.gen(),
                    x: rng.gen(),
                    y: rng.gen(),
                    width: rng.gen(),
                    height: rng.gen(),
                },
            ],
        }
    );

    cycle(&segment);
}

#[test]
fn test_pds_cycle() {

    let mut rng = thread_rng();
    let entries = (0..=255u8)
        .map(|id| {
            (
                id,
                PaletteEntry {
                    y: rng.gen(),
                    cr: rng.gen(),
                    cb: rng.gen(),
                    alpha: rng.gen(),
                },
            )
        })
        .collect();
    let segment = Segment::PaletteDefinition(
        PaletteDefinitionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            id: rng.gen(),
            version: rng.gen(),
            entries,
        }
    );

    cycle(&segment);
}

#[test]
fn test_ods_cycle_single() {

    let mut rng = thread_rng();
    let mut data = vec![0u8; 1_024];
    rng.fill(&mut data[..]);
    let segment = Segment::ObjectDefinition(
        ObjectDefinitionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            id: rng.gen(),
            version: rng.gen(),
            sequence: Some(ObjectSequence::Both),
            length: 1_028,
            width: rng.gen(),
            height: rng.gen(),
            data,
        }
    );

    cycle(&segment);
}

#[test]
fn test_ods_cycle_middle() {

    let mut rng = thread_rng();
    let mut data = vec![0u8; 2_048];
    rng.fill(&mut data[..]);
    let segment = Segment::ObjectDefinition(
        ObjectDefinitionSegment {
            pts: rng.gen(),
            dts: rng.gen(),
            id: rng.gen(),
            version: rng.gen(),
            sequence: None,
            length: 0,
            width: 0,
            height: 0,
            data,
        }
    );

    cycle(&segment);
}

#[test]
fn test_es_cycle() {

    let mut rng = thread_rng();
    let segment = Segment::End(
        EndSegment {
            pts: rng.gen(),
            dts: rng.gen(),
        }
    );

    cycle(&segment);
}

#[test]
fn test_split_object_small_yields_single() {

    let segments = split_object(4, 0, 320, 240, vec![0x42; 100], 900_000);

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].sequence, Some(ObjectSequence::Both));
    assert_eq!(segments[0].length, 104);
    assert_eq!(segments[0].width, 320);
    assert_eq!(segments[0].height, 240);
}

#[test]
fn test_split_object_large_balances_flags() {

    let data = vec![0x42; ODS_FIRST_MAX_DATA + 2 * ODS_NEXT_MAX_DATA + 10];
    let total = data.len();
    let segments = split_object(4, 0, 1920, 1080, data, 900_000);

    assert_eq!(segments.len(), 4);
    assert_eq!(segments[0].sequence, Some(ObjectSequence::First));
    assert_eq!(segments[0].length, total as u32 + 4);
    assert!(segments[1].sequence.is_none());
    assert!(segments[2].sequence.is_none());
    assert_eq!(segments[3].sequence, Some(ObjectSequence::Last));

    let firsts = segments.iter().filter(|s| s.is_first()).count();
    let lasts = segments.iter().filter(|s| s.is_last()).count();
    assert_eq!(firsts, lasts);

    let reassembled: usize = segments.iter().map(|s| s.data.len()).sum();
    assert_eq!(reassembled, total);

    for segment in &segments {
        cycle(&Segment::ObjectDefinition(segment.clone()));
    }
}
