/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! Post-hoc decoder-model verification of an emitted stream. Bandwidth
//! excesses are reported as warnings; buffer overruns and malformed palettes
//! mark the stream non-compliant. The stream is emitted either way.

use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::displayset::Epoch;
use crate::segment::{CompositionState, Segment};
use crate::timing::PgDecoder;
use crate::ts_to_timestamp;

/// The verdict over a stream: `compliant` is withdrawn on defects that crash
/// hardware decoders, `warnings` counts bandwidth excesses that merely risk
/// losing sync.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ComplianceReport {
    pub compliant: bool,
    pub warnings: u32,
}

/// Wire size of a segment: the 13-byte header plus its body.
fn coded_size(segment: &Segment) -> u64 {
    let body = match segment {
        Segment::PresentationComposition(pcs) => {
            11 + pcs
                .composition_objects
                .iter()
                .map(|co| if co.crop.is_some() { 16u64 } else { 8 })
                .sum::<u64>()
        }
        Segment::WindowDefinition(wds) => 1 + 9 * wds.windows.len() as u64,
        Segment::PaletteDefinition(pds) => 2 + 5 * pds.entries.len() as u64,
        Segment::ObjectDefinition(ods) => {
            4 + if ods.is_first() { 7 } else { 0 } + ods.data.len() as u64
        }
        Segment::End(_) => 0,
    };
    13 + body
}

/// Checks every epoch of a stream against the PG decoder's limits.
pub fn check(epochs: &[Epoch], fps: f64) -> ComplianceReport {

    let mut compliant = true;
    let mut warnings = 0u32;

    let ra_len = fps.round() as usize;
    let mut coded_bw_ra: Vec<u64> = vec![0; ra_len];
    let mut coded_bw_ra_pts: Vec<i64> = vec![-1; ra_len];

    let mut prev_pts: i64 = -1;
    let mut last_cbbw = 0u64;
    let mut last_dbbw = 0u64;
    let mut last_rc = 0.0f64;

    for epoch in epochs {
        let mut ods_acc = 0u64;
        let mut window_area: BTreeMap<u8, u64> = BTreeMap::new();
        let mut objects_sizes: BTreeMap<u16, u64> = BTreeMap::new();
        let mut cumulated_ods_size = 0u64;

        for ds in &epoch.display_sets {
            let mut decoded_this_ds = 0u64;
            let mut coded_this_ds = 0u64;
            let mut areas2gp: BTreeMap<u16, Option<u64>> = BTreeMap::new();

            let current_pts = ds.pcs().pts as i64;

            for seg in &ds.segments {
                match seg {
                    Segment::PresentationComposition(pcs) => {
                        if pcs.composition_state != CompositionState::Normal {
                            // Acquisitions flush the decoded object buffer.
                            ods_acc = 0;
                            objects_sizes.clear();
                        }
                        for cobj in &pcs.composition_objects {
                            let area = cobj
                                .crop
                                .as_ref()
                                .map(|c| c.width as u64 * c.height as u64);
                            areas2gp.insert(cobj.object_id, area);
                        }
                    }
                    Segment::WindowDefinition(wds) => {
                        for w in &wds.windows {
                            window_area
                                .insert(w.id, w.width as u64 * w.height as u64);
                        }
                    }
                    Segment::ObjectDefinition(ods) => {
                        if ods.is_first() {
                            if cumulated_ods_size > 0 {
                                error!(
                                    "a past ODS was not properly terminated, \
                                     stream is critically corrupted"
                                );
                                compliant = false;
                                cumulated_ods_size = 0;
                            }
                            decoded_this_ds += ods.width as u64 * ods.height as u64;
                            objects_sizes
                                .insert(ods.id, ods.width as u64 * ods.height as u64);
                        }
                        coded_this_ds += ods.data.len() as u64;
                        cumulated_ods_size += coded_size(seg) - 2;
                        if ods.is_last() {
                            if cumulated_ods_size > PgDecoder::CODED_BUF_SIZE {
                                warn!(
                                    "object has size >1 MiB at {}, some decoders \
                                     don't support this",
                                    ts_to_timestamp(ods.pts)
                                );
                                warnings += 1;
                            }
                            cumulated_ods_size = 0;
                        }
                    }
                    Segment::PaletteDefinition(pds) => {
                        if pds.id >= 8 {
                            warn!(
                                "using an undefined palette ID at {}",
                                ts_to_timestamp(pds.pts)
                            );
                            compliant = false;
                        }
                    }
                    Segment::End(_) => {}
                }
            }

            let area_copied: u64 = areas2gp
                .iter()
                .map(|(oid, area)| {
                    area.unwrap_or_else(|| {
                        objects_sizes.get(oid).copied().unwrap_or(0)
                    })
                })
                .sum();
            ods_acc += decoded_this_ds;

            let coded_buffer_pts = last_cbbw + coded_this_ds;
            let decoded_buffer_pts = last_dbbw + decoded_this_ds;

            let dt_seconds =
                (current_pts - prev_pts).unsigned_abs() as f64 / PgDecoder::FREQ;
            let (coded_buffer_bandwidth, decoded_buffer_bandwidth) =
                if prev_pts != current_pts {
                    last_cbbw = 0;
                    last_dbbw = 0;
                    (
                        coded_buffer_pts as f64 / dt_seconds,
                        decoded_buffer_pts as f64 / dt_seconds,
                    )
                } else {
                    // Same PTS: accumulate and settle at the next one.
                    last_cbbw = coded_buffer_pts;
                    last_dbbw = decoded_buffer_pts;
                    (0.0, 0.0)
                };

            // Transport packets drain into the coded buffer at RX, at most.
            if coded_buffer_bandwidth > PgDecoder::RX {
                if coded_buffer_bandwidth / PgDecoder::RX >= 2.0 {
                    warn!(
                        "high instantaneous coded bandwidth at {}",
                        ts_to_timestamp(current_pts as u32)
                    );
                } else {
                    info!(
                        "high coded bandwidth at {} (not critical - fair warning)",
                        ts_to_timestamp(current_pts as u32)
                    );
                }
                // Not an issue unless sustained, so not marked non-compliant.
            }

            if prev_pts != current_pts {
                coded_bw_ra.remove(0);
                coded_bw_ra_pts.remove(0);
                coded_bw_ra.push(coded_buffer_pts);
                coded_bw_ra_pts.push(current_pts);
            }

            let ra_span = (coded_bw_ra_pts[ra_len - 1] - coded_bw_ra_pts[0])
                .unsigned_abs() as f64
                / PgDecoder::FREQ;
            if ra_span > 0.0 {
                let rate = coded_bw_ra.iter().sum::<u64>() as f64 / ra_span;
                if rate > PgDecoder::RX {
                    warn!(
                        "exceeding coded bandwidth at ~{}, {:.03}%",
                        ts_to_timestamp(current_pts as u32),
                        100.0 * rate / PgDecoder::RX
                    );
                    warnings += 1;
                }
            }

            if decoded_buffer_bandwidth > PgDecoder::RD {
                warn!(
                    "exceeding decoded buffer bandwidth at {}",
                    ts_to_timestamp(current_pts as u32)
                );
                warnings += 1;
            }

            if ods_acc >= PgDecoder::DECODED_BUF_SIZE {
                warn!(
                    "decoded object buffer overrun at {}",
                    ts_to_timestamp(current_pts as u32)
                );
                compliant = false;
            }

            // A palette update re-colors the existing plane without copying,
            // so it escapes the RC constraint.
            if ds.pcs().palette_update_only {
                prev_pts = current_pts;
                continue;
            }

            let total_windows: u64 = window_area.values().sum();
            let rc = fps * (total_windows + area_copied.min(total_windows)) as f64;
            let nf = if prev_pts >= 0 {
                ((current_pts - prev_pts) as f64 / PgDecoder::FREQ * fps).round()
            } else {
                0.0
            };
            if nf == 0.0 {
                last_rc += rc;
            } else if (last_rc + rc) / nf > PgDecoder::RC {
                warn!(
                    "graphic plane overloaded, graphics may flicker at {}",
                    ts_to_timestamp(current_pts as u32)
                );
                warnings += 1;
            } else {
                last_rc = 0.0;
            }

            prev_pts = current_pts;
        }
    }

    if warnings == 0 && compliant {
        info!("output PGS seems compliant");
    } else if warnings > 0 && compliant {
        warn!("excessive bandwidth detected, requires HW testing (PGS may go out of sync)");
    }
    if !compliant {
        error!("PG stream will crash a hardware decoder");
    }

    ComplianceReport { compliant, warnings }
}
