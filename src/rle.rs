/*
 * Copyright 2026 pgsup Contributors
 *
 * This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a
 * copy of the MPL was not distributed with this file, You can obtain one at
 * https://mozilla.org/MPL/2.0/.
 *
 * SPDX-License-Identifier: MPL-2.0
 */

//! PGS object run-length coding. Each object line is a sequence of literal
//! non-zero bytes and `0x00`-escaped runs, terminated by `0x00 0x00`.


use thiserror::Error as ThisError;

pub type RleResult<T> = Result<T, RleError>;

/// The error type for RLE decoding.
#[derive(ThisError, Debug)]
pub enum RleError {
    /// The data ends in the middle of an escape sequence.
    #[error("incomplete RLE sequence")]
    IncompleteSequence,
    /// The data ends in the middle of a line.
    #[error("incomplete RLE line")]
    IncompleteLine,
}

const MAX_RUN: usize = 0x3FFF;

/// Encodes an indexed bitmap, one terminated line per bitmap row.
pub fn encode(width: usize, height: usize, data: &[u8]) -> Vec<u8> {

    debug_assert_eq!(data.len(), width * height);

    let mut out = Vec::with_capacity(data.len() / 2);
    for line in data.chunks_exact(width.max(1)) {
        let mut x = 0;
        while x < line.len() {
            let color = line[x];
            let mut run = 1;
            while x + run < line.len() && line[x + run] == color && run < MAX_RUN {
                run += 1;
            }
            encode_run(&mut out, color, run);
            x += run;
        }
        out.push(0x00);
        out.push(0x00);
    }
    out
}

fn encode_run(out: &mut Vec<u8>, color: u8, run: usize) {

    if color != 0 && run <= 2 {
        for _ in 0..run {
            out.push(color);
        }
        return;
    }
    out.push(0x00);
    match (color, run) {
        (0, r) if r <= 0x3F => {
            out.push(r as u8);
        }
        (0, r) => {
            out.push(0x40 | (r >> 8) as u8);
            out.push((r & 0xFF) as u8);
        }
        (c, r) if r <= 0x3F => {
            out.push(0x80 | r as u8);
            out.push(c);
        }
        (c, r) => {
            out.push(0xC0 | (r >> 8) as u8);
            out.push((r & 0xFF) as u8);
            out.push(c);
        }
    }
}

/// Decodes object data back into lines of indexed pixels.
pub fn decode(input: &[u8]) -> RleResult<Vec<Vec<u8>>> {

    let mut output = Vec::<Vec<u8>>::new();
    let mut line = vec![];
    let mut iter = input.iter();

    while let Some(&byte_1) = iter.next() {
        if byte_1 != 0x00 {
            line.push(byte_1);
            continue;
        }
        let &byte_2 = iter.next().ok_or(RleError::IncompleteSequence)?;
        match byte_2 {
            0x00 => {
                output.push(line);
                line = vec![];
            }
            b if b >> 6 == 0 => {
                line.resize(line.len() + (b & 0x3F) as usize, 0);
            }
            b if b >> 6 == 1 => {
                let &byte_3 = iter.next().ok_or(RleError::IncompleteSequence)?;
                let run = ((b as usize & 0x3F) << 8) | byte_3 as usize;
                line.resize(line.len() + run, 0);
            }
            b if b >> 6 == 2 => {
                let &byte_3 = iter.next().ok_or(RleError::IncompleteSequence)?;
                for _ in 0..(b & 0x3F) {
                    line.push(byte_3);
                }
            }
            b => {
                let &byte_3 = iter.next().ok_or(RleError::IncompleteSequence)?;
                let &byte_4 = iter.next().ok_or(RleError::IncompleteSequence)?;
                let run = ((b as usize & 0x3F) << 8) | byte_3 as usize;
                for _ in 0..run {
                    line.push(byte_4);
                }
            }
        }
    }

    if !line.is_empty() {
        return Err(RleError::IncompleteLine);
    }

    Ok(output)
}
