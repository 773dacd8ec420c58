// SPDX-License-Identifier: AGPL-3.0-only
// Copyright (C) 2024 Jonathan Lee
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License version 3
// as published by the Free Software Foundation.
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
// See the GNU Affero General Public License for more details.
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see https://www.gnu.org/licenses/.

//! Splits a byte stream into logical records.
//!
//! A record ends at `\n` (or `\r\n`) unless the line break sits inside a
//! quoted field, so a quoted cell may span several physical lines. A lone
//! `\r` is kept as data. Quote handling mirrors the row parser: a quote only
//! opens a quoted field at the start of a field, and `""` inside a quoted
//! field is an escaped quote.

use super::{is_padding, QUOTE};
use std::collections::VecDeque;
use std::io::{self, BufRead};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    FieldStart,
    Unquoted,
    Quoted,
    AfterQuote,
}

#[derive(Debug)]
pub struct RecordTokenizer<R> {
    reader: R,
    delimiter: u8,
    replay: VecDeque<u8>,
}

impl<R: BufRead> RecordTokenizer<R> {
    pub fn new(reader: R, delimiter: u8) -> Self {
        Self {
            reader,
            delimiter,
            replay: VecDeque::new(),
        }
    }

    /// Reads the next logical record without its terminator.
    ///
    /// Returns `Ok(None)` at end of stream. When the stream ends inside an
    /// open quote, only the text up to the first line break after that quote
    /// is returned and the remainder is queued to be tokenized again, so one bad quote does
    /// not swallow the rest of the input.
    pub fn next_record(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut record = Vec::new();
        let mut state = ScanState::FieldStart;
        let mut open_quote = 0;
        while let Some(byte) = self.next_byte()? {
            if state != ScanState::Quoted {
                if byte == b'\n' {
                    return Ok(Some(record));
                }
                if byte == b'\r' && self.peek_byte()? == Some(b'\n') {
                    self.next_byte()?;
                    return Ok(Some(record));
                }
            }
            state = match state {
                _ if state != ScanState::Quoted && byte == self.delimiter => ScanState::FieldStart,
                ScanState::FieldStart if byte == QUOTE => {
                    open_quote = record.len();
                    ScanState::Quoted
                }
                ScanState::FieldStart if is_padding(byte) => ScanState::FieldStart,
                ScanState::FieldStart => ScanState::Unquoted,
                ScanState::Quoted if byte == QUOTE => {
                    if self.peek_byte()? == Some(QUOTE) {
                        record.push(byte);
                        self.next_byte()?;
                        ScanState::Quoted
                    } else {
                        ScanState::AfterQuote
                    }
                }
                other => other,
            };
            record.push(byte);
        }
        if record.is_empty() {
            return Ok(None);
        }
        if state == ScanState::Quoted {
            // earlier quoted fields may hold line breaks of their own
            if let Some(split) = record[open_quote..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|offset| open_quote + offset)
            {
                let rest = record.split_off(split + 1);
                record.truncate(split);
                if record.last() == Some(&b'\r') {
                    record.pop();
                }
                self.replay.extend(rest);
            }
        }
        Ok(Some(record))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    fn next_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(byte) = self.replay.pop_front() {
            return Ok(Some(byte));
        }
        let byte = self.peek_reader()?;
        if byte.is_some() {
            self.reader.consume(1);
        }
        Ok(byte)
    }

    fn peek_byte(&mut self) -> io::Result<Option<u8>> {
        if let Some(&byte) = self.replay.front() {
            return Ok(Some(byte));
        }
        self.peek_reader()
    }

    fn peek_reader(&mut self) -> io::Result<Option<u8>> {
        loop {
            match self.reader.fill_buf() {
                Ok(buf) => return Ok(buf.first().copied()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
