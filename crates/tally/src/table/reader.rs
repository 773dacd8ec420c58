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

use super::row::{Header, Row};
use super::row_parser::decode_record;
use super::tokenizer::RecordTokenizer;
use super::DEFAULT_DELIMITER;
use crate::error::{RecordError, TableError, TableResult};
use std::cell::Cell;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::iter::FusedIterator;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

const PREVIEW_CHARS: usize = 100;

/// A record that could not be split into fields and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    /// Running malformed count, including this record.
    pub ordinal: u64,
    /// The record text, cut to 100 characters.
    pub preview: String,
    pub reason: RecordError,
}

pub type WarningSink = Box<dyn FnMut(&MalformedRecord)>;

/// Malformed-row count shared between a [`RowStream`] and its caller.
#[derive(Debug, Clone, Default)]
pub struct MalformedCounter(Rc<Cell<u64>>);

impl MalformedCounter {
    pub fn get(&self) -> u64 {
        self.0.get()
    }

    fn increment(&self) -> u64 {
        let next = self.0.get() + 1;
        self.0.set(next);
        next
    }
}

#[derive(Debug, Clone)]
pub struct TableReader {
    delimiter: u8,
    has_header: bool,
}

impl TableReader {
    pub fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER,
            has_header: true,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    pub fn open(&self, path: &Path) -> TableResult<RowStream<BufReader<File>>> {
        let display = path.display().to_string();
        let file = File::open(path).map_err(|source| TableError::Open {
            path: display.clone(),
            source,
        })?;
        let metadata = file.metadata().map_err(|source| TableError::Open {
            path: display.clone(),
            source,
        })?;
        if !metadata.is_file() {
            return Err(TableError::NotAFile { path: display });
        }
        self.from_buf_reader(BufReader::new(file), display)
    }

    pub fn from_reader<R: Read>(
        &self,
        reader: R,
        input: impl Into<String>,
    ) -> TableResult<RowStream<BufReader<R>>> {
        self.from_buf_reader(BufReader::new(reader), input)
    }

    /// Reads the header eagerly and returns a lazy stream over the remaining rows.
    ///
    /// Leading blank records are skipped. An empty input yields an empty
    /// header and no rows; a header that cannot be tokenized is fatal.
    pub fn from_buf_reader<R: BufRead>(
        &self,
        reader: R,
        input: impl Into<String>,
    ) -> TableResult<RowStream<R>> {
        let input = input.into();
        let mut tokenizer = RecordTokenizer::new(reader, self.delimiter);
        let first = loop {
            match tokenizer.next_record() {
                Ok(Some(record)) if is_blank(&record, self.delimiter) => continue,
                Ok(record) => break record,
                Err(source) => return Err(TableError::Io { input, source }),
            }
        };
        let Some(first) = first else {
            debug!(input = %input, "input is empty");
            return Ok(RowStream::new(input, Header::empty(), None, self.delimiter, None));
        };
        let fields = decode_record(&first, self.delimiter).map_err(|source| TableError::Header {
            input: input.clone(),
            source,
        })?;
        let (header, pending) = if self.has_header {
            (Header::new(fields), None)
        } else {
            (Header::synthesized(fields.len()), Some(fields))
        };
        debug!(input = %input, columns = header.len(), "header parsed");
        Ok(RowStream::new(
            input,
            header,
            Some(tokenizer),
            self.delimiter,
            pending,
        ))
    }
}

impl Default for TableReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Lazy, forward-only sequence of rows.
///
/// The underlying reader is dropped as soon as the stream is exhausted, hits
/// an I/O error, is closed, or is itself dropped.
pub struct RowStream<R> {
    input: String,
    header: Arc<Header>,
    tokenizer: Option<RecordTokenizer<R>>,
    delimiter: u8,
    pending: Option<Vec<String>>,
    malformed: MalformedCounter,
    rows_read: u64,
    warning_sink: Option<WarningSink>,
}

impl<R> RowStream<R> {
    fn new(
        input: String,
        header: Header,
        tokenizer: Option<RecordTokenizer<R>>,
        delimiter: u8,
        pending: Option<Vec<String>>,
    ) -> Self {
        Self {
            input,
            header: Arc::new(header),
            tokenizer,
            delimiter,
            pending,
            malformed: MalformedCounter::default(),
            rows_read: 0,
            warning_sink: None,
        }
    }

    /// Receives every skipped record in addition to the `tracing` warning.
    pub fn with_warning_sink(mut self, sink: impl FnMut(&MalformedRecord) + 'static) -> Self {
        self.warning_sink = Some(Box::new(sink));
        self
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn shared_header(&self) -> Arc<Header> {
        Arc::clone(&self.header)
    }

    pub fn malformed_counter(&self) -> MalformedCounter {
        self.malformed.clone()
    }

    pub fn malformed_rows(&self) -> u64 {
        self.malformed.get()
    }

    /// Rows successfully produced so far.
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    pub fn is_closed(&self) -> bool {
        self.tokenizer.is_none() && self.pending.is_none()
    }

    /// Stops reading and releases the underlying reader.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.tokenizer.take().is_some() {
            debug!(
                input = %self.input,
                rows = self.rows_read,
                malformed = self.malformed.get(),
                "input released"
            );
        }
        self.pending = None;
    }

    fn emit(&mut self, fields: Vec<String>) -> Row {
        self.rows_read += 1;
        Row::new(Arc::clone(&self.header), fields)
    }

    fn skip_malformed(&mut self, record: &[u8], reason: RecordError) {
        let ordinal = self.malformed.increment();
        let malformed = MalformedRecord {
            ordinal,
            preview: preview(record),
            reason,
        };
        warn!(
            input = %self.input,
            reason = %malformed.reason,
            "Skipping malformed row #{}: {}",
            ordinal,
            malformed.preview
        );
        if let Some(sink) = self.warning_sink.as_mut() {
            sink(&malformed);
        }
    }
}

impl<R: BufRead> Iterator for RowStream<R> {
    type Item = TableResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(fields) = self.pending.take() {
            return Some(Ok(self.emit(fields)));
        }
        loop {
            let next = self.tokenizer.as_mut()?.next_record();
            match next {
                Ok(Some(record)) if is_blank(&record, self.delimiter) => continue,
                Ok(Some(record)) => match decode_record(&record, self.delimiter) {
                    Ok(fields) => return Some(Ok(self.emit(fields))),
                    Err(reason) => self.skip_malformed(&record, reason),
                },
                Ok(None) => {
                    self.release();
                    return None;
                }
                Err(source) => {
                    self.release();
                    return Some(Err(TableError::Io {
                        input: self.input.clone(),
                        source,
                    }));
                }
            }
        }
    }
}

impl<R: BufRead> FusedIterator for RowStream<R> {}

impl<R> fmt::Debug for RowStream<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowStream")
            .field("input", &self.input)
            .field("header", &self.header)
            .field("open", &self.tokenizer.is_some())
            .field("rows_read", &self.rows_read)
            .field("malformed", &self.malformed.get())
            .finish_non_exhaustive()
    }
}

/// Whitespace-only and free of delimiters. With a tab delimiter, `\t` is a
/// row of empty fields.
fn is_blank(record: &[u8], delimiter: u8) -> bool {
    record
        .iter()
        .all(|&b| b != delimiter && b.is_ascii_whitespace())
}

fn preview(record: &[u8]) -> String {
    let text = String::from_utf8_lossy(record);
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text.into_owned()
    }
}
