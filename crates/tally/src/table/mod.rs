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

pub mod reader;
pub mod row;
pub mod row_parser;
pub mod tokenizer;

pub use reader::{MalformedCounter, MalformedRecord, RowStream, TableReader};
pub use row::{Header, Row};
pub use row_parser::{decode_record, parse_record};
pub use tokenizer::RecordTokenizer;

pub const DEFAULT_DELIMITER: u8 = b',';
pub(crate) const QUOTE: u8 = b'"';

/// Whitespace that may surround a field without becoming part of it.
pub(crate) fn is_padding(byte: u8) -> bool {
    byte == b' ' || byte == b'\t'
}
