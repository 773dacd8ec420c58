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

use super::{is_padding, QUOTE};
use crate::error::RecordError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldState {
    Start,
    Unquoted,
    Quoted,
    AfterQuote,
}

fn padding(ch: char) -> bool {
    u8::try_from(ch).is_ok_and(is_padding)
}

/// Decodes a raw record and splits it into fields.
pub fn decode_record(record: &[u8], delimiter: u8) -> Result<Vec<String>, RecordError> {
    let text = std::str::from_utf8(record).map_err(|_| RecordError::InvalidUtf8)?;
    parse_record(text, char::from(delimiter))
}

/// Splits one logical record into field values.
///
/// Unquoted fields are trimmed. A field opened with `"` keeps its content
/// verbatim, with `""` standing for a literal quote; only padding may follow
/// the closing quote before the next delimiter.
pub fn parse_record(text: &str, delimiter: char) -> Result<Vec<String>, RecordError> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut state = FieldState::Start;
    let mut quote_start = 0;
    let mut chars = text.chars().enumerate().peekable();
    while let Some((i, ch)) = chars.next() {
        match state {
            FieldState::Start => {
                if ch == delimiter {
                    fields.push(String::new());
                } else if ch == char::from(QUOTE) {
                    state = FieldState::Quoted;
                    quote_start = i + 1;
                } else if !padding(ch) {
                    field.push(ch);
                    state = FieldState::Unquoted;
                }
            }
            FieldState::Unquoted => {
                if ch == delimiter {
                    fields.push(field.trim_end().to_string());
                    field.clear();
                    state = FieldState::Start;
                } else {
                    field.push(ch);
                }
            }
            FieldState::Quoted => {
                if ch != char::from(QUOTE) {
                    field.push(ch);
                } else if chars.peek().is_some_and(|&(_, next)| next == char::from(QUOTE)) {
                    chars.next();
                    field.push(ch);
                } else {
                    state = FieldState::AfterQuote;
                }
            }
            FieldState::AfterQuote => {
                if ch == delimiter {
                    fields.push(std::mem::take(&mut field));
                    state = FieldState::Start;
                } else if !padding(ch) {
                    return Err(RecordError::TextAfterQuote {
                        found: ch,
                        position: i + 1,
                    });
                }
            }
        }
    }
    match state {
        FieldState::Quoted => {
            return Err(RecordError::UnterminatedQuote {
                position: quote_start,
            })
        }
        FieldState::Unquoted => fields.push(field.trim_end().to_string()),
        FieldState::Start | FieldState::AfterQuote => fields.push(field),
    }
    Ok(fields)
}
