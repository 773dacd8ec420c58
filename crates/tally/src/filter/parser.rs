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

//! Recursive-descent parser for filter expressions.
//!
//! ```text
//! Expr      := OrTerm
//! OrTerm    := AndTerm ( '||' AndTerm )*
//! AndTerm   := Condition ( '&&' Condition )*
//! Condition := Identifier Operator Value
//! Operator  := '==' | '!=' | '>=' | '<=' | '>' | '<'
//! Value     := QuotedString | Number
//! ```
//!
//! Positions in errors are byte offsets into the expression.

use super::ast::{ComparisonOperator, FilterCondition, FilterExpression, FilterValue};
use crate::error::{FilterError, FilterResult};
use crate::table::Header;

const OPERATORS: [(&str, ComparisonOperator); 6] = [
    ("==", ComparisonOperator::Equal),
    ("!=", ComparisonOperator::NotEqual),
    (">=", ComparisonOperator::GreaterThanOrEqual),
    ("<=", ComparisonOperator::LessThanOrEqual),
    (">", ComparisonOperator::GreaterThan),
    ("<", ComparisonOperator::LessThan),
];

pub struct FilterParser<'a> {
    input: &'a str,
    pos: usize,
    header: &'a Header,
}

impl<'a> FilterParser<'a> {
    pub fn new(input: &'a str, header: &'a Header) -> Self {
        Self {
            input,
            pos: 0,
            header,
        }
    }

    pub fn parse(mut self) -> FilterResult<FilterExpression> {
        let expression = self.parse_or()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(FilterError::UnexpectedInput {
                position: self.pos,
                remainder: self.input[self.pos..].to_string(),
            });
        }
        Ok(expression)
    }

    fn parse_or(&mut self) -> FilterResult<FilterExpression> {
        let mut terms = vec![self.parse_and()?];
        loop {
            self.skip_whitespace();
            if !self.consume("||") {
                break;
            }
            terms.push(self.parse_and()?);
        }
        Ok(collapse(terms, FilterExpression::Or))
    }

    fn parse_and(&mut self) -> FilterResult<FilterExpression> {
        let mut terms = vec![self.parse_condition()?];
        loop {
            self.skip_whitespace();
            if !self.consume("&&") {
                break;
            }
            terms.push(self.parse_condition()?);
        }
        Ok(collapse(terms, FilterExpression::And))
    }

    fn parse_condition(&mut self) -> FilterResult<FilterExpression> {
        self.skip_whitespace();
        if self.at_end() {
            return Err(FilterError::UnexpectedEnd { position: self.pos });
        }
        let column_pos = self.pos;
        let column = self.parse_identifier();
        if column.is_empty() {
            return Err(FilterError::ExpectedColumn { position: column_pos });
        }
        if !self.header.contains(column) {
            return Err(FilterError::UnknownColumn {
                column: column.to_string(),
                position: column_pos,
                available: self.header.describe(),
            });
        }
        self.skip_whitespace();
        let operator_pos = self.pos;
        let operator = self.parse_operator()?;
        self.skip_whitespace();
        let value = self.parse_value()?;
        if matches!(value, FilterValue::Text(_)) && operator.is_ordering() {
            return Err(FilterError::StringOrdering {
                column: column.to_string(),
                operator: operator.symbol().to_string(),
                position: operator_pos,
            });
        }
        Ok(FilterExpression::Condition(FilterCondition {
            column: column.to_string(),
            operator,
            value,
        }))
    }

    fn parse_identifier(&mut self) -> &'a str {
        let input = self.input;
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_')
        {
            self.pos += 1;
        }
        &input[start..self.pos]
    }

    fn parse_operator(&mut self) -> FilterResult<ComparisonOperator> {
        for (symbol, operator) in OPERATORS {
            if self.consume(symbol) {
                return Ok(operator);
            }
        }
        Err(FilterError::ExpectedOperator { position: self.pos })
    }

    fn parse_value(&mut self) -> FilterResult<FilterValue> {
        match self.peek() {
            None => Err(FilterError::ExpectedValue { position: self.pos }),
            Some(b'"') => self.parse_string().map(FilterValue::Text),
            Some(_) => self.parse_number().map(FilterValue::Number),
        }
    }

    /// `"..."` with `\"` and `\\` escapes; any other backslash is literal.
    fn parse_string(&mut self) -> FilterResult<String> {
        let start = self.pos;
        self.pos += 1;
        let mut value = String::new();
        let mut chars = self.input[self.pos..].char_indices();
        while let Some((offset, ch)) = chars.next() {
            match ch {
                '"' => {
                    self.pos += offset + 1;
                    return Ok(value);
                }
                '\\' => match chars.clone().next() {
                    Some((_, escaped @ ('"' | '\\'))) => {
                        chars.next();
                        value.push(escaped);
                    }
                    _ => value.push(ch),
                },
                _ => value.push(ch),
            }
        }
        Err(FilterError::UnclosedString { position: start })
    }

    fn parse_number(&mut self) -> FilterResult<f64> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while self.peek().is_some_and(|b| b.is_ascii_digit() || b == b'.') {
            self.pos += 1;
        }
        let literal = &self.input[start..self.pos];
        if literal.is_empty() {
            return Err(FilterError::ExpectedValue { position: start });
        }
        literal.parse().map_err(|_| FilterError::InvalidNumber {
            literal: literal.to_string(),
            position: start,
        })
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn consume(&mut self, token: &str) -> bool {
        if self.input[self.pos..].starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }
}

fn collapse(
    mut terms: Vec<FilterExpression>,
    combine: fn(Vec<FilterExpression>) -> FilterExpression,
) -> FilterExpression {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}
