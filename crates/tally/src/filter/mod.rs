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

pub mod ast;
pub mod parser;

pub use ast::{ComparisonOperator, FilterCondition, FilterExpression, FilterValue};
pub use parser::FilterParser;

use crate::error::FilterResult;
use crate::table::{Header, Row};

/// A pure yes/no decision over one row.
pub trait RowPredicate {
    fn test(&self, row: &Row) -> bool;
}

impl<F> RowPredicate for F
where
    F: Fn(&Row) -> bool,
{
    fn test(&self, row: &Row) -> bool {
        self(row)
    }
}

/// A filter expression validated against a header.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFilter {
    expression: Option<FilterExpression>,
}

impl CompiledFilter {
    pub fn accept_all() -> Self {
        Self { expression: None }
    }

    pub fn expression(&self) -> Option<&FilterExpression> {
        self.expression.as_ref()
    }

    pub fn is_accept_all(&self) -> bool {
        self.expression.is_none()
    }
}

impl RowPredicate for CompiledFilter {
    fn test(&self, row: &Row) -> bool {
        self.expression
            .as_ref()
            .map_or(true, |expression| expression.evaluate(row))
    }
}

/// Parses `expression` and checks every column against `header`.
///
/// A blank expression accepts every row. All validation happens here, so a
/// compiled filter never fails at evaluation time.
pub fn compile(expression: &str, header: &Header) -> FilterResult<CompiledFilter> {
    if expression.trim().is_empty() {
        return Ok(CompiledFilter::accept_all());
    }
    let expression = FilterParser::new(expression, header).parse()?;
    Ok(CompiledFilter {
        expression: Some(expression),
    })
}
