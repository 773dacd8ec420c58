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

use crate::table::Row;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

impl ComparisonOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "==",
            Self::NotEqual => "!=",
            Self::GreaterThan => ">",
            Self::LessThan => "<",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
        }
    }

    /// Whether the operator needs an ordering, which text values lack.
    pub fn is_ordering(self) -> bool {
        !matches!(self, Self::Equal | Self::NotEqual)
    }

    #[allow(clippy::float_cmp)]
    pub fn compare(self, actual: f64, expected: f64) -> bool {
        match self {
            Self::Equal => actual == expected,
            Self::NotEqual => actual != expected,
            Self::GreaterThan => actual > expected,
            Self::LessThan => actual < expected,
            Self::GreaterThanOrEqual => actual >= expected,
            Self::LessThanOrEqual => actual <= expected,
        }
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub column: String,
    pub operator: ComparisonOperator,
    pub value: FilterValue,
}

impl FilterCondition {
    /// Text values compare the raw cell exactly. Numeric values compare the
    /// trimmed cell, reading blank as `0`; a cell that is not a number fails
    /// the condition.
    pub fn evaluate(&self, row: &Row) -> bool {
        let cell = row.get_or_empty(&self.column);
        match &self.value {
            FilterValue::Text(expected) => match self.operator {
                ComparisonOperator::Equal => cell == expected.as_str(),
                ComparisonOperator::NotEqual => cell != expected.as_str(),
                _ => false,
            },
            FilterValue::Number(expected) => numeric_cell(cell)
                .is_some_and(|actual| self.operator.compare(actual, *expected)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpression {
    Condition(FilterCondition),
    And(Vec<FilterExpression>),
    Or(Vec<FilterExpression>),
}

impl FilterExpression {
    pub fn evaluate(&self, row: &Row) -> bool {
        match self {
            Self::Condition(condition) => condition.evaluate(row),
            Self::And(terms) => terms.iter().all(|term| term.evaluate(row)),
            Self::Or(terms) => terms.iter().any(|term| term.evaluate(row)),
        }
    }

    /// Every column the expression reads, in order of appearance.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Condition(condition) => vec![condition.column.as_str()],
            Self::And(terms) | Self::Or(terms) => {
                terms.iter().flat_map(FilterExpression::columns).collect()
            }
        }
    }
}

fn numeric_cell(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse().ok()
}
