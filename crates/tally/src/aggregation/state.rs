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

use crate::aggregation::spec::{AggregateFunction, AggregateOperation, ColumnReduction};
use crate::table::Row;
use serde::Serialize;
use std::collections::HashMap;

/// How a parsed cell value folds into a column accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reduction {
    Sum,
    Min,
    Max,
}

impl Reduction {
    pub fn apply(self, accumulator: &mut ColumnAccumulator, value: f64) {
        match self {
            Reduction::Sum => accumulator.sum += value,
            Reduction::Min => {
                accumulator.min = Some(accumulator.min.map_or(value, |current| current.min(value)));
            }
            Reduction::Max => {
                accumulator.max = Some(accumulator.max.map_or(value, |current| current.max(value)));
            }
        }
    }
}

/// Running sum, min and max over the parsed values of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnAccumulator {
    sum: f64,
    min: Option<f64>,
    max: Option<f64>,
}

impl ColumnAccumulator {
    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }
}

/// Per-group accumulator.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationState {
    count: u64,
    columns: HashMap<String, ColumnAccumulator>,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the row, then folds each reduction whose cell parses as a
    /// finite number. Blank or unparsable cells skip that reduction only.
    pub fn add_row(&mut self, row: &Row, reductions: &[ColumnReduction]) {
        self.count += 1;
        for ColumnReduction { column, reduction } in reductions {
            let Some(value) = parse_numeric(row.get_or_empty(column)) else {
                continue;
            };
            match self.columns.get_mut(column) {
                Some(accumulator) => reduction.apply(accumulator, value),
                None => {
                    let mut accumulator = ColumnAccumulator::default();
                    reduction.apply(&mut accumulator, value);
                    self.columns.insert(column.clone(), accumulator);
                }
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self, column: &str) -> f64 {
        self.columns.get(column).map_or(0.0, ColumnAccumulator::sum)
    }

    /// `sum / count`, or `0` for an empty group.
    pub fn avg(&self, column: &str) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum(column) / self.count as f64
    }

    pub fn min(&self, column: &str) -> Option<f64> {
        self.columns.get(column).and_then(ColumnAccumulator::min)
    }

    pub fn max(&self, column: &str) -> Option<f64> {
        self.columns.get(column).and_then(ColumnAccumulator::max)
    }

    pub fn accumulator(&self, column: &str) -> Option<&ColumnAccumulator> {
        self.columns.get(column)
    }

    /// Reads the value an operation reports. `None` only for min/max with no
    /// observations.
    pub fn value(&self, operation: &AggregateOperation) -> Option<f64> {
        let column = operation.column.as_deref().unwrap_or_default();
        match operation.function {
            AggregateFunction::Count => Some(self.count as f64),
            AggregateFunction::Sum => Some(self.sum(column)),
            AggregateFunction::Average => Some(self.avg(column)),
            AggregateFunction::Min => self.min(column),
            AggregateFunction::Max => self.max(column),
        }
    }
}

fn parse_numeric(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of(column: &str) -> ColumnReduction {
        ColumnReduction {
            column: column.to_string(),
            reduction: Reduction::Sum,
        }
    }

    fn reductions(column: &str) -> Vec<ColumnReduction> {
        [Reduction::Sum, Reduction::Min, Reduction::Max]
            .into_iter()
            .map(|reduction| ColumnReduction {
                column: column.to_string(),
                reduction,
            })
            .collect()
    }

    #[test]
    fn test_count_always_increments() {
        let mut state = AggregationState::new();
        state.add_row(&Row::from_pairs([("amount", "abc")]), &[sum_of("amount")]);
        state.add_row(&Row::from_pairs([("amount", "")]), &[sum_of("amount")]);
        assert_eq!(state.count(), 2);
        assert_eq!(state.sum("amount"), 0.0);
    }

    #[test]
    fn test_min_max_initialised_by_first_value() {
        let mut state = AggregationState::new();
        for v in ["-5", "3", "12.5"] {
            state.add_row(&Row::from_pairs([("amount", v)]), &reductions("amount"));
        }
        assert_eq!(state.min("amount"), Some(-5.0));
        assert_eq!(state.max("amount"), Some(12.5));
        assert_eq!(state.sum("amount"), 10.5);
    }

    #[test]
    fn test_unobserved_min_is_none() {
        let mut state = AggregationState::new();
        state.add_row(&Row::from_pairs([("amount", "n/a")]), &reductions("amount"));
        assert_eq!(state.min("amount"), None);
        assert_eq!(state.max("amount"), None);
    }

    #[test]
    fn test_non_finite_values_are_skipped() {
        let mut state = AggregationState::new();
        for v in ["inf", "NaN", "4"] {
            state.add_row(&Row::from_pairs([("amount", v)]), &reductions("amount"));
        }
        assert_eq!(state.sum("amount"), 4.0);
        assert_eq!(state.max("amount"), Some(4.0));
    }

    #[test]
    fn test_avg_is_sum_over_count() {
        let mut state = AggregationState::new();
        for v in ["10", "20", "x"] {
            state.add_row(&Row::from_pairs([("amount", v)]), &[sum_of("amount")]);
        }
        assert_eq!(state.avg("amount"), 10.0);
        assert_eq!(AggregationState::new().avg("amount"), 0.0);
    }

    #[test]
    fn test_value_dispatches_by_function() {
        let mut state = AggregationState::new();
        state.add_row(&Row::from_pairs([("amount", " 7 ")]), &reductions("amount"));
        assert_eq!(state.value(&AggregateOperation::count()), Some(1.0));
        assert_eq!(
            state.value(&AggregateOperation::on(AggregateFunction::Sum, "amount")),
            Some(7.0)
        );
        assert_eq!(
            state.value(&AggregateOperation::on(AggregateFunction::Min, "other")),
            None
        );
    }
}
