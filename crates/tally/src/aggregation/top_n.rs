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

use crate::aggregation::group_key::GroupKey;
use crate::aggregation::spec::{AggregateFunction, AggregateOperation, FUNCTION_CALL};
use crate::aggregation::state::AggregationState;
use crate::error::{AggregationError, AggregationResult};
use crate::table::Header;
use std::fmt;

/// What the top-N selection ranks groups by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Metric {
    #[default]
    Count,
    Sum(String),
    Average(String),
    Min(String),
    Max(String),
    Unknown(String),
}

impl Metric {
    /// Accepts `count`, `sum_<col>` style names and `sum(col)` style calls.
    /// Anything else becomes `Unknown`.
    pub fn parse(name: &str) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case("count") {
            return Metric::Count;
        }
        if let Some(captures) = FUNCTION_CALL.captures(name) {
            if let Some(function) = AggregateFunction::from_name(&captures[1]) {
                return Self::from_parts(function, captures[2].to_string());
            }
        }
        if let Some((prefix, column)) = name.split_once('_') {
            if !column.is_empty() {
                if let Some(function) = AggregateFunction::from_name(prefix) {
                    if function != AggregateFunction::Count {
                        return Self::from_parts(function, column.to_string());
                    }
                }
            }
        }
        Metric::Unknown(name.to_string())
    }

    fn from_parts(function: AggregateFunction, column: String) -> Self {
        match function {
            AggregateFunction::Count => Metric::Count,
            AggregateFunction::Sum => Metric::Sum(column),
            AggregateFunction::Average => Metric::Average(column),
            AggregateFunction::Min => Metric::Min(column),
            AggregateFunction::Max => Metric::Max(column),
        }
    }

    pub fn column(&self) -> Option<&str> {
        match self {
            Metric::Sum(c) | Metric::Average(c) | Metric::Min(c) | Metric::Max(c) => Some(c.as_str()),
            Metric::Count | Metric::Unknown(_) => None,
        }
    }

    /// The aggregation that must run for this metric to be meaningful.
    pub fn operation(&self) -> Option<AggregateOperation> {
        let (function, column) = match self {
            Metric::Count => return Some(AggregateOperation::count()),
            Metric::Sum(c) => (AggregateFunction::Sum, c),
            Metric::Average(c) => (AggregateFunction::Average, c),
            Metric::Min(c) => (AggregateFunction::Min, c),
            Metric::Max(c) => (AggregateFunction::Max, c),
            Metric::Unknown(_) => return None,
        };
        Some(AggregateOperation::on(function, column.clone()))
    }

    /// Underscore-style name, e.g. `sum_amount`.
    pub fn name(&self) -> String {
        match self {
            Metric::Unknown(raw) => raw.clone(),
            _ => self
                .operation()
                .map(|op| op.metric_name())
                .unwrap_or_default(),
        }
    }

    /// Unknown metrics and unobserved min/max read as negative infinity.
    pub fn value(&self, state: &AggregationState) -> f64 {
        match self {
            Metric::Count => state.count() as f64,
            Metric::Sum(c) => state.sum(c),
            Metric::Average(c) => state.avg(c),
            Metric::Min(c) => state.min(c).unwrap_or(f64::NEG_INFINITY),
            Metric::Max(c) => state.max(c).unwrap_or(f64::NEG_INFINITY),
            Metric::Unknown(_) => f64::NEG_INFINITY,
        }
    }

    pub fn validate(&self, header: &Header) -> AggregationResult<()> {
        match self {
            Metric::Unknown(metric) => Err(AggregationError::UnknownMetric {
                metric: metric.clone(),
            }),
            _ => match self.column() {
                Some(column) if !header.contains(column) => Err(AggregationError::UnknownMetricColumn {
                    metric: self.name(),
                    column: column.to_string(),
                    available: header.describe(),
                }),
                _ => Ok(()),
            },
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopNEntry {
    pub group_key: GroupKey,
    pub value: f64,
}

pub struct TopN;

impl TopN {
    /// Ranks groups by `metric` descending, ties by key ascending, and keeps
    /// the first `n`.
    pub fn compute<'a>(
        groups: impl IntoIterator<Item = (&'a GroupKey, &'a AggregationState)>,
        metric: &Metric,
        n: usize,
    ) -> Vec<TopNEntry> {
        if n == 0 {
            return Vec::new();
        }
        let mut entries: Vec<TopNEntry> = groups
            .into_iter()
            .map(|(key, state)| TopNEntry {
                group_key: key.clone(),
                // -0.0 + 0.0 is 0.0, so signed zeros tie
                value: metric.value(state) + 0.0,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.value
                .total_cmp(&a.value)
                .then_with(|| a.group_key.cmp(&b.group_key))
        });
        entries.truncate(n);
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Header {
        Header::new(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(Metric::parse("count"), Metric::Count);
        assert_eq!(Metric::parse("COUNT"), Metric::Count);
        assert_eq!(Metric::parse("sum_amount"), Metric::Sum("amount".to_string()));
        assert_eq!(Metric::parse("avg_unit_price"), Metric::Average("unit_price".to_string()));
        assert_eq!(Metric::parse("min_qty"), Metric::Min("qty".to_string()));
        assert_eq!(Metric::parse("max(qty)"), Metric::Max("qty".to_string()));
        assert_eq!(Metric::parse("median_qty"), Metric::Unknown("median_qty".to_string()));
        assert_eq!(Metric::parse("sum_"), Metric::Unknown("sum_".to_string()));
        assert_eq!(Metric::parse("count_x"), Metric::Unknown("count_x".to_string()));
    }

    #[test]
    fn test_name_round_trips_through_parse() {
        for name in ["count", "sum_amount", "avg_amount", "min_amount", "max_amount"] {
            assert_eq!(Metric::parse(name).name(), name);
        }
        assert_eq!(Metric::parse("sum(amount)").name(), "sum_amount");
    }

    #[test]
    fn test_validate() {
        let h = header(&["amount"]);
        assert!(Metric::Count.validate(&h).is_ok());
        assert!(Metric::parse("sum_amount").validate(&h).is_ok());
        assert_eq!(
            Metric::parse("bogus").validate(&h),
            Err(AggregationError::UnknownMetric {
                metric: "bogus".to_string()
            })
        );
        assert!(matches!(
            Metric::parse("max_price").validate(&h),
            Err(AggregationError::UnknownMetricColumn { ref column, .. }) if column == "price"
        ));
    }

    #[test]
    fn test_unknown_metric_ranks_by_key() {
        let a = GroupKey::new(vec!["b".to_string()]);
        let b = GroupKey::new(vec!["a".to_string()]);
        let state = AggregationState::new();
        let top = TopN::compute([(&a, &state), (&b, &state)], &Metric::Unknown("x".to_string()), 5);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].group_key, b);
        assert_eq!(top[0].value, f64::NEG_INFINITY);
    }

    #[test]
    fn test_zero_n_is_empty() {
        let key = GroupKey::global();
        let state = AggregationState::new();
        assert!(TopN::compute([(&key, &state)], &Metric::Count, 0).is_empty());
    }
}
