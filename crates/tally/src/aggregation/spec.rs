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

use crate::aggregation::state::Reduction;
use crate::error::{AggregationError, AggregationResult};
use crate::table::Header;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

pub(crate) static FUNCTION_CALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)(sum|avg|min|max)\s*\(\s*([A-Za-z0-9_]+)\s*\)$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFunction {
    Count,
    Sum,
    #[serde(rename = "avg")]
    Average,
    Min,
    Max,
}

impl AggregateFunction {
    pub fn name(self) -> &'static str {
        match self {
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Average => "avg",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "count" => Some(AggregateFunction::Count),
            "sum" => Some(AggregateFunction::Sum),
            "avg" => Some(AggregateFunction::Average),
            "min" => Some(AggregateFunction::Min),
            "max" => Some(AggregateFunction::Max),
            _ => None,
        }
    }

    /// The running accumulation this function reads from. Average shares the
    /// sum with Sum and divides by the group count when read.
    pub fn reduction(self) -> Option<Reduction> {
        match self {
            AggregateFunction::Count => None,
            AggregateFunction::Sum | AggregateFunction::Average => Some(Reduction::Sum),
            AggregateFunction::Min => Some(Reduction::Min),
            AggregateFunction::Max => Some(Reduction::Max),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One requested aggregation: `count`, or a function over a column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregateOperation {
    pub function: AggregateFunction,
    pub column: Option<String>,
}

impl AggregateOperation {
    pub fn count() -> Self {
        Self {
            function: AggregateFunction::Count,
            column: None,
        }
    }

    pub fn on(function: AggregateFunction, column: impl Into<String>) -> Self {
        if function == AggregateFunction::Count {
            return Self::count();
        }
        Self {
            function,
            column: Some(column.into()),
        }
    }

    /// Call-style label, e.g. `sum(amount)`.
    pub fn label(&self) -> String {
        match &self.column {
            Some(column) => format!("{}({})", self.function.name(), column),
            None => self.function.name().to_string(),
        }
    }

    /// Underscore-style name used for metrics and JSON fields, e.g. `sum_amount`.
    pub fn metric_name(&self) -> String {
        match &self.column {
            Some(column) => format!("{}_{}", self.function.name(), column),
            None => self.function.name().to_string(),
        }
    }
}

impl fmt::Display for AggregateOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A numeric reduction over one column, deduplicated across operations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnReduction {
    pub column: String,
    pub reduction: Reduction,
}

/// Group-by columns plus the aggregations to compute per group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationSpec {
    group_by: Vec<String>,
    aggregations: Vec<AggregateOperation>,
}

impl AggregationSpec {
    pub fn new(group_by: Vec<String>, aggregations: Vec<AggregateOperation>) -> Self {
        Self {
            group_by,
            aggregations,
        }
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    pub fn aggregations(&self) -> &[AggregateOperation] {
        &self.aggregations
    }

    pub fn contains(&self, operation: &AggregateOperation) -> bool {
        self.aggregations.contains(operation)
    }

    pub fn push(&mut self, operation: AggregateOperation) {
        if !self.contains(&operation) {
            self.aggregations.push(operation);
        }
    }

    /// Checks every group-by and aggregation column against `header`.
    pub fn validate(&self, header: &Header) -> AggregationResult<()> {
        for column in &self.group_by {
            if !header.contains(column) {
                return Err(AggregationError::UnknownGroupByColumn {
                    column: column.clone(),
                    available: header.describe(),
                });
            }
        }
        for column in self.aggregations.iter().filter_map(|op| op.column.as_ref()) {
            if !header.contains(column) {
                return Err(AggregationError::UnknownColumn {
                    column: column.clone(),
                    available: header.describe(),
                });
            }
        }
        Ok(())
    }

    /// The distinct column reductions the aggregations need. `sum(x)` and
    /// `avg(x)` together yield a single `Sum` over `x`.
    pub fn reductions(&self) -> Vec<ColumnReduction> {
        self.aggregations
            .iter()
            .filter_map(|op| {
                let reduction = op.function.reduction()?;
                let column = op.column.clone()?;
                Some(ColumnReduction { column, reduction })
            })
            .unique()
            .collect()
    }
}

/// Parses one token such as `count` or `SUM( amount )`.
pub fn parse_operation(token: &str) -> Option<AggregateOperation> {
    let token = token.trim();
    if token.eq_ignore_ascii_case("count") {
        return Some(AggregateOperation::count());
    }
    let captures = FUNCTION_CALL.captures(token)?;
    let function = AggregateFunction::from_name(&captures[1])?;
    Some(AggregateOperation::on(function, &captures[2]))
}

/// Parses a comma-separated aggregation list and checks its columns against
/// `header`. A blank list means `count`.
pub fn parse_aggregations(spec: &str, header: &Header) -> AggregationResult<Vec<AggregateOperation>> {
    let mut operations = Vec::new();
    for token in spec.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        let operation = parse_operation(token).ok_or_else(|| AggregationError::UnrecognisedToken {
            token: token.to_string(),
        })?;
        if let Some(column) = &operation.column {
            if !header.contains(column) {
                return Err(AggregationError::UnknownColumn {
                    column: column.clone(),
                    available: header.describe(),
                });
            }
        }
        if !operations.contains(&operation) {
            operations.push(operation);
        }
    }
    if operations.is_empty() {
        operations.push(AggregateOperation::count());
    }
    debug!(
        aggregations = %operations.iter().map(AggregateOperation::label).join(", "),
        "parsed aggregations"
    );
    Ok(operations)
}

/// Splits a comma-separated column list, dropping blanks.
pub fn parse_column_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(names: &[&str]) -> Header {
        Header::new(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn test_parse_count_and_functions() {
        let h = header(&["amount", "qty"]);
        let ops = parse_aggregations("count, sum(amount), AVG( qty ), min(amount),Max(qty)", &h).unwrap();
        assert_eq!(
            ops,
            vec![
                AggregateOperation::count(),
                AggregateOperation::on(AggregateFunction::Sum, "amount"),
                AggregateOperation::on(AggregateFunction::Average, "qty"),
                AggregateOperation::on(AggregateFunction::Min, "amount"),
                AggregateOperation::on(AggregateFunction::Max, "qty"),
            ]
        );
    }

    #[test]
    fn test_blank_spec_defaults_to_count() {
        let h = header(&["amount"]);
        assert_eq!(parse_aggregations("", &h).unwrap(), vec![AggregateOperation::count()]);
        assert_eq!(parse_aggregations(" , ", &h).unwrap(), vec![AggregateOperation::count()]);
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let h = header(&["amount"]);
        let err = parse_aggregations("sum(price)", &h).unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnknownColumn {
                column: "price".to_string(),
                available: "[amount]".to_string(),
            }
        );
    }

    #[test]
    fn test_unrecognised_token_is_rejected() {
        let h = header(&["amount"]);
        let err = parse_aggregations("count,median(amount)", &h).unwrap_err();
        assert_eq!(
            err,
            AggregationError::UnrecognisedToken {
                token: "median(amount)".to_string()
            }
        );
    }

    #[test]
    fn test_duplicates_collapse() {
        let h = header(&["amount"]);
        let ops = parse_aggregations("sum(amount),SUM(amount)", &h).unwrap();
        assert_eq!(ops.len(), 1);
    }

    #[test]
    fn test_sum_and_avg_share_one_reduction() {
        let spec = AggregationSpec::new(
            vec![],
            vec![
                AggregateOperation::count(),
                AggregateOperation::on(AggregateFunction::Sum, "amount"),
                AggregateOperation::on(AggregateFunction::Average, "amount"),
                AggregateOperation::on(AggregateFunction::Max, "amount"),
            ],
        );
        assert_eq!(
            spec.reductions(),
            vec![
                ColumnReduction {
                    column: "amount".to_string(),
                    reduction: Reduction::Sum
                },
                ColumnReduction {
                    column: "amount".to_string(),
                    reduction: Reduction::Max
                },
            ]
        );
    }

    #[test]
    fn test_validate_reports_group_by_column() {
        let spec = AggregationSpec::new(vec!["nonexistent_col".to_string()], vec![AggregateOperation::count()]);
        let err = spec.validate(&header(&["a", "b"])).unwrap_err();
        assert!(matches!(err, AggregationError::UnknownGroupByColumn { ref column, .. } if column == "nonexistent_col"));
    }

    #[test]
    fn test_labels() {
        let op = AggregateOperation::on(AggregateFunction::Average, "amount");
        assert_eq!(op.label(), "avg(amount)");
        assert_eq!(op.metric_name(), "avg_amount");
        assert_eq!(AggregateOperation::count().metric_name(), "count");
    }

    #[test]
    fn test_parse_column_list() {
        assert_eq!(parse_column_list(" product , region,,"), vec!["product", "region"]);
        assert!(parse_column_list("").is_empty());
    }
}
