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

use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use tally::{AggregateFunction, AnalyticsResult, GroupKey};
use tracing::info;

/// Whole numbers without decimals, everything else with two.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

fn group_label(key: &GroupKey, group_by: &[String]) -> String {
    if key.is_global() {
        return "(global)".to_string();
    }
    key.labelled(group_by)
        .map(|(column, value)| format!("{column}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn ranked_label(key: &GroupKey) -> String {
    if key.is_global() {
        return "(global)".to_string();
    }
    key.values().join(" — ")
}

fn key_fields(key: &GroupKey, group_by: &[String]) -> Map<String, Value> {
    key.labelled(group_by)
        .map(|(column, value)| (column.to_string(), Value::String(value.to_string())))
        .collect()
}

pub fn build_report_text(result: &AnalyticsResult) -> String {
    let mut out = String::new();
    for (key, state) in &result.groups {
        let _ = writeln!(out, "GROUP: {}", group_label(key, &result.group_by));
        let _ = writeln!(out, "count: {}", state.count());
        for operation in &result.aggregations {
            if operation.function == AggregateFunction::Count {
                continue;
            }
            let value = state.value(operation).map_or_else(|| "-".to_string(), format_number);
            let _ = writeln!(out, "{}: {value}", operation.label());
        }
        out.push_str("---\n");
    }
    if !result.top_n.is_empty() {
        let _ = writeln!(out, "TOP {} (by {}):", result.top_n.len(), result.metric);
        for (i, entry) in result.top_n.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. {} — {}",
                i + 1,
                ranked_label(&entry.group_key),
                format_number(entry.value)
            );
        }
    }
    out
}

pub fn build_json_summary(result: &AnalyticsResult) -> Value {
    let groups: Vec<Value> = result
        .groups
        .iter()
        .map(|(key, state)| {
            let mut group = Map::new();
            group.insert("groupKey".to_string(), Value::Object(key_fields(key, &result.group_by)));
            group.insert("count".to_string(), json!(state.count()));
            for operation in &result.aggregations {
                if operation.function == AggregateFunction::Count {
                    continue;
                }
                group.insert(operation.metric_name(), json!(state.value(operation)));
            }
            Value::Object(group)
        })
        .collect();
    let top_n: Vec<Value> = result
        .top_n
        .iter()
        .map(|entry| {
            let mut ranked = Map::new();
            ranked.insert(
                "groupKey".to_string(),
                Value::Object(key_fields(&entry.group_key, &result.group_by)),
            );
            ranked.insert(result.metric.name(), json!(entry.value));
            Value::Object(ranked)
        })
        .collect();
    json!({
        "inputFile": result.input,
        "totalRows": result.total_rows,
        "malformedRows": result.malformed_rows,
        "matchedRows": result.matched_rows,
        "groups": groups,
        "topN": top_n,
    })
}

/// Prints the text report, then writes the optional report and JSON files.
pub fn write_outputs(result: &AnalyticsResult, report_path: Option<&Path>, json_path: Option<&Path>) -> Result<()> {
    let report = build_report_text(result);
    print!("{report}");
    if let Some(path) = report_path {
        fs::write(path, &report).with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }
    if let Some(path) = json_path {
        let summary = serde_json::to_string_pretty(&build_json_summary(result))?;
        fs::write(path, summary).with_context(|| format!("Failed to write JSON summary to {}", path.display()))?;
        info!(path = %path.display(), "JSON summary written");
    }
    Ok(())
}
