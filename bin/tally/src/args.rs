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

use clap::Parser;
use std::path::PathBuf;
use tally::aggregation::parse_column_list;
use tally::config::{parse_delimiter, AnalyticsConfig};
use tally::ConfigError;

#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about = "Filter, group and rank a delimited text table in one streaming pass"
)]
pub struct Args {
    #[arg(long = "input", help = "Path to the input table")]
    pub input: Option<PathBuf>,
    #[arg(
        long = "filter",
        help = "Row filter, e.g. 'region == \"APAC\" && amount > 1000'"
    )]
    pub filter: Option<String>,
    #[arg(long = "group-by", help = "Comma-separated group-by columns")]
    pub group_by: Option<String>,
    #[arg(
        long = "agg",
        help = "Comma-separated aggregations: count, sum(col), avg(col), min(col), max(col)"
    )]
    pub agg: Option<String>,
    #[arg(long = "top-n", help = "Number of groups to rank [default: 10]")]
    pub top_n: Option<usize>,
    #[arg(
        long = "top-n-metric",
        help = "Ranking metric: count, sum_<col>, avg_<col>, min_<col> or max_<col> [default: count]"
    )]
    pub top_n_metric: Option<String>,
    #[arg(long = "output", help = "Write the JSON summary to this path")]
    pub output: Option<PathBuf>,
    #[arg(long = "report", help = "Also write the text report to this path")]
    pub report: Option<PathBuf>,
    #[arg(long = "delimiter", help = "Field delimiter, one character or \\t [default: ,]")]
    pub delimiter: Option<String>,
    #[arg(long = "header", help = "Whether the first record is a header row [default: true]")]
    pub header: Option<bool>,
    #[arg(long = "config", help = "TOML file with defaults; flags override it")]
    pub config: Option<PathBuf>,
    #[arg(long = "debug", default_value_t = false, help = "Enable debug logging")]
    pub debug: bool,
}

impl Args {
    /// Loads `--config` when given, then applies every flag on top.
    pub fn resolve_config(&self) -> Result<AnalyticsConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => AnalyticsConfig::load_from_file(path)?,
            None => AnalyticsConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = Some(input.clone());
        }
        if let Some(filter) = &self.filter {
            config.filter = Some(filter.clone());
        }
        if let Some(group_by) = &self.group_by {
            config.group_by = parse_column_list(group_by);
        }
        if let Some(agg) = &self.agg {
            config.aggregations = parse_column_list(agg);
        }
        if let Some(top_n) = self.top_n {
            config.top_n = top_n;
        }
        if let Some(metric) = &self.top_n_metric {
            config.top_n_metric = metric.clone();
        }
        if let Some(delimiter) = &self.delimiter {
            config.delimiter = parse_delimiter(delimiter)?;
        }
        if let Some(header) = self.header {
            config.has_header = header;
        }
        config.delimiter_byte()?;
        config.input_path()?;
        Ok(config)
    }
}
