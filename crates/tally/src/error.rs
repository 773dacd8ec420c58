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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Table error: {0}")]
    Table(#[from] TableError),
    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("Aggregation error: {0}")]
    Aggregation(#[from] AggregationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum TableError {
    #[error("Failed to open input '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Input '{path}' is not a regular file")]
    NotAFile { path: String },
    #[error("I/O error while reading '{input}': {source}")]
    Io {
        input: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse header of '{input}': {source}")]
    Header {
        input: String,
        #[source]
        source: RecordError,
    },
    #[error("Input '{input}' has no header row; pass has_header = false for headerless files")]
    EmptyHeader { input: String },
}

/// Why a single logical record could not be split into fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("unterminated quoted field starting at column {position}")]
    UnterminatedQuote { position: usize },
    #[error("unexpected character '{found}' after closing quote at column {position}")]
    TextAfterQuote { found: char, position: usize },
    #[error("record is not valid UTF-8")]
    InvalidUtf8,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Unknown column in filter: '{column}' at position {position}. Available columns: {available}")]
    UnknownColumn {
        column: String,
        position: usize,
        available: String,
    },
    #[error("Expected column name at position {position}")]
    ExpectedColumn { position: usize },
    #[error("Expected operator (==, !=, >, <, >=, <=) at position {position}")]
    ExpectedOperator { position: usize },
    #[error("Expected value (string or number) at position {position}")]
    ExpectedValue { position: usize },
    #[error("Unclosed string literal starting at position {position}")]
    UnclosedString { position: usize },
    #[error("Invalid number '{literal}' at position {position}")]
    InvalidNumber { literal: String, position: usize },
    #[error("String comparison on column '{column}' only supports == and !=, found '{operator}' at position {position}")]
    StringOrdering {
        column: String,
        operator: String,
        position: usize,
    },
    #[error("Unexpected input at position {position}: '{remainder}'")]
    UnexpectedInput { position: usize, remainder: String },
    #[error("Unexpected end of expression at position {position}")]
    UnexpectedEnd { position: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Unknown column in aggregation: '{column}'. Available: {available}")]
    UnknownColumn { column: String, available: String },
    #[error("Group-by column not in input: '{column}'. Available: {available}")]
    UnknownGroupByColumn { column: String, available: String },
    #[error("Unrecognised aggregation '{token}'; expected count, sum(col), avg(col), min(col) or max(col)")]
    UnrecognisedToken { token: String },
    #[error("Unknown top-N metric '{metric}'; expected count, sum_<col>, avg_<col>, min_<col> or max_<col>")]
    UnknownMetric { metric: String },
    #[error("Top-N metric '{metric}' refers to unknown column '{column}'. Available: {available}")]
    UnknownMetricColumn {
        metric: String,
        column: String,
        available: String,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse configuration file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Delimiter must be a single character, got '{value}'")]
    InvalidDelimiter { value: String },
    #[error("Delimiter '{delimiter}' cannot be a quote or line break")]
    ReservedDelimiter { delimiter: char },
    #[error("Missing required configuration: {field}")]
    MissingRequired { field: String },
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
pub type TableResult<T> = std::result::Result<T, TableError>;
pub type FilterResult<T> = std::result::Result<T, FilterError>;
pub type AggregationResult<T> = std::result::Result<T, AggregationError>;
