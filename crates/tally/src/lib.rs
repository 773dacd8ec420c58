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

//! Streaming analytics over delimited text tables.
//!
//! Rows are read lazily, filtered by a compiled expression, folded into
//! per-group accumulators and ranked, all in one forward pass. Memory grows
//! with the number of distinct groups, not with the number of rows.

pub mod aggregation;
pub mod config;
pub mod error;
pub mod filter;
pub mod pipeline;
pub mod table;

pub use aggregation::{
    AggregateFunction, AggregateOperation, AggregationSpec, AggregationState, GroupKey, Metric, StreamAggregator,
    TopN, TopNEntry,
};
pub use config::AnalyticsConfig;
pub use error::{AggregationError, AnalyticsError, ConfigError, FilterError, RecordError, Result, TableError};
pub use filter::{compile, CompiledFilter, FilterExpression, RowPredicate};
pub use pipeline::{run, AnalyticsResult, Pipeline};
pub use table::{Header, Row, RowStream, TableReader};
