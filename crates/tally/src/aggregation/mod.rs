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

//! Group-by aggregation and top-N ranking.

pub mod aggregator;
pub mod group_key;
pub mod spec;
pub mod state;
pub mod top_n;

pub use aggregator::StreamAggregator;
pub use group_key::GroupKey;
pub use spec::{
    parse_aggregations, parse_column_list, parse_operation, AggregateFunction, AggregateOperation, AggregationSpec,
    ColumnReduction,
};
pub use state::{AggregationState, ColumnAccumulator, Reduction};
pub use top_n::{Metric, TopN, TopNEntry};
