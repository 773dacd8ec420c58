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

use crate::aggregation::{
    parse_aggregations, AggregateOperation, AggregationSpec, AggregationState, GroupKey, Metric, StreamAggregator,
    TopN, TopNEntry,
};
use crate::config::AnalyticsConfig;
use crate::error::{Result, TableError};
use crate::filter::{self, RowPredicate};
use crate::table::reader::WarningSink;
use crate::table::{MalformedRecord, RowStream, TableReader};
use std::collections::BTreeMap;
use std::io::{BufRead, Read};
use tracing::{debug, info};

/// Everything one run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyticsResult {
    pub input: String,
    /// Rows parsed plus malformed records.
    pub total_rows: u64,
    pub malformed_rows: u64,
    /// Rows that passed the filter.
    pub matched_rows: u64,
    pub group_by: Vec<String>,
    pub aggregations: Vec<AggregateOperation>,
    pub metric: Metric,
    pub groups: BTreeMap<GroupKey, AggregationState>,
    pub top_n: Vec<TopNEntry>,
}

impl AnalyticsResult {
    pub fn parsed_rows(&self) -> u64 {
        self.total_rows - self.malformed_rows
    }
}

/// Wires reader, filter, aggregator and top-N together for one config.
pub struct Pipeline {
    config: AnalyticsConfig,
    on_malformed: Option<WarningSink>,
}

impl Pipeline {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self {
            config,
            on_malformed: None,
        }
    }

    /// Called once per malformed record, after the warning is logged.
    pub fn on_malformed(mut self, hook: impl FnMut(&MalformedRecord) + 'static) -> Self {
        self.on_malformed = Some(Box::new(hook));
        self
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    fn table_reader(&self) -> Result<TableReader> {
        Ok(TableReader::new()
            .with_delimiter(self.config.delimiter_byte()?)
            .with_headers(self.config.has_header))
    }

    /// Runs against the file named by `input`.
    pub fn run(self) -> Result<AnalyticsResult> {
        let path = self.config.input_path()?.to_path_buf();
        let stream = self.table_reader()?.open(&path)?;
        self.run_stream(stream)
    }

    pub fn run_reader<R: Read>(self, reader: R, input: &str) -> Result<AnalyticsResult> {
        let stream = self.table_reader()?.from_reader(reader, input)?;
        self.run_stream(stream)
    }

    /// Validates every column reference against the header, then streams the
    /// rows. Nothing is aggregated unless all validation passes.
    fn run_stream<R: BufRead>(mut self, stream: RowStream<R>) -> Result<AnalyticsResult> {
        let header = stream.shared_header();
        let input = stream.input().to_string();
        if header.is_empty() {
            return Err(TableError::EmptyHeader { input }.into());
        }

        let mut spec = AggregationSpec::new(
            self.config.group_by.clone(),
            parse_aggregations(&self.config.aggregation_list(), &header)?,
        );
        spec.validate(&header)?;
        let filter = filter::compile(self.config.filter.as_deref().unwrap_or_default(), &header)?;
        let metric = Metric::parse(&self.config.top_n_metric);
        metric.validate(&header)?;
        let aggregations = spec.aggregations().to_vec();
        if let Some(operation) = metric.operation() {
            if !spec.contains(&operation) {
                debug!(metric = %metric, "tracking metric aggregation");
                spec.push(operation);
            }
        }

        info!(
            input = %input,
            columns = header.len(),
            group_by = ?spec.group_by(),
            filtered = !filter.is_accept_all(),
            "aggregation started"
        );

        let mut stream = match self.on_malformed.take() {
            Some(hook) => stream.with_warning_sink(hook),
            None => stream,
        };
        let malformed = stream.malformed_counter();
        let mut aggregator = StreamAggregator::new(spec);
        let mut parsed = 0u64;
        let mut matched = 0u64;
        for row in &mut stream {
            let row = row?;
            parsed += 1;
            if filter.test(&row) {
                matched += 1;
                aggregator.accept(&row);
            }
        }
        stream.close();

        let malformed_rows = malformed.get();
        let group_by = aggregator.spec().group_by().to_vec();
        let groups = aggregator.finalize();
        let top_n = TopN::compute(&groups, &metric, self.config.top_n);
        info!(
            input = %input,
            rows = parsed,
            malformed = malformed_rows,
            matched,
            groups = groups.len(),
            "aggregation finished"
        );

        Ok(AnalyticsResult {
            input,
            total_rows: parsed + malformed_rows,
            malformed_rows,
            matched_rows: matched,
            group_by,
            aggregations,
            metric,
            groups,
            top_n,
        })
    }
}

/// Runs `config` against its configured input file.
pub fn run(config: AnalyticsConfig) -> Result<AnalyticsResult> {
    Pipeline::new(config).run()
}
