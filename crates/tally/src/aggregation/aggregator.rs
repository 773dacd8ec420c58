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
use crate::aggregation::spec::{AggregationSpec, ColumnReduction};
use crate::aggregation::state::AggregationState;
use crate::table::Row;
use itertools::Itertools;
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Folds rows into per-group state. Groups live for the whole run.
#[derive(Debug, Clone)]
pub struct StreamAggregator {
    spec: AggregationSpec,
    reductions: Vec<ColumnReduction>,
    index: HashMap<GroupKey, usize>,
    states: Vec<AggregationState>,
    rows_accepted: u64,
}

impl StreamAggregator {
    pub fn new(spec: AggregationSpec) -> Self {
        let reductions = spec.reductions();
        Self {
            spec,
            reductions,
            index: HashMap::new(),
            states: Vec::new(),
            rows_accepted: 0,
        }
    }

    pub fn spec(&self) -> &AggregationSpec {
        &self.spec
    }

    pub fn accept(&mut self, row: &Row) {
        let key = GroupKey::from_row(row, self.spec.group_by());
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = self.states.len();
                trace!(group = %key, slot, "new group");
                self.index.insert(key, slot);
                self.states.push(AggregationState::new());
                slot
            }
        };
        self.states[slot].add_row(row, &self.reductions);
        self.rows_accepted += 1;
    }

    pub fn consume<'a>(&mut self, rows: impl IntoIterator<Item = &'a Row>) {
        for row in rows {
            self.accept(row);
        }
    }

    pub fn rows_accepted(&self) -> u64 {
        self.rows_accepted
    }

    pub fn group_count(&self) -> usize {
        self.states.len()
    }

    /// Current groups in ascending key order.
    pub fn groups(&self) -> Vec<(&GroupKey, &AggregationState)> {
        self.index
            .iter()
            .map(|(key, &slot)| (key, &self.states[slot]))
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .collect()
    }

    pub fn finalize(self) -> BTreeMap<GroupKey, AggregationState> {
        let mut states = self.states;
        self.index
            .into_iter()
            .map(|(key, slot)| (key, std::mem::take(&mut states[slot])))
            .collect()
    }
}
