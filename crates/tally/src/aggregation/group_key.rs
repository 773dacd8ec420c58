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

use crate::table::Row;
use serde::Serialize;
use std::fmt;

/// Grouping values of one row, in group-by column order.
///
/// Ordering is lexicographic over the values; a key that is a prefix of
/// another sorts first. The empty key is the global group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(Vec<String>);

impl GroupKey {
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    pub fn global() -> Self {
        Self(Vec::new())
    }

    /// Absent columns contribute `""`.
    pub fn from_row(row: &Row, group_by: &[String]) -> Self {
        Self(
            group_by
                .iter()
                .map(|column| row.get_or_empty(column).to_string())
                .collect(),
        )
    }

    pub fn values(&self) -> &[String] {
        &self.0
    }

    pub fn is_global(&self) -> bool {
        self.0.is_empty()
    }

    /// Pairs each value with its group-by column name.
    pub fn labelled<'a>(&'a self, group_by: &'a [String]) -> impl Iterator<Item = (&'a str, &'a str)> {
        group_by
            .iter()
            .zip(self.0.iter())
            .map(|(column, value)| (column.as_str(), value.as_str()))
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_global() {
            f.write_str("(global)")
        } else {
            f.write_str(&self.0.join(", "))
        }
    }
}

impl From<Vec<String>> for GroupKey {
    fn from(values: Vec<String>) -> Self {
        Self(values)
    }
}
