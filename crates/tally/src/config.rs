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

use crate::error::ConfigError;
use crate::table::{DEFAULT_DELIMITER, QUOTE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_METRIC: &str = "count";

/// Settings for one analytics run. Every field has a default, so a TOML file
/// only needs the keys it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    pub input: Option<PathBuf>,
    pub delimiter: char,
    pub has_header: bool,
    pub filter: Option<String>,
    pub group_by: Vec<String>,
    pub aggregations: Vec<String>,
    pub top_n: usize,
    pub top_n_metric: String,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            input: None,
            delimiter: DEFAULT_DELIMITER as char,
            has_header: true,
            filter: None,
            group_by: Vec::new(),
            aggregations: Vec::new(),
            top_n: DEFAULT_TOP_N,
            top_n_metric: DEFAULT_METRIC.to_string(),
        }
    }
}

impl AnalyticsConfig {
    pub fn load_from_file(config_path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.display().to_string(),
            source,
        })?;
        let config: AnalyticsConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: config_path.display().to_string(),
            source,
        })?;
        config.delimiter_byte()?;
        Ok(config)
    }

    /// The delimiter as a single byte. Quotes, line breaks and non-ASCII
    /// characters are rejected.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        let delimiter = self.delimiter;
        if !delimiter.is_ascii() {
            return Err(ConfigError::InvalidDelimiter {
                value: delimiter.to_string(),
            });
        }
        let byte = delimiter as u8;
        if byte == QUOTE || byte == b'\n' || byte == b'\r' {
            return Err(ConfigError::ReservedDelimiter { delimiter });
        }
        Ok(byte)
    }

    /// Aggregation tokens joined back into one list.
    pub fn aggregation_list(&self) -> String {
        self.aggregations.join(",")
    }

    pub fn input_path(&self) -> Result<&Path, ConfigError> {
        self.input.as_deref().ok_or_else(|| ConfigError::MissingRequired {
            field: "input".to_string(),
        })
    }
}

/// Reads a delimiter given on the command line. Accepts one character, or
/// `\t` / `tab` for a tab.
pub fn parse_delimiter(value: &str) -> Result<char, ConfigError> {
    if value == "\\t" || value.eq_ignore_ascii_case("tab") {
        return Ok('\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ConfigError::InvalidDelimiter {
            value: value.to_string(),
        }),
    }
}
