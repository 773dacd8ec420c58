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

use tally::filter::{compile, FilterExpression, RowPredicate};
use tally::{FilterError, Header, Row};

fn header() -> Header {
    Header::new(vec!["region".to_string(), "amount".to_string(), "product".to_string()])
}

fn row(pairs: &[(&str, &str)]) -> Row {
    Row::from_pairs(pairs.iter().copied())
}

fn accepts(expression: &str, pairs: &[(&str, &str)]) -> bool {
    compile(expression, &header()).unwrap().test(&row(pairs))
}

#[test]
fn test_string_equality_and_inequality() {
    assert!(accepts("region==\"APAC\"", &[("region", "APAC"), ("amount", "100")]));
    assert!(!accepts("region==\"APAC\"", &[("region", "EMEA"), ("amount", "100")]));
    assert!(accepts("region!=\"EMEA\"", &[("region", "APAC")]));
    assert!(!accepts("region!=\"EMEA\"", &[("region", "EMEA")]));
}

#[test]
fn test_string_equality_is_exact() {
    assert!(!accepts("region==\"APAC\"", &[("region", "apac")]));
    assert!(!accepts("region==\"APAC\"", &[("region", " APAC")]));
    assert!(accepts("region==\"\"", &[("amount", "1")]));
}

#[test]
fn test_numeric_comparisons() {
    assert!(accepts("amount>1000", &[("amount", "1500")]));
    assert!(!accepts("amount>1000", &[("amount", "500")]));
    assert!(!accepts("amount>1000", &[("amount", "1000")]));
    assert!(accepts("amount<=500", &[("amount", "500")]));
    assert!(accepts("amount<=500", &[("amount", "100")]));
    assert!(!accepts("amount<=500", &[("amount", "501")]));
    assert!(accepts("amount >= -2.5", &[("amount", " -2.5 ")]));
    assert!(accepts("amount == 0", &[("amount", "")]));
    assert!(!accepts("amount > 0", &[("amount", "lots")]));
    assert!(!accepts("amount != 0", &[("amount", "lots")]));
}

#[test]
fn test_and_binds_tighter_than_or() {
    let expression = "region==\"APAC\" && amount>1000 || product==\"X\"";
    assert!(accepts(expression, &[("region", "APAC"), ("amount", "1500"), ("product", "Y")]));
    assert!(accepts(expression, &[("region", "EMEA"), ("amount", "1"), ("product", "X")]));
    assert!(!accepts(expression, &[("region", "APAC"), ("amount", "1"), ("product", "Y")]));

    let compiled = compile(expression, &header()).unwrap();
    assert!(matches!(compiled.expression(), Some(FilterExpression::Or(terms)) if terms.len() == 2));
}

#[test]
fn test_combined_and_scenario() {
    let expression = "region==\"APAC\" && amount>1000";
    assert!(accepts(expression, &[("region", "APAC"), ("amount", "1500")]));
    assert!(!accepts(expression, &[("region", "APAC"), ("amount", "500")]));
    assert!(!accepts(expression, &[("region", "EMEA"), ("amount", "1500")]));
}

#[test]
fn test_combined_or() {
    let expression = "region==\"APAC\" || region==\"EMEA\"";
    assert!(accepts(expression, &[("region", "APAC")]));
    assert!(accepts(expression, &[("region", "EMEA")]));
    assert!(!accepts(expression, &[("region", "LATAM")]));
}

#[test]
fn test_escaped_quotes_in_literals() {
    assert!(accepts(r#"product=="say \"hi\"""#, &[("product", "say \"hi\"")]));
    assert!(accepts(r#"product=="a\\b""#, &[("product", "a\\b")]));
}

#[test]
fn test_unknown_column_fails_fast() {
    let err = compile("unknown==\"x\"", &header()).unwrap_err();
    assert!(matches!(err, FilterError::UnknownColumn { ref column, .. } if column == "unknown"));
    assert!(err.to_string().contains("[region, amount, product]"));

    let err = compile("region==\"APAC\" && foo>1", &header()).unwrap_err();
    assert!(matches!(err, FilterError::UnknownColumn { ref column, .. } if column == "foo"));
}

#[test]
fn test_grammar_errors() {
    let h = header();
    assert!(matches!(compile("region > \"APAC\"", &h), Err(FilterError::StringOrdering { .. })));
    assert!(matches!(compile("region == \"APAC", &h), Err(FilterError::UnclosedString { .. })));
    assert!(matches!(compile("region \"APAC\"", &h), Err(FilterError::ExpectedOperator { .. })));
    assert!(matches!(compile("region ==", &h), Err(FilterError::ExpectedValue { .. }) | Err(FilterError::UnexpectedEnd { .. })));
    assert!(matches!(compile("amount > 1 2", &h), Err(FilterError::UnexpectedInput { .. })));
    assert!(compile("amount > 1 &&", &h).is_err());
    assert!(compile("(amount > 1)", &h).is_err());
}

#[test]
fn test_blank_expression_accepts_everything() {
    for expression in ["", "   "] {
        let compiled = compile(expression, &header()).unwrap();
        assert!(compiled.is_accept_all());
        assert!(compiled.test(&row(&[("region", "X")])));
    }
}

#[test]
fn test_closures_are_predicates() {
    let big = |row: &Row| row.get("amount").is_some_and(|v| v.len() > 3);
    assert!(big.test(&row(&[("amount", "10000")])));
    assert!(!big.test(&row(&[("amount", "1")])));
}
