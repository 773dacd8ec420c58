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

use tally::aggregation::{AggregateFunction, AggregateOperation, AggregationSpec, GroupKey, StreamAggregator};
use tally::Row;

fn key(values: &[&str]) -> GroupKey {
    GroupKey::new(values.iter().map(|v| v.to_string()).collect())
}

fn count_and_sum(column: &str) -> Vec<AggregateOperation> {
    vec![
        AggregateOperation::count(),
        AggregateOperation::on(AggregateFunction::Sum, column),
    ]
}

#[test]
fn test_group_by_one_column_count_and_sum() {
    let spec = AggregationSpec::new(vec!["product".to_string()], count_and_sum("amount"));
    let mut aggregator = StreamAggregator::new(spec);
    let rows = [
        Row::from_pairs([("product", "A"), ("amount", "100")]),
        Row::from_pairs([("product", "A"), ("amount", "200")]),
        Row::from_pairs([("product", "B"), ("amount", "50")]),
    ];
    aggregator.consume(&rows);
    let groups = aggregator.finalize();

    assert_eq!(groups.len(), 2);
    let a = &groups[&key(&["A"])];
    let b = &groups[&key(&["B"])];
    assert_eq!(a.count(), 2);
    assert_eq!(a.sum("amount"), 300.0);
    assert_eq!(a.avg("amount"), 150.0);
    assert_eq!(b.count(), 1);
    assert_eq!(b.sum("amount"), 50.0);

    let keys: Vec<_> = groups.keys().collect();
    assert!(keys[0] < keys[1]);
}

#[test]
fn test_group_by_two_columns() {
    let spec = AggregationSpec::new(
        vec!["product".to_string(), "region".to_string()],
        count_and_sum("amount"),
    );
    let mut aggregator = StreamAggregator::new(spec);
    for (product, region, amount) in [("A", "APAC", "100"), ("A", "APAC", "200"), ("A", "EMEA", "50")] {
        aggregator.accept(&Row::from_pairs([
            ("product", product),
            ("region", region),
            ("amount", amount),
        ]));
    }
    let groups = aggregator.finalize();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&key(&["A", "APAC"])].count(), 2);
    assert_eq!(groups[&key(&["A", "APAC"])].sum("amount"), 300.0);
    assert_eq!(groups[&key(&["A", "EMEA"])].count(), 1);
    assert_eq!(groups[&key(&["A", "EMEA"])].sum("amount"), 50.0);
}

#[test]
fn test_global_aggregate() {
    let spec = AggregationSpec::new(
        vec![],
        vec![
            AggregateOperation::count(),
            AggregateOperation::on(AggregateFunction::Sum, "amount"),
            AggregateOperation::on(AggregateFunction::Min, "amount"),
            AggregateOperation::on(AggregateFunction::Max, "amount"),
        ],
    );
    let mut aggregator = StreamAggregator::new(spec);
    for amount in ["10", "20", "30"] {
        aggregator.accept(&Row::from_pairs([("amount", amount)]));
    }
    let groups = aggregator.finalize();
    assert_eq!(groups.len(), 1);
    let state = &groups[&GroupKey::global()];
    assert_eq!(state.count(), 3);
    assert_eq!(state.sum("amount"), 60.0);
    assert_eq!(state.min("amount"), Some(10.0));
    assert_eq!(state.max("amount"), Some(30.0));
    assert_eq!(state.avg("amount"), 20.0);
}

#[test]
fn test_key_order_independent_of_arrival() {
    let spec = AggregationSpec::new(vec!["x".to_string()], vec![AggregateOperation::count()]);
    let mut aggregator = StreamAggregator::new(spec);
    for x in ["b", "a", "c"] {
        aggregator.accept(&Row::from_pairs([("x", x)]));
    }
    let order: Vec<&str> = aggregator
        .groups()
        .into_iter()
        .map(|(k, _)| k.values()[0].as_str())
        .collect();
    assert_eq!(order, ["a", "b", "c"]);
    let finalized: Vec<String> = aggregator.finalize().into_keys().map(|k| k.values()[0].clone()).collect();
    assert_eq!(finalized, ["a", "b", "c"]);
}

#[test]
fn test_sum_and_avg_together_do_not_double_count() {
    let spec = AggregationSpec::new(
        vec![],
        vec![
            AggregateOperation::on(AggregateFunction::Sum, "amount"),
            AggregateOperation::on(AggregateFunction::Average, "amount"),
        ],
    );
    let mut aggregator = StreamAggregator::new(spec);
    for amount in ["1", "2", "3", "4"] {
        aggregator.accept(&Row::from_pairs([("amount", amount)]));
    }
    let groups = aggregator.finalize();
    let state = &groups[&GroupKey::global()];
    assert_eq!(state.sum("amount"), 10.0);
    assert_eq!(state.avg("amount"), 2.5);
}

#[test]
fn test_unparsable_cells_skip_only_that_reduction() {
    let spec = AggregationSpec::new(
        vec!["g".to_string()],
        vec![
            AggregateOperation::on(AggregateFunction::Sum, "a"),
            AggregateOperation::on(AggregateFunction::Sum, "b"),
        ],
    );
    let mut aggregator = StreamAggregator::new(spec);
    aggregator.accept(&Row::from_pairs([("g", "x"), ("a", "oops"), ("b", "5")]));
    aggregator.accept(&Row::from_pairs([("g", "x"), ("a", "2"), ("b", "")]));
    let groups = aggregator.finalize();
    let state = &groups[&key(&["x"])];
    assert_eq!(state.count(), 2);
    assert_eq!(state.sum("a"), 2.0);
    assert_eq!(state.sum("b"), 5.0);
}

#[test]
fn test_missing_group_column_groups_under_empty_value() {
    let spec = AggregationSpec::new(vec!["region".to_string()], vec![AggregateOperation::count()]);
    let mut aggregator = StreamAggregator::new(spec);
    aggregator.accept(&Row::from_pairs([("product", "A")]));
    aggregator.accept(&Row::from_pairs([("region", ""), ("product", "B")]));
    let groups = aggregator.finalize();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[&key(&[""])].count(), 2);
}
