// Tests for the undoable collector library.

use std::collections::BTreeMap;

use crate::collector::{
    average, compose, count, max, min, sum, to_multimap, GroupResult, TupleCollector,
};
use crate::fact::Fact;
use crate::key::IndexKey;
use crate::mapping::TupleValueMapping;
use crate::tuple::{Tuple, TupleIdGen};

#[derive(Debug)]
struct Item {
    value: i64,
    tag: &'static str,
}

fn item_tuple(ids: &mut TupleIdGen, fact_id: u64, value: i64, tag: &'static str) -> Tuple {
    Tuple::of_fact(ids.next(), Fact::new(fact_id, Item { value, tag }))
}

#[test]
fn test_count_accumulate_undo() {
    let collector = count();
    let mut state = collector.new_state();
    let mut ids = TupleIdGen::default();

    let a = item_tuple(&mut ids, 1, 5, "a");
    let b = item_tuple(&mut ids, 2, 3, "b");

    let delta_a = collector.accumulate(&mut state, &a);
    let delta_b = collector.accumulate(&mut state, &b);
    assert_eq!(collector.finish(&state), GroupResult::Int(2));

    collector.undo(&mut state, &delta_a);
    assert_eq!(collector.finish(&state), GroupResult::Int(1));
    collector.undo(&mut state, &delta_b);
    assert_eq!(collector.finish(&state), GroupResult::Int(0));
}

#[test]
fn test_sum_undo_out_of_order() {
    let collector = sum(|i: &Item| i.value);
    let mut state = collector.new_state();
    let mut ids = TupleIdGen::default();

    let a = item_tuple(&mut ids, 1, 5, "a");
    let b = item_tuple(&mut ids, 2, 3, "b");
    let c = item_tuple(&mut ids, 3, 7, "c");

    let delta_a = collector.accumulate(&mut state, &a);
    let delta_b = collector.accumulate(&mut state, &b);
    let delta_c = collector.accumulate(&mut state, &c);
    assert_eq!(collector.finish(&state), GroupResult::Int(15));

    // Deltas for different tuples are independent of undo order.
    collector.undo(&mut state, &delta_b);
    assert_eq!(collector.finish(&state), GroupResult::Int(12));
    collector.undo(&mut state, &delta_a);
    collector.undo(&mut state, &delta_c);
    assert_eq!(collector.finish(&state), GroupResult::Int(0));
}

#[test]
fn test_average_divides_only_at_finish() {
    let collector = average(|i: &Item| i.value);
    let mut state = collector.new_state();
    let mut ids = TupleIdGen::default();

    let delta = collector.accumulate(&mut state, &item_tuple(&mut ids, 1, 1, "a"));
    collector.accumulate(&mut state, &item_tuple(&mut ids, 2, 2, "b"));
    assert_eq!(collector.finish(&state), GroupResult::Float(1.5));

    collector.undo(&mut state, &delta);
    assert_eq!(collector.finish(&state), GroupResult::Float(2.0));
}

#[test]
fn test_min_max_reveal_next_value_on_undo() {
    let min_collector = min(|i: &Item| i.value);
    let max_collector = max(|i: &Item| i.value);
    let mut min_state = min_collector.new_state();
    let mut max_state = max_collector.new_state();
    let mut ids = TupleIdGen::default();

    let low = item_tuple(&mut ids, 1, -4, "low");
    let mid = item_tuple(&mut ids, 2, 2, "mid");
    let high = item_tuple(&mut ids, 3, 9, "high");

    let min_low = min_collector.accumulate(&mut min_state, &low);
    min_collector.accumulate(&mut min_state, &mid);
    let max_high = max_collector.accumulate(&mut max_state, &high);
    max_collector.accumulate(&mut max_state, &mid);

    assert_eq!(min_collector.finish(&min_state), GroupResult::Int(-4));
    assert_eq!(max_collector.finish(&max_state), GroupResult::Int(9));

    // Retracting the extreme exposes the runner-up.
    min_collector.undo(&mut min_state, &min_low);
    max_collector.undo(&mut max_state, &max_high);
    assert_eq!(min_collector.finish(&min_state), GroupResult::Int(2));
    assert_eq!(max_collector.finish(&max_state), GroupResult::Int(2));
}

#[test]
fn test_min_duplicate_values() {
    let collector = min(|i: &Item| i.value);
    let mut state = collector.new_state();
    let mut ids = TupleIdGen::default();

    let first = collector.accumulate(&mut state, &item_tuple(&mut ids, 1, 3, "a"));
    collector.accumulate(&mut state, &item_tuple(&mut ids, 2, 3, "b"));

    // One of two equal minima retracted: the minimum stays.
    collector.undo(&mut state, &first);
    assert_eq!(collector.finish(&state), GroupResult::Int(3));
}

#[test]
fn test_multimap_shrink_law() {
    let collector = to_multimap(|i: &Item| i.tag, |i: &Item| i.value);
    let mut state = collector.new_state();
    let mut ids = TupleIdGen::default();

    let deltas: Vec<_> = (0..3)
        .map(|n| collector.accumulate(&mut state, &item_tuple(&mut ids, n, n as i64, "k")))
        .collect();

    let result = collector.finish(&state);
    let map = result.as_map().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map[&IndexKey::Str("k".into())].len(), 3);

    // After retracting every value under the key, the key itself is gone -
    // not present with an empty set.
    for delta in &deltas {
        collector.undo(&mut state, delta);
    }
    let result = collector.finish(&state);
    assert_eq!(result.as_map().unwrap(), &BTreeMap::new());
}

#[test]
fn test_multimap_duplicate_values_are_a_set() {
    let collector = to_multimap(|i: &Item| i.tag, |i: &Item| i.value);
    let mut state = collector.new_state();
    let mut ids = TupleIdGen::default();

    let first = collector.accumulate(&mut state, &item_tuple(&mut ids, 1, 7, "k"));
    collector.accumulate(&mut state, &item_tuple(&mut ids, 2, 7, "k"));

    let result = collector.finish(&state);
    assert_eq!(result.as_map().unwrap()[&IndexKey::Str("k".into())].len(), 1);

    // Retracting one of two identical values keeps the value present.
    collector.undo(&mut state, &first);
    let result = collector.finish(&state);
    assert_eq!(result.as_map().unwrap()[&IndexKey::Str("k".into())].len(), 1);
}

#[test]
fn test_composition_law() {
    // compose(sum, count, sum/count) must equal average over any stream.
    let composed = compose(
        sum(|i: &Item| i.value),
        count(),
        |total, n| match (total.as_int(), n.as_int()) {
            (Some(total), Some(n)) if n != 0 => GroupResult::Float(total as f64 / n as f64),
            _ => GroupResult::None,
        },
    );
    let reference = average(|i: &Item| i.value);

    let mut composed_state = composed.new_state();
    let mut reference_state = reference.new_state();
    let mut ids = TupleIdGen::default();

    let values = [4, -2, 9, 9, 1];
    let mut composed_deltas = Vec::new();
    let mut reference_deltas = Vec::new();
    for (n, value) in values.iter().enumerate() {
        let tuple = item_tuple(&mut ids, n as u64, *value, "x");
        composed_deltas.push(composed.accumulate(&mut composed_state, &tuple));
        reference_deltas.push(reference.accumulate(&mut reference_state, &tuple));
    }
    assert_eq!(
        composed.finish(&composed_state),
        reference.finish(&reference_state)
    );

    // The law holds under interleaved undo as well.
    composed.undo(&mut composed_state, &composed_deltas[2]);
    reference.undo(&mut reference_state, &reference_deltas[2]);
    composed.undo(&mut composed_state, &composed_deltas[0]);
    reference.undo(&mut reference_state, &reference_deltas[0]);
    assert_eq!(
        composed.finish(&composed_state),
        reference.finish(&reference_state)
    );
}

#[test]
fn test_collector_equality_by_mapping_id() {
    let mapping = TupleValueMapping::of(|i: &Item| i.value);
    let a = TupleCollector::Sum(mapping.clone());
    let b = TupleCollector::Sum(mapping);
    let c = sum(|i: &Item| i.value);

    // Shared mapping: structurally equal, de-duplicable.
    assert_eq!(a, b);
    // Fresh closure, fresh id: not equal.
    assert_ne!(a, c);
    assert_eq!(count(), count());
}

#[test]
fn test_composed_collector_equality() {
    let mapping = TupleValueMapping::of(|i: &Item| i.value);
    let first = TupleCollector::Sum(mapping.clone());

    let composed_a = TupleCollector::Compose {
        first: Box::new(first.clone()),
        second: Box::new(count()),
        combine: crate::collector::CombineFn::of(|a, _| a.clone()),
    };
    let composed_b = TupleCollector::Compose {
        first: Box::new(first),
        second: Box::new(count()),
        combine: composed_a_combine(&composed_a),
    };
    assert_eq!(composed_a, composed_b);
}

fn composed_a_combine(collector: &TupleCollector) -> crate::collector::CombineFn {
    match collector {
        TupleCollector::Compose { combine, .. } => combine.clone(),
        _ => unreachable!(),
    }
}
