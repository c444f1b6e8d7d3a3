//! End-to-end properties of the scoring engine over the shared
//! shift-scheduling fixtures.

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use scoreflow_core::{HardSoftScore, Score, SimpleScore};
use scoreflow_scoring::collector::{count, to_multimap};
use scoreflow_scoring::joiner::{equal, filtering};
use scoreflow_scoring::stream::ConstraintFactory;
use scoreflow_scoring::{
    ConstraintSession, Fact, IncrementalScoreDirector, NetworkTopology, ScoreCalculator,
    ScoreExplanation,
};
use scoreflow_test::{employee, shift, unassigned_shift, Employee, Shift};

fn skill_mismatch_factory() -> ConstraintFactory<HardSoftScore> {
    let factory = ConstraintFactory::<HardSoftScore>::new();
    let employees = factory.for_each::<Employee>();
    factory
        .for_each::<Shift>()
        .join(
            &employees,
            vec![
                equal(|s: &Shift| s.employee, |e: &Employee| Some(e.id)),
                filtering(|s: &Shift, e: &Employee| s.required_skill != e.skill),
            ],
        )
        .penalize(HardSoftScore::of_hard(1))
        .as_constraint("Missing skill");
    factory
        .for_each::<Shift>()
        .filter(|s: &Shift| s.employee.is_none())
        .penalize(HardSoftScore::of_soft(1))
        .as_constraint("Unassigned shift");
    factory
}

#[test]
fn test_scenario_score_progression() {
    let mut session = ConstraintSession::build(skill_mismatch_factory().build()).unwrap();

    session.insert(employee(1, "nurse")).unwrap();
    session.insert(employee(2, "doctor")).unwrap();
    session.insert(shift(1, 1, 0, "nurse")).unwrap();
    session.insert(shift(2, 2, 0, "nurse")).unwrap();
    session.insert(unassigned_shift(3, 1, "nurse")).unwrap();

    // Shift 2 needs a nurse but got a doctor; shift 3 is unassigned.
    assert_eq!(session.calculate_score(), HardSoftScore::of(-1, -1));

    // Reassign shift 2 to the nurse.
    session.update(shift(2, 1, 0, "nurse")).unwrap();
    assert_eq!(session.calculate_score(), HardSoftScore::of(0, -1));

    // Assign shift 3 to the doctor: skill mismatch appears.
    session.update(shift(3, 2, 1, "nurse")).unwrap();
    assert_eq!(session.calculate_score(), HardSoftScore::of(-1, 0));
}

/// Brute-force reference: count matching pairs with a nested loop.
fn brute_force_pairs(shifts: &[(u64, Option<u64>)], employees: &[u64]) -> i64 {
    let mut matches = 0;
    for (_, assigned) in shifts {
        for employee_id in employees {
            if *assigned == Some(*employee_id) {
                matches += 1;
            }
        }
    }
    matches
}

#[test]
fn test_randomized_join_equals_nested_loop() {
    // Property 7: the indexed join must agree with a brute-force nested
    // loop on every random fact set.
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);

    for round in 0..20 {
        let employee_count = rng.random_range(1..6u64);
        let shift_count = rng.random_range(0..12u64);
        let employees: Vec<u64> = (0..employee_count).collect();
        let shifts: Vec<(u64, Option<u64>)> = (0..shift_count)
            .map(|id| {
                let assigned = if rng.random_bool(0.8) {
                    // Deliberately sample beyond the employee range so some
                    // assignments dangle.
                    Some(rng.random_range(0..employee_count + 2))
                } else {
                    None
                };
                (id, assigned)
            })
            .collect();

        let factory = ConstraintFactory::<SimpleScore>::new();
        let employee_stream = factory.for_each::<Employee>();
        let id = factory
            .for_each::<Shift>()
            .join(
                &employee_stream,
                vec![equal(|s: &Shift| s.employee, |e: &Employee| Some(e.id))],
            )
            .penalize(SimpleScore::of(1))
            .as_constraint("Assigned pair");
        let mut session = ConstraintSession::build(factory.build()).unwrap();

        for employee_id in &employees {
            session.insert(employee(*employee_id, "any")).unwrap();
        }
        for (shift_id, assigned) in &shifts {
            let fact = match assigned {
                Some(employee_id) => shift(*shift_id, *employee_id, 0, "any"),
                None => unassigned_shift(*shift_id, 0, "any"),
            };
            session.insert(fact).unwrap();
        }

        let expected = brute_force_pairs(&shifts, &employees);
        assert_eq!(
            session.calculate_score(),
            SimpleScore::of(-expected),
            "round {round}: indexed join disagrees with nested loop"
        );
        assert_eq!(
            session.constraint_match_totals()[&id].match_count() as i64,
            expected
        );
    }
}

#[test]
fn test_random_event_sequence_stays_consistent() {
    // Property 1: after any event sequence, the incremental score equals a
    // from-scratch recomputation, and totals sum to the aggregate.
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    let session = ConstraintSession::build(skill_mismatch_factory().build()).unwrap();
    let mut director = IncrementalScoreDirector::new(session);

    let employees: Vec<Fact> = vec![employee(1, "nurse"), employee(2, "doctor")];
    for fact in &employees {
        director.insert(fact.clone()).unwrap();
    }

    let skills = ["nurse", "doctor"];
    let mut live: Vec<u64> = Vec::new();
    let mut next_shift: u64 = 0;

    for _ in 0..200 {
        match rng.random_range(0..3) {
            0 => {
                let id = next_shift;
                next_shift += 1;
                let fact = if rng.random_bool(0.3) {
                    unassigned_shift(id, 0, skills[rng.random_range(0..2)])
                } else {
                    shift(
                        id,
                        rng.random_range(1..3u64),
                        0,
                        skills[rng.random_range(0..2)],
                    )
                };
                director.insert(fact).unwrap();
                live.push(id);
            }
            1 if !live.is_empty() => {
                let id = live[rng.random_range(0..live.len())];
                let fact = if rng.random_bool(0.3) {
                    unassigned_shift(id, 0, skills[rng.random_range(0..2)])
                } else {
                    shift(
                        id,
                        rng.random_range(1..3u64),
                        0,
                        skills[rng.random_range(0..2)],
                    )
                };
                director.update(fact).unwrap();
            }
            2 if !live.is_empty() => {
                let position = rng.random_range(0..live.len());
                let id = live.swap_remove(position);
                director.retract(&unassigned_shift(id, 0, "nurse")).unwrap();
            }
            _ => {}
        }
    }

    // Incremental == from scratch.
    director.assert_score_from_scratch().unwrap();

    // Σ totals == aggregate score.
    let total: HardSoftScore = director
        .constraint_match_totals()
        .unwrap()
        .values()
        .fold(HardSoftScore::zero(), |acc, t| acc + t.score());
    assert_eq!(total, director.calculate_score().unwrap());

    // Σ matches per total == total score.
    for total in director.constraint_match_totals().unwrap().values() {
        let summed = total
            .matches()
            .fold(HardSoftScore::zero(), |acc, m| acc + m.score);
        assert_eq!(summed, total.score());
    }
}

#[test]
fn test_multimap_collector_through_session() {
    // Property 5 at session level: group N values under a key, retract all
    // N, and the key vanishes from the aggregate row.
    let factory = ConstraintFactory::<SimpleScore>::new();
    let id = factory
        .for_each::<Shift>()
        .group_by(
            |s: &Shift| s.day,
            to_multimap(|s: &Shift| s.employee, |s: &Shift| s.id),
        )
        .penalize_weighted(SimpleScore::of(1), |_, result| {
            result.as_map().map(|m| m.len() as i64).unwrap_or(0)
        })
        .as_constraint("Distinct assignees per day");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(shift(1, 1, 0, "any")).unwrap();
    session.insert(shift(2, 1, 0, "any")).unwrap();
    session.insert(shift(3, 2, 0, "any")).unwrap();

    // Day 0 has two distinct assignees.
    assert_eq!(session.calculate_score(), SimpleScore::of(-2));

    session.retract(&shift(3, 2, 0, "any")).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    session.retract(&shift(1, 1, 0, "any")).unwrap();
    session.retract(&shift(2, 1, 0, "any")).unwrap();
    // The whole group is gone.
    assert_eq!(session.calculate_score(), SimpleScore::ZERO);
    assert_eq!(session.constraint_match_totals()[&id].match_count(), 0);
}

#[test]
fn test_group_count_per_employee() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Shift>()
        .filter(|s: &Shift| s.employee.is_some())
        .group_by(|s: &Shift| s.employee, count())
        .penalize_weighted(SimpleScore::of(1), |_, result| {
            // Quadratic load penalty.
            let n = result.as_int().unwrap_or(0);
            n * n
        })
        .as_constraint("Balanced load");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(shift(1, 1, 0, "any")).unwrap();
    session.insert(shift(2, 1, 1, "any")).unwrap();
    session.insert(shift(3, 2, 0, "any")).unwrap();

    // 2 shifts on employee 1 (penalty 4), 1 on employee 2 (penalty 1).
    assert_eq!(session.calculate_score(), SimpleScore::of(-5));

    // Rebalance onto a third employee: every load drops to 1.
    session.update(shift(2, 3, 1, "any")).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-3));
}

#[test]
fn test_topology_layers_and_labels() {
    let session = ConstraintSession::build(skill_mismatch_factory().build()).unwrap();
    let topology = NetworkTopology::of(&session);

    // Two shared sources, one join, one filter, two sinks.
    assert_eq!(topology.nodes.len(), 6);
    let sources: Vec<_> = topology.nodes.iter().filter(|n| n.kind == "source").collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.iter().all(|n| n.layer == 0));

    // Sinks sit one layer past their parents.
    for node in topology.nodes.iter().filter(|n| n.kind == "sink") {
        assert!(node.layer >= 2);
        assert!(node.detail.contains('@'));
    }

    // Every edge goes to a strictly deeper layer.
    for (parent, child) in &topology.edges {
        assert!(topology.nodes[*child].layer > topology.nodes[*parent].layer);
    }

    // The rendering mentions the fixture fact types.
    let rendered = topology.to_string();
    assert!(rendered.contains("source Shift"));
    assert!(rendered.contains("source Employee"));
}

#[test]
fn test_score_explanation_breakdown() {
    let mut session = ConstraintSession::build(skill_mismatch_factory().build()).unwrap();
    session.insert(employee(1, "nurse")).unwrap();
    session.insert(shift(1, 1, 0, "doctor")).unwrap();
    session.insert(unassigned_shift(2, 0, "nurse")).unwrap();

    let explanation = ScoreExplanation::of(&session);
    assert_eq!(explanation.score, HardSoftScore::of(-1, -1));
    assert_eq!(explanation.constraints.len(), 2);
    assert_eq!(explanation.total_match_count(), 2);
    assert_eq!(explanation.non_zero_constraints().len(), 2);

    let rendered = explanation.to_string();
    assert!(rendered.contains("Missing skill"));
    assert!(rendered.contains("Unassigned shift"));
}
