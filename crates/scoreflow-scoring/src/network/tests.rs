// Session-level tests of the propagation network.

use scoreflow_core::{HardSoftScore, Score, ScoreFlowError, SimpleScore};

use crate::collector::{count, sum};
use crate::fact::Fact;
use crate::joiner::{equal, filtering, greater_than, less_than};
use crate::network::{ConstraintSession, Node};
use crate::stream::ConstraintFactory;

#[derive(Debug)]
struct Entity {
    id: u64,
}

#[derive(Debug)]
struct Left {
    key: i64,
    weight: i64,
}

#[derive(Debug)]
struct Right {
    key: i64,
    limit: i64,
}

fn entity(id: u64) -> Fact {
    Fact::new(id, Entity { id })
}

#[test]
fn test_penalize_each_entity() {
    // forEach(Entity).penalize(1hard): 3 inserts, one retract, one re-insert.
    let factory = ConstraintFactory::<HardSoftScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(HardSoftScore::of_hard(1))
        .as_constraint("Every entity");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    assert_eq!(session.calculate_score(), HardSoftScore::of_hard(0));

    let facts: Vec<Fact> = (0..3).map(entity).collect();
    for fact in &facts {
        session.insert(fact.clone()).unwrap();
    }
    assert_eq!(session.calculate_score(), HardSoftScore::of_hard(-3));

    session.retract(&facts[1]).unwrap();
    assert_eq!(session.calculate_score(), HardSoftScore::of_hard(-2));

    session.insert(facts[1].clone()).unwrap();
    assert_eq!(session.calculate_score(), HardSoftScore::of_hard(-3));
}

#[test]
fn test_insert_retract_round_trip_is_identity() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let id = factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("Every entity");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(entity(0)).unwrap();
    let score_before = session.calculate_score();
    let matches_before = session.constraint_match_totals()[&id].match_count();
    let source_before = source_tuple_count(&session);

    let probe = entity(99);
    session.insert(probe.clone()).unwrap();
    session.retract(&probe).unwrap();

    assert_eq!(session.calculate_score(), score_before);
    assert_eq!(
        session.constraint_match_totals()[&id].match_count(),
        matches_before
    );
    assert_eq!(source_tuple_count(&session), source_before);
    assert!(!session.indictments().contains_key(&probe.key()));
}

fn source_tuple_count<Sc: Score>(session: &ConstraintSession<Sc>) -> usize {
    session
        .nodes()
        .iter()
        .map(|node| match node {
            Node::Source(source) => source.tuple_count(),
            _ => 0,
        })
        .sum()
}

#[test]
fn test_double_insert_fails() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("Every entity");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(entity(0)).unwrap();
    let err = session.insert(entity(0)).unwrap_err();
    assert!(matches!(err, ScoreFlowError::Consistency(_)));
}

#[test]
fn test_retract_unknown_fails() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("Every entity");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    let err = session.retract(&entity(0)).unwrap_err();
    assert!(matches!(err, ScoreFlowError::Consistency(_)));
}

#[test]
fn test_fact_without_source_is_ignored() {
    #[derive(Debug)]
    struct Unrelated;

    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("Every entity");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Unrelated)).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::ZERO);
}

#[test]
fn test_equal_join_produces_matching_pairs() {
    // 3 left facts, 2 right facts, one shared key with one pair each.
    let factory = ConstraintFactory::<SimpleScore>::new();
    let lefts = factory.for_each::<Left>();
    let rights = factory.for_each::<Right>();
    let id = lefts
        .join(
            &rights,
            vec![equal(|l: &Left| l.key, |r: &Right| r.key)],
        )
        .penalize(SimpleScore::of(1))
        .as_constraint("Pair");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 1, weight: 0 })).unwrap();
    session.insert(Fact::new(1, Left { key: 2, weight: 0 })).unwrap();
    session.insert(Fact::new(2, Left { key: 3, weight: 0 })).unwrap();
    session.insert(Fact::new(0, Right { key: 1, limit: 0 })).unwrap();
    session.insert(Fact::new(1, Right { key: 2, limit: 0 })).unwrap();

    // Keys 1 and 2 each pair up once; key 3 finds no partner.
    assert_eq!(session.calculate_score(), SimpleScore::of(-2));
    assert_eq!(session.constraint_match_totals()[&id].match_count(), 2);

    // Retracting one right removes exactly its pair.
    session.retract(&Fact::new(0, Right { key: 1, limit: 0 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));
}

#[test]
fn test_comparison_joiner() {
    // lessThan(weight, limit): left matches rights with a larger limit.
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    factory
        .for_each::<Left>()
        .join(
            &rights,
            vec![less_than(|l: &Left| l.weight, |r: &Right| r.limit)],
        )
        .penalize(SimpleScore::of(1))
        .as_constraint("Under limit");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 0, weight: 5 })).unwrap();
    session.insert(Fact::new(0, Right { key: 0, limit: 3 })).unwrap();
    session.insert(Fact::new(1, Right { key: 0, limit: 5 })).unwrap();
    session.insert(Fact::new(2, Right { key: 0, limit: 8 })).unwrap();

    // 5 < 8 only.
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    // greater_than probes flip direction; check via a second session.
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    factory
        .for_each::<Left>()
        .join(
            &rights,
            vec![greater_than(|l: &Left| l.weight, |r: &Right| r.limit)],
        )
        .penalize(SimpleScore::of(1))
        .as_constraint("Over limit");
    let mut session = ConstraintSession::build(factory.build()).unwrap();
    session.insert(Fact::new(0, Right { key: 0, limit: 3 })).unwrap();
    session.insert(Fact::new(1, Right { key: 0, limit: 8 })).unwrap();
    session.insert(Fact::new(0, Left { key: 0, weight: 5 })).unwrap();
    // 5 > 3 only.
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));
}

#[test]
fn test_join_update_in_place_when_key_unchanged() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    let id = factory
        .for_each::<Left>()
        .join(&rights, vec![equal(|l: &Left| l.key, |r: &Right| r.key)])
        .penalize_weighted(SimpleScore::of(1), |l: &Left, _r: &Right| l.weight)
        .as_constraint("Weighted pair");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 1, weight: 2 })).unwrap();
    session.insert(Fact::new(0, Right { key: 1, limit: 0 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-2));

    // Same join key, new weight: the pair survives, the match re-weighs.
    session.update(Fact::new(0, Left { key: 1, weight: 7 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-7));
    assert_eq!(session.constraint_match_totals()[&id].match_count(), 1);
}

#[test]
fn test_join_update_moves_key() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    factory
        .for_each::<Left>()
        .join(&rights, vec![equal(|l: &Left| l.key, |r: &Right| r.key)])
        .penalize(SimpleScore::of(1))
        .as_constraint("Pair");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 1, weight: 0 })).unwrap();
    session.insert(Fact::new(0, Right { key: 1, limit: 0 })).unwrap();
    session.insert(Fact::new(1, Right { key: 2, limit: 0 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    // Key 1 -> 2: the old pair dies, a new one forms.
    session.update(Fact::new(0, Left { key: 2, weight: 0 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    // Key 2 -> 3: no partner left.
    session.update(Fact::new(0, Left { key: 3, weight: 0 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(0));
}

#[test]
fn test_filtering_joiner_update_flips_verdict() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    factory
        .for_each::<Left>()
        .join(
            &rights,
            vec![
                equal(|l: &Left| l.key, |r: &Right| r.key),
                filtering(|l: &Left, r: &Right| l.weight > r.limit),
            ],
        )
        .penalize(SimpleScore::of(1))
        .as_constraint("Overweight pair");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 1, weight: 5 })).unwrap();
    session.insert(Fact::new(0, Right { key: 1, limit: 10 })).unwrap();
    // 5 > 10 is false: no match.
    assert_eq!(session.calculate_score(), SimpleScore::of(0));

    // Weight rises above the limit with an unchanged join key: the filter
    // verdict flips to a match without a retract of the left tuple.
    session.update(Fact::new(0, Left { key: 1, weight: 12 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    // And back.
    session.update(Fact::new(0, Left { key: 1, weight: 5 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(0));
}

#[test]
fn test_filter_node_update_transitions() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Left>()
        .filter(|l: &Left| l.weight > 0)
        .penalize(SimpleScore::of(1))
        .as_constraint("Positive weight");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 0, weight: -1 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(0));

    session.update(Fact::new(0, Left { key: 0, weight: 1 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    session.update(Fact::new(0, Left { key: 0, weight: 2 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    session.update(Fact::new(0, Left { key: 0, weight: -2 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(0));

    session.retract(&Fact::new(0, Left { key: 0, weight: -2 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(0));
}

#[test]
fn test_group_by_count_incremental() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let id = factory
        .for_each::<Left>()
        .group_by(|l: &Left| l.key, count())
        .penalize_weighted(SimpleScore::of(1), |_, result| {
            result.as_int().unwrap_or(0)
        })
        .as_constraint("Group size");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 1, weight: 0 })).unwrap();
    session.insert(Fact::new(1, Left { key: 1, weight: 0 })).unwrap();
    session.insert(Fact::new(2, Left { key: 2, weight: 0 })).unwrap();

    // Group 1 has 2 members, group 2 has 1: penalty 2 + 1.
    assert_eq!(session.calculate_score(), SimpleScore::of(-3));
    assert_eq!(session.constraint_match_totals()[&id].match_count(), 2);

    // Retracting the last member of group 2 removes its match entirely.
    session.retract(&Fact::new(2, Left { key: 2, weight: 0 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-2));
    assert_eq!(session.constraint_match_totals()[&id].match_count(), 1);
}

#[test]
fn test_group_by_sum_update_moves_group() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Left>()
        .group_by(|l: &Left| l.key, sum(|l: &Left| l.weight))
        .penalize_weighted(SimpleScore::of(1), |_, result| {
            result.as_int().unwrap_or(0)
        })
        .as_constraint("Group load");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(Fact::new(0, Left { key: 1, weight: 4 })).unwrap();
    session.insert(Fact::new(1, Left { key: 1, weight: 6 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-10));

    // Update within the group.
    session.update(Fact::new(1, Left { key: 1, weight: 1 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-5));

    // Update that moves the fact to another group.
    session.update(Fact::new(1, Left { key: 2, weight: 1 })).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-5));
    assert_eq!(
        session.constraint_match_totals().values().next().unwrap().match_count(),
        2
    );

    // Move it back; group 2 disappears again.
    session.update(Fact::new(1, Left { key: 1, weight: 1 })).unwrap();
    assert_eq!(
        session.constraint_match_totals().values().next().unwrap().match_count(),
        1
    );
}

#[test]
fn test_indictments_attribute_to_facts() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    factory
        .for_each::<Left>()
        .join(&rights, vec![equal(|l: &Left| l.key, |r: &Right| r.key)])
        .penalize(SimpleScore::of(1))
        .as_constraint("Pair");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    let left = Fact::new(0, Left { key: 1, weight: 0 });
    let right_a = Fact::new(0, Right { key: 1, limit: 0 });
    let right_b = Fact::new(1, Right { key: 1, limit: 0 });
    session.insert(left.clone()).unwrap();
    session.insert(right_a.clone()).unwrap();
    session.insert(right_b.clone()).unwrap();

    // The left fact is in both pairs, each right in one.
    assert_eq!(session.indictments()[&left.key()].score(), SimpleScore::of(-2));
    assert_eq!(
        session.indictments()[&right_a.key()].score(),
        SimpleScore::of(-1)
    );
    assert_eq!(
        session.indictments()[&right_b.key()].match_count(),
        1
    );

    // Justification lists rebuild lazily per indictment.
    let indictment = session.indictments_mut().get_mut(&left.key()).unwrap();
    assert_eq!(indictment.justification_list().len(), 2);

    session.retract(&right_b).unwrap();
    assert!(!session.indictments().contains_key(&right_b.key()));
}

#[test]
fn test_reward_adds_score() {
    let factory = ConstraintFactory::<HardSoftScore>::new();
    factory
        .for_each::<Entity>()
        .reward(HardSoftScore::of_soft(5))
        .as_constraint("Bonus");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(entity(0)).unwrap();
    session.insert(entity(1)).unwrap();
    assert_eq!(session.calculate_score(), HardSoftScore::of_soft(10));
}

#[test]
fn test_duplicate_constraint_id_fails_at_build() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("Same name");
    factory
        .for_each::<Entity>()
        .reward(SimpleScore::of(1))
        .as_constraint("Same name");

    let err = ConstraintSession::build(factory.build()).unwrap_err();
    assert!(matches!(err, ScoreFlowError::Build(_)));
}

#[test]
fn test_indexing_joiner_after_filtering_fails_at_build() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    let rights = factory.for_each::<Right>();
    factory
        .for_each::<Left>()
        .join(
            &rights,
            vec![
                filtering(|l: &Left, r: &Right| l.weight > r.limit),
                equal(|l: &Left| l.key, |r: &Right| r.key),
            ],
        )
        .penalize(SimpleScore::of(1))
        .as_constraint("Invalid order");

    let err = ConstraintSession::build(factory.build()).unwrap_err();
    assert!(matches!(err, ScoreFlowError::Build(_)));
}

#[test]
fn test_shared_source_feeds_both_constraints() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("First");
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(10))
        .as_constraint("Second");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    // One source node only.
    let source_count = session
        .nodes()
        .iter()
        .filter(|node| matches!(node, Node::Source(_)))
        .count();
    assert_eq!(source_count, 1);

    session.insert(entity(0)).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-11));
}

#[test]
fn test_session_reset_clears_state() {
    let factory = ConstraintFactory::<SimpleScore>::new();
    factory
        .for_each::<Entity>()
        .penalize(SimpleScore::of(1))
        .as_constraint("Every entity");
    let mut session = ConstraintSession::build(factory.build()).unwrap();

    session.insert(entity(0)).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));

    session.reset().unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::ZERO);

    // The same fact can be inserted again after a reset.
    session.insert(entity(0)).unwrap();
    assert_eq!(session.calculate_score(), SimpleScore::of(-1));
}
