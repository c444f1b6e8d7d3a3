//! Constraint match and indictment bookkeeping.
//!
//! Constraint sinks register one [`ConstraintMatch`] per surviving tuple.
//! The [`MatchRegistry`] keeps three views in lockstep: the per-constraint
//! [`ConstraintMatchTotal`]s, the per-fact [`Indictment`]s, and the running
//! total score. Removing a match that is not registered is a consistency
//! violation, reported loudly - a silent ignore here would let a corrupt
//! score reach the search loop.

use std::collections::HashMap;
use std::fmt;

use scoreflow_core::{ConstraintId, Result, Score, ScoreFlowError};

use crate::fact::{Fact, FactKey};
use crate::tuple::Tuple;

/// Identity of one registered constraint match.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchId(u64);

impl fmt::Debug for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Why a constraint matched: the participating facts plus a description.
#[derive(Clone, Debug)]
pub struct Justification {
    /// Facts participating in the match, leftmost stream first. Empty for
    /// matches produced by aggregate rows.
    pub facts: Vec<Fact>,
    /// Human-readable description of the matched combination.
    pub description: String,
}

impl Justification {
    /// Builds the justification for a tuple arriving at a sink.
    pub fn of_tuple(tuple: &Tuple) -> Self {
        Self {
            facts: tuple.facts().to_vec(),
            description: tuple.describe(),
        }
    }
}

impl PartialEq for Justification {
    fn eq(&self, other: &Self) -> bool {
        self.description == other.description
            && self.facts.len() == other.facts.len()
            && self
                .facts
                .iter()
                .zip(&other.facts)
                .all(|(a, b)| a.key() == b.key())
    }
}

impl Eq for Justification {}

/// One concrete weighted match of a constraint.
#[derive(Clone, Debug)]
pub struct ConstraintMatch<Sc: Score> {
    pub id: MatchId,
    pub constraint: ConstraintId,
    pub justification: Justification,
    /// Facts this match is attributed to in the indictment map.
    pub indicted: Vec<Fact>,
    pub score: Sc,
}

/// Running sum of all matches of one constraint.
///
/// Invariant: `score() == Σ m.score for m in matches()`.
#[derive(Clone, Debug)]
pub struct ConstraintMatchTotal<Sc: Score> {
    constraint: ConstraintId,
    weight: Sc,
    matches: HashMap<MatchId, ConstraintMatch<Sc>>,
    score: Sc,
}

impl<Sc: Score> ConstraintMatchTotal<Sc> {
    pub(crate) fn new(constraint: ConstraintId, weight: Sc) -> Self {
        Self {
            constraint,
            weight,
            matches: HashMap::new(),
            score: Sc::zero(),
        }
    }

    /// Returns the constraint this total belongs to.
    pub fn constraint(&self) -> &ConstraintId {
        &self.constraint
    }

    /// Returns the declared weight of the constraint.
    pub fn weight(&self) -> Sc {
        self.weight
    }

    /// Returns the summed score of all current matches.
    pub fn score(&self) -> Sc {
        self.score
    }

    /// Returns the number of current matches.
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Iterates the current matches in no particular order.
    pub fn matches(&self) -> impl Iterator<Item = &ConstraintMatch<Sc>> {
        self.matches.values()
    }

    fn add(&mut self, constraint_match: ConstraintMatch<Sc>) {
        self.score = self.score + constraint_match.score;
        self.matches.insert(constraint_match.id, constraint_match);
    }

    fn remove(&mut self, id: MatchId) -> Result<ConstraintMatch<Sc>> {
        match self.matches.remove(&id) {
            Some(removed) => {
                self.score = self.score - removed.score;
                Ok(removed)
            }
            None => {
                let mut present: Vec<String> =
                    self.matches.keys().map(|m| format!("{m:?}")).collect();
                present.sort();
                Err(ScoreFlowError::Consistency(format!(
                    "Cannot remove constraint match {:?} from constraint ({}): \
                     it is not in the current match set [{}].",
                    id,
                    self.constraint,
                    present.join(", ")
                )))
            }
        }
    }
}

/// Running sum of every match that names one fact among its indicted
/// objects.
///
/// Invariant: `score() == Σ m.score for m in matches()`.
#[derive(Clone, Debug)]
pub struct Indictment<Sc: Score> {
    fact: Fact,
    matches: HashMap<MatchId, ConstraintMatch<Sc>>,
    score: Sc,
    // Lazily rebuilt on access, invalidated by any add/remove.
    justifications: Option<Vec<Justification>>,
}

impl<Sc: Score> Indictment<Sc> {
    fn new(fact: Fact) -> Self {
        Self {
            fact,
            matches: HashMap::new(),
            score: Sc::zero(),
            justifications: None,
        }
    }

    /// Returns the indicted fact.
    pub fn fact(&self) -> &Fact {
        &self.fact
    }

    /// Returns the summed score of every match naming this fact.
    pub fn score(&self) -> Sc {
        self.score
    }

    /// Returns the number of matches naming this fact.
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// Iterates the matches naming this fact, in no particular order.
    pub fn matches(&self) -> impl Iterator<Item = &ConstraintMatch<Sc>> {
        self.matches.values()
    }

    /// Returns the distinct justifications of this fact's matches.
    ///
    /// The list is rebuilt lazily from the match set and cached until the
    /// next add or remove; justifications are de-duplicated by equality.
    pub fn justification_list(&mut self) -> &[Justification] {
        if self.justifications.is_none() {
            let mut distinct: Vec<Justification> = Vec::with_capacity(self.matches.len());
            let mut ordered: Vec<&ConstraintMatch<Sc>> = self.matches.values().collect();
            ordered.sort_by_key(|m| m.id);
            for constraint_match in ordered {
                if !distinct.contains(&constraint_match.justification) {
                    distinct.push(constraint_match.justification.clone());
                }
            }
            self.justifications = Some(distinct);
        }
        self.justifications.as_deref().unwrap_or(&[])
    }

    fn add(&mut self, constraint_match: ConstraintMatch<Sc>) {
        self.score = self.score + constraint_match.score;
        self.matches.insert(constraint_match.id, constraint_match);
        self.justifications = None;
    }

    fn remove(&mut self, id: MatchId) -> Result<()> {
        match self.matches.remove(&id) {
            Some(removed) => {
                self.score = self.score - removed.score;
                self.justifications = None;
                Ok(())
            }
            None => Err(ScoreFlowError::Consistency(format!(
                "Cannot remove constraint match {:?} from the indictment of fact {:?}: \
                 it is not in the current match set.",
                id, self.fact
            ))),
        }
    }

    fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// The bookkeeping owned by one session: totals, indictments and the
/// running score.
#[derive(Debug)]
pub struct MatchRegistry<Sc: Score> {
    totals: HashMap<ConstraintId, ConstraintMatchTotal<Sc>>,
    indictments: HashMap<FactKey, Indictment<Sc>>,
    running: Sc,
    next_match_id: u64,
}

impl<Sc: Score> MatchRegistry<Sc> {
    pub(crate) fn new() -> Self {
        Self {
            totals: HashMap::new(),
            indictments: HashMap::new(),
            running: Sc::zero(),
            next_match_id: 0,
        }
    }

    /// Pre-registers a constraint so its total exists even with zero
    /// matches.
    pub(crate) fn register_constraint(&mut self, constraint: ConstraintId, weight: Sc) {
        self.totals
            .insert(constraint.clone(), ConstraintMatchTotal::new(constraint, weight));
    }

    /// Registers one match, updating the owning total, every indicted
    /// fact's indictment and the running score.
    pub(crate) fn add_match(
        &mut self,
        constraint: &ConstraintId,
        justification: Justification,
        indicted: Vec<Fact>,
        score: Sc,
    ) -> Result<MatchId> {
        let id = MatchId(self.next_match_id);
        self.next_match_id += 1;
        let constraint_match = ConstraintMatch {
            id,
            constraint: constraint.clone(),
            justification,
            indicted,
            score,
        };

        let total = self.totals.get_mut(constraint).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Cannot add a match for unregistered constraint ({constraint})."
            ))
        })?;
        total.add(constraint_match.clone());

        for fact in &constraint_match.indicted {
            self.indictments
                .entry(fact.key())
                .or_insert_with(|| Indictment::new(fact.clone()))
                .add(constraint_match.clone());
        }

        self.running = self.running + score;
        Ok(id)
    }

    /// Reverses exactly one earlier [`add_match`](Self::add_match).
    pub(crate) fn remove_match(&mut self, constraint: &ConstraintId, id: MatchId) -> Result<()> {
        let total = self.totals.get_mut(constraint).ok_or_else(|| {
            ScoreFlowError::Consistency(format!(
                "Cannot remove a match for unregistered constraint ({constraint})."
            ))
        })?;
        let removed = total.remove(id)?;

        for fact in &removed.indicted {
            let key = fact.key();
            let indictment = self.indictments.get_mut(&key).ok_or_else(|| {
                ScoreFlowError::Consistency(format!(
                    "Cannot remove constraint match {id:?}: fact {fact:?} has no indictment."
                ))
            })?;
            indictment.remove(id)?;
            if indictment.is_empty() {
                self.indictments.remove(&key);
            }
        }

        self.running = self.running - removed.score;
        Ok(())
    }

    /// Returns the current running score.
    pub fn score(&self) -> Sc {
        self.running
    }

    /// Returns the per-constraint totals.
    pub fn totals(&self) -> &HashMap<ConstraintId, ConstraintMatchTotal<Sc>> {
        &self.totals
    }

    /// Returns the per-fact indictments.
    pub fn indictments(&self) -> &HashMap<FactKey, Indictment<Sc>> {
        &self.indictments
    }

    /// Returns the per-fact indictments mutably (justification lists are
    /// rebuilt on access).
    pub fn indictments_mut(&mut self) -> &mut HashMap<FactKey, Indictment<Sc>> {
        &mut self.indictments
    }
}
