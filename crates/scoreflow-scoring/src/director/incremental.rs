// Incremental score director backed by a live constraint session.

use std::collections::HashMap;
use std::sync::Arc;

use scoreflow_core::{ConstraintId, Result, Score, ScoreFlowError};
use tracing::debug;

use crate::fact::{Fact, FactKey};
use crate::matches::{ConstraintMatchTotal, Indictment};
use crate::network::ConstraintSession;

use super::ScoreCalculator;

// Keeps a [`ConstraintSession`] in sync with the working solution and
// exposes its running score and match detail.
//
// The director also remembers the current fact set, which lets
// [`assert_score_from_scratch`](IncrementalScoreDirector::assert_score_from_scratch)
// rebuild an independent session and cross-check the incremental score -
// the standard way to pin down a score-corruption bug in a constraint or
// in the engine itself.
pub struct IncrementalScoreDirector<Sc: Score> {
    session: ConstraintSession<Sc>,
    facts: HashMap<FactKey, Fact>,
}

impl<Sc: Score> IncrementalScoreDirector<Sc> {
    // Wraps a freshly built session.
    pub fn new(session: ConstraintSession<Sc>) -> Self {
        Self {
            session,
            facts: HashMap::new(),
        }
    }

    // Inserts a fact into the session and the remembered fact set.
    pub fn insert(&mut self, fact: Fact) -> Result<()> {
        self.session.insert(fact.clone())?;
        self.facts.insert(fact.key(), fact);
        Ok(())
    }

    // Re-evaluates a fact whose payload changed.
    pub fn update(&mut self, fact: Fact) -> Result<()> {
        self.session.update(fact.clone())?;
        self.facts.insert(fact.key(), fact);
        Ok(())
    }

    // Retracts a fact from the session and the remembered fact set.
    pub fn retract(&mut self, fact: &Fact) -> Result<()> {
        self.session.retract(fact)?;
        self.facts.remove(&fact.key());
        Ok(())
    }

    // Returns the underlying session.
    pub fn session(&self) -> &ConstraintSession<Sc> {
        &self.session
    }

    // Returns the underlying session mutably (e.g. for justification
    // lists, which rebuild lazily).
    pub fn session_mut(&mut self) -> &mut ConstraintSession<Sc> {
        &mut self.session
    }

    // Rebuilds an independent session over the current fact set and fails
    // with [`ScoreFlowError::ScoreCorruption`] if its score differs from
    // the incrementally maintained one.
    //
    // Expensive; meant for assert modes and tests, never the hot loop.
    pub fn assert_score_from_scratch(&self) -> Result<()> {
        let mut fresh = ConstraintSession::build(Arc::clone(self.session.definition()))?;
        let mut ordered: Vec<&Fact> = self.facts.values().collect();
        ordered.sort_by_key(|fact| fact.key());
        for fact in ordered {
            fresh.insert(fact.clone())?;
        }
        let expected = fresh.calculate_score();
        let actual = self.session.calculate_score();
        if actual != expected {
            return Err(ScoreFlowError::ScoreCorruption(format!(
                "Incremental score ({actual}) differs from the from-scratch \
                 recomputation ({expected}) over {} fact(s).",
                self.facts.len()
            )));
        }
        debug!(score = %actual, "from-scratch assertion passed");
        Ok(())
    }
}

impl<Sc: Score> ScoreCalculator<Sc> for IncrementalScoreDirector<Sc> {
    fn calculate_score(&mut self) -> Result<Sc> {
        Ok(self.session.calculate_score())
    }

    fn constraint_match_totals(
        &self,
    ) -> Result<&HashMap<ConstraintId, ConstraintMatchTotal<Sc>>> {
        Ok(self.session.constraint_match_totals())
    }

    fn indictment_map(&self) -> Result<&HashMap<FactKey, Indictment<Sc>>> {
        Ok(self.session.indictments())
    }

    fn is_incremental(&self) -> bool {
        true
    }
}
