// From-scratch score director: rebuilds the network on every score read.

use std::collections::HashMap;
use std::sync::Arc;

use scoreflow_core::{ConstraintId, Result, Score, ScoreFlowError};

use crate::fact::{Fact, FactKey};
use crate::matches::{ConstraintMatchTotal, Indictment};
use crate::network::ConstraintSession;
use crate::stream::ConstraintSetDef;

use super::ScoreCalculator;

// Recomputes the score from scratch on every
// [`calculate_score`](ScoreCalculator::calculate_score) call.
//
// Slow but simple; it exists as the reference the incremental director is
// checked against, and as a fallback when incremental bookkeeping is not
// worth its memory. It keeps no matches around, so match and indictment
// detail are unsupported.
pub struct FromScratchScoreDirector<Sc: Score> {
    def: Arc<ConstraintSetDef<Sc>>,
    facts: HashMap<FactKey, Fact>,
}

impl<Sc: Score> FromScratchScoreDirector<Sc> {
    // Creates a director for a constraint-set definition.
    pub fn new(def: Arc<ConstraintSetDef<Sc>>) -> Self {
        Self {
            def,
            facts: HashMap::new(),
        }
    }

    // Records a fact insert.
    pub fn insert(&mut self, fact: Fact) -> Result<()> {
        if self.facts.insert(fact.key(), fact.clone()).is_some() {
            return Err(ScoreFlowError::Consistency(format!(
                "Fact {fact:?} was already inserted."
            )));
        }
        Ok(())
    }

    // Records a fact update.
    pub fn update(&mut self, fact: Fact) -> Result<()> {
        if self.facts.insert(fact.key(), fact.clone()).is_none() {
            return Err(ScoreFlowError::Consistency(format!(
                "Cannot update fact {fact:?}: it was never inserted."
            )));
        }
        Ok(())
    }

    // Records a fact retract.
    pub fn retract(&mut self, fact: &Fact) -> Result<()> {
        if self.facts.remove(&fact.key()).is_none() {
            return Err(ScoreFlowError::Consistency(format!(
                "Cannot retract fact {fact:?}: it was never inserted."
            )));
        }
        Ok(())
    }
}

impl<Sc: Score> ScoreCalculator<Sc> for FromScratchScoreDirector<Sc> {
    fn calculate_score(&mut self) -> Result<Sc> {
        let mut session = ConstraintSession::build(Arc::clone(&self.def))?;
        let mut ordered: Vec<&Fact> = self.facts.values().collect();
        ordered.sort_by_key(|fact| fact.key());
        for fact in ordered {
            session.insert(fact.clone())?;
        }
        Ok(session.calculate_score())
    }

    fn constraint_match_totals(
        &self,
    ) -> Result<&HashMap<ConstraintId, ConstraintMatchTotal<Sc>>> {
        Err(ScoreFlowError::Unsupported(
            "Constraint match totals are not supported by FromScratchScoreDirector; \
             use IncrementalScoreDirector instead."
                .to_string(),
        ))
    }

    fn indictment_map(&self) -> Result<&HashMap<FactKey, Indictment<Sc>>> {
        Err(ScoreFlowError::Unsupported(
            "Indictments are not supported by FromScratchScoreDirector; \
             use IncrementalScoreDirector instead."
                .to_string(),
        ))
    }
}
