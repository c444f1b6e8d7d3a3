// Score directors: the calculator surface exposed to the search loop.

mod from_scratch;
mod incremental;


pub use from_scratch::FromScratchScoreDirector;
pub use incremental::IncrementalScoreDirector;

use std::collections::HashMap;

use scoreflow_core::{ConstraintId, Result, Score};

use crate::fact::FactKey;
use crate::matches::{ConstraintMatchTotal, Indictment};

// A score calculator fed fact events by the (external) solution layer.
//
// `constraint_match_totals` and `indictment_map` may legitimately be
// unsupported by a calculator that does not track match detail; such a
// calculator fails with [`ScoreFlowError::Unsupported`]
// (scoreflow_core::ScoreFlowError::Unsupported) rather than returning
// empty or partial data.
pub trait ScoreCalculator<Sc: Score> {
    // Calculates and returns the current score.
    fn calculate_score(&mut self) -> Result<Sc>;

    // Returns the per-constraint match totals.
    fn constraint_match_totals(&self)
        -> Result<&HashMap<ConstraintId, ConstraintMatchTotal<Sc>>>;

    // Returns the per-fact indictments.
    fn indictment_map(&self) -> Result<&HashMap<FactKey, Indictment<Sc>>>;

    // Returns true if this calculator updates its score incrementally.
    fn is_incremental(&self) -> bool {
        false
    }
}
