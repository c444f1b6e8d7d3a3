//! Constraint weight overrides.
//!
//! Lets deployment configuration replace declared constraint weights
//! without touching constraint-authoring code. Raw level-number overrides
//! go through the checked score conversion, so a weight of the wrong
//! dimensionality fails at configuration time, not mid-solve.

use std::collections::HashMap;
use std::sync::Arc;

use scoreflow_core::{ConstraintId, Result, Score, ScoreFlowError};

use crate::stream::ConstraintSetDef;

/// A set of per-constraint weight replacements.
///
/// # Example
///
/// ```
/// use scoreflow_core::{ConstraintId, HardSoftScore};
/// use scoreflow_scoring::api::weight_overrides::ConstraintWeightOverrides;
///
/// let mut overrides = ConstraintWeightOverrides::new();
/// overrides.set(ConstraintId::of("Room conflict"), HardSoftScore::of_hard(2));
///
/// // Raw level numbers are dimension-checked:
/// let err = overrides
///     .set_levels(ConstraintId::of("Room conflict"), &[1, 2, 3])
///     .unwrap_err();
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConstraintWeightOverrides<Sc: Score> {
    overrides: HashMap<ConstraintId, Sc>,
}

impl<Sc: Score> ConstraintWeightOverrides<Sc> {
    /// Creates an empty override set.
    pub fn new() -> Self {
        Self {
            overrides: HashMap::new(),
        }
    }

    /// Replaces the weight of one constraint.
    pub fn set(&mut self, constraint: ConstraintId, weight: Sc) {
        self.overrides.insert(constraint, weight);
    }

    /// Replaces the weight of one constraint from raw level numbers.
    ///
    /// # Errors
    ///
    /// [`ScoreFlowError::DimensionMismatch`] when the level count does not
    /// match the score type.
    pub fn set_levels(&mut self, constraint: ConstraintId, levels: &[i64]) -> Result<()> {
        let weight = Sc::try_from_level_numbers(levels)?;
        self.overrides.insert(constraint, weight);
        Ok(())
    }

    /// Returns the override for a constraint, if any.
    pub fn get(&self, constraint: &ConstraintId) -> Option<Sc> {
        self.overrides.get(constraint).copied()
    }

    /// Returns the number of overridden constraints.
    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Returns true when no constraint is overridden.
    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Applies the overrides to a definition, producing a new one.
    ///
    /// # Errors
    ///
    /// [`ScoreFlowError::Build`] when an override names a constraint the
    /// definition does not declare.
    pub fn apply(&self, def: &Arc<ConstraintSetDef<Sc>>) -> Result<Arc<ConstraintSetDef<Sc>>> {
        if self.overrides.is_empty() {
            return Ok(Arc::clone(def));
        }
        let declared = def.constraint_ids();
        for constraint in self.overrides.keys() {
            if !declared.contains(constraint) {
                return Err(ScoreFlowError::Build(format!(
                    "Weight override names unknown constraint ({constraint})."
                )));
            }
        }
        let mut adjusted = (**def).clone();
        for (constraint, weight) in &self.overrides {
            adjusted = adjusted.with_weight(constraint, *weight);
        }
        Ok(Arc::new(adjusted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreflow_core::{HardSoftScore, SimpleScore};

    use crate::stream::ConstraintFactory;

    #[derive(Debug)]
    struct Entity;

    #[test]
    fn test_apply_replaces_weight() {
        let factory = ConstraintFactory::<SimpleScore>::new();
        let id = factory
            .for_each::<Entity>()
            .penalize(SimpleScore::of(1))
            .as_constraint("Always");
        let def = factory.build();

        let mut overrides = ConstraintWeightOverrides::new();
        overrides.set(id.clone(), SimpleScore::of(5));
        let adjusted = overrides.apply(&def).unwrap();

        let mut session = crate::network::ConstraintSession::build(adjusted).unwrap();
        session.insert(crate::fact::Fact::new(0, Entity)).unwrap();
        assert_eq!(session.calculate_score(), SimpleScore::of(-5));
    }

    #[test]
    fn test_apply_rejects_unknown_constraint() {
        let factory = ConstraintFactory::<SimpleScore>::new();
        factory
            .for_each::<Entity>()
            .penalize(SimpleScore::of(1))
            .as_constraint("Always");
        let def = factory.build();

        let mut overrides = ConstraintWeightOverrides::new();
        overrides.set(ConstraintId::of("No such constraint"), SimpleScore::of(5));
        assert!(matches!(
            overrides.apply(&def),
            Err(ScoreFlowError::Build(_))
        ));
    }

    #[test]
    fn test_set_levels_checks_dimension() {
        let mut overrides = ConstraintWeightOverrides::<HardSoftScore>::new();
        overrides
            .set_levels(ConstraintId::of("Ok"), &[1, 0])
            .unwrap();
        let err = overrides
            .set_levels(ConstraintId::of("Bad"), &[1, 0, 0])
            .unwrap_err();
        assert!(matches!(
            err,
            ScoreFlowError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }
}
