//! Constraint identity and classification.

use std::fmt;

/// Identifies one declared constraint.
///
/// A constraint id has an optional group (used when several modules
/// contribute constraints to one session) and a name unique within that
/// group.
///
/// # Example
///
/// ```
/// use scoreflow_core::ConstraintId;
///
/// let id = ConstraintId::in_group("scheduling", "No overlapping shifts");
/// assert_eq!(id.to_string(), "scheduling/No overlapping shifts");
///
/// let bare = ConstraintId::of("Unassigned shift");
/// assert_eq!(bare.to_string(), "Unassigned shift");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintId {
    /// Group the constraint belongs to; empty for ungrouped constraints.
    pub group: String,
    /// Name of the constraint, unique within its group.
    pub name: String,
}

impl ConstraintId {
    /// Creates an ungrouped constraint id.
    pub fn of(name: impl Into<String>) -> Self {
        Self {
            group: String::new(),
            name: name.into(),
        }
    }

    /// Creates a constraint id within a group.
    pub fn in_group(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.group, self.name)
        }
    }
}

/// Direction in which a constraint impacts the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactType {
    /// Penalize (subtract the weight from the score).
    Penalty,
    /// Reward (add the weight to the score).
    Reward,
}

impl ImpactType {
    /// Returns the sign applied to the weight: -1 for penalties, +1 for rewards.
    #[inline]
    pub const fn sign(self) -> i64 {
        match self {
            ImpactType::Penalty => -1,
            ImpactType::Reward => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_id_display() {
        let id = ConstraintId::in_group("pkg", "Conflict");
        assert_eq!(id.to_string(), "pkg/Conflict");
        let bare = ConstraintId::of("Conflict");
        assert_eq!(bare.to_string(), "Conflict");
    }

    #[test]
    fn test_impact_sign() {
        assert_eq!(ImpactType::Penalty.sign(), -1);
        assert_eq!(ImpactType::Reward.sign(), 1);
    }
}
