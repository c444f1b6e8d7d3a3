//! Core Score trait definition

use std::fmt::{Debug, Display};
use std::ops::{Add, Neg, Sub};

use crate::error::{Result, ScoreFlowError};

use super::ScoreLevel;

/// Core trait for all score types in scoreflow.
///
/// Scores represent the quality of a working solution. The engine only ever
/// combines scores of one concrete type; the level-number conversions exist
/// for the boundaries where weights arrive untyped (configuration, weight
/// overrides) and must be checked for dimensionality.
///
/// All score implementations are:
/// - Immutable (operations return new instances)
/// - Thread-safe (Send + Sync)
/// - Totally ordered, comparing higher-priority levels first
pub trait Score:
    Copy
    + Debug
    + Display
    + Default
    + Send
    + Sync
    + PartialEq
    + Eq
    + PartialOrd
    + Ord
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + 'static
{
    /// Returns the zero score (identity element for addition).
    fn zero() -> Self;

    /// Returns true if this score represents a feasible solution.
    ///
    /// A solution is feasible when all hard levels are >= 0.
    fn is_feasible(&self) -> bool;

    /// Returns the number of score levels.
    ///
    /// For example SimpleScore has 1 level, HardSoftScore has 2,
    /// HardMediumSoftScore has 3.
    fn levels_count() -> usize;

    /// Returns the score values from highest priority to lowest.
    fn to_level_numbers(&self) -> Vec<i64>;

    /// Creates a score from level numbers, checking dimensionality.
    ///
    /// Returns [`ScoreFlowError::DimensionMismatch`] when the slice length
    /// does not equal [`levels_count()`](Score::levels_count). This is the
    /// single place where scores of mismatched dimensionality can meet, and
    /// it fails rather than truncating or padding.
    fn try_from_level_numbers(levels: &[i64]) -> Result<Self> {
        if levels.len() != Self::levels_count() {
            return Err(ScoreFlowError::DimensionMismatch {
                expected: Self::levels_count(),
                actual: levels.len(),
            });
        }
        Ok(Self::from_level_numbers_unchecked(levels))
    }

    /// Creates a score from a slice already known to have the right length.
    fn from_level_numbers_unchecked(levels: &[i64]) -> Self;

    /// Multiplies every level by an integer factor.
    ///
    /// Used by constraint sinks to apply a per-match weight multiplier.
    fn scale(&self, factor: i64) -> Self;

    /// Returns the absolute value of this score.
    fn abs(&self) -> Self;

    /// Returns the semantic label for the score level at the given index.
    ///
    /// # Panics
    /// Panics if `index >= levels_count()`.
    fn level_label(index: usize) -> ScoreLevel;
}

/// Scores that can be parsed from their textual representation.
pub trait ParseableScore: Score {
    /// Parses a score from a string.
    ///
    /// # Format
    /// - SimpleScore: `"42"`
    /// - HardSoftScore: `"0hard/-100soft"`
    /// - HardMediumSoftScore: `"0hard/0medium/-100soft"`
    fn parse(s: &str) -> std::result::Result<Self, ScoreParseError>;

    /// Returns the canonical string representation of this score.
    fn to_string_repr(&self) -> String;
}

/// Error when parsing a score from a string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreParseError {
    pub message: String,
}

impl std::fmt::Display for ScoreParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Score parse error: {}", self.message)
    }
}

impl std::error::Error for ScoreParseError {}
