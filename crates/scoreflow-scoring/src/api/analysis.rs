//! Score explanation: a per-constraint breakdown of the current score.
//!
//! Derived read-only from the match registry; building an explanation does
//! not disturb the session.

use scoreflow_core::{ConstraintId, Score};

use crate::network::ConstraintSession;

/// One match, summarized for reporting.
#[derive(Debug, Clone)]
pub struct MatchSummary<Sc: Score> {
    /// Description of the matched combination.
    pub description: String,
    /// Score impact of this match.
    pub score: Sc,
}

/// Per-constraint breakdown in a score explanation.
#[derive(Debug, Clone)]
pub struct ConstraintAnalysis<Sc: Score> {
    pub constraint: ConstraintId,
    /// Declared (possibly overridden) weight.
    pub weight: Sc,
    /// Total score from this constraint.
    pub score: Sc,
    /// Summaries of the current matches, sorted by description.
    pub matches: Vec<MatchSummary<Sc>>,
}

impl<Sc: Score> ConstraintAnalysis<Sc> {
    /// Returns the number of matches.
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }
}

/// Complete score explanation with per-constraint breakdown.
#[derive(Debug, Clone)]
pub struct ScoreExplanation<Sc: Score> {
    /// The total score.
    pub score: Sc,
    /// Per-constraint breakdown, sorted by constraint id.
    pub constraints: Vec<ConstraintAnalysis<Sc>>,
}

impl<Sc: Score> ScoreExplanation<Sc> {
    /// Builds an explanation from a session's current match totals.
    pub fn of(session: &ConstraintSession<Sc>) -> Self {
        let mut constraints: Vec<ConstraintAnalysis<Sc>> = session
            .constraint_match_totals()
            .values()
            .map(|total| {
                let mut matches: Vec<MatchSummary<Sc>> = total
                    .matches()
                    .map(|m| MatchSummary {
                        description: m.justification.description.clone(),
                        score: m.score,
                    })
                    .collect();
                matches.sort_by(|a, b| a.description.cmp(&b.description));
                ConstraintAnalysis {
                    constraint: total.constraint().clone(),
                    weight: total.weight(),
                    score: total.score(),
                    matches,
                }
            })
            .collect();
        constraints.sort_by(|a, b| a.constraint.cmp(&b.constraint));
        Self {
            score: session.calculate_score(),
            constraints,
        }
    }

    /// Returns the total match count across all constraints.
    pub fn total_match_count(&self) -> usize {
        self.constraints.iter().map(|c| c.match_count()).sum()
    }

    /// Returns the constraints currently contributing a non-zero score.
    pub fn non_zero_constraints(&self) -> Vec<&ConstraintAnalysis<Sc>> {
        self.constraints
            .iter()
            .filter(|c| c.score != Sc::zero())
            .collect()
    }
}

impl<Sc: Score> std::fmt::Display for ScoreExplanation<Sc> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Score: {}", self.score)?;
        for analysis in &self.constraints {
            writeln!(
                f,
                "  {} (weight {}): {} from {} match(es)",
                analysis.constraint,
                analysis.weight,
                analysis.score,
                analysis.match_count()
            )?;
        }
        Ok(())
    }
}
