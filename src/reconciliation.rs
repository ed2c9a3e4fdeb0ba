// ⚖️ Score Reconciliation - goals counted from events vs the published result
//
//   goals(home) in events == home_score in matches document
//   goals(away) in events == away_score in matches document
//
// Open data sometimes misses a goal event (or lists a shootout goal as a
// regular one). A mismatch is a warning, never a failure; the matches document
// is treated as the authoritative final score.

use crate::cdf::Score;
use crate::temporal::Period;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// SCORE TALLY
// ============================================================================

/// Running score built goal by goal, in match order
#[derive(Debug, Clone)]
pub struct ScoreTally {
    home_team_id: String,
    away_team_id: String,
    total: Score,
    shootout: Score,
    by_period: BTreeMap<Period, Score>,
}

impl ScoreTally {
    pub fn new(home_team_id: impl Into<String>, away_team_id: impl Into<String>) -> Self {
        ScoreTally {
            home_team_id: home_team_id.into(),
            away_team_id: away_team_id.into(),
            total: Score::default(),
            shootout: Score::default(),
            by_period: BTreeMap::new(),
        }
    }

    /// Count one goal for `team_id` and return the score after it.
    ///
    /// Shootout goals are kept under their own period and in `shootout()`,
    /// never in the running score.
    pub fn record(&mut self, team_id: &str, period: Period) -> Score {
        let is_home = team_id == self.home_team_id;
        if !is_home && team_id != self.away_team_id {
            return self.total;
        }

        let period_score = self.by_period.entry(period).or_default();
        let running = if period == Period::Shootout { &mut self.shootout } else { &mut self.total };
        if is_home {
            period_score.home += 1;
            running.home += 1;
        } else {
            period_score.away += 1;
            running.away += 1;
        }
        self.total
    }

    pub fn total(&self) -> Score {
        self.total
    }

    /// Converted penalties of the shootout
    pub fn shootout(&self) -> Score {
        self.shootout
    }

    /// Goals per period keyed by CDF period name; periods that were played
    /// without a goal are listed with 0-0
    pub fn by_period(&self, played: &[Period]) -> BTreeMap<String, Score> {
        let mut out: BTreeMap<String, Score> = played
            .iter()
            .map(|p| (p.name().to_string(), Score::default()))
            .collect();
        for (period, score) in &self.by_period {
            out.insert(period.name().to_string(), *score);
        }
        out
    }
}

// ============================================================================
// RECONCILIATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReconciliationResult {
    /// Goal events add up to the published score
    Agreed { score: Score },

    /// Goal events and the published score disagree
    Mismatch { from_events: Score, from_document: Score },

    /// No published score to compare against
    Unverified { from_events: Score },
}

impl ReconciliationResult {
    pub fn is_agreed(&self) -> bool {
        matches!(self, ReconciliationResult::Agreed { .. })
    }

    pub fn has_discrepancy(&self) -> bool {
        matches!(self, ReconciliationResult::Mismatch { .. })
    }

    /// Score to publish in the match sheet
    pub fn final_score(&self) -> Score {
        match self {
            ReconciliationResult::Agreed { score } => *score,
            ReconciliationResult::Mismatch { from_document, .. } => *from_document,
            ReconciliationResult::Unverified { from_events } => *from_events,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            ReconciliationResult::Agreed { score } => format!("{}-{} agreed", score.home, score.away),
            ReconciliationResult::Mismatch {
                from_events,
                from_document,
            } => format!(
                "goal events give {}-{}, matches document says {}-{}",
                from_events.home, from_events.away, from_document.home, from_document.away
            ),
            ReconciliationResult::Unverified { from_events } => {
                format!("{}-{} from goal events only", from_events.home, from_events.away)
            }
        }
    }
}

// ============================================================================
// RECONCILIATION ENGINE
// ============================================================================

pub struct ReconciliationEngine;

impl ReconciliationEngine {
    pub fn new() -> Self {
        ReconciliationEngine
    }

    /// Compare the event tally with the matches document.
    ///
    /// A document score with only one side present counts as absent.
    pub fn reconcile(&self, from_events: Score, home_score: Option<u32>, away_score: Option<u32>) -> ReconciliationResult {
        match (home_score, away_score) {
            (Some(home), Some(away)) => {
                let from_document = Score { home, away };
                if from_document == from_events {
                    ReconciliationResult::Agreed { score: from_events }
                } else {
                    ReconciliationResult::Mismatch {
                        from_events,
                        from_document,
                    }
                }
            }
            _ => ReconciliationResult::Unverified { from_events },
        }
    }
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
