// ✅ Data Quality - recoverable conversion issues
// Everything that degrades a match without aborting it ends up here
//
// Warnings stay attached to the match they came from, so a batch report can
// tell "converted with warnings" apart from "failed".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

// ============================================================================
// SEVERITY / KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,    // Value was filled in from a fallback
    Warning, // Data was degraded (clamped, retyped, dropped)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    UnknownEventType,
    MalformedEvent,
    CoordinateClamped,
    MissingMetadata,
    ScoreMismatch,
    InvalidKickoff,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::UnknownEventType => "unknown_event_type",
            WarningKind::MalformedEvent => "malformed_event",
            WarningKind::CoordinateClamped => "coordinate_clamped",
            WarningKind::MissingMetadata => "missing_metadata",
            WarningKind::ScoreMismatch => "score_mismatch",
            WarningKind::InvalidKickoff => "invalid_kickoff",
        }
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            WarningKind::MissingMetadata => Severity::Info,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CONVERSION WARNING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionWarning {
    pub severity: Severity,
    pub kind: WarningKind,
    pub match_id: String,
    pub source_event_id: Option<String>,
    pub message: String,
}

impl fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source_event_id {
            Some(ev) => write!(f, "[{}] match {} event {}: {}", self.kind, self.match_id, ev, self.message),
            None => write!(f, "[{}] match {}: {}", self.kind, self.match_id, self.message),
        }
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Warning collector for one match.
///
/// Every push also emits a `warn!` line so a run without a report still
/// shows what was degraded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    match_id: String,
    warnings: Vec<ConversionWarning>,
}

impl Diagnostics {
    pub fn new(match_id: impl Into<String>) -> Self {
        Diagnostics {
            match_id: match_id.into(),
            warnings: Vec::new(),
        }
    }

    pub fn match_id(&self) -> &str {
        &self.match_id
    }

    /// Record a warning tied to one source event
    pub fn event_warning(&mut self, kind: WarningKind, source_event_id: &str, message: impl Into<String>) {
        self.push(kind, Some(source_event_id.to_string()), message.into());
    }

    /// Record a match-level warning
    pub fn match_warning(&mut self, kind: WarningKind, message: impl Into<String>) {
        self.push(kind, None, message.into());
    }

    fn push(&mut self, kind: WarningKind, source_event_id: Option<String>, message: String) {
        let warning = ConversionWarning {
            severity: kind.default_severity(),
            kind,
            match_id: self.match_id.clone(),
            source_event_id,
            message,
        };

        warn!(
            match_id = %warning.match_id,
            event = warning.source_event_id.as_deref().unwrap_or("-"),
            kind = %warning.kind,
            "{}",
            warning.message
        );

        self.warnings.push(warning);
    }

    pub fn warnings(&self) -> &[ConversionWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn count(&self, kind: WarningKind) -> usize {
        self.warnings.iter().filter(|w| w.kind == kind).count()
    }

    pub fn by_kind(&self) -> BTreeMap<WarningKind, usize> {
        let mut counts = BTreeMap::new();
        for w in &self.warnings {
            *counts.entry(w.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn summary(&self) -> String {
        if self.warnings.is_empty() {
            return format!("match {}: clean", self.match_id);
        }
        let parts: Vec<String> = self
            .by_kind()
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind))
            .collect();
        format!("match {}: {}", self.match_id, parts.join(", "))
    }

    pub fn into_warnings(self) -> Vec<ConversionWarning> {
        self.warnings
    }
}

// ============================================================================
// TESTS
// ============================================================================
