// 🚨 Conversion Errors - match-fatal failures
// Anything here aborts one match; recoverable issues go to data_quality::Diagnostics

use crate::identity::EntityKind;
use crate::schema::ValidationError;
use thiserror::Error;

/// A team or player referenced by an event is not in the lineup document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("match {match_id}: event {source_event_id} references unknown {kind} '{key}'")]
pub struct MissingReferenceError {
    pub match_id: String,
    pub source_event_id: String,
    pub kind: EntityKind,
    pub key: String,
}

#[derive(Debug, Clone, Error)]
pub enum ConversionError {
    #[error(transparent)]
    MissingReference(#[from] MissingReferenceError),

    #[error("match {match_id}: invalid lineup: {reason}")]
    InvalidLineup { match_id: String, reason: String },

    #[error("match {match_id}: {} integrity violation(s), first: {}", .violations.len(), first_violation(.violations))]
    IntegrityViolation {
        match_id: String,
        violations: Vec<ValidationError>,
    },
}

fn first_violation(violations: &[ValidationError]) -> String {
    violations
        .first()
        .map(|v| v.to_string())
        .unwrap_or_default()
}

impl ConversionError {
    /// Match the error belongs to
    pub fn match_id(&self) -> &str {
        match self {
            ConversionError::MissingReference(e) => &e.match_id,
            ConversionError::InvalidLineup { match_id, .. } => match_id,
            ConversionError::IntegrityViolation { match_id, .. } => match_id,
        }
    }

    /// Source event that triggered the failure, when there is one
    pub fn source_event_id(&self) -> Option<&str> {
        match self {
            ConversionError::MissingReference(e) => Some(&e.source_event_id),
            _ => None,
        }
    }
}
