// 🔑 Identifier Resolver - stable, namespaced identity
//
// Every entity gets an EntityId = (kind, key). The kind is the namespace, so a
// team 217 and a player 217 can never collide. Resolution is a pure function of
// the source documents: no lookups outside the roster built for this match.

use crate::entities::{Player, Roster, Team};
use crate::error::MissingReferenceError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// ENTITY KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Match,
    Team,
    Player,
    Competition,
    Season,
    Stadium,
    Referee,
    Event,
}

impl EntityKind {
    /// Namespace prefix used in node identifiers
    pub fn slug(&self) -> &'static str {
        match self {
            EntityKind::Match => "match",
            EntityKind::Team => "team",
            EntityKind::Player => "player",
            EntityKind::Competition => "competition",
            EntityKind::Season => "season",
            EntityKind::Stadium => "stadium",
            EntityKind::Referee => "referee",
            EntityKind::Event => "event",
        }
    }

    pub fn all() -> [EntityKind; 8] {
        [
            EntityKind::Match,
            EntityKind::Team,
            EntityKind::Player,
            EntityKind::Competition,
            EntityKind::Season,
            EntityKind::Stadium,
            EntityKind::Referee,
            EntityKind::Event,
        ]
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

// ============================================================================
// ENTITY ID
// ============================================================================

/// Namespaced identifier.
///
/// CDF tables carry `key` (the column already says which kind it is);
/// the graph uses `node_id()` = "{kind}/{key}".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    pub kind: EntityKind,
    pub key: String,
}

impl EntityId {
    pub fn new(kind: EntityKind, key: impl Into<String>) -> Self {
        EntityId {
            kind,
            key: key.into(),
        }
    }

    pub fn node_id(&self) -> String {
        node_id(self.kind.slug(), &self.key)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.node_id())
    }
}

/// Joins a source event id and the ordinal of a record split out of it
pub const DERIVED_SEPARATOR: char = '#';

/// "{type_slug}/{entity_id}", key percent-encoded so it stays one IRI segment
pub fn node_id(type_slug: &str, key: &str) -> String {
    format!("{}/{}", type_slug, urlencoding::encode(key))
}

/// Canonical form of a vendor event id: UUIDs lowercase-hyphenated, anything else verbatim
pub fn normalize_event_key(source_event_id: &str) -> String {
    match Uuid::parse_str(source_event_id.trim()) {
        Ok(uuid) => uuid.hyphenated().to_string(),
        Err(_) => source_event_id.to_string(),
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Per-match lookup structure.
///
/// Built once from the roster before any event is processed and only read
/// afterwards, so resolution never depends on event order.
pub struct IdResolver<'a> {
    match_id: EntityId,
    roster: &'a Roster,
}

impl<'a> IdResolver<'a> {
    pub fn new(match_key: &str, roster: &'a Roster) -> Self {
        IdResolver {
            match_id: EntityId::new(EntityKind::Match, match_key),
            roster,
        }
    }

    pub fn match_id(&self) -> &EntityId {
        &self.match_id
    }

    pub fn roster(&self) -> &Roster {
        self.roster
    }

    /// Pure namespacing for kinds that need no roster lookup
    pub fn resolve(&self, kind: EntityKind, source_key: &str) -> EntityId {
        match kind {
            EntityKind::Event => self.event(source_key),
            _ => EntityId::new(kind, source_key.trim()),
        }
    }

    pub fn event(&self, source_event_id: &str) -> EntityId {
        EntityId::new(EntityKind::Event, normalize_event_key(source_event_id))
    }

    /// Id for the second, third, ... record split out of one source event.
    ///
    /// StatsBomb event ids are UUIDs and never contain `#`, so "{id}#{n}"
    /// cannot collide with another event's own id.
    pub fn derived_event(&self, source_event_id: &str, ordinal: usize) -> EntityId {
        if ordinal == 0 {
            return self.event(source_event_id);
        }
        EntityId::new(
            EntityKind::Event,
            format!("{}{}{}", normalize_event_key(source_event_id), DERIVED_SEPARATOR, ordinal),
        )
    }

    pub fn team(&self, source_id: u64, source_event_id: &str) -> Result<&'a Team, MissingReferenceError> {
        self.roster
            .team_by_source_id(source_id)
            .ok_or_else(|| self.missing(EntityKind::Team, source_id, source_event_id))
    }

    pub fn player(&self, source_id: u64, source_event_id: &str) -> Result<&'a Player, MissingReferenceError> {
        self.roster
            .player_by_source_id(source_id)
            .ok_or_else(|| self.missing(EntityKind::Player, source_id, source_event_id))
    }

    fn missing(&self, kind: EntityKind, source_id: u64, source_event_id: &str) -> MissingReferenceError {
        MissingReferenceError {
            match_id: self.match_id.key.clone(),
            source_event_id: source_event_id.to_string(),
            kind,
            key: source_id.to_string(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
