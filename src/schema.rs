// 📐 Shape Layer - CDF Table Integrity
// Validates the table triple of one match before it leaves the mapper
//
// Not a formal schema check: only the cross-table references and ordering
// guarantees the graph stage relies on.

use crate::attributes::AttributeRegistry;
use crate::cdf::{CdfTables, EventRecord, MatchMeta, MatchSheet};
use crate::identity::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// TABLE CONTEXT
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    MatchSheet,
    EventLog,
    MatchMeta,
}

impl Table {
    pub fn name(&self) -> &str {
        match self {
            Table::MatchSheet => "match_sheet",
            Table::EventLog => "event_log",
            Table::MatchMeta => "match_meta",
        }
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub context: String,
}

impl ValidationError {
    fn new(table: Table, field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError {
            field: field.into(),
            message: message.into(),
            context: table.name().to_string(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.context, self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), Vec<ValidationError>>;

fn into_result(errors: Vec<ValidationError>) -> ValidationResult {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

// ============================================================================
// SCHEMA VALIDATOR
// ============================================================================

pub struct SchemaValidator<'a> {
    registry: &'a AttributeRegistry,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(registry: &'a AttributeRegistry) -> Self {
        SchemaValidator { registry }
    }

    /// Teams are distinct, players sit in the team that lists them,
    /// summaries point at listed teams and players
    pub fn validate_match_sheet(&self, sheet: &MatchSheet) -> ValidationResult {
        let mut errors = Vec::new();

        if sheet.home.id == sheet.away.id {
            errors.push(ValidationError::new(
                Table::MatchSheet,
                "away.id",
                format!("home and away are both team {}", sheet.home.id),
            ));
        }

        for team in sheet.teams() {
            for player in &team.players {
                if player.team_id != team.id {
                    errors.push(ValidationError::new(
                        Table::MatchSheet,
                        "players.team_id",
                        format!("player {} listed under team {} but claims {}", player.id, team.id, player.team_id),
                    ));
                }
            }
        }

        if let Some(winner) = &sheet.result.winning_team_id {
            if !sheet.has_team(winner) {
                errors.push(ValidationError::new(
                    Table::MatchSheet,
                    "result.winning_team_id",
                    format!("unknown team {}", winner),
                ));
            }
        }

        let mut check_player = |field: &str, event_id: &str, player: Option<&String>| {
            if let Some(player) = player {
                if !sheet.has_player(player) {
                    errors.push(ValidationError::new(
                        Table::MatchSheet,
                        field,
                        format!("event {} references unknown player {}", event_id, player),
                    ));
                }
            }
        };

        for goal in &sheet.goals {
            check_player("goals.player_id", &goal.event_id, goal.player_id.as_ref());
            check_player("goals.assist_id", &goal.event_id, goal.assist_id.as_ref());
        }
        for sub in &sheet.substitutions {
            check_player("substitutions.in_player_id", &sub.event_id, Some(&sub.in_player_id));
            check_player("substitutions.out_player_id", &sub.event_id, Some(&sub.out_player_id));
        }
        for card in &sheet.cards {
            check_player("cards.player_id", &card.event_id, card.player_id.as_ref());
        }

        let summary_teams = sheet
            .goals
            .iter()
            .map(|g| (&g.event_id, &g.team_id))
            .chain(sheet.substitutions.iter().map(|s| (&s.event_id, &s.team_id)))
            .chain(sheet.cards.iter().map(|c| (&c.event_id, &c.team_id)));
        for (event_id, team_id) in summary_teams {
            if !sheet.has_team(team_id) {
                errors.push(ValidationError::new(
                    Table::MatchSheet,
                    "team_id",
                    format!("event {} references unknown team {}", event_id, team_id),
                ));
            }
        }

        into_result(errors)
    }

    /// Match ids agree, references resolve, ids are unique, time never goes backwards,
    /// attributes are the ones declared for the event type
    pub fn validate_events(&self, sheet: &MatchSheet, events: &[EventRecord]) -> ValidationResult {
        let mut errors = Vec::new();
        let event_ids: HashSet<&str> = events.iter().map(|e| e.event_id.as_str()).collect();

        if event_ids.len() != events.len() {
            errors.push(ValidationError::new(
                Table::EventLog,
                "event_id",
                format!("{} duplicate event id(s)", events.len() - event_ids.len()),
            ));
        }

        for event in events {
            let field = |name: &str| format!("{}.{}", event.event_id, name);

            if event.match_id != sheet.match_id {
                errors.push(ValidationError::new(
                    Table::EventLog,
                    field("match_id"),
                    format!("{} != match sheet {}", event.match_id, sheet.match_id),
                ));
            }

            if let Some(team) = &event.team_id {
                if !sheet.has_team(team) {
                    errors.push(ValidationError::new(Table::EventLog, field("team_id"), format!("unknown team {}", team)));
                }
            }

            if let Some(player) = &event.player_id {
                if !sheet.has_player(player) {
                    errors.push(ValidationError::new(
                        Table::EventLog,
                        field("player_id"),
                        format!("unknown player {}", player),
                    ));
                }
            }

            for (name, value) in &event.attributes {
                if !self.registry.accepts(event.event_type, name) {
                    errors.push(ValidationError::new(
                        Table::EventLog,
                        field(name),
                        format!("not an attribute of {}", event.event_type),
                    ));
                }

                for target in value.references() {
                    let resolves = match target.kind {
                        EntityKind::Player => sheet.has_player(&target.key),
                        EntityKind::Team => sheet.has_team(&target.key),
                        EntityKind::Event => event_ids.contains(target.key.as_str()),
                        _ => true,
                    };
                    if !resolves {
                        errors.push(ValidationError::new(
                            Table::EventLog,
                            field(name),
                            format!("dangling reference {}", target),
                        ));
                    }
                }
            }
        }

        for pair in events.windows(2) {
            if pair[1].time_ms < pair[0].time_ms {
                errors.push(ValidationError::new(
                    Table::EventLog,
                    format!("{}.time_ms", pair[1].event_id),
                    format!("{} comes after {} at {}", pair[1].time_ms, pair[0].event_id, pair[0].time_ms),
                ));
            }
        }

        into_result(errors)
    }

    pub fn validate_match_meta(&self, sheet: &MatchSheet, meta: &MatchMeta) -> ValidationResult {
        let mut errors = Vec::new();

        if meta.match_id != sheet.match_id {
            errors.push(ValidationError::new(
                Table::MatchMeta,
                "match_id",
                format!("{} != match sheet {}", meta.match_id, sheet.match_id),
            ));
        }
        if meta.home_team_id != sheet.home.id {
            errors.push(ValidationError::new(
                Table::MatchMeta,
                "home_team_id",
                format!("{} != match sheet {}", meta.home_team_id, sheet.home.id),
            ));
        }
        if meta.away_team_id != sheet.away.id {
            errors.push(ValidationError::new(
                Table::MatchMeta,
                "away_team_id",
                format!("{} != match sheet {}", meta.away_team_id, sheet.away.id),
            ));
        }

        into_result(errors)
    }

    /// All checks, all violations
    pub fn validate(&self, tables: &CdfTables) -> ValidationResult {
        let mut errors = Vec::new();

        for result in [
            self.validate_match_sheet(&tables.match_sheet),
            self.validate_events(&tables.match_sheet, &tables.events),
            self.validate_match_meta(&tables.match_sheet, &tables.match_meta),
        ] {
            if let Err(mut e) = result {
                errors.append(&mut e);
            }
        }

        into_result(errors)
    }
}

// ============================================================================
// TESTS
// ============================================================================
