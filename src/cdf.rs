// 📋 CDF Tables - vendor-neutral match representation
// Three tables per match: match sheet, event log, match meta

use crate::coordinates::NormalizedPoint;
use crate::identity::EntityId;
use crate::temporal::Period;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// EVENT TYPES
// ============================================================================

/// CDF event vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CdfEventType {
    Pass,
    Shot,
    Carry,
    Dribble,
    DribbledPast,
    Duel,
    FiftyFifty,
    Interception,
    Clearance,
    Block,
    BallRecovery,
    BallReceipt,
    Dispossessed,
    Pressure,
    FoulCommitted,
    FoulWon,
    Card,
    Substitution,
    Goalkeeper,
    Offside,
    OwnGoalFor,
    OwnGoalAgainst,
    Miscontrol,
    Error,
    Shield,
    InjuryStoppage,
    RefereeBallDrop,
    TacticalShift,
    PlayerOn,
    PlayerOff,
    /// Administrative markers, only emitted when configured to keep them
    Administrative,
    Other,
}

impl CdfEventType {
    /// snake_case name used in the event log
    pub fn as_str(&self) -> &'static str {
        match self {
            CdfEventType::Pass => "pass",
            CdfEventType::Shot => "shot",
            CdfEventType::Carry => "carry",
            CdfEventType::Dribble => "dribble",
            CdfEventType::DribbledPast => "dribbled_past",
            CdfEventType::Duel => "duel",
            CdfEventType::FiftyFifty => "fifty_fifty",
            CdfEventType::Interception => "interception",
            CdfEventType::Clearance => "clearance",
            CdfEventType::Block => "block",
            CdfEventType::BallRecovery => "ball_recovery",
            CdfEventType::BallReceipt => "ball_receipt",
            CdfEventType::Dispossessed => "dispossessed",
            CdfEventType::Pressure => "pressure",
            CdfEventType::FoulCommitted => "foul_committed",
            CdfEventType::FoulWon => "foul_won",
            CdfEventType::Card => "card",
            CdfEventType::Substitution => "substitution",
            CdfEventType::Goalkeeper => "goalkeeper",
            CdfEventType::Offside => "offside",
            CdfEventType::OwnGoalFor => "own_goal_for",
            CdfEventType::OwnGoalAgainst => "own_goal_against",
            CdfEventType::Miscontrol => "miscontrol",
            CdfEventType::Error => "error",
            CdfEventType::Shield => "shield",
            CdfEventType::InjuryStoppage => "injury_stoppage",
            CdfEventType::RefereeBallDrop => "referee_ball_drop",
            CdfEventType::TacticalShift => "tactical_shift",
            CdfEventType::PlayerOn => "player_on",
            CdfEventType::PlayerOff => "player_off",
            CdfEventType::Administrative => "administrative",
            CdfEventType::Other => "other",
        }
    }

    /// Ontology class name ("Pass", "FoulCommitted", ...)
    pub fn class_name(&self) -> String {
        self.as_str()
            .split('_')
            .map(|part| {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect()
    }
}

impl fmt::Display for CdfEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ATTRIBUTE VALUES
// ============================================================================

/// Typed value of one CDF attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    /// Identifier of another entity, stored as its bare key in the table
    Reference(EntityId),
    /// Several identifiers under one attribute, in source order
    References(Vec<EntityId>),
}

impl AttributeValue {
    pub fn as_reference(&self) -> Option<&EntityId> {
        match self {
            AttributeValue::Reference(id) => Some(id),
            _ => None,
        }
    }

    /// Every identifier carried, whether one or many
    pub fn references(&self) -> &[EntityId] {
        match self {
            AttributeValue::Reference(id) => std::slice::from_ref(id),
            AttributeValue::References(ids) => ids,
            _ => &[],
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttributeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

pub type AttributeMap = BTreeMap<String, AttributeValue>;

// ============================================================================
// EVENT LOG
// ============================================================================

/// Per-record markers for recoverable problems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFlag {
    UnknownEventType,
    MalformedEvent,
    CoordinateClamped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: String,
    pub source_event_id: String,
    pub match_id: String,

    /// Null only for malformed records whose team could not be read
    pub team_id: Option<String>,
    pub player_id: Option<String>,

    pub period: Period,
    /// Broadcast clock "HH:MM:SS.mmm"
    pub clock: String,
    /// Monotonic in-match time in milliseconds
    pub time_ms: u64,

    pub location: Option<NormalizedPoint>,
    pub event_type: CdfEventType,

    #[serde(default)]
    pub attributes: AttributeMap,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<EventFlag>,
}

impl EventRecord {
    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn has_flag(&self, flag: EventFlag) -> bool {
        self.flags.contains(&flag)
    }
}

// ============================================================================
// MATCH SHEET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,
    pub jersey_number: Option<u32>,
    pub position: Option<String>,
    pub is_starter: bool,
    pub has_played: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSheet {
    pub id: String,
    pub name: String,
    pub players: Vec<PlayerEntry>,
}

impl TeamSheet {
    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub home: u32,
    pub away: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub final_score: Score,
    pub winning_team_id: Option<String>,
    /// Goals scored per period, keyed by CDF period name
    pub by_period: BTreeMap<String, Score>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchStatus {
    pub is_neutral: bool,
    pub has_extratime: bool,
    pub has_shootout: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalEntry {
    pub event_id: String,
    pub clock: String,
    pub team_id: String,
    pub player_id: Option<String>,
    pub assist_id: Option<String>,
    pub is_own_goal: bool,
    pub is_penalty: bool,
    /// Running score after this goal
    pub score: Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubstitutionEntry {
    pub event_id: String,
    pub clock: String,
    pub team_id: String,
    pub in_player_id: String,
    pub out_player_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardEntry {
    pub event_id: String,
    pub clock: String,
    pub team_id: String,
    pub player_id: Option<String>,
    /// "yellow card", "second yellow", "red card"
    pub card_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSheet {
    pub match_id: String,
    pub home: TeamSheet,
    pub away: TeamSheet,
    pub result: MatchResult,
    pub status: MatchStatus,
    pub kickoff_time: Option<String>,
    pub stadium_id: Option<String>,
    pub referees: Vec<NamedEntity>,
    pub goals: Vec<GoalEntry>,
    pub substitutions: Vec<SubstitutionEntry>,
    pub cards: Vec<CardEntry>,
    pub vendor: String,
}

impl MatchSheet {
    pub fn teams(&self) -> [&TeamSheet; 2] {
        [&self.home, &self.away]
    }

    pub fn has_team(&self, team_id: &str) -> bool {
        self.teams().iter().any(|t| t.id == team_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.teams().iter().any(|t| t.has_player(player_id))
    }
}

// ============================================================================
// MATCH META
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StadiumInfo {
    pub id: String,
    pub name: Option<String>,
    pub country: Option<String>,
    pub pitch_length: Option<f64>,
    pub pitch_width: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayDirection {
    LeftRight,
    RightLeft,
}

impl PlayDirection {
    pub fn flipped(&self) -> Self {
        match self {
            PlayDirection::LeftRight => PlayDirection::RightLeft,
            PlayDirection::RightLeft => PlayDirection::LeftRight,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlayDirection::LeftRight => "left_right",
            PlayDirection::RightLeft => "right_left",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodInfo {
    pub period: Period,
    pub start_ms: u64,
    pub end_ms: u64,
    /// Home team's attacking direction
    pub play_direction: Option<PlayDirection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Whistle {
    /// "half_start" / "half_end"
    pub kind: String,
    pub period: Period,
    pub clock: String,
    pub time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub vendor: String,
    pub cdf_version: String,
    /// Version of this converter
    pub converter_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchMeta {
    pub match_id: String,
    pub competition: Option<NamedEntity>,
    pub season: Option<NamedEntity>,
    pub competition_stage: Option<String>,
    pub match_week: Option<u32>,
    /// RFC 3339, UTC
    pub kickoff_time: Option<String>,
    pub stadium: Option<StadiumInfo>,
    pub referee: Option<NamedEntity>,
    pub home_team_id: String,
    pub away_team_id: String,
    pub periods: Vec<PeriodInfo>,
    pub whistles: Vec<Whistle>,
    pub version: VersionInfo,
}

// ============================================================================
// TABLE TRIPLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CdfTables {
    pub match_sheet: MatchSheet,
    pub events: Vec<EventRecord>,
    pub match_meta: MatchMeta,
}

impl CdfTables {
    pub fn match_id(&self) -> &str {
        &self.match_sheet.match_id
    }

    pub fn event(&self, event_id: &str) -> Option<&EventRecord> {
        self.events.iter().find(|e| e.event_id == event_id)
    }
}
