// 📥 Source Documents - StatsBomb open-data shapes
// Events, lineups and matches as delivered by the vendor, already parsed by the caller

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// SHARED SHAPES
// ============================================================================

/// `{ "id": 30, "name": "Pass" }` - the vendor's id/name pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdName {
    pub id: u64,
    pub name: String,
}

/// `{ "id": ..., "name": ... }` where either side may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionalIdName {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
}

// ============================================================================
// EVENTS DOCUMENT
// ============================================================================

/// Event keys every source event carries; anything else is a qualifier
const CORE_EVENT_KEYS: &[&str] = &[
    "id",
    "index",
    "period",
    "timestamp",
    "minute",
    "second",
    "type",
    "team",
    "player",
    "location",
    "duration",
    "under_pressure",
    "play_pattern",
    "possession",
    "possession_team",
    "position",
    "related_events",
];

/// One event from the events document.
///
/// The type-specific objects (`pass`, `shot`, `foul_committed`, ...) are kept
/// as raw JSON in `qualifiers`; the taxonomy handlers pick what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvent {
    pub id: String,

    #[serde(default)]
    pub index: u64,

    pub period: u8,

    /// Period-relative clock "HH:MM:SS.mmm"
    #[serde(default)]
    pub timestamp: String,

    #[serde(default)]
    pub minute: u32,

    #[serde(default)]
    pub second: u32,

    #[serde(rename = "type")]
    pub event_type: IdName,

    pub team: IdName,

    #[serde(default)]
    pub player: Option<IdName>,

    #[serde(default)]
    pub location: Option<Vec<f64>>,

    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,

    #[serde(default)]
    pub under_pressure: Option<bool>,

    #[serde(default)]
    pub play_pattern: Option<IdName>,

    #[serde(default)]
    pub related_events: Vec<String>,

    #[serde(flatten)]
    pub qualifiers: Map<String, Value>,
}

impl SourceEvent {
    /// Decode one raw event. Errors stay local to the event.
    pub fn from_value(raw: &Value) -> Result<Self, serde_json::Error> {
        let mut event: SourceEvent = serde_json::from_value(raw.clone())?;
        event
            .qualifiers
            .retain(|key, _| !CORE_EVENT_KEYS.contains(&key.as_str()));
        Ok(event)
    }

    /// The type-specific qualifier object, e.g. `qualifier("pass")`
    pub fn qualifier(&self, key: &str) -> Option<&Value> {
        self.qualifiers.get(key).filter(|v| !v.is_null())
    }

    /// Walk a path of keys through a qualifier object: `path(&["pass", "outcome", "name"])`
    pub fn path(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.qualifier(first)?;
        for key in rest {
            current = current.get(*key)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    pub fn path_str(&self, keys: &[&str]) -> Option<&str> {
        self.path(keys).and_then(|v| v.as_str())
    }

    pub fn path_f64(&self, keys: &[&str]) -> Option<f64> {
        self.path(keys).and_then(|v| v.as_f64())
    }

    pub fn path_u64(&self, keys: &[&str]) -> Option<u64> {
        self.path(keys).and_then(|v| v.as_u64())
    }

    /// Boolean qualifiers are only present when true
    pub fn path_flag(&self, keys: &[&str]) -> bool {
        self.path(keys).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    /// `[x, y]` or `[x, y, z]` nested in a qualifier (end locations)
    pub fn path_location(&self, keys: &[&str]) -> Option<Vec<f64>> {
        let array = self.path(keys)?.as_array()?;
        let coords: Vec<f64> = array.iter().filter_map(|v| v.as_f64()).collect();
        if coords.len() >= 2 && coords.len() == array.len() {
            Some(coords)
        } else {
            None
        }
    }

    pub fn player_id(&self) -> Option<u64> {
        self.player.as_ref().map(|p| p.id)
    }

    pub fn type_name(&self) -> &str {
        &self.event_type.name
    }
}

/// Best-effort id of a raw event that failed to decode
pub fn raw_event_id(raw: &Value, position: usize) -> String {
    raw.get("id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| format!("unidentified-{}", position))
}

// ============================================================================
// LINEUP DOCUMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupTeam {
    pub team_id: u64,
    pub team_name: String,
    #[serde(default)]
    pub lineup: Vec<LineupPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupPlayer {
    pub player_id: u64,
    pub player_name: String,
    #[serde(default)]
    pub player_nickname: Option<String>,
    #[serde(default)]
    pub jersey_number: Option<u32>,
    #[serde(default)]
    pub country: Option<OptionalIdName>,
    #[serde(default)]
    pub positions: Vec<LineupPosition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupPosition {
    #[serde(default)]
    pub position_id: Option<u64>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub from_period: Option<u8>,
    #[serde(default)]
    pub to_period: Option<u8>,
    #[serde(default)]
    pub start_reason: Option<String>,
    #[serde(default)]
    pub end_reason: Option<String>,
}

// ============================================================================
// MATCHES DOCUMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    /// Numeric in the open data; accepted as string or number
    #[serde(deserialize_with = "deserialize_match_id")]
    pub match_id: String,

    #[serde(default)]
    pub match_date: Option<String>,

    /// Local kickoff clock "HH:MM:SS.mmm"
    #[serde(default)]
    pub kick_off: Option<String>,

    #[serde(default)]
    pub competition: Option<CompetitionRef>,

    #[serde(default)]
    pub season: Option<SeasonRef>,

    #[serde(default)]
    pub home_team: Option<HomeTeamRef>,

    #[serde(default)]
    pub away_team: Option<AwayTeamRef>,

    #[serde(default)]
    pub home_score: Option<u32>,

    #[serde(default)]
    pub away_score: Option<u32>,

    #[serde(default)]
    pub match_week: Option<u32>,

    #[serde(default)]
    pub competition_stage: Option<OptionalIdName>,

    #[serde(default)]
    pub stadium: Option<VenueRef>,

    #[serde(default)]
    pub referee: Option<VenueRef>,

    #[serde(default)]
    pub pitch_length: Option<f64>,

    #[serde(default)]
    pub pitch_width: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionRef {
    pub competition_id: u64,
    #[serde(default)]
    pub competition_name: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonRef {
    pub season_id: u64,
    #[serde(default)]
    pub season_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HomeTeamRef {
    pub home_team_id: u64,
    #[serde(default)]
    pub home_team_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AwayTeamRef {
    pub away_team_id: u64,
    #[serde(default)]
    pub away_team_name: Option<String>,
}

/// Stadiums and referees share the `{id, name, country}` shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub country: Option<OptionalIdName>,
}

fn deserialize_match_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "match_id must be a string or number, got {}",
            other
        ))),
    }
}

// ============================================================================
// INPUT BUNDLE
// ============================================================================

/// The three documents of one match, as handed to the mapper
#[derive(Debug, Clone)]
pub struct SourceDocuments {
    pub match_id: String,
    pub events: Vec<Value>,
    pub lineup: Vec<LineupTeam>,
    pub matches: Option<Vec<MatchSummary>>,
}

impl SourceDocuments {
    pub fn new(match_id: impl Into<String>, events: Vec<Value>, lineup: Vec<LineupTeam>) -> Self {
        SourceDocuments {
            match_id: match_id.into(),
            events,
            lineup,
            matches: None,
        }
    }

    /// Builder: attach the competition/season matches document
    pub fn with_matches(mut self, matches: Vec<MatchSummary>) -> Self {
        self.matches = Some(matches);
        self
    }

    /// The summary record for this match, if the matches document lists it
    pub fn match_summary(&self) -> Option<&MatchSummary> {
        self.matches
            .as_ref()?
            .iter()
            .find(|m| m.match_id == self.match_id)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pass_event() -> Value {
        json!({
            "id": "9f3c0a4e-1111-4c1e-9a51-000000000001",
            "index": 5,
            "period": 1,
            "timestamp": "00:00:01.250",
            "minute": 0,
            "second": 1,
            "type": { "id": 30, "name": "Pass" },
            "team": { "id": 217, "name": "Barcelona" },
            "player": { "id": 5503, "name": "Lionel Messi" },
            "location": [60.0, 40.0],
            "duration": 1.2,
            "possession": 2,
            "pass": {
                "recipient": { "id": 5211, "name": "Jordi Alba" },
                "length": 18.5,
                "end_location": [75.0, 30.0],
                "outcome": { "id": 9, "name": "Incomplete" }
            }
        })
    }

    #[test]
    fn test_event_qualifiers_exclude_core_keys() {
        let event = SourceEvent::from_value(&pass_event()).unwrap();
        assert!(event.qualifiers.contains_key("pass"));
        assert!(!event.qualifiers.contains_key("possession"));
        assert_eq!(event.type_name(), "Pass");
        assert_eq!(event.player_id(), Some(5503));
    }

    #[test]
    fn test_event_path_helpers() {
        let event = SourceEvent::from_value(&pass_event()).unwrap();
        assert_eq!(event.path_u64(&["pass", "recipient", "id"]), Some(5211));
        assert_eq!(event.path_str(&["pass", "outcome", "name"]), Some("Incomplete"));
        assert_eq!(event.path_f64(&["pass", "length"]), Some(18.5));
        assert_eq!(event.path_location(&["pass", "end_location"]), Some(vec![75.0, 30.0]));
        assert!(!event.path_flag(&["pass", "cross"]));
        assert!(event.path(&["shot"]).is_none());
    }

    #[test]
    fn test_malformed_event_fails_locally() {
        let raw = json!({ "id": "broken", "type": "not-an-object" });
        assert!(SourceEvent::from_value(&raw).is_err());
        assert_eq!(raw_event_id(&raw, 3), "broken");
        assert_eq!(raw_event_id(&json!({}), 3), "unidentified-3");
    }

    #[test]
    fn test_match_summary_accepts_numeric_id() {
        let summary: MatchSummary = serde_json::from_value(json!({
            "match_id": 3788741,
            "home_score": 2,
            "away_score": 1,
            "stadium": { "id": 4867, "name": "Stadio Olimpico" }
        }))
        .unwrap();
        assert_eq!(summary.match_id, "3788741");
        assert_eq!(summary.home_score, Some(2));
        assert_eq!(summary.stadium.unwrap().name.as_deref(), Some("Stadio Olimpico"));
    }

    #[test]
    fn test_documents_find_match_summary() {
        let summary: MatchSummary = serde_json::from_value(json!({ "match_id": "42" })).unwrap();
        let docs = SourceDocuments::new("42", Vec::new(), Vec::new()).with_matches(vec![summary]);
        assert!(docs.match_summary().is_some());

        let docs = SourceDocuments::new("43", Vec::new(), Vec::new());
        assert!(docs.match_summary().is_none());
    }
}
