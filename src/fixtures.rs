// 🧪 Test fixtures - one small, fully consistent match
//
// Italy (home) 2-1 Turkey (away) per the matches document; the events
// document only carries the kickoff, one pass and one goal.

use crate::cdf::CdfTables;
use crate::config::PipelineConfig;
use crate::entities::Roster;
use crate::mapper::SourceToCdfMapper;
use crate::source::{LineupPlayer, LineupPosition, LineupTeam, MatchSummary, SourceDocuments};
use crate::taxonomy::TaxonomyRegistry;
use crate::temporal::parse_timestamp;
use serde_json::{json, Value};

pub const MATCH_ID: &str = "3788741";
pub const HOME_TEAM_ID: u64 = 914;
pub const AWAY_TEAM_ID: u64 = 909;

pub const EVENT_KICKOFF: &str = "0a1b2c3d-0000-4000-8000-000000000001";
pub const EVENT_PASS: &str = "0a1b2c3d-0000-4000-8000-000000000002";
pub const EVENT_GOAL: &str = "0a1b2c3d-0000-4000-8000-000000000003";

pub const PLAYERS_PER_TEAM: u64 = 11;

pub fn home_player(i: u64) -> u64 {
    10_000 + i
}

pub fn away_player(i: u64) -> u64 {
    20_000 + i
}

// ============================================================================
// LINEUP / MATCHES
// ============================================================================

fn lineup_team(team_id: u64, team_name: &str, player: fn(u64) -> u64) -> LineupTeam {
    LineupTeam {
        team_id,
        team_name: team_name.to_string(),
        lineup: (0..PLAYERS_PER_TEAM)
            .map(|i| LineupPlayer {
                player_id: player(i),
                player_name: format!("Given{} Family{} {}", i, i, team_name),
                player_nickname: if i == 0 { Some(format!("Keeper {}", team_name)) } else { None },
                jersey_number: Some(i as u32 + 1),
                country: None,
                // the last player came on as a substitute
                positions: vec![LineupPosition {
                    position_id: Some(i + 1),
                    position: Some(format!("Position {}", i + 1)),
                    from: Some(if i + 1 == PLAYERS_PER_TEAM { "60:00" } else { "00:00" }.to_string()),
                    to: None,
                    from_period: Some(if i + 1 == PLAYERS_PER_TEAM { 2 } else { 1 }),
                    to_period: None,
                    start_reason: Some(
                        if i + 1 == PLAYERS_PER_TEAM { "Substitution - On (Tactical)" } else { "Starting XI" }.to_string(),
                    ),
                    end_reason: Some("Final Whistle".to_string()),
                }],
            })
            .collect(),
    }
}

pub fn lineup() -> Vec<LineupTeam> {
    vec![
        lineup_team(HOME_TEAM_ID, "Italy", home_player),
        lineup_team(AWAY_TEAM_ID, "Turkey", away_player),
    ]
}

pub fn matches() -> Vec<MatchSummary> {
    serde_json::from_value(json!([
        {
            "match_id": 3788741,
            "match_date": "2021-06-11",
            "kick_off": "21:00:00.000",
            "competition": { "competition_id": 55, "competition_name": "UEFA Euro", "country_name": "Europe" },
            "season": { "season_id": 43, "season_name": "2020" },
            "home_team": { "home_team_id": HOME_TEAM_ID, "home_team_name": "Italy" },
            "away_team": { "away_team_id": AWAY_TEAM_ID, "away_team_name": "Turkey" },
            "home_score": 2,
            "away_score": 1,
            "match_week": 1,
            "competition_stage": { "id": 10, "name": "Group Stage" },
            "stadium": { "id": 4867, "name": "Stadio Olimpico", "country": { "id": 112, "name": "Italy" } },
            "referee": { "id": 943, "name": "Danny Makkelie", "country": { "id": 160, "name": "Netherlands" } }
        },
        { "match_id": 3788742, "home_score": 0, "away_score": 0 }
    ]))
    .expect("fixture matches document")
}

pub fn roster() -> Roster {
    let matches = matches();
    Roster::from_lineup(&lineup(), matches.first()).expect("fixture roster")
}

// ============================================================================
// EVENTS
// ============================================================================

/// A bare source event; add qualifiers with `value["pass"] = json!(...)`
pub fn event(id: &str, index: u64, period: u8, timestamp: &str, type_id: u64, type_name: &str, team: u64, player: Option<u64>) -> Value {
    let millis = parse_timestamp(timestamp).unwrap_or(0);
    let period_start_minute = match period {
        2 => 45,
        3 => 90,
        4 => 105,
        5 => 120,
        _ => 0,
    };
    let team_name = if team == HOME_TEAM_ID { "Italy" } else { "Turkey" };
    let mut value = json!({
        "id": id,
        "index": index,
        "period": period,
        "timestamp": timestamp,
        "minute": period_start_minute + millis / 60_000,
        "second": (millis / 1000) % 60,
        "type": { "id": type_id, "name": type_name },
        "team": { "id": team, "name": team_name },
        "possession": 1,
        "possession_team": { "id": team, "name": team_name }
    });
    if let Some(player) = player {
        value["player"] = json!({ "id": player, "name": format!("Player {}", player) });
    }
    value
}

pub fn scenario_events() -> Vec<Value> {
    let mut kickoff = event(EVENT_KICKOFF, 1, 1, "00:00:00.100", 30, "Pass", HOME_TEAM_ID, Some(home_player(9)));
    kickoff["location"] = json!([60.0, 40.0]);
    kickoff["duration"] = json!(0.8);
    kickoff["play_pattern"] = json!({ "id": 9, "name": "From Kick Off" });
    kickoff["pass"] = json!({
        "recipient": { "id": home_player(8), "name": "Receiver" },
        "length": 10.0,
        "angle": 3.1415927,
        "end_location": [50.0, 40.0],
        "height": { "id": 1, "name": "Ground Pass" },
        "type": { "id": 65, "name": "Kick Off" },
        "body_part": { "id": 40, "name": "Right Foot" }
    });

    let mut pass = event(EVENT_PASS, 2, 1, "00:10:00.000", 30, "Pass", HOME_TEAM_ID, Some(home_player(4)));
    pass["location"] = json!([70.0, 30.0]);
    pass["duration"] = json!(1.2);
    pass["pass"] = json!({
        "recipient": { "id": home_player(10), "name": "Scorer" },
        "end_location": [110.0, 38.0],
        "goal_assist": true,
        "shot_assist": true,
        "assisted_shot_id": EVENT_GOAL
    });

    let mut goal = event(EVENT_GOAL, 3, 1, "00:10:02.000", 16, "Shot", HOME_TEAM_ID, Some(home_player(10)));
    goal["location"] = json!([110.0, 38.0]);
    goal["shot"] = json!({
        "statsbomb_xg": 0.4213,
        "end_location": [120.0, 39.0, 1.2],
        "outcome": { "id": 97, "name": "Goal" },
        "type": { "id": 87, "name": "Open Play" },
        "body_part": { "id": 38, "name": "Left Foot" },
        "technique": { "id": 93, "name": "Normal" },
        "first_time": true,
        "key_pass_id": EVENT_PASS
    });

    vec![kickoff, pass, goal]
}

pub fn scenario_documents() -> SourceDocuments {
    SourceDocuments::new(MATCH_ID, scenario_events(), lineup()).with_matches(matches())
}

pub fn scenario_tables() -> CdfTables {
    let config = PipelineConfig::default();
    let registry = TaxonomyRegistry::new();
    SourceToCdfMapper::new(&config, &registry)
        .convert(&scenario_documents())
        .expect("scenario converts")
        .tables
}
