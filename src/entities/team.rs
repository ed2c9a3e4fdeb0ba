// 🛡️ Team Entity + Roster
// Both sides of one match, keyed by vendor id, built once from the lineup document

use crate::entities::player::Player;
use crate::identity::{EntityId, EntityKind};
use crate::source::{LineupTeam, MatchSummary};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

// ============================================================================
// TEAM
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: EntityId,
    pub source_id: u64,
    pub name: String,
    pub side: Side,
    pub players: Vec<Player>,
}

impl Team {
    pub fn from_lineup(entry: &LineupTeam, side: Side) -> Self {
        let id = EntityId::new(EntityKind::Team, entry.team_id.to_string());
        let players = entry
            .lineup
            .iter()
            .map(|p| Player::from_lineup(p, &id))
            .collect();

        Team {
            id,
            source_id: entry.team_id,
            name: entry.team_name.clone(),
            side,
            players,
        }
    }

    pub fn starters(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_starter)
    }
}

// ============================================================================
// ROSTER
// ============================================================================

/// Why a lineup document cannot seed a roster
#[derive(Debug, Clone, PartialEq)]
pub enum RosterError {
    WrongTeamCount(usize),
    DuplicateTeam(u64),
    DuplicatePlayer(u64),
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::WrongTeamCount(n) => write!(f, "expected 2 teams, found {}", n),
            RosterError::DuplicateTeam(id) => write!(f, "team {} listed twice", id),
            RosterError::DuplicatePlayer(id) => write!(f, "player {} listed twice", id),
        }
    }
}

/// Both teams of a match plus a player index.
///
/// Read-only after construction: the identifier resolver borrows it for the
/// whole event pass.
#[derive(Debug, Clone)]
pub struct Roster {
    pub home: Team,
    pub away: Team,
    /// player source id -> (side, index into that team's players)
    player_index: HashMap<u64, (Side, usize)>,
}

impl Roster {
    /// Build from the lineup document.
    ///
    /// The home side comes from the matches document when it names one of the
    /// two lineup teams; otherwise the first lineup entry is home.
    pub fn from_lineup(
        lineup: &[LineupTeam],
        summary: Option<&MatchSummary>,
    ) -> Result<Self, RosterError> {
        if lineup.len() != 2 {
            return Err(RosterError::WrongTeamCount(lineup.len()));
        }
        if lineup[0].team_id == lineup[1].team_id {
            return Err(RosterError::DuplicateTeam(lineup[0].team_id));
        }

        let home_hint = summary
            .and_then(|s| s.home_team.as_ref())
            .map(|h| h.home_team_id);

        let (home_entry, away_entry) = match home_hint {
            Some(id) if id == lineup[1].team_id => (&lineup[1], &lineup[0]),
            _ => (&lineup[0], &lineup[1]),
        };

        let home = Team::from_lineup(home_entry, Side::Home);
        let away = Team::from_lineup(away_entry, Side::Away);

        let mut player_index = HashMap::new();
        for team in [&home, &away] {
            for (idx, player) in team.players.iter().enumerate() {
                if player_index
                    .insert(player.source_id, (team.side, idx))
                    .is_some()
                {
                    return Err(RosterError::DuplicatePlayer(player.source_id));
                }
            }
        }

        Ok(Roster {
            home,
            away,
            player_index,
        })
    }

    pub fn team(&self, side: Side) -> &Team {
        match side {
            Side::Home => &self.home,
            Side::Away => &self.away,
        }
    }

    pub fn team_by_source_id(&self, source_id: u64) -> Option<&Team> {
        [&self.home, &self.away]
            .into_iter()
            .find(|t| t.source_id == source_id)
    }

    pub fn player_by_source_id(&self, source_id: u64) -> Option<&Player> {
        let (side, idx) = self.player_index.get(&source_id)?;
        self.team(*side).players.get(*idx)
    }

    pub fn teams(&self) -> [&Team; 2] {
        [&self.home, &self.away]
    }

    pub fn player_count(&self) -> usize {
        self.player_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{HomeTeamRef, LineupPlayer};

    fn lineup_team(team_id: u64, name: &str, player_ids: &[u64]) -> LineupTeam {
        LineupTeam {
            team_id,
            team_name: name.to_string(),
            lineup: player_ids
                .iter()
                .map(|id| LineupPlayer {
                    player_id: *id,
                    player_name: format!("Player {}", id),
                    player_nickname: None,
                    jersey_number: Some((*id % 99) as u32),
                    country: None,
                    positions: Vec::new(),
                })
                .collect(),
        }
    }

    fn summary_with_home(home_id: u64) -> MatchSummary {
        serde_json::from_value(serde_json::json!({
            "match_id": "1",
            "home_team": { "home_team_id": home_id }
        }))
        .unwrap()
    }

    #[test]
    fn test_roster_uses_lineup_order_without_summary() {
        let lineup = vec![lineup_team(1, "A", &[10, 11]), lineup_team(2, "B", &[20])];
        let roster = Roster::from_lineup(&lineup, None).unwrap();

        assert_eq!(roster.home.source_id, 1);
        assert_eq!(roster.away.source_id, 2);
        assert_eq!(roster.player_count(), 3);
        assert_eq!(
            roster.player_by_source_id(20).unwrap().team_id,
            roster.away.id
        );
    }

    #[test]
    fn test_roster_home_from_summary() {
        let lineup = vec![lineup_team(1, "A", &[10]), lineup_team(2, "B", &[20])];
        let summary = summary_with_home(2);
        let roster = Roster::from_lineup(&lineup, Some(&summary)).unwrap();

        assert_eq!(roster.home.source_id, 2);
        assert_eq!(roster.home.side, Side::Home);
        assert_eq!(roster.away.name, "A");
    }

    #[test]
    fn test_roster_rejects_wrong_team_count() {
        let lineup = vec![lineup_team(1, "A", &[10])];
        assert_eq!(
            Roster::from_lineup(&lineup, None).unwrap_err(),
            RosterError::WrongTeamCount(1)
        );
    }

    #[test]
    fn test_roster_rejects_duplicate_player() {
        let lineup = vec![lineup_team(1, "A", &[10]), lineup_team(2, "B", &[10])];
        assert_eq!(
            Roster::from_lineup(&lineup, None).unwrap_err(),
            RosterError::DuplicatePlayer(10)
        );
    }

    #[test]
    fn test_unknown_lookups() {
        let lineup = vec![lineup_team(1, "A", &[10]), lineup_team(2, "B", &[20])];
        let roster = Roster::from_lineup(&lineup, None).unwrap();
        assert!(roster.team_by_source_id(3).is_none());
        assert!(roster.player_by_source_id(99).is_none());
        assert_eq!(roster.team_by_source_id(2).unwrap().name, "B");
    }

    #[test]
    fn test_home_team_ref_unused_when_not_in_lineup() {
        let lineup = vec![lineup_team(1, "A", &[]), lineup_team(2, "B", &[])];
        let summary = MatchSummary {
            home_team: Some(HomeTeamRef {
                home_team_id: 77,
                home_team_name: None,
            }),
            ..summary_with_home(77)
        };
        let roster = Roster::from_lineup(&lineup, Some(&summary)).unwrap();
        assert_eq!(roster.home.source_id, 1);
    }
}
