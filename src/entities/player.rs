// 🧍 Player Entity - lineup-derived identity
//
// The vendor player id is the IDENTITY, the display name is a VALUE.
// Names are split once here so every table agrees on first/last name.

use crate::identity::{EntityId, EntityKind};
use crate::source::LineupPlayer;
use serde::{Deserialize, Serialize};

const STARTING_XI: &str = "Starting XI";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: EntityId,
    pub source_id: u64,
    pub team_id: EntityId,

    /// Full registered name, e.g. "Lionel Andrés Messi Cuccittini"
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub nickname: Option<String>,

    pub jersey_number: Option<u32>,
    pub is_starter: bool,
    pub has_played: bool,

    /// Position at kickoff (or first position taken)
    pub position: Option<String>,
}

impl Player {
    pub fn from_lineup(entry: &LineupPlayer, team_id: &EntityId) -> Self {
        let (first_name, last_name) = split_name(&entry.player_name);

        Player {
            id: EntityId::new(EntityKind::Player, entry.player_id.to_string()),
            source_id: entry.player_id,
            team_id: team_id.clone(),
            name: entry.player_name.clone(),
            first_name,
            last_name,
            nickname: entry.player_nickname.clone(),
            jersey_number: entry.jersey_number,
            is_starter: entry
                .positions
                .iter()
                .any(|p| p.start_reason.as_deref() == Some(STARTING_XI)),
            has_played: !entry.positions.is_empty(),
            position: entry.positions.first().and_then(|p| p.position.clone()),
        }
    }

    /// Nickname when the vendor has one, otherwise the full name
    pub fn display_name(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }
}

/// First token is the first name, the rest is the last name
pub fn split_name(full_name: &str) -> (String, String) {
    let mut parts = full_name.split_whitespace();
    let first = parts.next().unwrap_or("").to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::LineupPosition;

    fn position(start_reason: &str) -> LineupPosition {
        LineupPosition {
            position_id: Some(17),
            position: Some("Right Wing".to_string()),
            from: Some("00:00".to_string()),
            to: None,
            from_period: Some(1),
            to_period: None,
            start_reason: Some(start_reason.to_string()),
            end_reason: Some("Final Whistle".to_string()),
        }
    }

    #[test]
    fn test_split_name() {
        assert_eq!(
            split_name("Lionel Andrés Messi Cuccittini"),
            ("Lionel".to_string(), "Andrés Messi Cuccittini".to_string())
        );
        assert_eq!(split_name("Pedri"), ("Pedri".to_string(), String::new()));
        assert_eq!(split_name(""), (String::new(), String::new()));
    }

    #[test]
    fn test_player_from_lineup_starter() {
        let team = EntityId::new(EntityKind::Team, "217");
        let entry = LineupPlayer {
            player_id: 5503,
            player_name: "Lionel Andrés Messi Cuccittini".to_string(),
            player_nickname: Some("Lionel Messi".to_string()),
            jersey_number: Some(10),
            country: None,
            positions: vec![position("Starting XI")],
        };

        let player = Player::from_lineup(&entry, &team);
        assert_eq!(player.id.node_id(), "player/5503");
        assert_eq!(player.team_id, team);
        assert!(player.is_starter);
        assert!(player.has_played);
        assert_eq!(player.display_name(), "Lionel Messi");
        assert_eq!(player.position.as_deref(), Some("Right Wing"));
    }

    #[test]
    fn test_unused_substitute() {
        let team = EntityId::new(EntityKind::Team, "217");
        let entry = LineupPlayer {
            player_id: 1,
            player_name: "Bench Player".to_string(),
            player_nickname: None,
            jersey_number: Some(25),
            country: None,
            positions: Vec::new(),
        };

        let player = Player::from_lineup(&entry, &team);
        assert!(!player.is_starter);
        assert!(!player.has_played);
        assert_eq!(player.display_name(), "Bench Player");
    }
}
