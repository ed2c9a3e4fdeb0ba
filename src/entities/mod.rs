// Entity Models
// Following the same rule as the rest of the pipeline:
// "Identity persists, values change"
//
// - Vendor id = identity (namespaced through identity::EntityId)
// - Names, jersey numbers, positions = values attached for one match
// - Roster = per-match registry for lookups by vendor id

pub mod player;
pub mod team;

pub use player::{split_name, Player};
pub use team::{Roster, RosterError, Side, Team};
