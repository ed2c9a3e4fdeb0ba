// 🏛️ Semantic Layer - CDF Attribute Registry
// "Attributes are independent, not owned by event types"
//
// The registry answers two questions for every attribute name:
// - which CDF event types expect it (the taxonomy mapper drops the rest)
// - which literal type / reference kind it carries (the graph serializer types it)

use crate::cdf::CdfEventType;
use crate::identity::EntityKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// ATTRIBUTE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    String,
    Decimal,
    Integer,
    Boolean,
    DateTime,
    /// Identifier of another node of the given kind
    Reference(EntityKind),
}

impl AttributeType {
    /// XSD datatype for literal attributes
    pub fn xsd_type(&self) -> Option<&'static str> {
        match self {
            AttributeType::String => Some("xsd:string"),
            AttributeType::Decimal => Some("xsd:decimal"),
            AttributeType::Integer => Some("xsd:integer"),
            AttributeType::Boolean => Some("xsd:boolean"),
            AttributeType::DateTime => Some("xsd:dateTime"),
            AttributeType::Reference(_) => None,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, AttributeType::Reference(_))
    }
}

/// Event types an attribute applies to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scope {
    AllEvents,
    Only(BTreeSet<CdfEventType>),
}

impl Scope {
    pub fn only(types: &[CdfEventType]) -> Self {
        Scope::Only(types.iter().copied().collect())
    }

    pub fn contains(&self, event_type: CdfEventType) -> bool {
        match self {
            Scope::AllEvents => true,
            Scope::Only(types) => types.contains(&event_type),
        }
    }
}

// ============================================================================
// ATTRIBUTE DEFINITION
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDefinition {
    /// Property name in the event log and the graph (e.g. "receiver_id")
    pub name: String,

    pub type_: AttributeType,

    pub description: String,

    pub scope: Scope,

    /// Where the value comes from in the source event
    pub provenance_info: String,
}

impl AttributeDefinition {
    pub fn new(name: impl Into<String>, type_: AttributeType) -> Self {
        AttributeDefinition {
            name: name.into(),
            type_,
            description: String::new(),
            scope: Scope::AllEvents,
            provenance_info: String::new(),
        }
    }

    /// Builder: add description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Builder: restrict to some event types
    pub fn for_types(mut self, types: &[CdfEventType]) -> Self {
        self.scope = Scope::only(types);
        self
    }

    /// Builder: add provenance info
    pub fn with_provenance(mut self, info: impl Into<String>) -> Self {
        self.provenance_info = info.into();
        self
    }

    pub fn applies_to(&self, event_type: CdfEventType) -> bool {
        self.scope.contains(event_type)
    }
}

// ============================================================================
// ATTRIBUTE REGISTRY
// ============================================================================

/// Catalog of all CDF event attributes.
///
/// Read-only once built; share one instance across matches.
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    attributes: BTreeMap<String, AttributeDefinition>,
}

impl AttributeRegistry {
    /// Create a registry with all core CDF attributes
    pub fn new() -> Self {
        let mut registry = AttributeRegistry {
            attributes: BTreeMap::new(),
        };

        registry.register_core_attributes();
        registry
    }

    fn register_core_attributes(&mut self) {
        use CdfEventType::*;

        // ====================================================================
        // COMMON ATTRIBUTES
        // ====================================================================

        self.register(
            AttributeDefinition::new("sub_type", AttributeType::String)
                .with_description("Vendor sub type (pass type, shot type, duel type, ...)")
                .with_provenance("<qualifier>.type.name"),
        );

        self.register(
            AttributeDefinition::new("outcome_type", AttributeType::String)
                .with_description("Outcome as named by the vendor")
                .with_provenance("<qualifier>.outcome.name"),
        );

        self.register(
            AttributeDefinition::new("is_successful", AttributeType::Boolean)
                .with_description("Whether the action reached its intended result")
                .for_types(&[Pass, Shot, Dribble, Duel, Interception, FiftyFifty, BallReceipt, BallRecovery, Goalkeeper])
                .with_provenance("Derived from outcome"),
        );

        self.register(
            AttributeDefinition::new("body_part", AttributeType::String)
                .for_types(&[Pass, Shot, Clearance, Goalkeeper])
                .with_provenance("<qualifier>.body_part.name"),
        );

        self.register(
            AttributeDefinition::new("under_pressure", AttributeType::Boolean)
                .with_description("Action taken while pressed by an opponent")
                .with_provenance("under_pressure"),
        );

        self.register(
            AttributeDefinition::new("play_pattern", AttributeType::String)
                .with_provenance("play_pattern.name"),
        );

        self.register(
            AttributeDefinition::new("related_event_ids", AttributeType::Reference(EntityKind::Event))
                .with_description("Events the vendor links to this one; only those kept in the log")
                .with_provenance("related_events"),
        );

        self.register(
            AttributeDefinition::new("duration", AttributeType::Decimal)
                .with_description("Seconds")
                .for_types(&[Pass, Carry, Pressure, BallReceipt, Dribble])
                .with_provenance("duration"),
        );

        // ====================================================================
        // END LOCATION
        // ====================================================================

        for axis in ["x_end", "y_end"] {
            self.register(
                AttributeDefinition::new(axis, AttributeType::Decimal)
                    .with_description("End location, CDF metres")
                    .for_types(&[Pass, Shot, Carry, Goalkeeper])
                    .with_provenance("<qualifier>.end_location"),
            );
        }

        self.register(
            AttributeDefinition::new("z_end", AttributeType::Decimal)
                .with_description("End height, CDF metres")
                .for_types(&[Shot])
                .with_provenance("shot.end_location[2]"),
        );

        // ====================================================================
        // PASS
        // ====================================================================

        self.register(
            AttributeDefinition::new("receiver_id", AttributeType::Reference(EntityKind::Player))
                .with_description("Intended recipient")
                .for_types(&[Pass])
                .with_provenance("pass.recipient.id"),
        );

        self.register(
            AttributeDefinition::new("receiver_time", AttributeType::String)
                .with_description("Match clock when the ball arrives")
                .for_types(&[Pass])
                .with_provenance("clock + duration"),
        );

        for (name, provenance) in [("length", "pass.length"), ("angle", "pass.angle")] {
            self.register(
                AttributeDefinition::new(name, AttributeType::Decimal)
                    .for_types(&[Pass])
                    .with_provenance(provenance),
            );
        }

        self.register(
            AttributeDefinition::new("height", AttributeType::String)
                .for_types(&[Pass])
                .with_provenance("pass.height.name"),
        );

        for (name, provenance) in [
            ("is_cross", "pass.cross"),
            ("is_switch", "pass.switch"),
            ("is_through_ball", "pass.through_ball"),
            ("is_goal_assist", "pass.goal_assist"),
            ("is_shot_assist", "pass.shot_assist"),
        ] {
            self.register(
                AttributeDefinition::new(name, AttributeType::Boolean)
                    .for_types(&[Pass])
                    .with_provenance(provenance),
            );
        }

        self.register(
            AttributeDefinition::new("assisted_shot_id", AttributeType::Reference(EntityKind::Event))
                .for_types(&[Pass])
                .with_provenance("pass.assisted_shot_id"),
        );

        // ====================================================================
        // SHOT
        // ====================================================================

        self.register(
            AttributeDefinition::new("xg", AttributeType::Decimal)
                .with_description("Vendor expected-goals value")
                .for_types(&[Shot])
                .with_provenance("shot.statsbomb_xg"),
        );

        self.register(
            AttributeDefinition::new("technique", AttributeType::String)
                .for_types(&[Shot, Goalkeeper])
                .with_provenance("<qualifier>.technique.name"),
        );

        for (name, provenance) in [
            ("is_goal", "shot.outcome.name == Goal"),
            ("is_penalty", "shot.type.name == Penalty / foul_committed.penalty"),
            ("is_first_time", "shot.first_time"),
        ] {
            self.register(
                AttributeDefinition::new(name, AttributeType::Boolean)
                    .for_types(&[Shot, FoulCommitted])
                    .with_provenance(provenance),
            );
        }

        self.register(
            AttributeDefinition::new("key_pass_id", AttributeType::Reference(EntityKind::Event))
                .for_types(&[Shot])
                .with_provenance("shot.key_pass_id"),
        );

        self.register(
            AttributeDefinition::new("assist_id", AttributeType::Reference(EntityKind::Player))
                .with_description("Player who assisted the goal")
                .for_types(&[Shot])
                .with_provenance("goal_assist pass or key pass passer"),
        );

        // ====================================================================
        // DISCIPLINE
        // ====================================================================

        self.register(
            AttributeDefinition::new("card_type", AttributeType::String)
                .for_types(&[Card])
                .with_provenance("<qualifier>.card.name"),
        );

        self.register(
            AttributeDefinition::new("is_advantage", AttributeType::Boolean)
                .for_types(&[FoulCommitted, FoulWon])
                .with_provenance("<qualifier>.advantage"),
        );

        // ====================================================================
        // SUBSTITUTION
        // ====================================================================

        self.register(
            AttributeDefinition::new("in_player_id", AttributeType::Reference(EntityKind::Player))
                .for_types(&[Substitution])
                .with_provenance("substitution.replacement.id"),
        );

        self.register(
            AttributeDefinition::new("out_player_id", AttributeType::Reference(EntityKind::Player))
                .for_types(&[Substitution])
                .with_provenance("player.id"),
        );

        // ====================================================================
        // DIAGNOSTICS
        // ====================================================================

        self.register(
            AttributeDefinition::new("source_type", AttributeType::String)
                .with_description("Vendor type name of an unmapped event")
                .for_types(&[Other, Administrative])
                .with_provenance("type.name"),
        );
    }

    /// Register a new attribute (replaces one with the same name)
    pub fn register(&mut self, attr: AttributeDefinition) {
        self.attributes.insert(attr.name.clone(), attr);
    }

    pub fn get(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }

    /// Is `name` a known attribute for `event_type`?
    pub fn accepts(&self, event_type: CdfEventType, name: &str) -> bool {
        self.get(name)
            .map(|attr| attr.applies_to(event_type))
            .unwrap_or(false)
    }

    pub fn type_of(&self, name: &str) -> Option<AttributeType> {
        self.get(name).map(|attr| attr.type_)
    }

    /// All definitions, sorted by name
    pub fn list_all(&self) -> impl Iterator<Item = &AttributeDefinition> {
        self.attributes.values()
    }

    pub fn count(&self) -> usize {
        self.attributes.len()
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = AttributeRegistry::new();
        assert!(registry.count() > 20, "Registry should have core attributes");
    }

    #[test]
    fn test_scoped_attributes() {
        let registry = AttributeRegistry::new();

        assert!(registry.accepts(CdfEventType::Pass, "receiver_id"));
        assert!(!registry.accepts(CdfEventType::Shot, "receiver_id"));
        assert!(registry.accepts(CdfEventType::Shot, "xg"));
        assert!(!registry.accepts(CdfEventType::Pass, "xg"));
    }

    #[test]
    fn test_common_attributes_apply_everywhere() {
        let registry = AttributeRegistry::new();
        assert!(registry.accepts(CdfEventType::Pressure, "under_pressure"));
        assert!(registry.accepts(CdfEventType::Other, "outcome_type"));
    }

    #[test]
    fn test_recovery_outcome_and_related_events_declared() {
        let registry = AttributeRegistry::new();
        assert!(registry.accepts(CdfEventType::BallRecovery, "is_successful"));
        assert!(!registry.accepts(CdfEventType::Pressure, "is_successful"));
        assert!(registry.accepts(CdfEventType::Substitution, "related_event_ids"));
        assert_eq!(
            registry.type_of("related_event_ids"),
            Some(AttributeType::Reference(EntityKind::Event))
        );
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let registry = AttributeRegistry::new();
        assert!(!registry.accepts(CdfEventType::Pass, "aerial_won"));
        assert!(registry.type_of("aerial_won").is_none());
    }

    #[test]
    fn test_reference_types() {
        let registry = AttributeRegistry::new();
        assert_eq!(
            registry.type_of("receiver_id"),
            Some(AttributeType::Reference(EntityKind::Player))
        );
        assert_eq!(
            registry.type_of("key_pass_id"),
            Some(AttributeType::Reference(EntityKind::Event))
        );
        assert!(registry.type_of("x_end").unwrap().xsd_type() == Some("xsd:decimal"));
        assert!(registry.type_of("in_player_id").unwrap().xsd_type().is_none());
    }

    #[test]
    fn test_register_custom_attribute() {
        let mut registry = AttributeRegistry::new();
        let initial = registry.count();

        registry.register(
            AttributeDefinition::new("aerial_won", AttributeType::Boolean)
                .for_types(&[CdfEventType::Duel])
                .with_description("Won an aerial duel"),
        );

        assert_eq!(registry.count(), initial + 1);
        assert!(registry.accepts(CdfEventType::Duel, "aerial_won"));
    }
}
