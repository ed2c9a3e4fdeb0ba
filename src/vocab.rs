// 📖 CDF Vocabulary - classes, properties and the shared @context
//
// Every property the graph serializer writes has a term here: either a core
// property of the table rows (below) or an event attribute from the registry.
// Reference-valued terms get `@type: @id`; typed literals get their XSD type.

use crate::attributes::{AttributeRegistry, AttributeType};
use crate::config::PipelineConfig;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema#";

// ============================================================================
// CLASSES
// ============================================================================

pub const CLASS_MATCH: &str = "Match";
pub const CLASS_MATCH_META: &str = "MatchMeta";
pub const CLASS_EVENT: &str = "Event";
pub const CLASS_GOAL: &str = "Goal";
pub const CLASS_TEAM: &str = "Team";
pub const CLASS_PLAYER: &str = "Player";
pub const CLASS_COMPETITION: &str = "Competition";
pub const CLASS_SEASON: &str = "Season";
pub const CLASS_STADIUM: &str = "Stadium";
pub const CLASS_REFEREE: &str = "Referee";
pub const CLASS_MATCH_RESULT: &str = "Match_Result";
pub const CLASS_MATCH_STATUS: &str = "Match_Status";
pub const CLASS_PERIOD: &str = "Period";
pub const CLASS_WHISTLE: &str = "Whistle";

// ============================================================================
// CORE PROPERTIES
// ============================================================================

/// How a property's values are written and coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    /// Node identifier, coerced to an IRI
    Id,
    String,
    Decimal,
    Integer,
    Boolean,
    DateTime,
}

impl Term {
    pub fn xsd_type(&self) -> Option<&'static str> {
        match self {
            Term::Id => None,
            Term::String => Some("xsd:string"),
            Term::Decimal => Some("xsd:decimal"),
            Term::Integer => Some("xsd:integer"),
            Term::Boolean => Some("xsd:boolean"),
            Term::DateTime => Some("xsd:dateTime"),
        }
    }

    /// Coercion rule in `@context`; booleans and integers are native JSON and need none
    fn definition(&self) -> Option<Value> {
        match self {
            Term::Id => Some(json!({ "@type": "@id" })),
            Term::String | Term::Decimal | Term::DateTime => self.xsd_type().map(|xsd| json!({ "@type": xsd })),
            Term::Integer | Term::Boolean => None,
        }
    }
}

impl From<AttributeType> for Term {
    fn from(type_: AttributeType) -> Self {
        match type_ {
            AttributeType::Reference(_) => Term::Id,
            AttributeType::String => Term::String,
            AttributeType::Decimal => Term::Decimal,
            AttributeType::Integer => Term::Integer,
            AttributeType::Boolean => Term::Boolean,
            AttributeType::DateTime => Term::DateTime,
        }
    }
}

/// Row-level properties shared by all node kinds
const CORE_PROPERTIES: &[(&str, Term)] = &[
    // references
    ("match", Term::Id),
    ("team", Term::Id),
    ("player", Term::Id),
    ("home_team", Term::Id),
    ("away_team", Term::Id),
    ("winning_team", Term::Id),
    ("competition", Term::Id),
    ("season", Term::Id),
    ("stadium", Term::Id),
    ("referee", Term::Id),
    ("match_meta", Term::Id),
    ("match_result", Term::Id),
    ("match_status", Term::Id),
    ("period", Term::Id),
    ("whistle", Term::Id),
    // literals
    ("name", Term::String),
    ("first_name", Term::String),
    ("last_name", Term::String),
    ("nickname", Term::String),
    ("position", Term::String),
    ("side", Term::String),
    ("country", Term::String),
    ("vendor", Term::String),
    ("cdf_version", Term::String),
    ("converter_version", Term::String),
    ("competition_stage", Term::String),
    ("period_name", Term::String),
    ("play_direction", Term::String),
    ("whistle_type", Term::String),
    ("clock", Term::String),
    ("event_type", Term::String),
    ("source_event_id", Term::String),
    ("quality_flag", Term::String),
    ("kickoff_time", Term::DateTime),
    ("x", Term::Decimal),
    ("y", Term::Decimal),
    ("z", Term::Decimal),
    ("pitch_length", Term::Decimal),
    ("pitch_width", Term::Decimal),
    ("jersey_number", Term::Integer),
    ("match_week", Term::Integer),
    ("home_score", Term::Integer),
    ("away_score", Term::Integer),
    ("time_ms", Term::Integer),
    ("start_ms", Term::Integer),
    ("end_ms", Term::Integer),
    ("is_starter", Term::Boolean),
    ("has_played", Term::Boolean),
    ("is_neutral", Term::Boolean),
    ("has_extratime", Term::Boolean),
    ("has_shootout", Term::Boolean),
    ("is_in_bounds", Term::Boolean),
];

// ============================================================================
// VOCABULARY
// ============================================================================

/// Property name -> type, for core properties and event attributes alike
#[derive(Debug, Clone)]
pub struct Vocabulary {
    namespace: String,
    base: String,
    terms: BTreeMap<String, Term>,
}

impl Vocabulary {
    pub fn new(config: &PipelineConfig, attributes: &AttributeRegistry) -> Self {
        let mut terms: BTreeMap<String, Term> = CORE_PROPERTIES
            .iter()
            .map(|(name, term)| (name.to_string(), *term))
            .collect();
        for def in attributes.list_all() {
            terms.entry(def.name.clone()).or_insert_with(|| Term::from(def.type_));
        }

        Vocabulary {
            namespace: config.vocab_namespace.clone(),
            base: config.data_base.clone(),
            terms,
        }
    }

    pub fn term(&self, property: &str) -> Option<Term> {
        self.terms.get(property).copied()
    }

    pub fn is_known(&self, property: &str) -> bool {
        self.terms.contains_key(property)
    }

    /// Absolute IRI of a class or property name
    pub fn iri(&self, name: &str) -> String {
        format!("{}{}", self.namespace, name)
    }

    /// The `@context` object shared by every node of one document
    pub fn context(&self) -> Value {
        let mut context = Map::new();
        context.insert("@vocab".to_string(), json!(self.namespace));
        context.insert("@base".to_string(), json!(self.base));
        context.insert("xsd".to_string(), json!(XSD_NS));

        for (name, term) in &self.terms {
            if let Some(definition) = term.definition() {
                context.insert(name.clone(), definition);
            }
        }

        Value::Object(context)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vocabulary() -> Vocabulary {
        Vocabulary::new(&PipelineConfig::default(), &AttributeRegistry::new())
    }

    #[test]
    fn test_context_header() {
        let context = vocabulary().context();
        assert_eq!(context["@vocab"], "https://w3id.org/football-cdf/core#");
        assert_eq!(context["@base"], "https://w3id.org/football-cdf/data/");
        assert_eq!(context["xsd"], XSD_NS);
    }

    #[test]
    fn test_reference_terms_coerce_to_iris() {
        let context = vocabulary().context();
        assert_eq!(context["player"], json!({ "@type": "@id" }));
        assert_eq!(context["receiver_id"], json!({ "@type": "@id" }));
        assert_eq!(context["key_pass_id"], json!({ "@type": "@id" }));
    }

    #[test]
    fn test_literal_terms_typed() {
        let context = vocabulary().context();
        assert_eq!(context["xg"], json!({ "@type": "xsd:decimal" }));
        assert_eq!(context["kickoff_time"], json!({ "@type": "xsd:dateTime" }));
        assert_eq!(context["body_part"], json!({ "@type": "xsd:string" }));
        assert!(context.get("is_goal").is_none());
    }

    #[test]
    fn test_attributes_are_terms() {
        let vocab = vocabulary();
        let registry = AttributeRegistry::new();
        assert!(registry.list_all().all(|def| vocab.is_known(&def.name)));
        assert_eq!(vocab.iri(CLASS_MATCH), "https://w3id.org/football-cdf/core#Match");
    }
}
