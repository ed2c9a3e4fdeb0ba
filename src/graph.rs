// 🕸️ CDF-to-Graph Serializer
// One JSON-LD document per match: shared @context + flat @graph of nodes
//
// Node identifiers are relative ("player/5503") and resolve against the
// @base of the context. Every reference written here points at a node of the
// same document, so a match document can be loaded on its own.

use crate::attributes::AttributeRegistry;
use crate::cdf::{AttributeValue, CdfTables, EventRecord, MatchMeta, MatchSheet, NamedEntity, TeamSheet};
use crate::config::PipelineConfig;
use crate::identity::{node_id, EntityKind};
use crate::vocab::{
    Term, Vocabulary, CLASS_COMPETITION, CLASS_EVENT, CLASS_GOAL, CLASS_MATCH, CLASS_MATCH_META, CLASS_MATCH_RESULT,
    CLASS_MATCH_STATUS, CLASS_PERIOD, CLASS_PLAYER, CLASS_REFEREE, CLASS_SEASON, CLASS_STADIUM, CLASS_TEAM,
    CLASS_WHISTLE,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

// ============================================================================
// GRAPH DOCUMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    #[serde(rename = "@context")]
    pub context: Value,

    #[serde(rename = "@graph")]
    pub graph: Vec<Value>,
}

impl GraphDocument {
    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Node by its relative identifier
    pub fn node(&self, id: &str) -> Option<&Value> {
        self.graph.iter().find(|n| n["@id"] == id)
    }

    /// Nodes carrying `class` among their types
    pub fn nodes_of_type<'d>(&'d self, class: &'d str) -> impl Iterator<Item = &'d Value> + 'd {
        self.graph.iter().filter(move |n| node_types(n).any(|t| t == class))
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// "@type" is a string for single-typed nodes, an array otherwise
pub fn node_types(node: &Value) -> impl Iterator<Item = &str> {
    let types: Vec<&str> = match &node["@type"] {
        Value::String(t) => vec![t.as_str()],
        Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };
    types.into_iter()
}

// ============================================================================
// NODE BUILDER
// ============================================================================

struct Node {
    properties: Map<String, Value>,
    decimal_places: usize,
}

impl Node {
    fn new(id: String, types: &[&str], decimal_places: usize) -> Self {
        let mut properties = Map::new();
        properties.insert("@id".to_string(), json!(id));
        let type_value = match types {
            [single] => json!(single),
            many => json!(many),
        };
        properties.insert("@type".to_string(), type_value);
        Node {
            properties,
            decimal_places,
        }
    }

    fn reference(&mut self, property: &str, target: String) {
        self.properties.insert(property.to_string(), json!(target));
    }

    /// Single target as a plain value, several as an array, none omitted
    fn references(&mut self, property: &str, mut targets: Vec<String>) {
        let value = match targets.len() {
            0 => return,
            1 => json!(targets.remove(0)),
            _ => json!(targets),
        };
        self.properties.insert(property.to_string(), value);
    }

    fn text(&mut self, property: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.properties.insert(property.to_string(), json!(value));
        }
    }

    fn integer(&mut self, property: &str, value: Option<i64>) {
        if let Some(value) = value {
            self.properties.insert(property.to_string(), json!(value));
        }
    }

    fn boolean(&mut self, property: &str, value: bool) {
        self.properties.insert(property.to_string(), json!(value));
    }

    fn decimal(&mut self, property: &str, value: Option<f64>) {
        if let Some(text) = value.and_then(|v| format_decimal(v, self.decimal_places)) {
            self.properties.insert(property.to_string(), json!(text));
        }
    }

    fn insert(&mut self, property: &str, value: Value) {
        self.properties.insert(property.to_string(), value);
    }

    fn build(self) -> Value {
        Value::Object(self.properties)
    }
}

/// Fixed-point rendering of an xsd:decimal; never scientific notation
pub fn format_decimal(value: f64, places: usize) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let text = format!("{:.*}", places, value);
    // "-0.000" -> "0.000"
    if text.starts_with('-') && text[1..].chars().all(|c| c == '0' || c == '.') {
        return Some(text[1..].to_string());
    }
    Some(text)
}

// ============================================================================
// NODE IDENTIFIERS
// ============================================================================

fn entity(kind: EntityKind, key: &str) -> String {
    node_id(kind.slug(), key)
}

/// Nodes that only exist inside one match: "{slug}/{match}/{part}"
fn scoped(slug: &str, match_id: &str, part: &str) -> String {
    format!("{}/{}", node_id(slug, match_id), urlencoding::encode(part))
}

fn match_meta_id(match_id: &str) -> String {
    node_id("match_meta", match_id)
}

fn match_status_id(match_id: &str) -> String {
    node_id("match_status", match_id)
}

// ============================================================================
// SERIALIZER
// ============================================================================

pub struct GraphSerializer<'a> {
    config: &'a PipelineConfig,
    vocabulary: Vocabulary,
}

impl<'a> GraphSerializer<'a> {
    pub fn new(config: &'a PipelineConfig, attributes: &AttributeRegistry) -> Self {
        GraphSerializer {
            config,
            vocabulary: Vocabulary::new(config, attributes),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Build the JSON-LD document of one match
    pub fn serialize(&self, tables: &CdfTables) -> GraphDocument {
        let sheet = &tables.match_sheet;
        let meta = &tables.match_meta;
        let match_id = sheet.match_id.as_str();
        let periods: BTreeSet<&str> = meta.periods.iter().map(|p| p.period.name()).collect();

        let mut graph = Vec::new();
        graph.push(self.match_node(sheet));
        graph.push(self.match_meta_node(meta, &periods));
        graph.extend(self.result_nodes(sheet));
        graph.push(self.status_node(sheet));

        for (team, side) in [(&sheet.home, "home"), (&sheet.away, "away")] {
            graph.push(self.team_node(team, side));
            graph.extend(team.players.iter().map(|p| {
                let mut node = self.node(entity(EntityKind::Player, &p.id), &[CLASS_PLAYER]);
                node.reference("team", entity(EntityKind::Team, &p.team_id));
                node.text("name", Some(&p.name));
                node.text("first_name", Some(&p.first_name));
                node.text("last_name", Some(&p.last_name));
                node.text("nickname", p.nickname.as_deref());
                node.integer("jersey_number", p.jersey_number.map(i64::from));
                node.text("position", p.position.as_deref());
                node.boolean("is_starter", p.is_starter);
                node.boolean("has_played", p.has_played);
                node.build()
            }));
        }

        graph.extend(self.context_nodes(sheet, meta));
        graph.extend(self.period_nodes(meta));
        graph.extend(self.whistle_nodes(meta, &periods));
        graph.extend(tables.events.iter().map(|e| self.event_node(e, &periods)));

        debug!(match_id, nodes = graph.len(), "graph built");

        GraphDocument {
            context: self.vocabulary.context(),
            graph,
        }
    }

    fn node(&self, id: String, types: &[&str]) -> Node {
        Node::new(id, types, self.config.decimal_places)
    }

    // ========================================================================
    // MATCH LEVEL
    // ========================================================================

    fn match_node(&self, sheet: &MatchSheet) -> Value {
        let match_id = sheet.match_id.as_str();
        let mut node = self.node(entity(EntityKind::Match, match_id), &[CLASS_MATCH]);

        node.reference("home_team", entity(EntityKind::Team, &sheet.home.id));
        node.reference("away_team", entity(EntityKind::Team, &sheet.away.id));
        node.reference("match_meta", match_meta_id(match_id));
        node.reference("match_status", match_status_id(match_id));
        node.references(
            "match_result",
            sheet
                .result
                .by_period
                .keys()
                .map(|period| scoped("match_result", match_id, period))
                .collect(),
        );
        node.integer("home_score", Some(i64::from(sheet.result.final_score.home)));
        node.integer("away_score", Some(i64::from(sheet.result.final_score.away)));
        if let Some(winner) = &sheet.result.winning_team_id {
            node.reference("winning_team", entity(EntityKind::Team, winner));
        }
        node.text("kickoff_time", sheet.kickoff_time.as_deref());
        if let Some(stadium) = &sheet.stadium_id {
            node.reference("stadium", entity(EntityKind::Stadium, stadium));
        }
        node.references(
            "referee",
            sheet
                .referees
                .iter()
                .map(|r| entity(EntityKind::Referee, &r.id))
                .collect(),
        );
        node.text("vendor", Some(&sheet.vendor));
        node.build()
    }

    fn match_meta_node(&self, meta: &MatchMeta, periods: &BTreeSet<&str>) -> Value {
        let match_id = meta.match_id.as_str();
        let mut node = self.node(match_meta_id(match_id), &[CLASS_MATCH_META]);

        node.reference("match", entity(EntityKind::Match, match_id));
        if let Some(competition) = &meta.competition {
            node.reference("competition", entity(EntityKind::Competition, &competition.id));
        }
        if let Some(season) = &meta.season {
            node.reference("season", entity(EntityKind::Season, &season.id));
        }
        node.text("competition_stage", meta.competition_stage.as_deref());
        node.integer("match_week", meta.match_week.map(i64::from));
        node.text("kickoff_time", meta.kickoff_time.as_deref());
        if let Some(stadium) = &meta.stadium {
            node.reference("stadium", entity(EntityKind::Stadium, &stadium.id));
        }
        if let Some(referee) = &meta.referee {
            node.reference("referee", entity(EntityKind::Referee, &referee.id));
        }
        node.reference("home_team", entity(EntityKind::Team, &meta.home_team_id));
        node.reference("away_team", entity(EntityKind::Team, &meta.away_team_id));
        node.references(
            "period",
            periods.iter().map(|p| scoped("period", match_id, p)).collect(),
        );
        node.references(
            "whistle",
            (0..meta.whistles.len())
                .map(|n| scoped("whistle", match_id, &n.to_string()))
                .collect(),
        );
        node.text("vendor", Some(&meta.version.vendor));
        node.text("cdf_version", Some(&meta.version.cdf_version));
        node.text("converter_version", Some(&meta.version.converter_version));
        node.build()
    }

    fn result_nodes(&self, sheet: &MatchSheet) -> Vec<Value> {
        let match_id = sheet.match_id.as_str();
        sheet
            .result
            .by_period
            .iter()
            .map(|(period, score)| {
                let mut node = self.node(scoped("match_result", match_id, period), &[CLASS_MATCH_RESULT]);
                node.reference("match", entity(EntityKind::Match, match_id));
                node.text("period_name", Some(period));
                node.integer("home_score", Some(i64::from(score.home)));
                node.integer("away_score", Some(i64::from(score.away)));
                node.build()
            })
            .collect()
    }

    fn status_node(&self, sheet: &MatchSheet) -> Value {
        let match_id = sheet.match_id.as_str();
        let mut node = self.node(match_status_id(match_id), &[CLASS_MATCH_STATUS]);
        node.reference("match", entity(EntityKind::Match, match_id));
        node.boolean("is_neutral", sheet.status.is_neutral);
        node.boolean("has_extratime", sheet.status.has_extratime);
        node.boolean("has_shootout", sheet.status.has_shootout);
        node.build()
    }

    fn team_node(&self, team: &TeamSheet, side: &str) -> Value {
        let mut node = self.node(entity(EntityKind::Team, &team.id), &[CLASS_TEAM]);
        node.text("name", Some(&team.name));
        node.text("side", Some(side));
        node.build()
    }

    /// Competition, season, stadium and referee nodes, one per distinct id
    fn context_nodes(&self, sheet: &MatchSheet, meta: &MatchMeta) -> Vec<Value> {
        let mut nodes = Vec::new();

        let named = |kind: EntityKind, class: &str, entity_ref: &NamedEntity| {
            let mut node = self.node(entity(kind, &entity_ref.id), &[class]);
            node.text("name", entity_ref.name.as_deref());
            node.build()
        };

        if let Some(competition) = &meta.competition {
            nodes.push(named(EntityKind::Competition, CLASS_COMPETITION, competition));
        }
        if let Some(season) = &meta.season {
            nodes.push(named(EntityKind::Season, CLASS_SEASON, season));
        }

        let mut stadiums: BTreeMap<&str, Value> = BTreeMap::new();
        if let Some(stadium_id) = &sheet.stadium_id {
            let node = self.node(entity(EntityKind::Stadium, stadium_id), &[CLASS_STADIUM]);
            stadiums.insert(stadium_id, node.build());
        }
        if let Some(stadium) = &meta.stadium {
            let mut node = self.node(entity(EntityKind::Stadium, &stadium.id), &[CLASS_STADIUM]);
            node.text("name", stadium.name.as_deref());
            node.text("country", stadium.country.as_deref());
            node.decimal("pitch_length", stadium.pitch_length);
            node.decimal("pitch_width", stadium.pitch_width);
            stadiums.insert(&stadium.id, node.build());
        }
        nodes.extend(stadiums.into_values());

        let mut referees: BTreeMap<&str, &NamedEntity> = BTreeMap::new();
        for referee in sheet.referees.iter().chain(meta.referee.iter()) {
            let entry = referees.entry(referee.id.as_str()).or_insert(referee);
            if entry.name.is_none() {
                *entry = referee;
            }
        }
        nodes.extend(
            referees
                .values()
                .map(|r| named(EntityKind::Referee, CLASS_REFEREE, r)),
        );

        nodes
    }

    fn period_nodes(&self, meta: &MatchMeta) -> Vec<Value> {
        let match_id = meta.match_id.as_str();
        meta.periods
            .iter()
            .map(|p| {
                let mut node = self.node(scoped("period", match_id, p.period.name()), &[CLASS_PERIOD]);
                node.reference("match", entity(EntityKind::Match, match_id));
                node.text("period_name", Some(p.period.name()));
                node.integer("start_ms", i64::try_from(p.start_ms).ok());
                node.integer("end_ms", i64::try_from(p.end_ms).ok());
                node.text("play_direction", p.play_direction.as_ref().map(|d| d.as_str()));
                node.build()
            })
            .collect()
    }

    fn whistle_nodes(&self, meta: &MatchMeta, periods: &BTreeSet<&str>) -> Vec<Value> {
        let match_id = meta.match_id.as_str();
        meta.whistles
            .iter()
            .enumerate()
            .map(|(n, w)| {
                let mut node = self.node(scoped("whistle", match_id, &n.to_string()), &[CLASS_WHISTLE]);
                node.reference("match", entity(EntityKind::Match, match_id));
                if periods.contains(w.period.name()) {
                    node.reference("period", scoped("period", match_id, w.period.name()));
                }
                node.text("whistle_type", Some(&w.kind));
                node.text("clock", Some(&w.clock));
                node.integer("time_ms", i64::try_from(w.time_ms).ok());
                node.build()
            })
            .collect()
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    fn event_node(&self, event: &EventRecord, periods: &BTreeSet<&str>) -> Value {
        let class = event.event_type.class_name();
        let is_goal = event.attribute("is_goal").and_then(AttributeValue::as_bool) == Some(true);
        let mut types = vec![CLASS_EVENT, class.as_str()];
        if is_goal {
            types.push(CLASS_GOAL);
        }

        let mut node = self.node(entity(EntityKind::Event, &event.event_id), &types);
        node.reference("match", entity(EntityKind::Match, &event.match_id));
        if let Some(team) = &event.team_id {
            node.reference("team", entity(EntityKind::Team, team));
        }
        if let Some(player) = &event.player_id {
            node.reference("player", entity(EntityKind::Player, player));
        }
        if periods.contains(event.period.name()) {
            node.reference("period", scoped("period", &event.match_id, event.period.name()));
        }
        node.text("event_type", Some(event.event_type.as_str()));
        node.text("source_event_id", Some(&event.source_event_id));
        node.text("clock", Some(&event.clock));
        node.integer("time_ms", i64::try_from(event.time_ms).ok());

        if let Some(location) = &event.location {
            node.decimal("x", Some(location.x));
            node.decimal("y", Some(location.y));
            node.decimal("z", location.z);
            node.boolean("is_in_bounds", location.in_bounds);
        }

        for (name, value) in &event.attributes {
            match self.attribute_value(name, value) {
                Some(rendered) => node.insert(name, rendered),
                None => warn!(event = %event.event_id, attribute = %name, "attribute has no graph form, skipped"),
            }
        }

        let flags: Vec<Value> = event
            .flags
            .iter()
            .filter_map(|f| serde_json::to_value(f).ok())
            .collect();
        if !flags.is_empty() {
            node.insert("quality_flag", Value::Array(flags));
        }

        node.build()
    }

    /// Attribute value rendered per its vocabulary term
    fn attribute_value(&self, name: &str, value: &AttributeValue) -> Option<Value> {
        let places = self.config.decimal_places;
        match (self.vocabulary.term(name)?, value) {
            (Term::Id, AttributeValue::Reference(id)) => Some(json!(id.node_id())),
            (Term::Id, AttributeValue::References(ids)) if !ids.is_empty() => {
                Some(Value::Array(ids.iter().map(|id| json!(id.node_id())).collect()))
            }
            (Term::Decimal, AttributeValue::Decimal(v)) => format_decimal(*v, places).map(Value::String),
            (Term::Decimal, AttributeValue::Integer(i)) => format_decimal(*i as f64, places).map(Value::String),
            (Term::Integer, AttributeValue::Integer(i)) => Some(json!(i)),
            (Term::Boolean, AttributeValue::Boolean(b)) => Some(json!(b)),
            (Term::String | Term::DateTime, AttributeValue::Text(s)) => Some(json!(s)),
            _ => None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
