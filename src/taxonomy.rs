// 🗂️ Event Taxonomy Mapper
// Source event type -> zero, one or more CDF records
//
// One handler per recognized StatsBomb type, looked up by type id (name as
// fallback). Anything the registry does not know goes through the unknown
// handler and comes out as `other`, flagged.
//
// Handlers only draft records (type + attributes); ids, clocks and the start
// location are attached by the mapper, which owns the per-match state.

use crate::attributes::AttributeRegistry;
use crate::cdf::{AttributeMap, AttributeValue, CdfEventType, EventFlag};
use crate::coordinates::CoordinateNormalizer;
use crate::error::MissingReferenceError;
use crate::identity::IdResolver;
use crate::source::SourceEvent;
use crate::temporal::{format_clock, match_clock_millis};
use std::collections::HashMap;
use tracing::{debug, trace};

// ============================================================================
// RECORD DRAFT
// ============================================================================

/// One CDF record as produced by a handler
#[derive(Debug, Clone, PartialEq)]
pub struct RecordDraft {
    pub event_type: CdfEventType,
    pub attributes: AttributeMap,
    pub flags: Vec<EventFlag>,
}

impl RecordDraft {
    pub fn new(event_type: CdfEventType) -> Self {
        RecordDraft {
            event_type,
            attributes: AttributeMap::new(),
            flags: Vec::new(),
        }
    }

    pub fn set(&mut self, name: &str, value: AttributeValue) {
        self.attributes.insert(name.to_string(), value);
    }

    pub fn set_text(&mut self, name: &str, value: Option<&str>) {
        if let Some(v) = value {
            self.set(name, AttributeValue::Text(v.to_string()));
        }
    }

    pub fn set_decimal(&mut self, name: &str, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.set(name, AttributeValue::Decimal(v));
        }
    }

    /// Vendor boolean qualifiers are only present when true
    pub fn set_flag(&mut self, name: &str, value: bool) {
        if value {
            self.set(name, AttributeValue::Boolean(true));
        }
    }

    pub fn flag(&mut self, flag: EventFlag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }
}

// ============================================================================
// MAPPING CONTEXT
// ============================================================================

/// Per-match lookups a handler may use
pub struct MappingContext<'a> {
    pub resolver: &'a IdResolver<'a>,
    pub normalizer: &'a CoordinateNormalizer,
    pub keep_administrative: bool,
}

impl<'a> MappingContext<'a> {
    /// Resolve a player-valued qualifier into a reference
    pub fn player_ref(&self, event: &SourceEvent, path: &[&str]) -> Result<Option<AttributeValue>, MissingReferenceError> {
        match event.path_u64(path) {
            Some(player) => {
                let resolved = self.resolver.player(player, &event.id)?;
                Ok(Some(AttributeValue::Reference(resolved.id.clone())))
            }
            None => Ok(None),
        }
    }

    /// Event-valued qualifiers (key pass, assisted shot)
    pub fn event_ref(&self, event: &SourceEvent, path: &[&str]) -> Option<AttributeValue> {
        event
            .path_str(path)
            .map(|id| AttributeValue::Reference(self.resolver.event(id)))
    }

    /// Writes x_end / y_end (and z_end when present); flags the draft when clamped
    pub fn end_location(&self, event: &SourceEvent, path: &[&str], draft: &mut RecordDraft) {
        let Some(coords) = event.path_location(path) else {
            return;
        };
        let Some(point) = self.normalizer.normalize_slice(&coords) else {
            return;
        };
        draft.set_decimal("x_end", Some(point.x));
        draft.set_decimal("y_end", Some(point.y));
        draft.set_decimal("z_end", point.z);
        if !point.in_bounds {
            draft.flag(EventFlag::CoordinateClamped);
        }
    }
}

// ============================================================================
// HANDLER TRAIT
// ============================================================================

/// EventHandler - one per recognized source type
///
/// Adding a source type = implement this (or reuse `QualifierHandler`) and
/// `register` it. Existing handlers are untouched.
pub trait EventHandler: Send + Sync {
    /// Handler name for logs
    fn name(&self) -> &str;

    /// Draft the CDF records for one source event.
    ///
    /// Errors only for entity references missing from the lineup.
    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError>;
}

// ============================================================================
// SHARED EXTRACTION
// ============================================================================

/// Whether a vendor outcome name means the action worked.
///
/// For passes and ball receipts the vendor leaves out the outcome when
/// the action is complete.
fn outcome_success(event_type: CdfEventType, outcome: Option<&str>) -> Option<bool> {
    match (event_type, outcome) {
        (CdfEventType::Pass | CdfEventType::BallReceipt, None) => Some(true),
        (_, None) => None,
        (_, Some(name)) => Some(matches!(
            name,
            "Complete"
                | "Won"
                | "Success"
                | "Success In Play"
                | "Success Out"
                | "Success To Team"
                | "Saved"
                | "Saved Twice"
                | "Claim"
                | "Clear"
                | "In Play Safe"
                | "Punched Out"
                | "Goal"
        )),
    }
}

/// Sub type, outcome, body part, technique, advantage and end location
/// read from the event's own qualifier object
fn extract_common(event: &SourceEvent, qualifier: &str, ctx: &MappingContext<'_>, draft: &mut RecordDraft) {
    draft.set_text("sub_type", event.path_str(&[qualifier, "type", "name"]));

    let outcome = event.path_str(&[qualifier, "outcome", "name"]);
    draft.set_text("outcome_type", outcome);
    if let Some(success) = outcome_success(draft.event_type, outcome) {
        draft.set("is_successful", AttributeValue::Boolean(success));
    }

    draft.set_text("body_part", event.path_str(&[qualifier, "body_part", "name"]));
    draft.set_text("technique", event.path_str(&[qualifier, "technique", "name"]));
    draft.set_flag("is_advantage", event.path_flag(&[qualifier, "advantage"]));
    ctx.end_location(event, &[qualifier, "end_location"], draft);
}

/// Attributes any source event may carry
fn extract_event_level(event: &SourceEvent, draft: &mut RecordDraft) {
    draft.set_flag("under_pressure", event.under_pressure.unwrap_or(false));
    if let Some(pattern) = &event.play_pattern {
        draft.set_text("play_pattern", Some(&pattern.name));
    }
    draft.set_decimal("duration", event.duration);
}

fn card_draft(card_name: &str) -> RecordDraft {
    let mut card = RecordDraft::new(CdfEventType::Card);
    card.set_text("card_type", Some(&card_name.to_lowercase()));
    card
}

// ============================================================================
// HANDLERS
// ============================================================================

/// Types whose attributes all live in one qualifier object (or none)
pub struct QualifierHandler {
    event_type: CdfEventType,
    qualifier: Option<&'static str>,
}

impl QualifierHandler {
    pub fn new(event_type: CdfEventType, qualifier: Option<&'static str>) -> Self {
        QualifierHandler { event_type, qualifier }
    }
}

impl EventHandler for QualifierHandler {
    fn name(&self) -> &str {
        self.event_type.as_str()
    }

    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut draft = RecordDraft::new(self.event_type);
        match self.qualifier {
            Some(q) => extract_common(event, q, ctx, &mut draft),
            None => {
                if let Some(success) = outcome_success(self.event_type, None) {
                    draft.set("is_successful", AttributeValue::Boolean(success));
                }
            }
        }
        Ok(vec![draft])
    }
}

pub struct PassHandler;

impl EventHandler for PassHandler {
    fn name(&self) -> &str {
        "pass"
    }

    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut draft = RecordDraft::new(CdfEventType::Pass);
        extract_common(event, "pass", ctx, &mut draft);

        if let Some(receiver) = ctx.player_ref(event, &["pass", "recipient", "id"])? {
            draft.set("receiver_id", receiver);
        }
        if let Some(duration) = event.duration.filter(|d| d.is_finite() && *d >= 0.0) {
            let arrival = match_clock_millis(event) + (duration * 1000.0).round() as u64;
            draft.set_text("receiver_time", Some(&format_clock(arrival)));
        }

        // metres on the reference pitch when both ends are known
        let start = event.location.as_deref().and_then(|c| ctx.normalizer.normalize_slice(c));
        let end = event
            .path_location(&["pass", "end_location"])
            .and_then(|c| ctx.normalizer.normalize_slice(&c));
        if let (Some(start), Some(end)) = (start, end) {
            draft.set_decimal("length", Some((end.x - start.x).hypot(end.y - start.y)));
        }
        // source y axis points down, CDF y axis points up
        draft.set_decimal("angle", event.path_f64(&["pass", "angle"]).map(|a| -a));

        draft.set_text("height", event.path_str(&["pass", "height", "name"]));
        draft.set_flag("is_cross", event.path_flag(&["pass", "cross"]));
        draft.set_flag("is_switch", event.path_flag(&["pass", "switch"]));
        draft.set_flag(
            "is_through_ball",
            event.path_flag(&["pass", "through_ball"])
                || event.path_str(&["pass", "technique", "name"]) == Some("Through Ball"),
        );
        draft.set_flag("is_goal_assist", event.path_flag(&["pass", "goal_assist"]));
        draft.set_flag("is_shot_assist", event.path_flag(&["pass", "shot_assist"]));
        if let Some(shot) = ctx.event_ref(event, &["pass", "assisted_shot_id"]) {
            draft.set("assisted_shot_id", shot);
        }

        Ok(vec![draft])
    }
}

pub struct ShotHandler;

impl EventHandler for ShotHandler {
    fn name(&self) -> &str {
        "shot"
    }

    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut draft = RecordDraft::new(CdfEventType::Shot);
        extract_common(event, "shot", ctx, &mut draft);

        let is_goal = event.path_str(&["shot", "outcome", "name"]) == Some("Goal");
        draft.set("is_goal", AttributeValue::Boolean(is_goal));
        draft.set("is_successful", AttributeValue::Boolean(is_goal));
        draft.set_flag("is_penalty", event.path_str(&["shot", "type", "name"]) == Some("Penalty"));
        draft.set_flag("is_first_time", event.path_flag(&["shot", "first_time"]));
        draft.set_decimal("xg", event.path_f64(&["shot", "statsbomb_xg"]));
        if let Some(pass) = ctx.event_ref(event, &["shot", "key_pass_id"]) {
            draft.set("key_pass_id", pass);
        }

        Ok(vec![draft])
    }
}

pub struct SubstitutionHandler;

impl EventHandler for SubstitutionHandler {
    fn name(&self) -> &str {
        "substitution"
    }

    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut draft = RecordDraft::new(CdfEventType::Substitution);
        draft.set_text("outcome_type", event.path_str(&["substitution", "outcome", "name"]));

        if let Some(incoming) = ctx.player_ref(event, &["substitution", "replacement", "id"])? {
            draft.set("in_player_id", incoming);
        }
        if let Some(outgoing) = event.player_id() {
            let player = ctx.resolver.player(outgoing, &event.id)?;
            draft.set("out_player_id", AttributeValue::Reference(player.id.clone()));
        }

        Ok(vec![draft])
    }
}

/// Foul, plus a card record when the referee showed one
pub struct FoulCommittedHandler;

impl EventHandler for FoulCommittedHandler {
    fn name(&self) -> &str {
        "foul_committed"
    }

    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut foul = RecordDraft::new(CdfEventType::FoulCommitted);
        extract_common(event, "foul_committed", ctx, &mut foul);
        foul.set_flag("is_penalty", event.path_flag(&["foul_committed", "penalty"]));

        let mut drafts = vec![foul];
        if let Some(card) = event.path_str(&["foul_committed", "card", "name"]) {
            drafts.push(card_draft(card));
        }
        Ok(drafts)
    }
}

/// Card only; behaviour without a card has no CDF counterpart beyond `other`
pub struct BadBehaviourHandler;

impl EventHandler for BadBehaviourHandler {
    fn name(&self) -> &str {
        "bad_behaviour"
    }

    fn map(&self, event: &SourceEvent, _ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        match event.path_str(&["bad_behaviour", "card", "name"]) {
            Some(card) => Ok(vec![card_draft(card)]),
            None => {
                let mut other = RecordDraft::new(CdfEventType::Other);
                other.set_text("source_type", Some(event.type_name()));
                Ok(vec![other])
            }
        }
    }
}

pub struct BallRecoveryHandler;

impl EventHandler for BallRecoveryHandler {
    fn name(&self) -> &str {
        "ball_recovery"
    }

    fn map(&self, event: &SourceEvent, _ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut draft = RecordDraft::new(CdfEventType::BallRecovery);
        let failed = event.path_flag(&["ball_recovery", "recovery_failure"]);
        draft.set("is_successful", AttributeValue::Boolean(!failed));
        Ok(vec![draft])
    }
}

/// Lineup announcements, half whistles, camera markers
pub struct AdministrativeHandler;

impl EventHandler for AdministrativeHandler {
    fn name(&self) -> &str {
        "administrative"
    }

    fn map(&self, event: &SourceEvent, ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        if !ctx.keep_administrative {
            return Ok(Vec::new());
        }
        let mut draft = RecordDraft::new(CdfEventType::Administrative);
        draft.set_text("source_type", Some(event.type_name()));
        Ok(vec![draft])
    }
}

/// Fallback for unrecognized type codes
pub struct UnknownHandler;

impl EventHandler for UnknownHandler {
    fn name(&self) -> &str {
        "unknown"
    }

    fn map(&self, event: &SourceEvent, _ctx: &MappingContext<'_>) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let mut draft = RecordDraft::new(CdfEventType::Other);
        draft.set_text("source_type", Some(event.type_name()));
        draft.flag(EventFlag::UnknownEventType);
        Ok(vec![draft])
    }
}

// ============================================================================
// TAXONOMY REGISTRY
// ============================================================================

/// Source type -> handler. Read-only once built; share one across matches.
pub struct TaxonomyRegistry {
    handlers: Vec<Box<dyn EventHandler>>,
    by_id: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
    unknown: Box<dyn EventHandler>,
    attributes: AttributeRegistry,
}

impl TaxonomyRegistry {
    /// Registry with every StatsBomb event type
    pub fn new() -> Self {
        Self::with_attributes(AttributeRegistry::new())
    }

    pub fn with_attributes(attributes: AttributeRegistry) -> Self {
        let mut registry = TaxonomyRegistry {
            handlers: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            unknown: Box::new(UnknownHandler),
            attributes,
        };
        registry.register_statsbomb_types();
        registry
    }

    fn register_statsbomb_types(&mut self) {
        use CdfEventType::*;

        let q = |t: CdfEventType, key: &'static str| Box::new(QualifierHandler::new(t, Some(key)));
        let plain = |t: CdfEventType| Box::new(QualifierHandler::new(t, None));

        // ====================================================================
        // ON THE BALL
        // ====================================================================

        self.register(30, "Pass", Box::new(PassHandler));
        self.register(16, "Shot", Box::new(ShotHandler));
        self.register(43, "Carry", q(Carry, "carry"));
        self.register(14, "Dribble", q(Dribble, "dribble"));
        self.register(42, "Ball Receipt*", q(BallReceipt, "ball_receipt"));
        self.register(38, "Miscontrol", q(Miscontrol, "miscontrol"));
        self.register(28, "Shield", plain(Shield));
        self.register(3, "Dispossessed", plain(Dispossessed));
        self.register(37, "Error", plain(Error));

        // ====================================================================
        // DEFENDING
        // ====================================================================

        self.register(2, "Ball Recovery", Box::new(BallRecoveryHandler));
        self.register(4, "Duel", q(Duel, "duel"));
        self.register(33, "50/50", q(FiftyFifty, "50_50"));
        self.register(10, "Interception", q(Interception, "interception"));
        self.register(9, "Clearance", q(Clearance, "clearance"));
        self.register(6, "Block", q(Block, "block"));
        self.register(17, "Pressure", plain(Pressure));
        self.register(39, "Dribbled Past", plain(DribbledPast));
        self.register(23, "Goal Keeper", q(Goalkeeper, "goalkeeper"));

        // ====================================================================
        // DISCIPLINE / STOPPAGES
        // ====================================================================

        self.register(22, "Foul Committed", Box::new(FoulCommittedHandler));
        self.register(21, "Foul Won", q(FoulWon, "foul_won"));
        self.register(24, "Bad Behaviour", Box::new(BadBehaviourHandler));
        self.register(8, "Offside", plain(Offside));
        self.register(40, "Injury Stoppage", plain(InjuryStoppage));
        self.register(41, "Referee Ball-Drop", plain(RefereeBallDrop));
        self.register(20, "Own Goal Against", plain(OwnGoalAgainst));
        self.register(25, "Own Goal For", plain(OwnGoalFor));

        // ====================================================================
        // PERSONNEL
        // ====================================================================

        self.register(19, "Substitution", Box::new(SubstitutionHandler));
        self.register(36, "Tactical Shift", plain(TacticalShift));
        self.register(26, "Player On", plain(PlayerOn));
        self.register(27, "Player Off", plain(PlayerOff));

        // ====================================================================
        // ADMINISTRATIVE MARKERS
        // ====================================================================

        self.register(35, "Starting XI", Box::new(AdministrativeHandler));
        self.register(18, "Half Start", Box::new(AdministrativeHandler));
        self.register(34, "Half End", Box::new(AdministrativeHandler));
        self.register(5, "Camera On", Box::new(AdministrativeHandler));
        self.register_name("Camera off", Box::new(AdministrativeHandler));
    }

    /// Register a handler under a type id and name (replaces earlier ones)
    pub fn register(&mut self, type_id: u64, name: &str, handler: Box<dyn EventHandler>) {
        let index = self.push(name, handler);
        self.by_id.insert(type_id, index);
    }

    /// Register a handler reachable by name only
    pub fn register_name(&mut self, name: &str, handler: Box<dyn EventHandler>) {
        self.push(name, handler);
    }

    fn push(&mut self, name: &str, handler: Box<dyn EventHandler>) -> usize {
        self.handlers.push(handler);
        let index = self.handlers.len() - 1;
        self.by_name.insert(name_key(name), index);
        index
    }

    /// Handler for a source event; `None` when the type is unrecognized
    pub fn handler_for(&self, event: &SourceEvent) -> Option<&dyn EventHandler> {
        self.by_id
            .get(&event.event_type.id)
            .or_else(|| self.by_name.get(&name_key(event.type_name())))
            .map(|i| self.handlers[*i].as_ref())
    }

    pub fn is_known(&self, event: &SourceEvent) -> bool {
        self.handler_for(event).is_some()
    }

    pub fn attributes(&self) -> &AttributeRegistry {
        &self.attributes
    }

    pub fn count(&self) -> usize {
        self.handlers.len()
    }

    /// Draft the records for one event.
    ///
    /// Event-level attributes are added to every draft, then each draft keeps
    /// only the attributes declared for its CDF type.
    pub fn map_event(
        &self,
        event: &SourceEvent,
        ctx: &MappingContext<'_>,
    ) -> Result<Vec<RecordDraft>, MissingReferenceError> {
        let handler = match self.handler_for(event) {
            Some(handler) => handler,
            None => {
                debug!(
                    event = %event.id,
                    type_id = event.event_type.id,
                    type_name = %event.type_name(),
                    "no handler registered, mapping to other"
                );
                self.unknown.as_ref()
            }
        };

        let mut drafts = handler.map(event, ctx)?;
        for draft in &mut drafts {
            extract_event_level(event, draft);
            let event_type = draft.event_type;
            draft.attributes.retain(|name, _| {
                let keep = self.attributes.accepts(event_type, name);
                if !keep {
                    trace!(event = %event.id, attribute = %name, "dropped for {}", event_type);
                }
                keep
            });
        }

        Ok(drafts)
    }
}

impl Default for TaxonomyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

// ============================================================================
// TESTS
// ============================================================================
