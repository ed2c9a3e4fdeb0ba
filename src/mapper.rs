// 🔄 Source-to-CDF Mapper
// Three source documents in, three CDF tables out
//
// Order of work for one match:
// 1. Roster + identifier resolver from the lineup (home side from the matches document)
// 2. Events decoded one by one; a bad event becomes a flagged `other` record
// 3. Every event through the taxonomy, ids through the resolver, points through the normalizer
// 4. Stable sort on normalized time, assists attached
// 5. Match sheet (summaries, reconciled score) and match meta
// 6. Integrity check over the finished tables
//
// All-or-nothing: a missing reference returns the error and no tables.

use crate::cdf::{
    AttributeMap, AttributeValue, CardEntry, CdfEventType, CdfTables, EventFlag, EventRecord, GoalEntry,
    MatchMeta, MatchResult, MatchSheet, MatchStatus, NamedEntity, PeriodInfo, PlayDirection, PlayerEntry,
    StadiumInfo, SubstitutionEntry, TeamSheet, VersionInfo, Whistle,
};
use crate::config::PipelineConfig;
use crate::coordinates::CoordinateNormalizer;
use crate::data_quality::{Diagnostics, WarningKind};
use crate::entities::{Player, Roster, Team};
use crate::error::ConversionError;
use crate::identity::{EntityId, EntityKind, IdResolver};
use crate::reconciliation::{ReconciliationEngine, ScoreTally};
use crate::schema::SchemaValidator;
use crate::source::{raw_event_id, MatchSummary, SourceDocuments, SourceEvent};
use crate::taxonomy::{MappingContext, TaxonomyRegistry};
use crate::temporal::{format_clock, match_clock, parse_timestamp, Period, PeriodTimeline};
use chrono::{NaiveDate, NaiveTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// StatsBomb type ids of the half whistles
const HALF_START: u64 = 18;
const HALF_END: u64 = 34;

/// Window used to guess the home team's first-half attacking direction
const DIRECTION_WINDOW_MINUTES: u32 = 5;

// ============================================================================
// OUTPUT
// ============================================================================

/// Tables of one match plus the warnings raised while building them
#[derive(Debug, Clone)]
pub struct MappedMatch {
    pub tables: CdfTables,
    pub diagnostics: Diagnostics,
}

// ============================================================================
// DECODED EVENTS
// ============================================================================

/// What could still be read from an event that failed to decode
#[derive(Debug, Clone)]
struct MalformedEvent {
    id: String,
    period: Option<u8>,
    timestamp: Option<String>,
    team: Option<u64>,
    type_name: Option<String>,
    reason: String,
}

#[derive(Debug, Clone)]
enum Decoded {
    Event(SourceEvent),
    Malformed(MalformedEvent),
}

impl Decoded {
    fn event(&self) -> Option<&SourceEvent> {
        match self {
            Decoded::Event(event) => Some(event),
            Decoded::Malformed(_) => None,
        }
    }
}

fn decode_events(raw_events: &[Value]) -> Vec<Decoded> {
    raw_events
        .iter()
        .enumerate()
        .map(|(position, raw)| match SourceEvent::from_value(raw) {
            Ok(event) => Decoded::Event(event),
            Err(e) => Decoded::Malformed(MalformedEvent {
                id: raw_event_id(raw, position),
                period: raw
                    .get("period")
                    .and_then(Value::as_u64)
                    .and_then(|p| u8::try_from(p).ok()),
                timestamp: raw.get("timestamp").and_then(Value::as_str).map(str::to_string),
                team: raw.pointer("/team/id").and_then(Value::as_u64),
                type_name: raw.pointer("/type/name").and_then(Value::as_str).map(str::to_string),
                reason: e.to_string(),
            }),
        })
        .collect()
}

// ============================================================================
// MAPPER
// ============================================================================

pub struct SourceToCdfMapper<'a> {
    config: &'a PipelineConfig,
    registry: &'a TaxonomyRegistry,
    normalizer: CoordinateNormalizer,
}

impl<'a> SourceToCdfMapper<'a> {
    pub fn new(config: &'a PipelineConfig, registry: &'a TaxonomyRegistry) -> Self {
        SourceToCdfMapper {
            config,
            registry,
            normalizer: CoordinateNormalizer::from_config(config),
        }
    }

    /// Convert one match
    pub fn convert(&self, docs: &SourceDocuments) -> Result<MappedMatch, ConversionError> {
        let match_id = docs.match_id.as_str();
        debug!(match_id, events = docs.events.len(), "mapping match");

        let mut diagnostics = Diagnostics::new(match_id);
        let summary = docs.match_summary();
        match (&docs.matches, summary) {
            (None, _) => diagnostics.match_warning(WarningKind::MissingMetadata, "no matches document supplied"),
            (Some(_), None) => diagnostics.match_warning(
                WarningKind::MissingMetadata,
                format!("match {} not listed in the matches document", match_id),
            ),
            _ => {}
        }

        let roster = Roster::from_lineup(&docs.lineup, summary).map_err(|e| ConversionError::InvalidLineup {
            match_id: match_id.to_string(),
            reason: e.to_string(),
        })?;
        let resolver = IdResolver::new(match_id, &roster);

        let decoded = decode_events(&docs.events);
        let timeline = PeriodTimeline::from_events(decoded.iter().filter_map(Decoded::event));

        let events = self.map_events(&decoded, &resolver, &timeline, &mut diagnostics)?;
        let kickoff_time = self.kickoff_time(summary, &mut diagnostics);
        let match_sheet = self.build_match_sheet(
            match_id,
            &roster,
            summary,
            &events,
            &timeline,
            kickoff_time.clone(),
            &mut diagnostics,
        );
        let match_meta = self.build_match_meta(match_id, &roster, summary, &decoded, &timeline, kickoff_time);

        let tables = CdfTables {
            match_sheet,
            events,
            match_meta,
        };

        SchemaValidator::new(self.registry.attributes())
            .validate(&tables)
            .map_err(|violations| ConversionError::IntegrityViolation {
                match_id: match_id.to_string(),
                violations,
            })?;

        info!(
            match_id,
            records = tables.events.len(),
            warnings = diagnostics.len(),
            "match converted"
        );

        Ok(MappedMatch { tables, diagnostics })
    }

    // ========================================================================
    // EVENT LOG
    // ========================================================================

    fn map_events(
        &self,
        decoded: &[Decoded],
        resolver: &IdResolver<'_>,
        timeline: &PeriodTimeline,
        diagnostics: &mut Diagnostics,
    ) -> Result<Vec<EventRecord>, ConversionError> {
        let ctx = MappingContext {
            resolver,
            normalizer: &self.normalizer,
            keep_administrative: self.config.keep_administrative_events,
        };

        let mut records = Vec::with_capacity(decoded.len());
        for item in decoded {
            match item {
                Decoded::Event(event) => self.map_event(event, &ctx, timeline, diagnostics, &mut records)?,
                Decoded::Malformed(bad) => records.push(malformed_record(bad, resolver, timeline, diagnostics)),
            }
        }

        // stable: equal times keep source order
        records.sort_by_key(|r| r.time_ms);
        prune_dangling_event_refs(&mut records);
        attach_assists(&mut records);
        Ok(records)
    }

    fn map_event(
        &self,
        event: &SourceEvent,
        ctx: &MappingContext<'_>,
        timeline: &PeriodTimeline,
        diagnostics: &mut Diagnostics,
        records: &mut Vec<EventRecord>,
    ) -> Result<(), ConversionError> {
        let team = ctx.resolver.team(event.team.id, &event.id)?;
        let player = match event.player_id() {
            Some(id) => Some(ctx.resolver.player(id, &event.id)?),
            None => None,
        };

        let drafts = self.registry.map_event(event, ctx)?;
        if drafts.is_empty() {
            return Ok(());
        }

        let related: Vec<EntityId> = event.related_events.iter().map(|id| ctx.resolver.event(id)).collect();

        let location = event
            .location
            .as_deref()
            .and_then(|coords| self.normalizer.normalize_slice(coords));
        let location_clamped = location.map(|p| !p.in_bounds).unwrap_or(false);
        let period = Period::from_source(event.period);
        let clock = match_clock(event);
        let time_ms = timeline.normalize_event(event);
        let mut clamp_reported = false;

        for (ordinal, draft) in drafts.into_iter().enumerate() {
            let mut flags = draft.flags;
            if location_clamped && !flags.contains(&EventFlag::CoordinateClamped) {
                flags.push(EventFlag::CoordinateClamped);
            }
            flags.sort();

            let mut attributes = draft.attributes;
            if !related.is_empty() && self.registry.attributes().accepts(draft.event_type, "related_event_ids") {
                attributes.insert("related_event_ids".to_string(), AttributeValue::References(related.clone()));
            }

            if flags.contains(&EventFlag::UnknownEventType) {
                diagnostics.event_warning(
                    WarningKind::UnknownEventType,
                    &event.id,
                    format!("type {} '{}' has no CDF mapping", event.event_type.id, event.type_name()),
                );
            }
            if flags.contains(&EventFlag::CoordinateClamped) && !clamp_reported {
                clamp_reported = true;
                diagnostics.event_warning(
                    WarningKind::CoordinateClamped,
                    &event.id,
                    "location outside the pitch, clamped to the touchline",
                );
            }

            records.push(EventRecord {
                event_id: ctx.resolver.derived_event(&event.id, ordinal).key,
                source_event_id: event.id.clone(),
                match_id: ctx.resolver.match_id().key.clone(),
                team_id: Some(team.id.key.clone()),
                player_id: player.map(|p| p.id.key.clone()),
                period,
                clock: clock.clone(),
                time_ms,
                location,
                event_type: draft.event_type,
                attributes,
                flags,
            });
        }

        Ok(())
    }

    // ========================================================================
    // MATCH SHEET
    // ========================================================================

    #[allow(clippy::too_many_arguments)]
    fn build_match_sheet(
        &self,
        match_id: &str,
        roster: &Roster,
        summary: Option<&MatchSummary>,
        events: &[EventRecord],
        timeline: &PeriodTimeline,
        kickoff_time: Option<String>,
        diagnostics: &mut Diagnostics,
    ) -> MatchSheet {
        let home_id = roster.home.id.key.clone();
        let away_id = roster.away.id.key.clone();

        let mut tally = ScoreTally::new(&home_id, &away_id);
        let mut goals = Vec::new();
        let mut substitutions = Vec::new();
        let mut cards = Vec::new();

        for record in events {
            let Some(team_id) = record.team_id.clone() else {
                continue;
            };

            match record.event_type {
                CdfEventType::Shot if record.attribute("is_goal").and_then(AttributeValue::as_bool) == Some(true) => {
                    let score = tally.record(&team_id, record.period);
                    if record.period == Period::Shootout {
                        continue;
                    }
                    goals.push(GoalEntry {
                        event_id: record.event_id.clone(),
                        clock: record.clock.clone(),
                        team_id,
                        player_id: record.player_id.clone(),
                        assist_id: reference_key(record, "assist_id"),
                        is_own_goal: false,
                        is_penalty: record.attribute("is_penalty").and_then(AttributeValue::as_bool).unwrap_or(false),
                        score,
                    });
                }
                CdfEventType::OwnGoalAgainst => {
                    let benefiting = if team_id == home_id { away_id.clone() } else { home_id.clone() };
                    let score = tally.record(&benefiting, record.period);
                    goals.push(GoalEntry {
                        event_id: record.event_id.clone(),
                        clock: record.clock.clone(),
                        team_id: benefiting,
                        player_id: record.player_id.clone(),
                        assist_id: None,
                        is_own_goal: true,
                        is_penalty: false,
                        score,
                    });
                }
                CdfEventType::Substitution => {
                    if let (Some(in_player_id), Some(out_player_id)) =
                        (reference_key(record, "in_player_id"), reference_key(record, "out_player_id"))
                    {
                        substitutions.push(SubstitutionEntry {
                            event_id: record.event_id.clone(),
                            clock: record.clock.clone(),
                            team_id,
                            in_player_id,
                            out_player_id,
                        });
                    }
                }
                CdfEventType::Card => cards.push(CardEntry {
                    event_id: record.event_id.clone(),
                    clock: record.clock.clone(),
                    team_id,
                    player_id: record.player_id.clone(),
                    card_type: record
                        .attribute("card_type")
                        .and_then(AttributeValue::as_text)
                        .unwrap_or("unknown")
                        .to_string(),
                }),
                _ => {}
            }
        }

        let reconciliation = ReconciliationEngine::new().reconcile(
            tally.total(),
            summary.and_then(|s| s.home_score),
            summary.and_then(|s| s.away_score),
        );
        if reconciliation.has_discrepancy() {
            diagnostics.match_warning(WarningKind::ScoreMismatch, reconciliation.summary());
        }

        let final_score = reconciliation.final_score();
        let shootout = tally.shootout();
        let winning_team_id = if final_score.home != final_score.away {
            Some(if final_score.home > final_score.away { &home_id } else { &away_id })
        } else if shootout.home != shootout.away {
            Some(if shootout.home > shootout.away { &home_id } else { &away_id })
        } else {
            None
        };

        let played = played_periods(timeline);

        MatchSheet {
            match_id: match_id.to_string(),
            home: team_sheet(&roster.home),
            away: team_sheet(&roster.away),
            result: MatchResult {
                final_score,
                winning_team_id: winning_team_id.cloned(),
                by_period: tally.by_period(&played),
            },
            status: MatchStatus {
                is_neutral: false,
                has_extratime: played.iter().any(Period::is_extratime),
                has_shootout: played.contains(&Period::Shootout),
            },
            kickoff_time,
            stadium_id: summary.and_then(|s| s.stadium.as_ref()).map(|s| s.id.to_string()),
            referees: summary
                .and_then(|s| s.referee.as_ref())
                .map(|r| NamedEntity {
                    id: r.id.to_string(),
                    name: r.name.clone(),
                })
                .into_iter()
                .collect(),
            goals,
            substitutions,
            cards,
            vendor: self.config.vendor.clone(),
        }
    }

    /// Local kickoff (match_date + kick_off) shifted to UTC
    fn kickoff_time(&self, summary: Option<&MatchSummary>, diagnostics: &mut Diagnostics) -> Option<String> {
        let summary = summary?;
        let date = summary.match_date.as_deref()?;
        let clock = summary.kick_off.as_deref()?;

        let parsed = parse_kickoff(date, clock, self.config.kickoff_utc_offset_minutes);
        if parsed.is_none() {
            diagnostics.match_warning(
                WarningKind::InvalidKickoff,
                format!("cannot parse kickoff '{} {}'", date, clock),
            );
        }
        parsed
    }

    // ========================================================================
    // MATCH META
    // ========================================================================

    fn build_match_meta(
        &self,
        match_id: &str,
        roster: &Roster,
        summary: Option<&MatchSummary>,
        decoded: &[Decoded],
        timeline: &PeriodTimeline,
        kickoff_time: Option<String>,
    ) -> MatchMeta {
        let first_half = self.home_direction(decoded, roster.home.source_id);

        let periods = timeline
            .periods()
            .filter_map(|p| {
                let period = Period::from_source(p);
                if period == Period::Unknown {
                    return None;
                }
                let (start_ms, end_ms) = timeline.bounds(p)?;
                let play_direction = match period {
                    Period::FirstHalf => first_half,
                    Period::SecondHalf => first_half.map(|d| d.flipped()),
                    _ => None,
                };
                Some(PeriodInfo {
                    period,
                    start_ms,
                    end_ms,
                    play_direction,
                })
            })
            .collect();

        let mut whistles: Vec<Whistle> = decoded
            .iter()
            .filter_map(Decoded::event)
            .filter_map(|event| {
                let kind = match (event.event_type.id, event.type_name()) {
                    (HALF_START, _) | (_, "Half Start") => "half_start",
                    (HALF_END, _) | (_, "Half End") => "half_end",
                    _ => return None,
                };
                Some(Whistle {
                    kind: kind.to_string(),
                    period: Period::from_source(event.period),
                    clock: match_clock(event),
                    time_ms: timeline.normalize_event(event),
                })
            })
            .collect();
        whistles.sort_by_key(|w| w.time_ms);

        MatchMeta {
            match_id: match_id.to_string(),
            competition: summary.and_then(|s| s.competition.as_ref()).map(|c| NamedEntity {
                id: c.competition_id.to_string(),
                name: c.competition_name.clone(),
            }),
            season: summary.and_then(|s| s.season.as_ref()).map(|s| NamedEntity {
                id: s.season_id.to_string(),
                name: s.season_name.clone(),
            }),
            competition_stage: summary
                .and_then(|s| s.competition_stage.as_ref())
                .and_then(|stage| stage.name.clone()),
            match_week: summary.and_then(|s| s.match_week),
            kickoff_time,
            stadium: summary.and_then(|s| {
                s.stadium.as_ref().map(|venue| StadiumInfo {
                    id: venue.id.to_string(),
                    name: venue.name.clone(),
                    country: venue.country.as_ref().and_then(|c| c.name.clone()),
                    pitch_length: s.pitch_length,
                    pitch_width: s.pitch_width,
                })
            }),
            referee: summary.and_then(|s| s.referee.as_ref()).map(|r| NamedEntity {
                id: r.id.to_string(),
                name: r.name.clone(),
            }),
            home_team_id: roster.home.id.key.clone(),
            away_team_id: roster.away.id.key.clone(),
            periods,
            whistles,
            version: VersionInfo {
                vendor: self.config.vendor.clone(),
                cdf_version: self.config.cdf_version.clone(),
                converter_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Home team's first-half direction from where its early actions happen.
    ///
    /// Mean x in the own half of the source grid means it attacks left to right.
    fn home_direction(&self, decoded: &[Decoded], home_source_id: u64) -> Option<PlayDirection> {
        let xs: Vec<f64> = decoded
            .iter()
            .filter_map(Decoded::event)
            .filter(|e| e.period == 1 && e.minute < DIRECTION_WINDOW_MINUTES && e.team.id == home_source_id)
            .filter_map(|e| e.location.as_ref().and_then(|l| l.first().copied()))
            .filter(|x| x.is_finite())
            .collect();

        if xs.is_empty() {
            return None;
        }
        let mean = xs.iter().sum::<f64>() / xs.len() as f64;
        if mean < self.config.source_pitch.length / 2.0 {
            Some(PlayDirection::LeftRight)
        } else {
            Some(PlayDirection::RightLeft)
        }
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn malformed_record(
    bad: &MalformedEvent,
    resolver: &IdResolver<'_>,
    timeline: &PeriodTimeline,
    diagnostics: &mut Diagnostics,
) -> EventRecord {
    diagnostics.event_warning(
        WarningKind::MalformedEvent,
        &bad.id,
        format!("could not decode event: {}", bad.reason),
    );

    let period = bad.period.unwrap_or(0);
    let period_millis = bad.timestamp.as_deref().and_then(parse_timestamp).unwrap_or(0);

    let mut attributes = AttributeMap::new();
    if let Some(name) = &bad.type_name {
        attributes.insert("source_type".to_string(), AttributeValue::Text(name.clone()));
    }

    EventRecord {
        event_id: resolver.event(&bad.id).key,
        source_event_id: bad.id.clone(),
        match_id: resolver.match_id().key.clone(),
        team_id: bad
            .team
            .and_then(|t| resolver.roster().team_by_source_id(t))
            .map(|t| t.id.key.clone()),
        player_id: None,
        period: Period::from_source(period),
        clock: format_clock(period_millis),
        time_ms: timeline.normalize(period, period_millis),
        location: None,
        event_type: CdfEventType::Other,
        attributes,
        flags: vec![EventFlag::MalformedEvent],
    }
}

/// Drop event-valued attributes pointing at events not in this log.
///
/// A list keeps the targets that resolve and goes away once empty.
fn prune_dangling_event_refs(records: &mut [EventRecord]) {
    let known: HashSet<String> = records.iter().map(|r| r.event_id.clone()).collect();
    for record in records.iter_mut() {
        let event_id = record.event_id.clone();
        record.attributes.retain(|name, value| match value {
            AttributeValue::Reference(target) => keeps_target(&known, &event_id, name, target),
            AttributeValue::References(targets) => {
                targets.retain(|target| keeps_target(&known, &event_id, name, target));
                !targets.is_empty()
            }
            _ => true,
        });
    }
}

fn keeps_target(known: &HashSet<String>, event_id: &str, attribute: &str, target: &EntityId) -> bool {
    let found = target.kind != EntityKind::Event || known.contains(&target.key);
    if !found {
        debug!(event = %event_id, attribute, target = %target, "dropping dangling event reference");
    }
    found
}

/// `assist_id` on goal shots: the passer flagged as goal assist, else the key pass's passer
fn attach_assists(records: &mut [EventRecord]) {
    let mut assist_for: HashMap<String, String> = HashMap::new();
    let mut passer_of: HashMap<String, String> = HashMap::new();

    for record in records.iter().filter(|r| r.event_type == CdfEventType::Pass) {
        let Some(passer) = &record.player_id else {
            continue;
        };
        passer_of.insert(record.event_id.clone(), passer.clone());

        let is_goal_assist = record.attribute("is_goal_assist").and_then(AttributeValue::as_bool) == Some(true);
        if let (true, Some(shot)) = (is_goal_assist, reference_key(record, "assisted_shot_id")) {
            assist_for.insert(shot, passer.clone());
        }
    }

    for record in records.iter_mut() {
        let is_goal = record.attribute("is_goal").and_then(AttributeValue::as_bool) == Some(true);
        if record.event_type != CdfEventType::Shot || !is_goal {
            continue;
        }
        let assist = assist_for
            .get(&record.event_id)
            .or_else(|| reference_key(record, "key_pass_id").and_then(|pass| passer_of.get(&pass)))
            .cloned();
        if let Some(player) = assist {
            record.attributes.insert(
                "assist_id".to_string(),
                AttributeValue::Reference(EntityId::new(EntityKind::Player, player)),
            );
        }
    }
}

fn reference_key(record: &EventRecord, attribute: &str) -> Option<String> {
    record
        .attribute(attribute)
        .and_then(AttributeValue::as_reference)
        .map(|id| id.key.clone())
}

fn played_periods(timeline: &PeriodTimeline) -> Vec<Period> {
    timeline
        .periods()
        .map(Period::from_source)
        .filter(|p| *p != Period::Unknown)
        .collect()
}

fn team_sheet(team: &Team) -> TeamSheet {
    TeamSheet {
        id: team.id.key.clone(),
        name: team.name.clone(),
        players: team.players.iter().map(player_entry).collect(),
    }
}

fn player_entry(player: &Player) -> PlayerEntry {
    PlayerEntry {
        id: player.id.key.clone(),
        team_id: player.team_id.key.clone(),
        name: player.name.clone(),
        first_name: player.first_name.clone(),
        last_name: player.last_name.clone(),
        nickname: player.nickname.clone(),
        jersey_number: player.jersey_number,
        position: player.position.clone(),
        is_starter: player.is_starter,
        has_played: player.has_played,
    }
}

/// "2021-06-11" + "21:00:00.000" at `offset_minutes` from UTC -> "2021-06-11T21:00:00Z" (offset 0)
pub fn parse_kickoff(date: &str, clock: &str, offset_minutes: i32) -> Option<String> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let time = NaiveTime::parse_from_str(clock.trim(), "%H:%M:%S%.f").ok()?;
    let local = date.and_time(time);
    let utc = local - chrono::Duration::minutes(i64::from(offset_minutes));
    Some(Utc.from_utc_datetime(&utc).to_rfc3339_opts(SecondsFormat::Secs, true))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdf::Score;
    use crate::fixtures::{self, away_player, home_player, AWAY_TEAM_ID, EVENT_GOAL, EVENT_KICKOFF, EVENT_PASS, HOME_TEAM_ID};
    use serde_json::json;

    fn convert(docs: &SourceDocuments) -> Result<MappedMatch, ConversionError> {
        convert_with(docs, &PipelineConfig::default())
    }

    fn convert_with(docs: &SourceDocuments, config: &PipelineConfig) -> Result<MappedMatch, ConversionError> {
        let registry = TaxonomyRegistry::new();
        SourceToCdfMapper::new(config, &registry).convert(docs)
    }

    fn with_extra_events(extra: Vec<Value>) -> SourceDocuments {
        let mut docs = fixtures::scenario_documents();
        docs.events.extend(extra);
        docs
    }

    #[test]
    fn test_scenario_event_log() {
        let mapped = convert(&fixtures::scenario_documents()).unwrap();
        let events = &mapped.tables.events;

        let ids: Vec<&str> = events.iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids, vec![EVENT_KICKOFF, EVENT_PASS, EVENT_GOAL]);
        assert!(events.iter().all(|e| e.match_id == fixtures::MATCH_ID));
        assert!(events.iter().all(|e| e.team_id.as_deref() == Some("914")));

        let goal = &events[2];
        assert_eq!(goal.event_type, CdfEventType::Shot);
        assert_eq!(goal.player_id.as_deref(), Some("10010"));
        assert_eq!(goal.attribute("is_goal"), Some(&AttributeValue::Boolean(true)));
        assert_eq!(
            goal.attribute("assist_id"),
            Some(&AttributeValue::Reference(EntityId::new(EntityKind::Player, "10004")))
        );
        assert_eq!(goal.clock, "00:10:02.000");
        assert!(goal.time_ms > events[1].time_ms);
    }

    #[test]
    fn test_scenario_match_sheet() {
        let mapped = convert(&fixtures::scenario_documents()).unwrap();
        let sheet = &mapped.tables.match_sheet;

        assert_eq!(sheet.home.id, "914");
        assert_eq!(sheet.away.id, "909");
        assert_eq!(sheet.home.players.len(), 11);

        // the events only carry one of the three goals
        assert_eq!(sheet.result.final_score, Score { home: 2, away: 1 });
        assert_eq!(sheet.result.winning_team_id.as_deref(), Some("914"));
        assert_eq!(mapped.diagnostics.count(WarningKind::ScoreMismatch), 1);

        assert_eq!(sheet.goals.len(), 1);
        assert_eq!(sheet.goals[0].assist_id.as_deref(), Some("10004"));
        assert_eq!(sheet.goals[0].score, Score { home: 1, away: 0 });
        assert_eq!(sheet.result.by_period["first_half"], Score { home: 1, away: 0 });

        assert_eq!(sheet.kickoff_time.as_deref(), Some("2021-06-11T21:00:00Z"));
        assert_eq!(sheet.stadium_id.as_deref(), Some("4867"));
        assert_eq!(sheet.referees[0].id, "943");
        assert!(!sheet.status.has_extratime);
    }

    #[test]
    fn test_scenario_match_meta() {
        let mapped = convert(&fixtures::scenario_documents()).unwrap();
        let meta = &mapped.tables.match_meta;

        assert_eq!(meta.competition.as_ref().map(|c| c.id.as_str()), Some("55"));
        assert_eq!(meta.season.as_ref().map(|s| s.id.as_str()), Some("43"));
        assert_eq!(meta.competition_stage.as_deref(), Some("Group Stage"));
        assert_eq!(meta.match_week, Some(1));
        assert_eq!(meta.stadium.as_ref().and_then(|s| s.country.as_deref()), Some("Italy"));
        assert_eq!(meta.periods.len(), 1);
        assert_eq!(meta.periods[0].period, Period::FirstHalf);
        assert_eq!(meta.version.converter_version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_missing_player_aborts_match() {
        let stranger = fixtures::event("ffff0000-0000-4000-8000-000000000009", 4, 1, "00:20:00.000", 17, "Pressure", HOME_TEAM_ID, Some(424242));
        let result = convert(&with_extra_events(vec![stranger]));

        match result {
            Err(ConversionError::MissingReference(e)) => {
                assert_eq!(e.kind, EntityKind::Player);
                assert_eq!(e.key, "424242");
                assert_eq!(e.source_event_id, "ffff0000-0000-4000-8000-000000000009");
            }
            other => panic!("expected missing reference, got {:?}", other.map(|m| m.tables.events.len())),
        }
    }

    #[test]
    fn test_unknown_team_aborts_match() {
        let stranger = fixtures::event("ffff0000-0000-4000-8000-000000000009", 4, 1, "00:20:00.000", 17, "Pressure", 1, None);
        let err = convert(&with_extra_events(vec![stranger])).unwrap_err();
        assert_eq!(err.source_event_id(), Some("ffff0000-0000-4000-8000-000000000009"));
        assert_eq!(err.match_id(), fixtures::MATCH_ID);
    }

    #[test]
    fn test_invalid_lineup() {
        let mut docs = fixtures::scenario_documents();
        docs.lineup.pop();
        assert!(matches!(convert(&docs), Err(ConversionError::InvalidLineup { .. })));
    }

    #[test]
    fn test_unknown_type_degrades_to_other() {
        let mystery = fixtures::event("mystery-1", 4, 1, "00:20:00.000", 999, "Mystery", AWAY_TEAM_ID, Some(away_player(2)));
        let mapped = convert(&with_extra_events(vec![mystery])).unwrap();

        let record = mapped.tables.events.iter().find(|e| e.source_event_id == "mystery-1").unwrap();
        assert_eq!(record.event_type, CdfEventType::Other);
        assert!(record.has_flag(EventFlag::UnknownEventType));
        assert_eq!(record.attribute("source_type").and_then(AttributeValue::as_text), Some("Mystery"));
        assert_eq!(mapped.diagnostics.count(WarningKind::UnknownEventType), 1);
    }

    #[test]
    fn test_malformed_event_is_kept_and_flagged() {
        // no type object
        let broken = json!({
            "id": "bad-1",
            "period": 1,
            "timestamp": "00:05:00.000",
            "team": { "id": HOME_TEAM_ID, "name": "Italy" }
        });
        let mapped = convert(&with_extra_events(vec![broken])).unwrap();
        let events = &mapped.tables.events;

        assert_eq!(events.len(), 4);
        assert_eq!(events[1].event_id, "bad-1");
        assert_eq!(events[1].event_type, CdfEventType::Other);
        assert!(events[1].has_flag(EventFlag::MalformedEvent));
        assert_eq!(events[1].team_id.as_deref(), Some("914"));
        assert_eq!(mapped.diagnostics.count(WarningKind::MalformedEvent), 1);
    }

    #[test]
    fn test_without_matches_document() {
        let docs = SourceDocuments::new(fixtures::MATCH_ID, fixtures::scenario_events(), fixtures::lineup());
        let mapped = convert(&docs).unwrap();
        let sheet = &mapped.tables.match_sheet;

        assert_eq!(mapped.diagnostics.count(WarningKind::MissingMetadata), 1);
        assert_eq!(mapped.diagnostics.count(WarningKind::ScoreMismatch), 0);
        assert_eq!(sheet.result.final_score, Score { home: 1, away: 0 });
        assert!(sheet.kickoff_time.is_none());
        assert!(mapped.tables.match_meta.competition.is_none());
    }

    #[test]
    fn test_match_not_listed_in_matches_document() {
        let docs = SourceDocuments::new("3788741", fixtures::scenario_events(), fixtures::lineup())
            .with_matches(fixtures::matches().into_iter().skip(1).collect());
        let mapped = convert(&docs).unwrap();
        assert_eq!(mapped.diagnostics.count(WarningKind::MissingMetadata), 1);
    }

    #[test]
    fn test_administrative_events_and_whistles() {
        let extra = vec![
            fixtures::event("whistle-1", 0, 1, "00:00:00.000", 18, "Half Start", HOME_TEAM_ID, None),
            fixtures::event("whistle-2", 4, 1, "00:46:10.000", 34, "Half End", HOME_TEAM_ID, None),
        ];

        let skipped = convert(&with_extra_events(extra.clone())).unwrap();
        assert_eq!(skipped.tables.events.len(), 3);
        let whistles = &skipped.tables.match_meta.whistles;
        assert_eq!(whistles.len(), 2);
        assert_eq!(whistles[0].kind, "half_start");
        assert_eq!(whistles[1].kind, "half_end");
        assert_eq!(whistles[1].time_ms, 2_770_000);

        let config = PipelineConfig::default().with_administrative_events(true);
        let kept = convert_with(&with_extra_events(extra), &config).unwrap();
        let admin = kept
            .tables
            .events
            .iter()
            .filter(|e| e.event_type == CdfEventType::Administrative)
            .count();
        assert_eq!(admin, 2);
    }

    #[test]
    fn test_own_goal_counts_for_opponent() {
        let own_goal = fixtures::event("og-1", 4, 1, "00:30:00.000", 20, "Own Goal Against", AWAY_TEAM_ID, Some(away_player(3)));
        let mut docs = SourceDocuments::new(fixtures::MATCH_ID, fixtures::scenario_events(), fixtures::lineup());
        docs.events.push(own_goal);

        let mapped = convert(&docs).unwrap();
        let sheet = &mapped.tables.match_sheet;

        assert_eq!(sheet.result.final_score, Score { home: 2, away: 0 });
        let own = sheet.goals.iter().find(|g| g.is_own_goal).unwrap();
        assert_eq!(own.team_id, "914");
        assert_eq!(own.player_id.as_deref(), Some("20003"));
        assert_eq!(own.score, Score { home: 2, away: 0 });
    }

    fn goal_shot(id: &str, index: u64, period: u8, timestamp: &str, team: u64, player: u64) -> Value {
        let mut shot = fixtures::event(id, index, period, timestamp, 16, "Shot", team, Some(player));
        shot["shot"] = json!({ "outcome": { "id": 97, "name": "Goal" }, "type": { "id": 88, "name": "Penalty" } });
        shot
    }

    #[test]
    fn test_shootout_scored_apart_and_decides_draw() {
        let mut docs = SourceDocuments::new(fixtures::MATCH_ID, fixtures::scenario_events(), fixtures::lineup());
        docs.events.push(goal_shot("away-goal", 4, 1, "00:30:00.000", AWAY_TEAM_ID, away_player(9)));
        docs.events.push(goal_shot("pen-1", 5, 5, "00:00:10.000", AWAY_TEAM_ID, away_player(7)));

        let mapped = convert(&docs).unwrap();
        let sheet = &mapped.tables.match_sheet;

        assert_eq!(sheet.result.final_score, Score { home: 1, away: 1 });
        assert_eq!(sheet.result.by_period["shootout"], Score { home: 0, away: 1 });
        assert_eq!(sheet.result.by_period["first_half"], Score { home: 1, away: 1 });
        assert_eq!(sheet.result.winning_team_id.as_deref(), Some("909"));
        assert!(sheet.status.has_shootout);
        assert_eq!(sheet.goals.len(), 2);
    }

    #[test]
    fn test_failed_ball_recovery_is_unsuccessful() {
        let mut recovery = fixtures::event("rec-1", 4, 1, "00:20:00.000", 2, "Ball Recovery", AWAY_TEAM_ID, Some(away_player(6)));
        recovery["ball_recovery"] = json!({ "recovery_failure": true });
        let clean = fixtures::event("rec-2", 5, 1, "00:21:00.000", 2, "Ball Recovery", HOME_TEAM_ID, Some(home_player(6)));

        let mapped = convert(&with_extra_events(vec![recovery, clean])).unwrap();
        let success = |id: &str| {
            mapped
                .tables
                .events
                .iter()
                .find(|e| e.event_id == id)
                .and_then(|e| e.attribute("is_successful"))
                .cloned()
        };

        assert_eq!(success("rec-1"), Some(AttributeValue::Boolean(false)));
        assert_eq!(success("rec-2"), Some(AttributeValue::Boolean(true)));
    }

    #[test]
    fn test_related_events_resolve_or_are_pruned() {
        let mut docs = fixtures::scenario_documents();
        docs.events[1]["related_events"] = json!([EVENT_GOAL, "not-in-this-match"]);
        docs.events[2]["related_events"] = json!(["9F3C0A4E-1111-4C1E-9A51-00000000DEAD"]);

        let mapped = convert(&docs).unwrap();
        let pass = mapped.tables.event(EVENT_PASS).unwrap();
        assert_eq!(
            pass.attribute("related_event_ids"),
            Some(&AttributeValue::References(vec![EntityId::new(EntityKind::Event, EVENT_GOAL)]))
        );
        let goal = mapped.tables.event(EVENT_GOAL).unwrap();
        assert!(goal.attribute("related_event_ids").is_none());
    }

    #[test]
    fn test_cards_and_substitutions_summarized() {
        let mut foul = fixtures::event("foul-1", 4, 1, "00:30:00.000", 22, "Foul Committed", AWAY_TEAM_ID, Some(away_player(5)));
        foul["foul_committed"] = json!({ "card": { "id": 7, "name": "Yellow Card" } });
        let mut sub = fixtures::event("sub-1", 5, 1, "00:40:00.000", 19, "Substitution", AWAY_TEAM_ID, Some(away_player(2)));
        sub["substitution"] = json!({ "replacement": { "id": away_player(10), "name": "Sub" } });

        let mapped = convert(&with_extra_events(vec![foul, sub])).unwrap();
        let sheet = &mapped.tables.match_sheet;

        assert_eq!(sheet.cards.len(), 1);
        assert_eq!(sheet.cards[0].card_type, "yellow card");
        assert_eq!(sheet.cards[0].event_id, "foul-1#1");
        assert_eq!(sheet.substitutions.len(), 1);
        assert_eq!(sheet.substitutions[0].in_player_id, "20010");
        assert_eq!(sheet.substitutions[0].out_player_id, "20002");
        assert_eq!(sheet.substitutions[0].team_id, "909");
    }

    #[test]
    fn test_clamped_location_is_flagged_once() {
        let mut wide = fixtures::event("wide-1", 4, 1, "00:20:00.000", 17, "Pressure", HOME_TEAM_ID, Some(home_player(2)));
        wide["location"] = json!([125.0, 40.0]);

        let mapped = convert(&with_extra_events(vec![wide])).unwrap();
        let record = mapped.tables.events.iter().find(|e| e.event_id == "wide-1").unwrap();

        assert!(record.has_flag(EventFlag::CoordinateClamped));
        assert_eq!(record.location.map(|p| p.x), Some(52.5));
        assert_eq!(mapped.diagnostics.count(WarningKind::CoordinateClamped), 1);
    }

    #[test]
    fn test_play_direction_flips_at_half_time() {
        let mut second_half = fixtures::event("p2-1", 4, 2, "00:01:00.000", 17, "Pressure", AWAY_TEAM_ID, Some(away_player(4)));
        second_half["location"] = json!([40.0, 40.0]);

        let mapped = convert(&with_extra_events(vec![second_half])).unwrap();
        let periods = &mapped.tables.match_meta.periods;

        assert_eq!(periods.len(), 2);
        // home kicked off at x = 60 on the 120 grid: not in its own half
        assert_eq!(periods[0].play_direction, Some(PlayDirection::RightLeft));
        assert_eq!(periods[1].play_direction, Some(PlayDirection::LeftRight));
        assert!(periods[1].start_ms > periods[0].end_ms);
    }

    #[test]
    fn test_conversion_is_deterministic() {
        let docs = fixtures::scenario_documents();
        let first = convert(&docs).unwrap();
        let second = convert(&docs).unwrap();
        assert_eq!(first.tables, second.tables);
        assert_eq!(first.diagnostics, second.diagnostics);
    }

    #[test]
    fn test_parse_kickoff() {
        assert_eq!(parse_kickoff("2021-06-11", "21:00:00.000", 0).as_deref(), Some("2021-06-11T21:00:00Z"));
        assert_eq!(parse_kickoff("2021-06-11", "21:00:00.000", 120).as_deref(), Some("2021-06-11T19:00:00Z"));
        assert_eq!(parse_kickoff("2021-06-12", "00:30:00", 60).as_deref(), Some("2021-06-11T23:30:00Z"));
        assert!(parse_kickoff("11/06/2021", "21:00", 0).is_none());
    }
}
