// 💾 File I/O - source documents in, CDF tables and graphs out
//
// Layout of a StatsBomb open-data checkout:
//   {root}/data/matches/{competition_id}/{season_id}.json   (array of match summaries)
//   {root}/data/events/{match_id}.json                      (array of events)
//   {root}/data/lineups/{match_id}.json                     (array of two teams)
//
// Output per match:
//   {out}/{match_id}/match_sheet_cdf.json
//   {out}/{match_id}/event_cdf.json
//   {out}/{match_id}/match_meta_cdf.json
//   {out}/{match_id}.jsonld

use crate::cdf::{CdfTables, EventRecord, MatchMeta, MatchSheet};
use crate::graph::GraphDocument;
use crate::source::{LineupTeam, MatchSummary, SourceDocuments};
use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const MATCH_SHEET_FILE: &str = "match_sheet_cdf.json";
pub const EVENT_LOG_FILE: &str = "event_cdf.json";
pub const MATCH_META_FILE: &str = "match_meta_cdf.json";
pub const GRAPH_EXTENSION: &str = "jsonld";

// ============================================================================
// JSON HELPERS
// ============================================================================

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .with_context(|| format!("Failed to encode JSON for {}", path.display()))?;
    fs::write(path, json).with_context(|| format!("Failed to write file: {}", path.display()))
}

// ============================================================================
// MATCH ID INFERENCE
// ============================================================================

/// First run of 5+ digits in the file name: "events_3788741.json" -> "3788741"
pub fn infer_match_id(path: &Path) -> Option<String> {
    let name = path.file_stem()?.to_str()?;
    let mut run = String::new();
    for c in name.chars() {
        if c.is_ascii_digit() {
            run.push(c);
        } else if run.len() >= 5 {
            return Some(run);
        } else {
            run.clear();
        }
    }
    if run.len() >= 5 {
        Some(run)
    } else {
        None
    }
}

// ============================================================================
// LOADING SOURCE DOCUMENTS
// ============================================================================

/// Load the documents of one match.
///
/// The match id is taken from `match_id` or, failing that, inferred from the
/// events file name.
pub fn load_documents(
    events_path: &Path,
    lineup_path: &Path,
    matches_path: Option<&Path>,
    match_id: Option<&str>,
) -> Result<SourceDocuments> {
    let match_id = match match_id {
        Some(id) => id.to_string(),
        None => match infer_match_id(events_path) {
            Some(id) => id,
            None => bail!(
                "Cannot infer a match id from {}; pass it explicitly",
                events_path.display()
            ),
        },
    };

    let events: Vec<Value> = read_json(events_path)?;
    let lineup: Vec<LineupTeam> = read_json(lineup_path)?;
    let mut docs = SourceDocuments::new(match_id, events, lineup);

    if let Some(path) = matches_path {
        let matches: Vec<MatchSummary> = read_json(path)?;
        docs = docs.with_matches(matches);
    }

    debug!(match_id = %docs.match_id, events = docs.events.len(), "documents loaded");
    Ok(docs)
}

/// Files of one match found under an open-data root
#[derive(Debug, Clone)]
pub struct MatchFiles {
    pub match_id: String,
    pub events: PathBuf,
    pub lineup: PathBuf,
    /// Summary from the competition/season matches document, when listed there
    pub summary: Option<MatchSummary>,
}

impl MatchFiles {
    pub fn load(&self) -> Result<SourceDocuments> {
        let events: Vec<Value> = read_json(&self.events)?;
        let lineup: Vec<LineupTeam> = read_json(&self.lineup)?;
        let docs = SourceDocuments::new(self.match_id.clone(), events, lineup);
        Ok(match &self.summary {
            Some(summary) => docs.with_matches(vec![summary.clone()]),
            None => docs,
        })
    }
}

/// Every match under `{root}/data` that has both an events and a lineup file,
/// ordered by match id
pub fn discover_matches(root: &Path) -> Result<Vec<MatchFiles>> {
    let data = root.join("data");
    let events_dir = data.join("events");
    let lineups_dir = data.join("lineups");
    if !events_dir.is_dir() {
        bail!("No events directory at {}", events_dir.display());
    }

    let summaries = load_match_summaries(&data.join("matches"))?;

    let mut found = BTreeMap::new();
    for entry in fs::read_dir(&events_dir).with_context(|| format!("Failed to list {}", events_dir.display()))? {
        let path = entry.with_context(|| format!("Failed to list {}", events_dir.display()))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(match_id) = infer_match_id(&path) else {
            debug!(path = %path.display(), "no match id in file name, skipped");
            continue;
        };

        let lineup = lineups_dir.join(format!("{}.json", match_id));
        if !lineup.is_file() {
            warn!(match_id = %match_id, "events without lineup, skipped");
            continue;
        }

        found.insert(
            match_id.clone(),
            MatchFiles {
                summary: summaries.get(&match_id).cloned(),
                match_id,
                events: path,
                lineup,
            },
        );
    }

    Ok(found.into_values().collect())
}

/// All match summaries under `{data}/matches/{competition}/{season}.json`, by match id
fn load_match_summaries(matches_dir: &Path) -> Result<BTreeMap<String, MatchSummary>> {
    let mut summaries = BTreeMap::new();
    if !matches_dir.is_dir() {
        return Ok(summaries);
    }

    let mut files = Vec::new();
    for competition in fs::read_dir(matches_dir).with_context(|| format!("Failed to list {}", matches_dir.display()))? {
        let competition = competition?.path();
        if !competition.is_dir() {
            continue;
        }
        for season in fs::read_dir(&competition).with_context(|| format!("Failed to list {}", competition.display()))? {
            let season = season?.path();
            if season.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(season);
            }
        }
    }
    files.sort();

    for file in files {
        let matches: Vec<MatchSummary> = read_json(&file)?;
        for summary in matches {
            summaries.insert(summary.match_id.clone(), summary);
        }
    }
    Ok(summaries)
}

// ============================================================================
// CDF TABLES
// ============================================================================

/// Write the three tables to `{out_dir}/{match_id}/`; returns that directory
pub fn write_cdf_tables(out_dir: &Path, tables: &CdfTables) -> Result<PathBuf> {
    let dir = out_dir.join(tables.match_id());
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;

    write_json(&dir.join(MATCH_SHEET_FILE), &tables.match_sheet)?;
    write_json(&dir.join(EVENT_LOG_FILE), &tables.events)?;
    write_json(&dir.join(MATCH_META_FILE), &tables.match_meta)?;
    Ok(dir)
}

/// Read tables written by `write_cdf_tables` from one match directory
pub fn read_cdf_tables(match_dir: &Path) -> Result<CdfTables> {
    let match_sheet: MatchSheet = read_json(&match_dir.join(MATCH_SHEET_FILE))?;
    let events: Vec<EventRecord> = read_json(&match_dir.join(EVENT_LOG_FILE))?;
    let match_meta: MatchMeta = read_json(&match_dir.join(MATCH_META_FILE))?;
    Ok(CdfTables {
        match_sheet,
        events,
        match_meta,
    })
}

// ============================================================================
// GRAPH
// ============================================================================

/// Write `{out_dir}/{match_id}.jsonld`; returns the file path
pub fn write_graph(out_dir: &Path, match_id: &str, doc: &GraphDocument) -> Result<PathBuf> {
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create directory: {}", out_dir.display()))?;
    let path = out_dir.join(format!("{}.{}", match_id, GRAPH_EXTENSION));
    write_json(&path, doc)?;
    Ok(path)
}

pub fn read_graph(path: &Path) -> Result<GraphDocument> {
    read_json(path)
}

/// Write any serializable report (batch summary, warnings) as pretty JSON
pub fn write_report<T: Serialize + ?Sized>(path: &Path, report: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    write_json(path, report)
}

// ============================================================================
// TESTS
// ============================================================================
