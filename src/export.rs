// 📤 Flat Event-Log Export
// One CSV row per event record, for spreadsheets and quick diffing
//
// Columns are fixed; the open-ended attribute map goes into one JSON column.

use crate::cdf::EventRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Flattened event record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRow {
    pub event_id: String,
    pub source_event_id: String,
    pub match_id: String,
    pub team_id: Option<String>,
    pub player_id: Option<String>,
    pub period: String,
    pub clock: String,
    pub time_ms: u64,
    pub event_type: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub in_bounds: Option<bool>,
    /// ";"-separated flag names
    pub flags: String,
    /// Attribute map as JSON
    pub attributes: String,
}

impl EventRow {
    pub fn from_record(record: &EventRecord) -> Result<Self> {
        let flags: Vec<String> = record
            .flags
            .iter()
            .map(|f| serde_json::to_value(f).map(|v| v.as_str().unwrap_or_default().to_string()))
            .collect::<serde_json::Result<_>>()?;

        Ok(EventRow {
            event_id: record.event_id.clone(),
            source_event_id: record.source_event_id.clone(),
            match_id: record.match_id.clone(),
            team_id: record.team_id.clone(),
            player_id: record.player_id.clone(),
            period: record.period.name().to_string(),
            clock: record.clock.clone(),
            time_ms: record.time_ms,
            event_type: record.event_type.as_str().to_string(),
            x: record.location.map(|p| p.x),
            y: record.location.map(|p| p.y),
            z: record.location.and_then(|p| p.z),
            in_bounds: record.location.map(|p| p.in_bounds),
            flags: flags.join(";"),
            attributes: serde_json::to_string(&record.attributes)
                .with_context(|| format!("Failed to encode attributes of event {}", record.event_id))?,
        })
    }
}

/// Write the event log as CSV (header row first)
pub fn write_event_log_csv<W: Write>(events: &[EventRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in events {
        let row = EventRow::from_record(record)?;
        wtr.serialize(&row)
            .with_context(|| format!("Failed to write CSV row for event {}", record.event_id))?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

pub fn write_event_log_csv_file(path: &Path, events: &[EventRecord]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create file: {}", path.display()))?;
    write_event_log_csv(events, file)
}

/// Read rows written by `write_event_log_csv`
pub fn read_event_rows(path: &Path) -> Result<Vec<EventRow>> {
    let mut rdr = csv::Reader::from_path(path).with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut rows = Vec::new();
    for (line_num, result) in rdr.deserialize().enumerate() {
        let row: EventRow = result.with_context(|| format!("Failed to parse CSV line {} in {}", line_num + 2, path.display()))?;
        rows.push(row);
    }
    Ok(rows)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cdf::EventFlag;
    use crate::fixtures;

    #[test]
    fn test_header_and_row_count() {
        let tables = fixtures::scenario_tables();
        let mut buffer = Vec::new();
        write_event_log_csv(&tables.events, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("event_id,source_event_id,match_id,team_id,player_id,period,clock,time_ms,event_type,x,y,z,in_bounds,flags,attributes")
        );
        assert_eq!(lines.count(), tables.events.len());
    }

    #[test]
    fn test_file_round_trip_keeps_columns() {
        let mut tables = fixtures::scenario_tables();
        tables.events[0].flags.push(EventFlag::CoordinateClamped);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.csv");
        write_event_log_csv_file(&path, &tables.events).unwrap();

        let rows = read_event_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].flags, "coordinate_clamped");
        assert_eq!(rows[2].event_type, "shot");
        assert_eq!(rows[2].period, "first_half");
        assert_eq!(rows[2].player_id.as_deref(), Some("10010"));

        let attributes: serde_json::Value = serde_json::from_str(&rows[2].attributes).unwrap();
        assert_eq!(attributes["is_goal"], true);
    }

    #[test]
    fn test_row_without_location() {
        let mut tables = fixtures::scenario_tables();
        tables.events[1].location = None;
        let row = EventRow::from_record(&tables.events[1]).unwrap();
        assert!(row.x.is_none() && row.in_bounds.is_none());
        assert_eq!(row.flags, "");
    }
}
