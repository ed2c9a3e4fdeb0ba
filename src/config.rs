// ⚙️ Pipeline Configuration
// Pitch geometry, output precision and vocabulary settings shared by both stages

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Core vocabulary namespace of the football-cdf ontology
pub const DEFAULT_VOCAB_NS: &str = "https://w3id.org/football-cdf/core#";

/// Base IRI that relative node identifiers ("player/5503") resolve against
pub const DEFAULT_DATA_BASE: &str = "https://w3id.org/football-cdf/data/";

// ============================================================================
// PITCH DIMENSIONS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchDimensions {
    /// Goal line to goal line
    pub length: f64,
    /// Touchline to touchline
    pub width: f64,
}

impl PitchDimensions {
    pub fn new(length: f64, width: f64) -> Self {
        PitchDimensions { length, width }
    }

    /// StatsBomb grid: 120 x 80 units, origin top-left
    pub fn statsbomb() -> Self {
        PitchDimensions::new(120.0, 80.0)
    }

    /// CDF reference pitch in metres
    pub fn cdf_reference() -> Self {
        PitchDimensions::new(105.0, 68.0)
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

/// Settings for the Source-to-CDF mapper and the graph serializer.
///
/// Every field has a default, so a config file only needs the keys it overrides:
/// ```json
/// { "decimal_places": 2, "kickoff_utc_offset_minutes": 120 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pitch grid the source coordinates are expressed in
    pub source_pitch: PitchDimensions,

    /// Pitch the CDF coordinates are scaled to
    pub reference_pitch: PitchDimensions,

    /// How far (in source units) a point may overshoot before it is flagged
    pub bounds_tolerance: f64,

    /// Emit records for Starting XI / Half Start / Half End instead of skipping them
    pub keep_administrative_events: bool,

    /// Fixed-point precision for decimal literals in the graph
    pub decimal_places: usize,

    /// Ontology namespace used as `@vocab`
    pub vocab_namespace: String,

    /// `@base` for node identifiers
    pub data_base: String,

    /// Vendor recorded in sheet/meta version blocks
    pub vendor: String,

    pub cdf_version: String,

    /// Offset of the source kickoff clock from UTC (StatsBomb kickoffs are local time)
    pub kickoff_utc_offset_minutes: i32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            source_pitch: PitchDimensions::statsbomb(),
            reference_pitch: PitchDimensions::cdf_reference(),
            bounds_tolerance: 0.5,
            keep_administrative_events: false,
            decimal_places: 3,
            vocab_namespace: DEFAULT_VOCAB_NS.to_string(),
            data_base: DEFAULT_DATA_BASE.to_string(),
            vendor: "StatsBomb".to_string(),
            cdf_version: "1.0".to_string(),
            kickoff_utc_offset_minutes: 0,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: override the bounds tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.bounds_tolerance = tolerance;
        self
    }

    /// Builder: override decimal precision of graph literals
    pub fn with_decimal_places(mut self, places: usize) -> Self {
        self.decimal_places = places;
        self
    }

    /// Builder: keep administrative marker events in the event log
    pub fn with_administrative_events(mut self, keep: bool) -> Self {
        self.keep_administrative_events = keep;
        self
    }

    /// Builder: kickoff clock offset from UTC
    pub fn with_kickoff_offset(mut self, minutes: i32) -> Self {
        self.kickoff_utc_offset_minutes = minutes;
        self
    }

    /// Parse a config from JSON text
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig =
            serde_json::from_str(json).context("Failed to parse pipeline config JSON")?;
        config.check()?;
        Ok(config)
    }

    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    fn check(&self) -> Result<()> {
        for (label, pitch) in [("source_pitch", self.source_pitch), ("reference_pitch", self.reference_pitch)] {
            if pitch.length <= 0.0 || pitch.width <= 0.0 {
                anyhow::bail!("{} must have positive length and width", label);
            }
        }
        if self.bounds_tolerance < 0.0 {
            anyhow::bail!("bounds_tolerance must not be negative");
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pitches() {
        let config = PipelineConfig::default();
        assert_eq!(config.source_pitch, PitchDimensions::new(120.0, 80.0));
        assert_eq!(config.reference_pitch, PitchDimensions::new(105.0, 68.0));
        assert_eq!(config.vendor, "StatsBomb");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(r#"{ "decimal_places": 2 }"#).unwrap();
        assert_eq!(config.decimal_places, 2);
        assert_eq!(config.bounds_tolerance, 0.5);
        assert_eq!(config.vocab_namespace, DEFAULT_VOCAB_NS);
    }

    #[test]
    fn test_rejects_degenerate_pitch() {
        let result = PipelineConfig::from_json_str(
            r#"{ "source_pitch": { "length": 0.0, "width": 80.0 } }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::new()
            .with_tolerance(1.0)
            .with_decimal_places(5)
            .with_administrative_events(true)
            .with_kickoff_offset(60);

        assert_eq!(config.bounds_tolerance, 1.0);
        assert_eq!(config.decimal_places, 5);
        assert!(config.keep_administrative_events);
        assert_eq!(config.kickoff_utc_offset_minutes, 60);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        fs::write(&path, r#"{ "kickoff_utc_offset_minutes": 120 }"#).unwrap();

        let config = PipelineConfig::load(&path).unwrap();
        assert_eq!(config.kickoff_utc_offset_minutes, 120);
    }
}
