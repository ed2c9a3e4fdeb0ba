// 📦 Batch Conversion
// Source documents -> CDF tables -> graph, for one match or many
//
// A failing match never stops the batch: its ConversionError is recorded
// under its match id and the next match is converted.

use crate::cdf::CdfTables;
use crate::config::PipelineConfig;
use crate::data_quality::{Diagnostics, Severity};
use crate::error::ConversionError;
use crate::graph::{GraphDocument, GraphSerializer};
use crate::mapper::SourceToCdfMapper;
use crate::source::SourceDocuments;
use crate::taxonomy::TaxonomyRegistry;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};

// ============================================================================
// ONE MATCH
// ============================================================================

/// Both stages' output for one match
#[derive(Debug, Clone)]
pub struct ConvertedMatch {
    pub tables: CdfTables,
    pub graph: GraphDocument,
    pub diagnostics: Diagnostics,
}

impl ConvertedMatch {
    pub fn match_id(&self) -> &str {
        self.tables.match_id()
    }

    /// SHA-256 of the compact graph document; equal inputs give equal digests
    pub fn digest(&self) -> String {
        graph_digest(&self.graph)
    }
}

/// Item delimiter; compact JSON never contains a raw newline
const DIGEST_DELIMITER: &[u8] = b"\n";

/// SHA-256 over the compact context and each node, one delimited item each
pub fn graph_digest(doc: &GraphDocument) -> String {
    let mut hasher = Sha256::new();
    hasher.update(doc.context.to_string());
    hasher.update(DIGEST_DELIMITER);
    for node in &doc.graph {
        hasher.update(node.to_string());
        hasher.update(DIGEST_DELIMITER);
    }
    format!("{:x}", hasher.finalize())
}

/// Map one match to CDF tables and serialize them to a graph
pub fn convert_match(
    docs: &SourceDocuments,
    config: &PipelineConfig,
    registry: &TaxonomyRegistry,
) -> Result<ConvertedMatch, ConversionError> {
    let mapped = SourceToCdfMapper::new(config, registry).convert(docs)?;
    let graph = GraphSerializer::new(config, registry.attributes()).serialize(&mapped.tables);

    Ok(ConvertedMatch {
        tables: mapped.tables,
        graph,
        diagnostics: mapped.diagnostics,
    })
}

// ============================================================================
// BATCH REPORT
// ============================================================================

/// Per-match outcome of a batch, keyed by match id
#[derive(Debug, Default)]
pub struct BatchReport {
    pub results: BTreeMap<String, Result<ConvertedMatch, ConversionError>>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, match_id: &str, result: Result<ConvertedMatch, ConversionError>) {
        if self.results.insert(match_id.to_string(), result).is_some() {
            warn!(match_id, "match converted twice in one batch, keeping the last result");
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &ConvertedMatch> {
        self.results.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &ConversionError)> {
        self.results
            .iter()
            .filter_map(|(id, r)| r.as_ref().err().map(|e| (id.as_str(), e)))
    }

    pub fn summary(&self) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for (match_id, result) in &self.results {
            summary.record(match_id, result);
        }
        summary
    }
}

// ============================================================================
// BATCH SUMMARY
// ============================================================================

/// Counts and digests of a batch, without the converted data.
///
/// Warnings (recoverable, per event or per match) are kept apart from
/// errors (match-fatal).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub converted: usize,
    pub failed: usize,
    pub warnings: usize,
    pub infos: usize,
    pub warnings_by_kind: BTreeMap<String, usize>,
    pub errors: BTreeMap<String, String>,
    pub digests: BTreeMap<String, String>,
}

impl BatchSummary {
    pub fn record(&mut self, match_id: &str, result: &Result<ConvertedMatch, ConversionError>) {
        match result {
            Ok(converted) => self.record_converted(match_id, &converted.diagnostics, Some(converted.digest())),
            Err(e) => self.record_failed(match_id, e),
        }
    }

    /// Count a converted match; `digest` is absent when no graph was built
    pub fn record_converted(&mut self, match_id: &str, diagnostics: &Diagnostics, digest: Option<String>) {
        self.total += 1;
        self.converted += 1;
        for warning in diagnostics.warnings() {
            match warning.severity {
                Severity::Warning => self.warnings += 1,
                Severity::Info => self.infos += 1,
            }
            *self
                .warnings_by_kind
                .entry(warning.kind.as_str().to_string())
                .or_insert(0) += 1;
        }
        if let Some(digest) = digest {
            self.digests.insert(match_id.to_string(), digest);
        }
    }

    pub fn record_failed(&mut self, match_id: &str, error: &ConversionError) {
        self.total += 1;
        self.failed += 1;
        self.errors.insert(match_id.to_string(), error.to_string());
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.warnings == 0
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} match(es): {} converted, {} failed, {} warning(s)",
            self.total, self.converted, self.failed, self.warnings
        )
    }
}

// ============================================================================
// DRIVERS
// ============================================================================

/// Convert matches one after another
pub fn convert_batch<I>(inputs: I, config: &PipelineConfig, registry: &TaxonomyRegistry) -> BatchReport
where
    I: IntoIterator<Item = SourceDocuments>,
{
    let mut report = BatchReport::new();
    for docs in inputs {
        let result = convert_match(&docs, config, registry);
        report.record(&docs.match_id, result);
    }
    info!(matches = report.len(), "batch finished");
    report
}

/// Convert matches on the rayon pool; same report as `convert_batch`
#[cfg(feature = "parallel")]
pub fn convert_batch_parallel(inputs: &[SourceDocuments], config: &PipelineConfig, registry: &TaxonomyRegistry) -> BatchReport {
    use rayon::prelude::*;

    let results: Vec<(String, Result<ConvertedMatch, ConversionError>)> = inputs
        .par_iter()
        .map(|docs| (docs.match_id.clone(), convert_match(docs, config, registry)))
        .collect();

    let mut report = BatchReport::new();
    for (match_id, result) in results {
        report.record(&match_id, result);
    }
    info!(matches = report.len(), "parallel batch finished");
    report
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_quality::WarningKind;
    use crate::fixtures;

    fn broken_match() -> SourceDocuments {
        let mut docs = fixtures::scenario_documents();
        docs.match_id = "3788742".to_string();
        docs.events.push(fixtures::event("stranger", 9, 1, "00:50:00.000", 17, "Pressure", fixtures::HOME_TEAM_ID, Some(424242)));
        docs
    }

    #[test]
    fn test_convert_match_runs_both_stages() {
        let config = PipelineConfig::default();
        let registry = TaxonomyRegistry::new();
        let converted = convert_match(&fixtures::scenario_documents(), &config, &registry).unwrap();

        assert_eq!(converted.match_id(), fixtures::MATCH_ID);
        assert_eq!(converted.tables.events.len(), 3);
        assert_eq!(converted.graph.nodes_of_type("Event").count(), 3);
        assert_eq!(converted.digest().len(), 64);
    }

    #[test]
    fn test_failed_match_does_not_stop_batch() {
        let config = PipelineConfig::default();
        let registry = TaxonomyRegistry::new();
        let report = convert_batch(vec![fixtures::scenario_documents(), broken_match()], &config, &registry);

        assert_eq!(report.len(), 2);
        assert_eq!(report.succeeded().count(), 1);
        let failed: Vec<&str> = report.failed().map(|(id, _)| id).collect();
        assert_eq!(failed, vec!["3788742"]);

        let summary = report.summary();
        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failed, 1);
        assert!(summary.errors["3788742"].contains("424242"));
        assert_eq!(summary.warnings_by_kind[WarningKind::ScoreMismatch.as_str()], 1);
        assert!(!summary.is_clean());
        assert_eq!(summary.to_string(), "2 match(es): 1 converted, 1 failed, 1 warning(s)");
    }

    #[test]
    fn test_digest_is_stable_across_runs() {
        let config = PipelineConfig::default();
        let registry = TaxonomyRegistry::new();
        let first = convert_batch(vec![fixtures::scenario_documents()], &config, &registry).summary();
        let second = convert_batch(vec![fixtures::scenario_documents()], &config, &registry).summary();
        assert_eq!(first.digests, second.digests);
    }

    #[test]
    fn test_digest_changes_with_precision() {
        let registry = TaxonomyRegistry::new();
        let docs = fixtures::scenario_documents();
        let coarse = convert_match(&docs, &PipelineConfig::default().with_decimal_places(1), &registry).unwrap();
        let fine = convert_match(&docs, &PipelineConfig::default(), &registry).unwrap();
        assert_ne!(coarse.digest(), fine.digest());
    }

    #[test]
    fn test_digest_separates_nodes() {
        let doc = |graph: Vec<serde_json::Value>| GraphDocument {
            context: serde_json::json!({}),
            graph,
        };
        let split = doc(vec![serde_json::json!(1), serde_json::json!(2)]);
        let joined = doc(vec![serde_json::json!(12)]);
        assert_ne!(graph_digest(&split), graph_digest(&joined));
        assert_eq!(graph_digest(&split), graph_digest(&doc(vec![serde_json::json!(1), serde_json::json!(2)])));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let config = PipelineConfig::default();
        let registry = TaxonomyRegistry::new();
        let inputs = vec![fixtures::scenario_documents(), broken_match()];

        let sequential = convert_batch(inputs.clone(), &config, &registry).summary();
        let parallel = convert_batch_parallel(&inputs, &config, &registry).summary();
        assert_eq!(sequential, parallel);
    }
}
