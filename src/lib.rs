// Football CDF - Core Library
// StatsBomb open data -> CDF tables (match sheet, event log, match meta) -> CDF-LD graph
//
// Exposes all modules for use in the CLI, batch drivers and tests

pub mod config;         // Pipeline configuration
pub mod error;          // Match-fatal errors
pub mod source;         // StatsBomb source documents
pub mod identity;       // Identifier Resolver
pub mod entities;       // Teams, players, per-match roster
pub mod coordinates;    // Coordinate Normalizer
pub mod temporal;       // Periods and the monotonic match timeline
pub mod cdf;            // CDF table model
pub mod attributes;     // Semantic Layer - CDF attribute registry
pub mod taxonomy;       // Event Taxonomy Mapper
pub mod data_quality;   // Recoverable conversion warnings
pub mod reconciliation; // Goal events vs published score
pub mod schema;         // Shape Layer - table integrity
pub mod mapper;         // Source-to-CDF Mapper
pub mod vocab;          // CDF-LD vocabulary and @context
pub mod graph;          // CDF-to-Graph Serializer
pub mod batch;          // One match or many, both stages
pub mod export;         // Flat CSV event log
pub mod io;             // File layout in and out

#[cfg(test)]
mod fixtures;

// Re-export commonly used types
pub use config::{PipelineConfig, PitchDimensions};
pub use error::{ConversionError, MissingReferenceError};
pub use source::{LineupTeam, MatchSummary, SourceDocuments, SourceEvent};
pub use identity::{EntityId, EntityKind, IdResolver};
pub use entities::{Player, Roster, Side, Team};
pub use coordinates::{CoordinateNormalizer, NormalizedPoint};
pub use temporal::{Period, PeriodTimeline};
pub use cdf::{
    AttributeValue, CdfEventType, CdfTables, EventFlag, EventRecord,
    MatchMeta, MatchSheet, Score,
};
pub use attributes::{AttributeDefinition, AttributeRegistry, AttributeType};
pub use taxonomy::{EventHandler, MappingContext, RecordDraft, TaxonomyRegistry};
pub use data_quality::{ConversionWarning, Diagnostics, Severity, WarningKind};
pub use reconciliation::{ReconciliationEngine, ReconciliationResult};
pub use schema::{SchemaValidator, ValidationError, ValidationResult};
pub use mapper::{MappedMatch, SourceToCdfMapper};
pub use graph::{GraphDocument, GraphSerializer};
pub use batch::{convert_batch, convert_match, BatchReport, BatchSummary, ConvertedMatch};

#[cfg(feature = "parallel")]
pub use batch::convert_batch_parallel;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
