//! Traceline: phone activity and location correlation for collision cases.
//!
//! Traceline ingests phone timeline and GPS exports, resolves each event to
//! a location, classifies events into a forensic priority taxonomy, derives
//! speed and movement state, pairs app start/end markers into sessions, and
//! produces a machine-readable summary of phone usage around a collision.
//!
//! # Quick start
//!
//! ```no_run
//! use traceline::{analyze_case, AnalysisConfig};
//! use std::path::Path;
//!
//! let report = analyze_case(
//!     Path::new("timeline.csv"),
//!     Some(Path::new("locations.csv")),
//!     None,
//!     AnalysisConfig::default(),
//! )?;
//! println!("{} events, {} sessions", report.events.len(), report.sessions.len());
//! # Ok::<(), traceline::AnalysisError>(())
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod geo;
pub mod loader;
pub mod merge;
pub mod movement;
pub mod pipeline;
pub mod sessions;
pub mod summary;
pub mod timeparse;
pub mod types;
pub mod validate;

pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use loader::LoadReport;
pub use pipeline::{analyze_case, CaseAnalyzer, CaseReport, LoadSummary};
pub use summary::AnalysisSummary;
pub use types::{
    AppSession, CollisionRef, EnrichedEvent, Event, ForensicPriority, LocationFix,
    LocationSource, MergedEvent, MovementType, StreamSource, TimeAnnotation,
};

/// Crate version, stamped into summary metadata
pub const TRACELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name, stamped into summary metadata
pub const PRODUCER_NAME: &str = "traceline";
