//! Analysis summary generation
//!
//! Builds the serializable summary payload handed to external report and
//! visualization consumers: run metadata, key findings, priority and app
//! distributions, and the movement/session aggregates.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::movement::MovementSummary;
use crate::sessions::{DrivingSession, SessionSummary};
use crate::types::{AppSession, CollisionRef, EnrichedEvent};
use crate::{PRODUCER_NAME, TRACELINE_VERSION};

/// Critical window for collision-relative counts (seconds)
const CRITICAL_WINDOW_SECONDS: f64 = 120.0;

/// Time span covered by the analyzed events
#[derive(Debug, Clone, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_hours: f64,
}

/// Run metadata
#[derive(Debug, Clone, Serialize)]
pub struct SummaryMetadata {
    pub producer: String,
    pub version: String,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub total_events: usize,
    pub collision_time: Option<DateTime<Utc>>,
    pub time_range: Option<TimeRange>,
    /// Share of events with resolved coordinates, 0-1
    pub location_coverage: f64,
}

/// Headline numbers for the executive summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct KeyFindings {
    pub total_events: usize,
    pub high_priority_events: usize,
    /// High-priority events above the driving threshold
    pub phone_while_driving: usize,
    /// High-priority events within the critical pre-collision window
    pub critical_events: usize,
    pub max_speed_mph: f64,
    pub average_speed_mph: f64,
    pub apps_used: usize,
}

/// Complete analysis summary payload
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub metadata: SummaryMetadata,
    pub key_findings: KeyFindings,
    pub priority_distribution: BTreeMap<String, usize>,
    pub app_usage: BTreeMap<String, usize>,
    pub movement: MovementSummary,
    pub sessions: SessionSummary,
    pub sessions_while_driving: Vec<DrivingSession>,
    pub critical_sessions: Vec<AppSession>,
}

/// Build the summary payload over a finished enrichment pass
#[allow(clippy::too_many_arguments)]
pub fn generate_summary(
    enriched: &[EnrichedEvent],
    movement: MovementSummary,
    session_summary: SessionSummary,
    driving_sessions: Vec<DrivingSession>,
    critical: Vec<AppSession>,
    collision: Option<&CollisionRef>,
    config: &AnalysisConfig,
) -> AnalysisSummary {
    AnalysisSummary {
        metadata: build_metadata(enriched, collision),
        key_findings: build_key_findings(enriched, &movement, config),
        priority_distribution: priority_distribution(enriched),
        app_usage: app_usage(enriched),
        movement,
        sessions: session_summary,
        sessions_while_driving: driving_sessions,
        critical_sessions: critical,
    }
}

fn build_metadata(enriched: &[EnrichedEvent], collision: Option<&CollisionRef>) -> SummaryMetadata {
    let time_range = match (
        enriched.iter().map(|e| e.merged.event.timestamp).min(),
        enriched.iter().map(|e| e.merged.event.timestamp).max(),
    ) {
        (Some(start), Some(end)) => Some(TimeRange {
            start,
            end,
            duration_hours: (end - start).num_seconds() as f64 / 3600.0,
        }),
        _ => None,
    };

    let with_location = enriched.iter().filter(|e| e.merged.has_coordinates()).count();
    let coverage = if enriched.is_empty() {
        0.0
    } else {
        with_location as f64 / enriched.len() as f64
    };

    SummaryMetadata {
        producer: PRODUCER_NAME.to_string(),
        version: TRACELINE_VERSION.to_string(),
        run_id: Uuid::new_v4().to_string(),
        generated_at: Utc::now(),
        total_events: enriched.len(),
        collision_time: collision.map(|c| c.time),
        time_range,
        location_coverage: coverage,
    }
}

fn build_key_findings(
    enriched: &[EnrichedEvent],
    movement: &MovementSummary,
    config: &AnalysisConfig,
) -> KeyFindings {
    let high_priority = enriched
        .iter()
        .filter(|e| e.forensic_priority.is_high_priority())
        .count();

    let phone_while_driving = enriched
        .iter()
        .filter(|e| e.forensic_priority.is_high_priority() && e.speed_mph > config.driving_threshold)
        .count();

    let critical_events = enriched
        .iter()
        .filter(|e| {
            e.forensic_priority.is_high_priority()
                && e.time_to_collision
                    .is_some_and(|t| (0.0..=CRITICAL_WINDOW_SECONDS).contains(&t))
        })
        .count();

    let apps: std::collections::HashSet<&str> = enriched
        .iter()
        .map(|e| e.merged.event.app_name.as_str())
        .collect();

    KeyFindings {
        total_events: enriched.len(),
        high_priority_events: high_priority,
        phone_while_driving,
        critical_events,
        max_speed_mph: movement.max_speed_mph,
        average_speed_mph: movement.average_speed_mph,
        apps_used: apps.len(),
    }
}

fn priority_distribution(enriched: &[EnrichedEvent]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in enriched {
        *counts
            .entry(event.forensic_priority.as_str().to_string())
            .or_insert(0) += 1;
    }
    counts
}

fn app_usage(enriched: &[EnrichedEvent]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for event in enriched {
        *counts
            .entry(event.merged.event.app_name.clone())
            .or_insert(0) += 1;
    }
    counts
}
