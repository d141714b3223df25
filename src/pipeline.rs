//! Pipeline orchestration
//!
//! This module provides the public API for Traceline. It sequences the
//! loaders, merger, classifier, movement analyzer, and session analyzer,
//! and hands the finished tables to external reporting collaborators.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Serialize;
use std::path::Path;

use crate::classify::classify_event;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::loader::{load_locations, load_timeline, LoadReport};
use crate::merge::merge_events;
use crate::movement::{MovementAnalyzer, TrackPoint};
use crate::sessions::{
    attach_sessions, critical_sessions, pair_sessions, sessions_while_driving, summarize_sessions,
    DrivingSession,
};
use crate::summary::{generate_summary, AnalysisSummary};
use crate::types::{
    AppSession, CollisionRef, EnrichedEvent, Event, LocationFix, MergedEvent,
};

/// Collision time format accepted by [`CaseAnalyzer::set_collision`]
const COLLISION_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Outcome of a data load, surfaced to the caller as data
#[derive(Debug, Clone, Serialize)]
pub struct LoadSummary {
    pub timeline: LoadReport,
    pub location: Option<LoadReport>,
    /// True when the location export failed to load and the run degraded
    /// to timeline-only analysis
    pub location_degraded: bool,
    pub merged_events: usize,
}

/// Final output of an analysis run, consumed by external report and
/// visualization collaborators
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub events: Vec<EnrichedEvent>,
    pub sessions: Vec<AppSession>,
    pub sessions_while_driving: Vec<DrivingSession>,
    /// Speed track, truncated to the configured path-point ceiling
    pub track: Vec<TrackPoint>,
    pub summary: AnalysisSummary,
}

/// Stateful analyzer for one case.
///
/// Load data once, optionally set a collision reference, then run the
/// analysis. The whole pipeline is synchronous and in-memory; one analyzer
/// processes one case at a time.
pub struct CaseAnalyzer {
    config: AnalysisConfig,
    collision: Option<CollisionRef>,
    merged: Option<Vec<MergedEvent>>,
}

impl Default for CaseAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl CaseAnalyzer {
    /// Create an analyzer with default thresholds
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    /// Create an analyzer with explicit configuration
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            config,
            collision: None,
            merged: None,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Set the collision reference from a `YYYY-MM-DD HH:MM:SS` string.
    /// Must be called before [`analyze`](Self::analyze).
    pub fn set_collision(
        &mut self,
        time: &str,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<(), AnalysisError> {
        let naive = NaiveDateTime::parse_from_str(time.trim(), COLLISION_TIME_FORMAT)
            .map_err(|e| AnalysisError::InvalidCollisionTime(format!("{time:?}: {e}")))?;

        self.collision = Some(CollisionRef {
            time: Utc.from_utc_datetime(&naive),
            latitude,
            longitude,
        });
        Ok(())
    }

    pub fn set_collision_ref(&mut self, collision: CollisionRef) {
        self.collision = Some(collision);
    }

    pub fn collision(&self) -> Option<&CollisionRef> {
        self.collision.as_ref()
    }

    /// Load the timeline export and, optionally, the location export.
    ///
    /// Timeline failure is fatal. Location failure degrades the run to
    /// timeline-only analysis and is reported, not raised.
    pub fn load(
        &mut self,
        timeline_path: &Path,
        location_path: Option<&Path>,
    ) -> Result<LoadSummary, AnalysisError> {
        let (events, timeline_report) = load_timeline(timeline_path, &self.config)?;

        let mut location_report = None;
        let mut degraded = false;
        let fixes = match location_path {
            Some(path) => match load_locations(path, &self.config) {
                Ok((fixes, report)) => {
                    location_report = Some(report);
                    Some(fixes)
                }
                Err(_) => {
                    degraded = true;
                    None
                }
            },
            None => None,
        };

        let merged = merge_events(
            &events,
            fixes.as_deref(),
            Duration::minutes(self.config.location_match_tolerance_minutes),
        );
        let merged_count = merged.len();
        self.merged = Some(merged);

        Ok(LoadSummary {
            timeline: timeline_report,
            location: location_report,
            location_degraded: degraded,
            merged_events: merged_count,
        })
    }

    /// Load from already-standardized streams (used by tests and embedders)
    pub fn load_from_parts(&mut self, events: Vec<Event>, fixes: Option<Vec<LocationFix>>) {
        let merged = merge_events(
            &events,
            fixes.as_deref(),
            Duration::minutes(self.config.location_match_tolerance_minutes),
        );
        self.merged = Some(merged);
    }

    /// Run the full enrichment pipeline over the loaded data
    pub fn analyze(&self) -> Result<CaseReport, AnalysisError> {
        let merged = self.merged.as_ref().ok_or(AnalysisError::NoData)?;

        // Narrow to the critical timeframe when a collision is set
        let working: Vec<MergedEvent> = match &self.collision {
            Some(collision) => filter_critical_timeframe(
                merged,
                collision.time,
                self.config.analysis_window_before_minutes,
                self.config.analysis_window_after_minutes,
            ),
            None => merged.clone(),
        };

        let movement = MovementAnalyzer::new(&self.config).analyze(&working);
        let (sessions, unpaired_starts) = pair_sessions(&working, &self.config);

        let mut enriched: Vec<EnrichedEvent> = working
            .into_iter()
            .zip(movement.per_event.iter())
            .map(|(m, &(speed_mph, movement_type))| {
                let forensic_priority = classify_event(
                    &m.event.event_type,
                    &m.event.details,
                    &m.event.direction,
                    &m.event.app_name,
                );
                let time_to_collision = self.collision.as_ref().map(|c| {
                    (c.time - m.event.timestamp).num_milliseconds() as f64 / 1000.0
                });

                EnrichedEvent {
                    merged: m,
                    forensic_priority,
                    speed_mph,
                    movement_type,
                    app_session_duration: None,
                    session_id: None,
                    time_to_collision,
                }
            })
            .collect();

        attach_sessions(&mut enriched, &sessions);

        let driving_sessions = sessions_while_driving(&sessions, &enriched, &self.config);
        let critical = match &self.collision {
            Some(collision) => critical_sessions(
                &sessions,
                collision.time,
                self.config.critical_window_minutes,
            ),
            None => Vec::new(),
        };

        let session_summary = summarize_sessions(&sessions, unpaired_starts);
        let summary = generate_summary(
            &enriched,
            movement.summary.clone(),
            session_summary,
            driving_sessions.clone(),
            critical.clone(),
            self.collision.as_ref(),
            &self.config,
        );

        let mut track = movement.track;
        track.truncate(self.config.max_location_points_for_path);

        Ok(CaseReport {
            events: enriched,
            sessions,
            sessions_while_driving: driving_sessions,
            track,
            summary,
        })
    }
}

/// One-shot convenience wrapper: load both exports, run the analysis
pub fn analyze_case(
    timeline_path: &Path,
    location_path: Option<&Path>,
    collision: Option<CollisionRef>,
    config: AnalysisConfig,
) -> Result<CaseReport, AnalysisError> {
    let mut analyzer = CaseAnalyzer::with_config(config);
    if let Some(collision) = collision {
        analyzer.set_collision_ref(collision);
    }
    analyzer.load(timeline_path, location_path)?;
    analyzer.analyze()
}

fn filter_critical_timeframe(
    merged: &[MergedEvent],
    collision_time: DateTime<Utc>,
    minutes_before: i64,
    minutes_after: i64,
) -> Vec<MergedEvent> {
    let start = collision_time - Duration::minutes(minutes_before);
    let end = collision_time + Duration::minutes(minutes_after);

    merged
        .iter()
        .filter(|m| m.event.timestamp >= start && m.event.timestamp <= end)
        .cloned()
        .collect()
}
