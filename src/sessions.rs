//! App usage session analysis
//!
//! Pairs start/end annotated events into bounded usage sessions, attaches
//! session metadata back onto the enriched stream, and flags sessions that
//! overlap with driving. Pairing is greedy first-match with no reservation
//! of end events; that mirrors the export's annotation semantics.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::types::{AppSession, EnrichedEvent, MergedEvent, TimeAnnotation};

/// A session whose average speed exceeded the driving threshold
#[derive(Debug, Clone, Serialize)]
pub struct DrivingSession {
    pub session: AppSession,
    pub avg_speed_mph: f64,
}

/// Per-app session statistics
#[derive(Debug, Clone, Serialize)]
pub struct AppSessionStats {
    pub app_name: String,
    pub count: usize,
    pub total_duration_seconds: f64,
    pub mean_duration_seconds: f64,
}

/// Aggregate session statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub total_sessions: usize,
    pub apps_used: usize,
    pub total_duration_seconds: f64,
    pub average_session_duration: f64,
    pub longest_session: Option<AppSessionStatsRef>,
    /// Start events that found no matching end within the lookahead
    pub unpaired_starts: usize,
    pub by_app: Vec<AppSessionStats>,
}

/// Reference to the longest session for the summary
#[derive(Debug, Clone, Serialize)]
pub struct AppSessionStatsRef {
    pub app_name: String,
    pub duration_seconds: f64,
}

/// Pair start/end annotated events into sessions.
///
/// For each start event (in time order) the chronologically first end
/// event for the same app strictly after the start and within the
/// configured lookahead closes the session. End events are not consumed:
/// one end can close several overlapping starts. Starts without a
/// qualifying end produce no session.
pub fn pair_sessions(merged: &[MergedEvent], config: &AnalysisConfig) -> (Vec<AppSession>, usize) {
    let lookahead = Duration::minutes(config.session_lookahead_minutes);

    let starts: Vec<&MergedEvent> = merged
        .iter()
        .filter(|m| m.event.time_annotation == Some(TimeAnnotation::Start))
        .collect();
    let ends: Vec<&MergedEvent> = merged
        .iter()
        .filter(|m| m.event.time_annotation == Some(TimeAnnotation::End))
        .collect();

    let mut sessions = Vec::new();
    let mut unpaired = 0;

    for start in starts {
        let matching_end = ends.iter().find(|end| {
            end.event.app_name == start.event.app_name
                && end.event.timestamp > start.event.timestamp
                && end.event.timestamp <= start.event.timestamp + lookahead
        });

        match matching_end {
            Some(end) => {
                let duration =
                    (end.event.timestamp - start.event.timestamp).num_milliseconds() as f64
                        / 1000.0;
                sessions.push(AppSession {
                    app_name: start.event.app_name.clone(),
                    start_time: start.event.timestamp,
                    end_time: end.event.timestamp,
                    duration_seconds: duration,
                    start_lat: start.latitude,
                    start_lon: start.longitude,
                    end_lat: end.latitude,
                    end_lon: end.longitude,
                    event_type: start.event.event_type.clone(),
                    details: start.event.details.clone(),
                });
            }
            None => unpaired += 1,
        }
    }

    (sessions, unpaired)
}

/// Attach session duration and id onto the start and end events of each
/// session in the enriched stream
pub fn attach_sessions(enriched: &mut [EnrichedEvent], sessions: &[AppSession]) {
    for (session_id, session) in sessions.iter().enumerate() {
        for event in enriched.iter_mut() {
            let matches_app = event.merged.event.app_name == session.app_name;
            let at_boundary = event.merged.event.timestamp == session.start_time
                || event.merged.event.timestamp == session.end_time;

            if matches_app && at_boundary {
                event.app_session_duration = Some(session.duration_seconds);
                event.session_id = Some(session_id);
            }
        }
    }
}

/// Sessions whose average event speed inside the window exceeds the
/// driving threshold
pub fn sessions_while_driving(
    sessions: &[AppSession],
    enriched: &[EnrichedEvent],
    config: &AnalysisConfig,
) -> Vec<DrivingSession> {
    sessions
        .iter()
        .filter_map(|session| {
            let speeds: Vec<f64> = enriched
                .iter()
                .filter(|e| {
                    e.merged.event.app_name == session.app_name
                        && e.merged.event.timestamp >= session.start_time
                        && e.merged.event.timestamp <= session.end_time
                })
                .map(|e| e.speed_mph)
                .collect();

            if speeds.is_empty() {
                return None;
            }

            let avg = speeds.iter().sum::<f64>() / speeds.len() as f64;
            (avg > config.driving_threshold).then(|| DrivingSession {
                session: session.clone(),
                avg_speed_mph: avg,
            })
        })
        .collect()
}

/// Sessions that started within the critical window before the collision
pub fn critical_sessions(
    sessions: &[AppSession],
    collision_time: DateTime<Utc>,
    window_minutes: i64,
) -> Vec<AppSession> {
    let window_start = collision_time - Duration::minutes(window_minutes);
    sessions
        .iter()
        .filter(|s| s.start_time >= window_start && s.start_time <= collision_time)
        .cloned()
        .collect()
}

/// Aggregate statistics over the session table
pub fn summarize_sessions(sessions: &[AppSession], unpaired_starts: usize) -> SessionSummary {
    if sessions.is_empty() {
        return SessionSummary {
            unpaired_starts,
            ..SessionSummary::default()
        };
    }

    let total_duration: f64 = sessions.iter().map(|s| s.duration_seconds).sum();

    let mut per_app: BTreeMap<&str, (usize, f64)> = BTreeMap::new();
    for session in sessions {
        let entry = per_app.entry(session.app_name.as_str()).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += session.duration_seconds;
    }

    let by_app: Vec<AppSessionStats> = per_app
        .iter()
        .map(|(app, (count, total))| AppSessionStats {
            app_name: (*app).to_string(),
            count: *count,
            total_duration_seconds: *total,
            mean_duration_seconds: total / *count as f64,
        })
        .collect();

    let longest = sessions
        .iter()
        .max_by(|a, b| {
            a.duration_seconds
                .partial_cmp(&b.duration_seconds)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|s| AppSessionStatsRef {
            app_name: s.app_name.clone(),
            duration_seconds: s.duration_seconds,
        });

    SessionSummary {
        total_sessions: sessions.len(),
        apps_used: per_app.len(),
        total_duration_seconds: total_duration,
        average_session_duration: total_duration / sessions.len() as f64,
        longest_session: longest,
        unpaired_starts,
        by_app,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Event, ForensicPriority, LocationSource, MovementType, StreamSource};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn annotated(secs: i64, app: &str, annotation: Option<TimeAnnotation>) -> MergedEvent {
        MergedEvent {
            event: Event {
                timestamp: ts(secs),
                time_annotation: annotation,
                event_type: "Application Usage".to_string(),
                direction: String::new(),
                details: format!("{app} event"),
                contact: None,
                app_name: app.to_string(),
                latitude: None,
                longitude: None,
                source: StreamSource::Timeline,
            },
            location_source: LocationSource::NoLocation,
            latitude: None,
            longitude: None,
            accuracy: None,
        }
    }

    fn enriched(merged: MergedEvent, speed: f64) -> EnrichedEvent {
        EnrichedEvent {
            merged,
            forensic_priority: ForensicPriority::Default,
            speed_mph: speed,
            movement_type: MovementType::Stationary,
            app_session_duration: None,
            session_id: None,
            time_to_collision: None,
        }
    }

    #[test]
    fn test_pair_start_end_five_minutes() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(300, "Instagram", Some(TimeAnnotation::End)),
        ];

        let (sessions, unpaired) = pair_sessions(&merged, &config);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_seconds, 300.0);
        assert_eq!(unpaired, 0);
    }

    #[test]
    fn test_start_without_end_yields_no_session() {
        let config = AnalysisConfig::default();
        let merged = vec![annotated(0, "Instagram", Some(TimeAnnotation::Start))];

        let (sessions, unpaired) = pair_sessions(&merged, &config);
        assert!(sessions.is_empty());
        assert_eq!(unpaired, 1);
    }

    #[test]
    fn test_end_beyond_lookahead_does_not_pair() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(3601, "Instagram", Some(TimeAnnotation::End)),
        ];

        let (sessions, unpaired) = pair_sessions(&merged, &config);
        assert!(sessions.is_empty());
        assert_eq!(unpaired, 1);
    }

    #[test]
    fn test_end_for_other_app_does_not_pair() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(60, "Snapchat", Some(TimeAnnotation::End)),
        ];

        let (sessions, _) = pair_sessions(&merged, &config);
        assert!(sessions.is_empty());
    }

    #[test]
    fn test_earliest_qualifying_end_wins() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(120, "Instagram", Some(TimeAnnotation::End)),
            annotated(600, "Instagram", Some(TimeAnnotation::End)),
        ];

        let (sessions, _) = pair_sessions(&merged, &config);
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_seconds, 120.0);
    }

    #[test]
    fn test_ends_are_not_reserved() {
        // Greedy unreserved matching: two starts can close on the same end
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(30, "Instagram", Some(TimeAnnotation::Start)),
            annotated(120, "Instagram", Some(TimeAnnotation::End)),
        ];

        let (sessions, _) = pair_sessions(&merged, &config);
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].duration_seconds, 120.0);
        assert_eq!(sessions[1].duration_seconds, 90.0);
    }

    #[test]
    fn test_attach_sessions_marks_boundaries() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(60, "Snapchat", None),
            annotated(300, "Instagram", Some(TimeAnnotation::End)),
        ];
        let (sessions, _) = pair_sessions(&merged, &config);

        let mut events: Vec<EnrichedEvent> =
            merged.into_iter().map(|m| enriched(m, 0.0)).collect();
        attach_sessions(&mut events, &sessions);

        assert_eq!(events[0].session_id, Some(0));
        assert_eq!(events[0].app_session_duration, Some(300.0));
        assert_eq!(events[1].session_id, None);
        assert_eq!(events[2].session_id, Some(0));
    }

    #[test]
    fn test_sessions_while_driving() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(300, "Instagram", Some(TimeAnnotation::End)),
        ];
        let (sessions, _) = pair_sessions(&merged, &config);

        let events: Vec<EnrichedEvent> = merged
            .iter()
            .cloned()
            .map(|m| enriched(m, 20.0))
            .collect();

        let driving = sessions_while_driving(&sessions, &events, &config);
        assert_eq!(driving.len(), 1);
        assert_eq!(driving[0].avg_speed_mph, 20.0);
    }

    #[test]
    fn test_stationary_session_not_flagged() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(300, "Instagram", Some(TimeAnnotation::End)),
        ];
        let (sessions, _) = pair_sessions(&merged, &config);

        let events: Vec<EnrichedEvent> =
            merged.iter().cloned().map(|m| enriched(m, 1.0)).collect();

        let driving = sessions_while_driving(&sessions, &events, &config);
        assert!(driving.is_empty());
    }

    #[test]
    fn test_critical_sessions_window() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(60, "Instagram", Some(TimeAnnotation::End)),
            annotated(2000, "Snapchat", Some(TimeAnnotation::Start)),
            annotated(2060, "Snapchat", Some(TimeAnnotation::End)),
        ];
        let (sessions, _) = pair_sessions(&merged, &config);
        assert_eq!(sessions.len(), 2);

        // Collision at t=2100; 10-minute window reaches back to t=1500
        let critical = critical_sessions(&sessions, ts(2100), 10);
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].app_name, "Snapchat");
    }

    #[test]
    fn test_summarize_sessions() {
        let config = AnalysisConfig::default();
        let merged = vec![
            annotated(0, "Instagram", Some(TimeAnnotation::Start)),
            annotated(100, "Instagram", Some(TimeAnnotation::End)),
            annotated(200, "Snapchat", Some(TimeAnnotation::Start)),
            annotated(500, "Snapchat", Some(TimeAnnotation::End)),
        ];
        let (sessions, unpaired) = pair_sessions(&merged, &config);

        let summary = summarize_sessions(&sessions, unpaired);
        assert_eq!(summary.total_sessions, 2);
        assert_eq!(summary.apps_used, 2);
        assert_eq!(summary.total_duration_seconds, 400.0);
        assert_eq!(summary.average_session_duration, 200.0);
        assert_eq!(summary.longest_session.as_ref().unwrap().app_name, "Snapchat");
        assert_eq!(summary.unpaired_starts, 0);
    }
}
