//! Event/location merging
//!
//! Attaches the best-available location to every timeline event: the
//! event's own coordinates win outright, otherwise the nearest fix in time
//! within tolerance, otherwise no location. The fix slice must be sorted
//! ascending by timestamp (the loader guarantees this).

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

use crate::types::{Event, LocationFix, LocationSource, MergedEvent};

/// Merge timeline events with the location fix stream.
///
/// When `locations` is None the whole run degrades to timeline-only and no
/// nearest-fix search is performed. The merged stream is deduplicated by
/// (timestamp, event_type, details), keeping the first occurrence.
pub fn merge_events(
    events: &[Event],
    locations: Option<&[LocationFix]>,
    tolerance: Duration,
) -> Vec<MergedEvent> {
    let merged: Vec<MergedEvent> = events
        .iter()
        .map(|event| resolve_location(event, locations, tolerance))
        .collect();

    dedup_merged(merged)
}

fn resolve_location(
    event: &Event,
    locations: Option<&[LocationFix]>,
    tolerance: Duration,
) -> MergedEvent {
    let Some(fixes) = locations else {
        return MergedEvent {
            event: event.clone(),
            location_source: LocationSource::TimelineOnly,
            latitude: event.latitude,
            longitude: event.longitude,
            accuracy: None,
        };
    };

    // The event's own coordinates always win; no search is performed
    if event.has_coordinates() {
        return MergedEvent {
            event: event.clone(),
            location_source: LocationSource::TimelineData,
            latitude: event.latitude,
            longitude: event.longitude,
            accuracy: None,
        };
    }

    match nearest_fix(fixes, event.timestamp) {
        Some((fix, diff)) if diff <= tolerance => MergedEvent {
            event: event.clone(),
            location_source: LocationSource::LocationTracking,
            latitude: Some(fix.latitude),
            longitude: Some(fix.longitude),
            accuracy: fix.accuracy,
        },
        _ => MergedEvent {
            event: event.clone(),
            location_source: LocationSource::NoLocation,
            latitude: None,
            longitude: None,
            accuracy: None,
        },
    }
}

/// Find the fix with minimum absolute time difference to `t` by binary
/// search over the sorted slice. On a tie the earlier fix wins (first
/// occurrence of the minimum in input order).
pub(crate) fn nearest_fix(
    fixes: &[LocationFix],
    t: DateTime<Utc>,
) -> Option<(&LocationFix, Duration)> {
    if fixes.is_empty() {
        return None;
    }

    let idx = fixes.partition_point(|f| f.timestamp < t);

    let mut best: Option<(usize, Duration)> = None;
    for cand in [idx.checked_sub(1), (idx < fixes.len()).then_some(idx)]
        .into_iter()
        .flatten()
    {
        let diff = abs_duration(t - fixes[cand].timestamp);
        // Strict comparison keeps the earlier candidate on ties
        if best.map_or(true, |(_, best_diff)| diff < best_diff) {
            best = Some((cand, diff));
        }
    }

    best.map(|(i, diff)| (&fixes[i], diff))
}

fn abs_duration(d: Duration) -> Duration {
    if d < Duration::zero() {
        -d
    } else {
        d
    }
}

fn dedup_merged(merged: Vec<MergedEvent>) -> Vec<MergedEvent> {
    let mut seen: HashSet<(i64, String, String)> = HashSet::new();
    merged
        .into_iter()
        .filter(|m| {
            seen.insert((
                m.event.timestamp.timestamp_millis(),
                m.event.event_type.clone(),
                m.event.details.clone(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamSource;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn event(secs: i64, event_type: &str, lat: Option<f64>, lon: Option<f64>) -> Event {
        Event {
            timestamp: ts(secs),
            time_annotation: None,
            event_type: event_type.to_string(),
            direction: String::new(),
            details: format!("{event_type} at {secs}"),
            contact: None,
            app_name: "Unknown".to_string(),
            latitude: lat,
            longitude: lon,
            source: StreamSource::Timeline,
        }
    }

    fn fix(secs: i64, lat: f64, lon: f64) -> LocationFix {
        LocationFix {
            timestamp: ts(secs),
            latitude: lat,
            longitude: lon,
            accuracy: Some(30.0),
            address: None,
            source: StreamSource::LocationTracking,
        }
    }

    #[test]
    fn test_own_coordinates_kept_verbatim() {
        let events = vec![event(0, "Call Log", Some(40.5), Some(-74.5))];
        let fixes = vec![fix(0, 41.0, -75.0)];

        let merged = merge_events(&events, Some(&fixes), Duration::minutes(5));
        assert_eq!(merged[0].location_source, LocationSource::TimelineData);
        assert_eq!(merged[0].latitude, Some(40.5));
        assert_eq!(merged[0].longitude, Some(-74.5));
        assert_eq!(merged[0].accuracy, None);
    }

    #[test]
    fn test_nearest_fix_within_tolerance() {
        let events = vec![event(100, "SMS Messages", None, None)];
        let fixes = vec![fix(0, 40.0, -74.0), fix(90, 40.1, -74.1), fix(300, 40.2, -74.2)];

        let merged = merge_events(&events, Some(&fixes), Duration::minutes(5));
        assert_eq!(merged[0].location_source, LocationSource::LocationTracking);
        assert_eq!(merged[0].latitude, Some(40.1));
        assert_eq!(merged[0].accuracy, Some(30.0));
    }

    #[test]
    fn test_no_fix_within_tolerance() {
        let events = vec![event(0, "SMS Messages", None, None)];
        let fixes = vec![fix(1000, 40.0, -74.0)];

        let merged = merge_events(&events, Some(&fixes), Duration::minutes(5));
        assert_eq!(merged[0].location_source, LocationSource::NoLocation);
        assert_eq!(merged[0].latitude, None);
        assert_eq!(merged[0].longitude, None);
    }

    #[test]
    fn test_timeline_only_when_no_location_stream() {
        let events = vec![event(0, "SMS Messages", None, None)];

        let merged = merge_events(&events, None, Duration::minutes(5));
        assert_eq!(merged[0].location_source, LocationSource::TimelineOnly);
    }

    #[test]
    fn test_nearest_fix_tie_breaks_to_first() {
        // Two fixes equidistant in time; the earlier one must win
        let fixes = vec![fix(0, 40.0, -74.0), fix(200, 41.0, -75.0)];
        let (nearest, diff) = nearest_fix(&fixes, ts(100)).unwrap();
        assert_eq!(nearest.latitude, 40.0);
        assert_eq!(diff, Duration::seconds(100));
    }

    #[test]
    fn test_dedup_keeps_first() {
        let mut a = event(0, "SMS Messages", None, None);
        let mut b = event(0, "SMS Messages", None, None);
        a.details = "same text".to_string();
        b.details = "same text".to_string();
        let c = event(0, "SMS Messages", None, None);

        let merged = merge_events(&[a, b, c], None, Duration::minutes(5));
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_event_order_preserved() {
        let events = vec![
            event(0, "A", None, None),
            event(10, "B", None, None),
            event(20, "C", None, None),
        ];
        let merged = merge_events(&events, None, Duration::minutes(5));
        let types: Vec<&str> = merged.iter().map(|m| m.event.event_type.as_str()).collect();
        assert_eq!(types, vec!["A", "B", "C"]);
    }
}
