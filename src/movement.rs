//! Movement and speed analysis
//!
//! Derives a per-fix speed track from events that carry real GPS, rejects
//! implausible speeds, classifies movement state, and joins the result
//! back onto every event by nearest timestamp.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;

use crate::config::AnalysisConfig;
use crate::geo::haversine_distance;
use crate::types::{LocationSource, MergedEvent, MovementType};

/// m/s to mph conversion factor
const MS_TO_MPH: f64 = 2.237;

/// One GPS-bearing point on the derived speed track
#[derive(Debug, Clone, Serialize)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub speed_mph: f64,
    pub movement_type: MovementType,
}

/// Side statistics over the speed track
#[derive(Debug, Clone, Default, Serialize)]
pub struct MovementSummary {
    pub track_points: usize,
    /// Average among nonzero speeds (mph)
    pub average_speed_mph: f64,
    pub max_speed_mph: f64,
    pub stationary_points: usize,
    pub slow_driving_points: usize,
    pub fast_driving_points: usize,
    /// Computed speeds discarded as implausible
    pub rejected_outliers: usize,
}

/// Result of movement analysis over a merged stream
#[derive(Debug, Clone)]
pub struct MovementAnalysis {
    /// (speed_mph, movement_type) for each input event, in input order
    pub per_event: Vec<(f64, MovementType)>,
    pub track: Vec<TrackPoint>,
    pub summary: MovementSummary,
}

/// Movement analyzer over a merged event stream
pub struct MovementAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> MovementAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Derive the speed track and join speed/movement onto every event
    pub fn analyze(&self, merged: &[MergedEvent]) -> MovementAnalysis {
        let points = self.select_track_points(merged);
        let (track, rejected) = self.build_track(points);

        let per_event = if track.is_empty() {
            let fallback = if merged
                .iter()
                .all(|m| m.location_source == LocationSource::TimelineOnly)
            {
                MovementType::Unknown
            } else {
                MovementType::Stationary
            };
            vec![(0.0, fallback); merged.len()]
        } else {
            merged
                .iter()
                .map(|m| self.join_speed(&track, m.event.timestamp))
                .collect()
        };

        let summary = summarize_track(&track, rejected);

        MovementAnalysis {
            per_event,
            track,
            summary,
        }
    }

    /// Select GPS-bearing points: real coordinates only, deduplicated by
    /// (timestamp, lat, lon), sorted by time, accuracy-filtered when the
    /// filtered subset still supports speed computation.
    fn select_track_points(&self, merged: &[MergedEvent]) -> Vec<RawPoint> {
        let mut seen: HashSet<(i64, u64, u64)> = HashSet::new();
        let mut points: Vec<RawPoint> = merged
            .iter()
            .filter(|m| {
                matches!(
                    m.location_source,
                    LocationSource::LocationTracking | LocationSource::TimelineData
                )
            })
            .filter_map(|m| {
                let lat = m.latitude?;
                let lon = m.longitude?;
                seen.insert((m.event.timestamp.timestamp_millis(), lat.to_bits(), lon.to_bits()))
                    .then_some(RawPoint {
                        timestamp: m.event.timestamp,
                        latitude: lat,
                        longitude: lon,
                        accuracy: m.accuracy,
                    })
            })
            .collect();

        points.sort_by_key(|p| p.timestamp);

        let good: Vec<RawPoint> = points
            .iter()
            .filter(|p| p.accuracy.map_or(true, |a| a <= self.config.max_gps_accuracy))
            .cloned()
            .collect();

        if good.len() >= 2 {
            good
        } else {
            points
        }
    }

    /// Compute pairwise speeds with minimum-interval reuse and outlier
    /// rejection, then classify each point's movement state.
    fn build_track(&self, points: Vec<RawPoint>) -> (Vec<TrackPoint>, usize) {
        let mut track = Vec::with_capacity(points.len());
        let mut rejected = 0;
        let mut prev_speed = 0.0;

        for (i, point) in points.iter().enumerate() {
            let speed_mph = if i == 0 {
                0.0
            } else {
                let prev = &points[i - 1];
                let elapsed = (point.timestamp - prev.timestamp).num_seconds();

                if elapsed < self.config.min_time_diff_seconds {
                    prev_speed
                } else {
                    let distance = haversine_distance(
                        prev.latitude,
                        prev.longitude,
                        point.latitude,
                        point.longitude,
                    );
                    let computed = distance / elapsed as f64 * MS_TO_MPH;

                    if computed > self.config.max_reasonable_speed {
                        rejected += 1;
                        prev_speed
                    } else {
                        computed
                    }
                }
            };

            prev_speed = speed_mph;
            track.push(TrackPoint {
                timestamp: point.timestamp,
                latitude: point.latitude,
                longitude: point.longitude,
                accuracy: point.accuracy,
                speed_mph,
                movement_type: self.classify_speed(speed_mph),
            });
        }

        (track, rejected)
    }

    /// Classify a speed into a movement state
    pub fn classify_speed(&self, speed_mph: f64) -> MovementType {
        if speed_mph < self.config.stationary_speed_threshold {
            MovementType::Stationary
        } else if speed_mph < self.config.slow_driving_threshold {
            MovementType::DrivingSlow
        } else {
            MovementType::DrivingFast
        }
    }

    /// Nearest-timestamp join within the configured tolerance; unmatched
    /// events default to stationary at speed 0.
    fn join_speed(&self, track: &[TrackPoint], t: DateTime<Utc>) -> (f64, MovementType) {
        let tolerance = Duration::minutes(self.config.speed_join_tolerance_minutes);
        let idx = track.partition_point(|p| p.timestamp < t);

        let mut best: Option<(usize, Duration)> = None;
        for cand in [idx.checked_sub(1), (idx < track.len()).then_some(idx)]
            .into_iter()
            .flatten()
        {
            let diff = abs_duration(t - track[cand].timestamp);
            if best.map_or(true, |(_, best_diff)| diff < best_diff) {
                best = Some((cand, diff));
            }
        }

        match best {
            Some((i, diff)) if diff <= tolerance => {
                (track[i].speed_mph, track[i].movement_type)
            }
            _ => (0.0, MovementType::Stationary),
        }
    }
}

#[derive(Debug, Clone)]
struct RawPoint {
    timestamp: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    accuracy: Option<f64>,
}

fn abs_duration(d: Duration) -> Duration {
    if d < Duration::zero() {
        -d
    } else {
        d
    }
}

fn summarize_track(track: &[TrackPoint], rejected: usize) -> MovementSummary {
    let nonzero: Vec<f64> = track
        .iter()
        .map(|p| p.speed_mph)
        .filter(|&s| s > 0.0)
        .collect();

    let average = if nonzero.is_empty() {
        0.0
    } else {
        nonzero.iter().sum::<f64>() / nonzero.len() as f64
    };
    let max = nonzero.iter().copied().fold(0.0, f64::max);

    MovementSummary {
        track_points: track.len(),
        average_speed_mph: average,
        max_speed_mph: max,
        stationary_points: count_movement(track, MovementType::Stationary),
        slow_driving_points: count_movement(track, MovementType::DrivingSlow),
        fast_driving_points: count_movement(track, MovementType::DrivingFast),
        rejected_outliers: rejected,
    }
}

fn count_movement(track: &[TrackPoint], movement: MovementType) -> usize {
    track.iter().filter(|p| p.movement_type == movement).count()
}
