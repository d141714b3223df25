//! Analysis configuration
//!
//! All thresholds and bounds used by the pipeline live in one immutable
//! value threaded through the analyzers, so tests can vary them per case.

use serde::{Deserialize, Serialize};

/// Configuration for a forensic analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Critical window before collision (minutes)
    pub critical_window_minutes: i64,
    /// Analysis window before collision (minutes)
    pub analysis_window_before_minutes: i64,
    /// Analysis window after collision (minutes)
    pub analysis_window_after_minutes: i64,

    /// Time tolerance when matching events to location fixes (minutes)
    pub location_match_tolerance_minutes: i64,

    /// Below this speed the vehicle is considered stationary (mph)
    pub stationary_speed_threshold: f64,
    /// Below this speed slow driving, at or above fast driving (mph)
    pub slow_driving_threshold: f64,
    /// Computed speeds above this are rejected as outliers (mph)
    pub max_reasonable_speed: f64,
    /// Minimum speed to consider the vehicle "driving" (mph)
    pub driving_threshold: f64,

    /// GPS accuracy ceiling for speed computation (meters)
    pub max_gps_accuracy: f64,
    /// High-accuracy GPS ceiling (meters)
    pub high_accuracy_gps: f64,

    /// Coordinate bounds (continental US by default)
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,

    /// Maximum location points rendered on a path by downstream consumers
    pub max_location_points_for_path: usize,
    /// Minimum elapsed seconds between fixes before recomputing speed
    pub min_time_diff_seconds: i64,
    /// Tolerance when joining per-fix speed back onto events (minutes)
    pub speed_join_tolerance_minutes: i64,

    /// Maximum input file size (MB)
    pub max_file_size_mb: u64,
    /// Free-text details are truncated to this many characters
    pub max_details_length: usize,
    /// Session pairing lookahead: an end must fall within this many minutes
    pub session_lookahead_minutes: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            critical_window_minutes: 10,
            analysis_window_before_minutes: 10,
            analysis_window_after_minutes: 2,
            location_match_tolerance_minutes: 5,
            stationary_speed_threshold: 3.0,
            slow_driving_threshold: 35.0,
            max_reasonable_speed: 120.0,
            driving_threshold: 5.0,
            max_gps_accuracy: 100.0,
            high_accuracy_gps: 50.0,
            min_latitude: 25.0,
            max_latitude: 49.0,
            min_longitude: -125.0,
            max_longitude: -66.0,
            max_location_points_for_path: 1000,
            min_time_diff_seconds: 10,
            speed_join_tolerance_minutes: 2,
            max_file_size_mb: 100,
            max_details_length: 500,
            session_lookahead_minutes: 60,
        }
    }
}
