//! Data validation
//!
//! Stateless predicates used as filters during loading and as standalone
//! cleaning utilities over already-loaded fix streams.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::types::LocationFix;

/// How far back a timestamp may reasonably lie (10 years)
const MAX_TIMESTAMP_AGE_DAYS: i64 = 3650;

/// How far forward a timestamp may reasonably lie (1 year)
const MAX_TIMESTAMP_FUTURE_DAYS: i64 = 365;

/// Check the file exists and is within the configured size ceiling
pub fn validate_file(path: &Path, config: &AnalysisConfig) -> Result<(), AnalysisError> {
    if !path.exists() {
        return Err(AnalysisError::FileNotFound(path.display().to_string()));
    }

    let size_bytes = std::fs::metadata(path)?.len();
    let size_mb = size_bytes as f64 / (1024.0 * 1024.0);
    if size_mb > config.max_file_size_mb as f64 {
        return Err(AnalysisError::FileTooLarge {
            path: path.display().to_string(),
            size_mb,
            limit_mb: config.max_file_size_mb,
        });
    }

    Ok(())
}

/// True when the coordinates fall within the configured bounds box
pub fn validate_coordinates(lat: f64, lon: f64, config: &AnalysisConfig) -> bool {
    (config.min_latitude..=config.max_latitude).contains(&lat)
        && (config.min_longitude..=config.max_longitude).contains(&lon)
}

/// True when the speed is non-negative and plausible
pub fn validate_speed(speed_mph: f64, config: &AnalysisConfig) -> bool {
    (0.0..=config.max_reasonable_speed).contains(&speed_mph)
}

/// True when the timestamp is within a bounded historical/future window
pub fn validate_timestamp(timestamp: DateTime<Utc>) -> bool {
    let now = Utc::now();
    let oldest = now - Duration::days(MAX_TIMESTAMP_AGE_DAYS);
    let newest = now + Duration::days(MAX_TIMESTAMP_FUTURE_DAYS);
    timestamp >= oldest && timestamp <= newest
}

/// Remove fixes with out-of-bounds coordinates or implausible timestamps,
/// then collapse exact (timestamp, lat, lon) duplicates keeping the first.
pub fn clean_location_fixes(fixes: Vec<LocationFix>, config: &AnalysisConfig) -> Vec<LocationFix> {
    let mut seen: HashSet<(i64, u64, u64)> = HashSet::new();
    fixes
        .into_iter()
        .filter(|f| validate_coordinates(f.latitude, f.longitude, config))
        .filter(|f| validate_timestamp(f.timestamp))
        .filter(|f| {
            seen.insert((
                f.timestamp.timestamp_millis(),
                f.latitude.to_bits(),
                f.longitude.to_bits(),
            ))
        })
        .collect()
}

/// Keep fixes whose accuracy is unknown (assume good) or at most `max_accuracy`
pub fn filter_by_accuracy(fixes: Vec<LocationFix>, max_accuracy: f64) -> Vec<LocationFix> {
    fixes
        .into_iter()
        .filter(|f| f.accuracy.map_or(true, |a| a <= max_accuracy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn fix(ts_secs: i64, lat: f64, lon: f64, accuracy: Option<f64>) -> LocationFix {
        LocationFix {
            timestamp: Utc.timestamp_opt(ts_secs, 0).unwrap(),
            latitude: lat,
            longitude: lon,
            accuracy,
            address: None,
            source: crate::types::StreamSource::LocationTracking,
        }
    }

    #[test]
    fn test_coordinates_within_bounds() {
        let config = AnalysisConfig::default();
        assert!(validate_coordinates(40.0, -74.0, &config));
        assert!(validate_coordinates(25.0, -125.0, &config));
        assert!(validate_coordinates(49.0, -66.0, &config));
    }

    #[test]
    fn test_coordinates_one_unit_beyond_bounds() {
        let config = AnalysisConfig::default();
        assert!(!validate_coordinates(24.0, -74.0, &config));
        assert!(!validate_coordinates(50.0, -74.0, &config));
        assert!(!validate_coordinates(40.0, -126.0, &config));
        assert!(!validate_coordinates(40.0, -65.0, &config));
    }

    #[test]
    fn test_speed_bounds() {
        let config = AnalysisConfig::default();
        assert!(validate_speed(0.0, &config));
        assert!(validate_speed(120.0, &config));
        assert!(!validate_speed(120.1, &config));
        assert!(!validate_speed(-1.0, &config));
    }

    #[test]
    fn test_timestamp_plausibility() {
        assert!(validate_timestamp(Utc::now()));
        assert!(!validate_timestamp(Utc::now() - Duration::days(4000)));
        assert!(!validate_timestamp(Utc::now() + Duration::days(400)));
    }

    #[test]
    fn test_clean_removes_out_of_bounds_and_duplicates() {
        let config = AnalysisConfig::default();
        let now = Utc::now().timestamp();
        let fixes = vec![
            fix(now, 40.0, -74.0, None),
            fix(now, 40.0, -74.0, None),  // exact duplicate
            fix(now, 10.0, -74.0, None),  // out of bounds
            fix(now + 60, 40.0, -74.0, None),
        ];

        let cleaned = clean_location_fixes(fixes, &config);
        assert_eq!(cleaned.len(), 2);
    }

    #[test]
    fn test_accuracy_filter_keeps_unknown() {
        let now = Utc::now().timestamp();
        let fixes = vec![
            fix(now, 40.0, -74.0, None),
            fix(now + 10, 40.0, -74.0, Some(50.0)),
            fix(now + 20, 40.0, -74.0, Some(150.0)),
        ];

        let filtered = filter_by_accuracy(fixes, 100.0);
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let config = AnalysisConfig::default();
        let err = validate_file(Path::new("/nonexistent/export.csv"), &config).unwrap_err();
        assert!(matches!(err, AnalysisError::FileNotFound(_)));
    }
}
