//! Timeline and location export loaders
//!
//! Both exports are CSV tables whose real header sits on the second
//! physical line (the first line carries export metadata). Rows that fail
//! time parsing or coordinate validation are skipped and counted, never
//! fatal; a load only fails when the file is missing, oversized, or yields
//! zero valid rows.

use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

use crate::classify::extract_app_name;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::timeparse::parse_export_time;
use crate::types::{Event, LocationFix, StreamSource};
use crate::validate::{validate_coordinates, validate_file, validate_timestamp};

/// Per-load statistics, surfaced to callers as data
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct LoadReport {
    /// Raw rows read from the export
    pub rows_read: usize,
    /// Rows that survived parsing and validation
    pub loaded: usize,
    /// Rows skipped for unparseable timestamps or invalid fields
    pub skipped: usize,
    /// Exact duplicates collapsed (location export only)
    pub duplicates_removed: usize,
}

#[derive(Debug, Deserialize)]
struct RawTimelineRow {
    #[serde(rename = "Time", default)]
    time: String,
    #[serde(rename = "Description", default)]
    description: String,
    #[serde(rename = "Type", default)]
    event_type: String,
    #[serde(rename = "Direction", default)]
    direction: String,
    #[serde(rename = "Party", default)]
    party: String,
    #[serde(rename = "Latitude", default)]
    latitude: String,
    #[serde(rename = "Longitude", default)]
    longitude: String,
}

#[derive(Debug, Deserialize)]
struct RawLocationRow {
    #[serde(rename = "Time", default)]
    time: String,
    #[serde(rename = "Latitude", default)]
    latitude: String,
    #[serde(rename = "Longitude", default)]
    longitude: String,
    #[serde(rename = "Horizontal Accuracy", default)]
    accuracy: String,
    #[serde(rename = "Map Address", default)]
    address: String,
}

/// Load the timeline export from `path`
pub fn load_timeline(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<(Vec<Event>, LoadReport), AnalysisError> {
    validate_file(path, config)?;
    let data = std::fs::read_to_string(path)?;
    parse_timeline(&data, config)
}

/// Load the location export from `path`
pub fn load_locations(
    path: &Path,
    config: &AnalysisConfig,
) -> Result<(Vec<LocationFix>, LoadReport), AnalysisError> {
    validate_file(path, config)?;
    let data = std::fs::read_to_string(path)?;
    parse_locations(&data, config)
}

/// Parse timeline CSV content (header on the second line)
pub fn parse_timeline(
    data: &str,
    config: &AnalysisConfig,
) -> Result<(Vec<Event>, LoadReport), AnalysisError> {
    let mut reader = csv_reader(data);
    let mut events = Vec::new();
    let mut report = LoadReport::default();

    for row in reader.deserialize::<RawTimelineRow>() {
        let row = match row {
            Ok(row) => row,
            Err(_) => {
                report.rows_read += 1;
                report.skipped += 1;
                continue;
            }
        };
        report.rows_read += 1;

        match timeline_row_to_event(&row, config) {
            Some(event) => events.push(event),
            None => report.skipped += 1,
        }
    }

    if events.is_empty() {
        return Err(AnalysisError::NoValidRows("timeline".to_string()));
    }

    events.sort_by_key(|e| e.timestamp);
    report.loaded = events.len();

    Ok((events, report))
}

/// Parse location CSV content (header on the second line)
pub fn parse_locations(
    data: &str,
    config: &AnalysisConfig,
) -> Result<(Vec<LocationFix>, LoadReport), AnalysisError> {
    let mut reader = csv_reader(data);
    let mut fixes = Vec::new();
    let mut report = LoadReport::default();
    let mut seen: HashSet<(i64, u64, u64)> = HashSet::new();

    for row in reader.deserialize::<RawLocationRow>() {
        let row = match row {
            Ok(row) => row,
            Err(_) => {
                report.rows_read += 1;
                report.skipped += 1;
                continue;
            }
        };
        report.rows_read += 1;

        let fix = match location_row_to_fix(&row, config) {
            Some(fix) => fix,
            None => {
                report.skipped += 1;
                continue;
            }
        };

        let key = (
            fix.timestamp.timestamp_millis(),
            fix.latitude.to_bits(),
            fix.longitude.to_bits(),
        );
        if seen.insert(key) {
            fixes.push(fix);
        } else {
            report.duplicates_removed += 1;
        }
    }

    if fixes.is_empty() {
        return Err(AnalysisError::NoValidRows("location".to_string()));
    }

    fixes.sort_by_key(|f| f.timestamp);
    report.loaded = fixes.len();

    Ok((fixes, report))
}

/// Build a CSV reader over the export content, skipping the metadata line
/// that precedes the real header
fn csv_reader(data: &str) -> csv::Reader<&[u8]> {
    let body = match data.find('\n') {
        Some(idx) => &data[idx + 1..],
        None => data,
    };

    csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes())
}

fn timeline_row_to_event(row: &RawTimelineRow, config: &AnalysisConfig) -> Option<Event> {
    let parsed = parse_export_time(&row.time)?;

    let app_name = extract_app_name(&row.description, &row.event_type);
    let contact = non_empty(&row.party);

    Some(Event {
        timestamp: parsed.timestamp,
        time_annotation: parsed.annotation,
        event_type: row.event_type.clone(),
        direction: row.direction.clone(),
        details: truncate_chars(&row.description, config.max_details_length),
        contact,
        app_name,
        latitude: coerce_numeric(&row.latitude),
        longitude: coerce_numeric(&row.longitude),
        source: StreamSource::Timeline,
    })
}

fn location_row_to_fix(row: &RawLocationRow, config: &AnalysisConfig) -> Option<LocationFix> {
    let parsed = parse_export_time(&row.time)?;
    if !validate_timestamp(parsed.timestamp) {
        return None;
    }

    let lat = coerce_numeric(&row.latitude)?;
    let lon = coerce_numeric(&row.longitude)?;
    if !validate_coordinates(lat, lon, config) {
        return None;
    }

    Some(LocationFix {
        timestamp: parsed.timestamp,
        latitude: lat,
        longitude: lon,
        accuracy: coerce_numeric(&row.accuracy),
        address: non_empty(&row.address),
        source: StreamSource::LocationTracking,
    })
}

/// Lenient numeric coercion: None on empty or malformed input
fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn truncate_chars(raw: &str, max: usize) -> String {
    if raw.chars().count() <= max {
        raw.to_string()
    } else {
        raw.chars().take(max).collect()
    }
}
