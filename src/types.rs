//! Core types for the Traceline pipeline
//!
//! This module defines the data structures that flow through each stage of
//! the pipeline: standardized events and fixes, merged events, enriched
//! events, and app usage sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Start/end annotation extracted from a raw time string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeAnnotation {
    Start,
    End,
}

/// Provenance tag identifying which export a row came from; emitted with
/// every serialized event and fix so downstream consumers keep the column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamSource {
    Timeline,
    LocationTracking,
}

impl StreamSource {
    fn timeline() -> Self {
        StreamSource::Timeline
    }

    fn location_tracking() -> Self {
        StreamSource::LocationTracking
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StreamSource::Timeline => "timeline",
            StreamSource::LocationTracking => "location_tracking",
        }
    }
}

/// Provenance of the coordinates attached to a merged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    /// The event carried its own coordinates
    TimelineData,
    /// Nearest location fix matched within tolerance
    LocationTracking,
    /// No fix within tolerance
    NoLocation,
    /// No location export supplied at all
    TimelineOnly,
}

impl LocationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationSource::TimelineData => "timeline_data",
            LocationSource::LocationTracking => "location_tracking",
            LocationSource::NoLocation => "no_location",
            LocationSource::TimelineOnly => "timeline_only",
        }
    }
}

/// Movement state classified from GPS-derived speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    Stationary,
    DrivingSlow,
    DrivingFast,
    Unknown,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Stationary => "stationary",
            MovementType::DrivingSlow => "driving_slow",
            MovementType::DrivingFast => "driving_fast",
            MovementType::Unknown => "unknown",
        }
    }

    /// True for either driving classification
    pub fn is_driving(&self) -> bool {
        matches!(self, MovementType::DrivingSlow | MovementType::DrivingFast)
    }
}

/// Forensic priority taxonomy for timeline events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForensicPriority {
    CallActive,
    SmsActive,
    SocialMediaActive,
    NotificationPassive,
    SystemBackground,
    Default,
}

impl ForensicPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForensicPriority::CallActive => "call_active",
            ForensicPriority::SmsActive => "sms_active",
            ForensicPriority::SocialMediaActive => "social_media_active",
            ForensicPriority::NotificationPassive => "notification_passive",
            ForensicPriority::SystemBackground => "system_background",
            ForensicPriority::Default => "default",
        }
    }

    /// Active phone interactions (call, SMS, social media)
    pub fn is_high_priority(&self) -> bool {
        matches!(
            self,
            ForensicPriority::CallActive
                | ForensicPriority::SmsActive
                | ForensicPriority::SocialMediaActive
        )
    }
}

/// One forensic-relevant occurrence from the timeline export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Canonical instant (UTC); rows with unparseable timestamps are dropped
    pub timestamp: DateTime<Utc>,
    /// Start/end marker extracted from the raw time string
    pub time_annotation: Option<TimeAnnotation>,
    /// Raw event type from the export
    pub event_type: String,
    /// Direction (incoming/outgoing), may be empty
    pub direction: String,
    /// Free-text description, truncated to the configured maximum
    pub details: String,
    /// Counterparty, if present
    pub contact: Option<String>,
    /// Normalized app identity
    pub app_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Stream provenance, always `timeline` for events
    #[serde(default = "StreamSource::timeline")]
    pub source: StreamSource,
}

impl Event {
    /// True when the event carries both coordinates
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// One GPS sample from the location export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFix {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters; None means "assume good"
    pub accuracy: Option<f64>,
    /// Optional display address
    pub address: Option<String>,
    /// Stream provenance, always `location_tracking` for fixes
    #[serde(default = "StreamSource::location_tracking")]
    pub source: StreamSource,
}

/// An event with its location resolved against the fix stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedEvent {
    /// Source event
    pub event: Event,
    /// Where the resolved coordinates came from
    pub location_source: LocationSource,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub accuracy: Option<f64>,
}

impl MergedEvent {
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// A merged event plus analysis results, added in stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedEvent {
    /// Source merged event
    pub merged: MergedEvent,
    /// Forensic priority classification
    pub forensic_priority: ForensicPriority,
    /// GPS-derived speed at the nearest matched fix (mph)
    pub speed_mph: f64,
    /// Movement state at the nearest matched fix
    pub movement_type: MovementType,
    /// Duration of the app session this event belongs to, if any (seconds)
    pub app_session_duration: Option<f64>,
    /// Index of the session this event belongs to, if any
    pub session_id: Option<usize>,
    /// Seconds until the collision instant, when one is set
    pub time_to_collision: Option<f64>,
}

/// A paired start/end usage interval for one app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSession {
    pub app_name: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_seconds: f64,
    pub start_lat: Option<f64>,
    pub start_lon: Option<f64>,
    pub end_lat: Option<f64>,
    pub end_lon: Option<f64>,
    pub event_type: String,
    pub details: String,
}

/// Collision anchor for relative-time analysis, set at most once per run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CollisionRef {
    pub time: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn event() -> Event {
        Event {
            timestamp: Utc.with_ymd_and_hms(2023, 3, 15, 10, 0, 0).unwrap(),
            time_annotation: None,
            event_type: "Application Usage".to_string(),
            direction: String::new(),
            details: "Instagram opened".to_string(),
            contact: None,
            app_name: "Instagram".to_string(),
            latitude: None,
            longitude: None,
            source: StreamSource::Timeline,
        }
    }

    fn fix() -> LocationFix {
        LocationFix {
            timestamp: Utc.with_ymd_and_hms(2023, 3, 15, 10, 0, 0).unwrap(),
            latitude: 40.0,
            longitude: -74.0,
            accuracy: Some(25.0),
            address: None,
            source: StreamSource::LocationTracking,
        }
    }

    #[test]
    fn test_serialized_rows_carry_source_column() {
        let json = serde_json::to_value(event()).unwrap();
        assert_eq!(json["source"], "timeline");

        let json = serde_json::to_value(fix()).unwrap();
        assert_eq!(json["source"], "location_tracking");
    }

    #[test]
    fn test_source_defaults_per_stream_on_deserialization() {
        let mut json = serde_json::to_value(event()).unwrap();
        json.as_object_mut().unwrap().remove("source");
        let event: Event = serde_json::from_value(json).unwrap();
        assert_eq!(event.source, StreamSource::Timeline);

        let mut json = serde_json::to_value(fix()).unwrap();
        json.as_object_mut().unwrap().remove("source");
        let fix: LocationFix = serde_json::from_value(json).unwrap();
        assert_eq!(fix.source, StreamSource::LocationTracking);
    }
}
