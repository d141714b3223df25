//! Event classification and app-name normalization
//!
//! Heuristic keyword tables map raw (event type, description, direction,
//! app) tuples onto the forensic priority taxonomy and onto a normalized
//! app identity. All matching is case-insensitive substring matching; the
//! tables are ordered and evaluated first-match-wins.

use crate::types::ForensicPriority;

/// Event types that indicate a call when paired with a direction
pub const CALL_PATTERNS: &[&str] = &["call", "phone"];

/// Event types that indicate an SMS or instant message
pub const MESSAGE_PATTERNS: &[&str] = &["sms", "message", "instant message"];

/// Social apps that classify an event as active social media use
pub const SOCIAL_MEDIA_APPS: &[&str] = &["snapchat", "instagram", "facebook", "twitter", "tiktok"];

/// Media and browser apps that also count as active use
pub const MEDIA_APPS: &[&str] = &["youtube", "spotify", "browser", "chrome", "safari"];

/// Event types that indicate a passive notification
pub const NOTIFICATION_PATTERNS: &[&str] = &["notification", "alert", "device notifications"];

/// Event types that indicate background system activity
pub const BACKGROUND_PATTERNS: &[&str] = &["log entries", "network connections", "system", "connection"];

/// Ordered substring-to-identity table for app-name normalization.
/// Evaluated against "description event_type" lowercased, first match wins.
pub const APP_PATTERNS: &[(&str, &str)] = &[
    ("snapchat", "Snapchat"),
    ("instagram", "Instagram"),
    ("facebook", "Facebook"),
    ("tiktok", "TikTok"),
    ("twitter", "Twitter"),
    ("whatsapp", "WhatsApp"),
    ("telegram", "Telegram"),
    ("youtube", "YouTube"),
    ("spotify", "Spotify"),
    ("maps", "Maps"),
    ("navigation", "Maps"),
    ("chrome", "Browser"),
    ("safari", "Browser"),
    ("browser", "Browser"),
    ("notification", "Notifications"),
    ("network", "Network"),
    ("log", "System"),
];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Classify an event into the forensic priority taxonomy.
///
/// Precedence: active call > message > social media > call log >
/// notification > background > default.
pub fn classify_event(
    event_type: &str,
    description: &str,
    direction: &str,
    app_name: &str,
) -> ForensicPriority {
    let event = event_type.to_lowercase();
    let desc = description.to_lowercase();
    let dir = direction.to_lowercase();
    let app = app_name.to_lowercase();

    if is_call_event(&event, &dir) {
        ForensicPriority::CallActive
    } else if contains_any(&event, MESSAGE_PATTERNS) {
        ForensicPriority::SmsActive
    } else if is_social_media_event(&event, &desc, &app) {
        ForensicPriority::SocialMediaActive
    } else if event.contains("call log") {
        // Call logs indicate phone interaction even without a direction
        ForensicPriority::CallActive
    } else if contains_any(&event, NOTIFICATION_PATTERNS) {
        ForensicPriority::NotificationPassive
    } else if contains_any(&event, BACKGROUND_PATTERNS) {
        ForensicPriority::SystemBackground
    } else {
        ForensicPriority::Default
    }
}

fn is_call_event(event: &str, dir: &str) -> bool {
    contains_any(event, CALL_PATTERNS) && (dir.contains("incoming") || dir.contains("outgoing"))
}

fn is_social_media_event(event: &str, desc: &str, app: &str) -> bool {
    event.contains("social media")
        || contains_any(app, SOCIAL_MEDIA_APPS)
        || contains_any(desc, SOCIAL_MEDIA_APPS)
        || contains_any(app, MEDIA_APPS)
}

/// Extract a normalized app identity from description and event type.
///
/// Falls back to generic Phone/Messages identities for call and message
/// event types, and to "Unknown" when nothing matches.
pub fn extract_app_name(description: &str, event_type: &str) -> String {
    let combined = format!("{} {}", description.to_lowercase(), event_type.to_lowercase());

    for (pattern, app_name) in APP_PATTERNS {
        if combined.contains(pattern) {
            return (*app_name).to_string();
        }
    }

    let type_lower = event_type.to_lowercase();
    if contains_any(&type_lower, CALL_PATTERNS) {
        "Phone".to_string()
    } else if type_lower.contains("sms") || type_lower.contains("message") {
        "Messages".to_string()
    } else {
        "Unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_call_with_direction() {
        assert_eq!(
            classify_event("Call", "", "Incoming", ""),
            ForensicPriority::CallActive
        );
        assert_eq!(
            classify_event("Phone", "", "Outgoing", ""),
            ForensicPriority::CallActive
        );
    }

    #[test]
    fn test_call_without_direction_is_not_active() {
        // A bare "Call" type with no direction falls through the call rule
        assert_eq!(classify_event("Call", "", "", ""), ForensicPriority::Default);
    }

    #[test]
    fn test_call_log_without_direction() {
        assert_eq!(
            classify_event("Call Log", "", "", ""),
            ForensicPriority::CallActive
        );
    }

    #[test]
    fn test_call_precedes_notification() {
        // Precedence: call beats notification even when the description
        // mentions one
        assert_eq!(
            classify_event("Call", "missed call notification", "incoming", ""),
            ForensicPriority::CallActive
        );
    }

    #[test]
    fn test_message_patterns() {
        assert_eq!(
            classify_event("SMS Messages", "", "", ""),
            ForensicPriority::SmsActive
        );
        assert_eq!(
            classify_event("Instant Messages", "", "", "WhatsApp"),
            ForensicPriority::SmsActive
        );
    }

    #[test]
    fn test_social_media_by_app() {
        assert_eq!(
            classify_event("Application Usage", "", "", "Snapchat"),
            ForensicPriority::SocialMediaActive
        );
    }

    #[test]
    fn test_social_media_by_description() {
        assert_eq!(
            classify_event("Application Usage", "opened instagram story", "", ""),
            ForensicPriority::SocialMediaActive
        );
    }

    #[test]
    fn test_media_app_counts_as_social() {
        assert_eq!(
            classify_event("Application Usage", "", "", "YouTube"),
            ForensicPriority::SocialMediaActive
        );
    }

    #[test]
    fn test_notification() {
        assert_eq!(
            classify_event("Device Notifications", "", "", ""),
            ForensicPriority::NotificationPassive
        );
    }

    #[test]
    fn test_background() {
        assert_eq!(
            classify_event("Log Entries", "", "", ""),
            ForensicPriority::SystemBackground
        );
        assert_eq!(
            classify_event("Network Connections", "", "", ""),
            ForensicPriority::SystemBackground
        );
    }

    #[test]
    fn test_default() {
        assert_eq!(
            classify_event("Contacts", "", "", ""),
            ForensicPriority::Default
        );
    }

    #[test]
    fn test_extract_known_apps() {
        assert_eq!(extract_app_name("Snapchat video opened", "Application"), "Snapchat");
        assert_eq!(extract_app_name("", "Instagram Activity"), "Instagram");
        assert_eq!(extract_app_name("watched on youtube", ""), "YouTube");
        assert_eq!(extract_app_name("chrome tab opened", ""), "Browser");
        assert_eq!(extract_app_name("turn-by-turn navigation", ""), "Maps");
    }

    #[test]
    fn test_extract_fallbacks() {
        assert_eq!(extract_app_name("", "Call Log"), "Phone");
        assert_eq!(extract_app_name("", "SMS Messages"), "Messages");
        assert_eq!(extract_app_name("", "Contacts"), "Unknown");
    }

    #[test]
    fn test_table_order_first_match_wins() {
        // "snapchat notification" normalizes to Snapchat, not Notifications
        assert_eq!(
            extract_app_name("snapchat notification received", ""),
            "Snapchat"
        );
    }

    #[test]
    fn test_every_pattern_rule_resolves() {
        // The table is data; walk it exhaustively
        for (pattern, expected) in APP_PATTERNS {
            assert_eq!(extract_app_name(pattern, ""), *expected);
        }
    }
}
