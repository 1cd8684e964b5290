//! Notification extraction.
//!
//! Pulls `notifies`/`subscribes` directives out of a raw resource body into
//! notification intents. Two independent scans, one per directive verb;
//! `notifies` matches precede `subscribes` matches in the result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static NOTIFIES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"notifies\s+:(\w+)\s*,\s*['"](\w+)\[([^\]]+)\]['"]\s*(?:,\s*:(\w+))?"#)
        .expect("static regex")
});

static SUBSCRIBES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"subscribes\s+:(\w+)\s*,\s*['"](\w+)\[([^\]]+)\]['"]\s*(?:,\s*:(\w+))?"#)
        .expect("static regex")
});

/// Which directive produced a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationDirective {
    Notifies,
    Subscribes,
}

/// Notification timing. Absent timing defaults to delayed at assembly time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTiming {
    Immediately,
    Delayed,
}

/// One extracted notification intent.
///
/// For `notifies`, `resource_type`/`resource_name` identify the notified
/// target. For `subscribes`, they identify the watched resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub directive: NotificationDirective,
    pub action: String,
    pub resource_type: String,
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timing: Option<NotificationTiming>,
}

impl Notification {
    /// The `type[name]` label of the referenced resource.
    pub fn target_label(&self) -> String {
        format!("{}[{}]", self.resource_type, self.resource_name)
    }
}

fn parse_timing(raw: Option<&str>) -> Option<NotificationTiming> {
    match raw {
        Some("immediately") => Some(NotificationTiming::Immediately),
        Some("delayed") => Some(NotificationTiming::Delayed),
        _ => None,
    }
}

fn scan(body: &str, re: &Regex, directive: NotificationDirective) -> Vec<Notification> {
    re.captures_iter(body)
        .map(|c| Notification {
            directive,
            action: c[1].to_string(),
            resource_type: c[2].to_string(),
            resource_name: c[3].to_string(),
            timing: parse_timing(c.get(4).map(|m| m.as_str())),
        })
        .collect()
}

/// Extract all notification intents from a resource body, `notifies`
/// matches first. Returns an empty list on no match.
pub fn extract_notifications(body: &str) -> Vec<Notification> {
    let mut notifications = scan(body, &NOTIFIES_RE, NotificationDirective::Notifies);
    notifications.extend(scan(body, &SUBSCRIBES_RE, NotificationDirective::Subscribes));
    notifications
}
