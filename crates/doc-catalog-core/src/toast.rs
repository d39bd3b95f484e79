//! Transient user notifications.
//!
//! A [`Toast`] is a short message with a category and an auto-dismiss
//! duration. The [`Notifier`] facade builds toasts and hands them to a
//! [`ToastSink`], which is whatever actually displays them (a terminal
//! printer, a test recorder).
//!
//! This module also defines [`NotificationRecord`], the payload of the live
//! notification stream.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default auto-dismiss delay for toasts shown without an explicit duration.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Warning,
    Danger,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToastKind::Success => "success",
            ToastKind::Info => "info",
            ToastKind::Warning => "warning",
            ToastKind::Danger => "danger",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    /// How long the toast stays visible before dismissing itself.
    pub duration: Duration,
}

/// Display surface for toasts.
pub trait ToastSink: Send + Sync {
    fn show(&self, toast: Toast);

    /// Dismiss everything currently shown.
    fn clear(&self) {}
}

/// Builds toasts with a default duration and forwards them to a sink.
#[derive(Clone)]
pub struct Notifier {
    sink: Arc<dyn ToastSink>,
    default_duration: Duration,
}

impl Notifier {
    pub fn new(sink: Arc<dyn ToastSink>) -> Self {
        Self {
            sink,
            default_duration: DEFAULT_TOAST_DURATION,
        }
    }

    pub fn with_default_duration(mut self, duration: Duration) -> Self {
        self.default_duration = duration;
        self
    }

    pub fn show(&self, message: impl Into<String>, kind: ToastKind, duration: Option<Duration>) {
        let toast = Toast {
            message: message.into(),
            kind,
            duration: duration.unwrap_or(self.default_duration),
        };
        tracing::debug!(kind = %toast.kind, "toast: {}", toast.message);
        self.sink.show(toast);
    }

    pub fn success(&self, message: impl Into<String>, duration: Option<Duration>) {
        self.show(message, ToastKind::Success, duration);
    }

    pub fn info(&self, message: impl Into<String>, duration: Option<Duration>) {
        self.show(message, ToastKind::Info, duration);
    }

    pub fn warning(&self, message: impl Into<String>, duration: Option<Duration>) {
        self.show(message, ToastKind::Warning, duration);
    }

    pub fn error(&self, message: impl Into<String>, duration: Option<Duration>) {
        self.show(message, ToastKind::Danger, duration);
    }

    pub fn clear(&self) {
        self.sink.clear();
    }
}

/// Sink that keeps every toast in memory. Handy for tests and headless runs.
#[derive(Default)]
pub struct RecordingToastSink {
    toasts: Mutex<Vec<Toast>>,
}

impl RecordingToastSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ToastSink for RecordingToastSink {
    fn show(&self, toast: Toast) {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(toast);
    }

    fn clear(&self) {
        self.toasts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

/// A "document created" notice received from the notification stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationRecord {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "UserId")]
    pub user_id: String,
    #[serde(rename = "UserName")]
    pub user_name: String,
    #[serde(rename = "DocumentID")]
    pub document_id: String,
    #[serde(rename = "DocumentTitle")]
    pub document_title: String,
}

impl NotificationRecord {
    /// The line shown to the user, e.g. `Ada created "Design Notes"`.
    pub fn message(&self) -> String {
        format!("{} created \"{}\"", self.user_name, self.document_title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_duration_applies() {
        let sink = Arc::new(RecordingToastSink::new());
        let notifier = Notifier::new(sink.clone());
        notifier.info("hello", None);
        notifier.error("bad", Some(Duration::from_secs(10)));

        let toasts = sink.toasts();
        assert_eq!(toasts.len(), 2);
        assert_eq!(toasts[0].kind, ToastKind::Info);
        assert_eq!(toasts[0].duration, DEFAULT_TOAST_DURATION);
        assert_eq!(toasts[1].kind, ToastKind::Danger);
        assert_eq!(toasts[1].duration, Duration::from_secs(10));
    }

    #[test]
    fn test_custom_default_and_clear() {
        let sink = Arc::new(RecordingToastSink::new());
        let notifier = Notifier::new(sink.clone()).with_default_duration(Duration::from_millis(250));
        notifier.warning("careful", None);
        assert_eq!(sink.toasts()[0].duration, Duration::from_millis(250));
        notifier.clear();
        assert!(sink.toasts().is_empty());
    }

    #[test]
    fn test_notification_record_parses_wire_json() {
        let json = r#"{
            "Timestamp": "2024-05-01T12:00:00Z",
            "UserId": "u-7",
            "UserName": "Ada",
            "DocumentID": "d-1",
            "DocumentTitle": "Design Notes"
        }"#;
        let record: NotificationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.user_id, "u-7");
        assert_eq!(record.document_id, "d-1");
        assert_eq!(record.message(), "Ada created \"Design Notes\"");
    }

    #[test]
    fn test_notification_record_rejects_non_object() {
        assert!(serde_json::from_str::<NotificationRecord>("not json").is_err());
        assert!(serde_json::from_str::<NotificationRecord>("[1, 2]").is_err());
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ToastKind::Danger.to_string(), "danger");
        assert_eq!(ToastKind::Success.to_string(), "success");
    }
}
