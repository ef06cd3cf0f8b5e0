//! Observer hooks of the HTTP client.
//!
//! - [`RequestObserver`] receives a [`RequestLog`] for every completed
//!   dispatch. It is purely observational: the client ignores whatever the
//!   observer does, and a missing observer changes nothing.
//! - [`SessionObserver`] is told when the session is irrecoverably gone and
//!   the user has to authenticate again.
//!
//! [`DebugLog`] is the bundled request observer behind `pscout --debug`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::VecDeque,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
};
use tracing::warn;

/// Failure details attached to a [`RequestLog`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

/// One completed request, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLog {
    pub method: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    pub request_data: Option<Value>,
    pub response_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RequestLogError>,
}

pub trait RequestObserver: Send + Sync {
    fn on_request_complete(&self, record: &RequestLog);
}

pub trait SessionObserver: Send + Sync {
    /// Tokens were cleared and the user must sign in again.
    fn session_expired(&self);
}

/// Default session observer: writes a warning to the log.
#[derive(Debug, Default)]
pub struct LogSessionObserver;

impl SessionObserver for LogSessionObserver {
    fn session_expired(&self) {
        warn!("Session expired, authentication required");
    }
}

/// Maximum number of entries a [`DebugLog`] keeps.
pub const DEBUG_LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub record: RequestLog,
}

/// Bounded in-memory request log, newest entry first.
#[derive(Debug, Default)]
pub struct DebugLog {
    entries: Mutex<VecDeque<DebugEntry>>,
    next_id: AtomicU64,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the captured entries, newest first.
    pub fn entries(&self) -> Vec<DebugEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl RequestObserver for DebugLog {
    fn on_request_complete(&self, record: &RequestLog) {
        let entry = DebugEntry {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            timestamp: Utc::now(),
            record: record.clone(),
        };

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(DEBUG_LOG_CAPACITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str) -> RequestLog {
        RequestLog {
            method: "GET".into(),
            url: url.into(),
            status: Some(200),
            request_data: None,
            response_data: None,
            error: None,
        }
    }

    #[test]
    fn test_debug_log_keeps_newest_first() {
        let log = DebugLog::new();
        log.on_request_complete(&record("/a"));
        log.on_request_complete(&record("/b"));

        let entries = log.entries();
        assert_eq!(entries[0].record.url, "/b");
        assert_eq!(entries[1].record.url, "/a");
        assert!(entries[0].id > entries[1].id);
    }

    #[test]
    fn test_debug_log_is_bounded() {
        let log = DebugLog::new();
        for i in 0..(DEBUG_LOG_CAPACITY + 10) {
            log.on_request_complete(&record(&format!("/{i}")));
        }
        assert_eq!(log.len(), DEBUG_LOG_CAPACITY);
        assert_eq!(log.entries()[0].record.url, format!("/{}", DEBUG_LOG_CAPACITY + 9));

        log.clear();
        assert!(log.is_empty());
    }
}
