//! A Signal-bound message queued for delivery, with its retry state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::PhoneNumber;

/// An outbound message waiting to be delivered to a Signal
/// destination, durable across process restarts while retries are
/// outstanding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSignalMessage {
    pub destination: PhoneNumber,
    pub raw_payload: serde_json::Value,
    pub retry_count: u32,
    pub created_at: DateTime<Utc>,
    pub last_error: Option<String>,
}

impl PendingSignalMessage {
    #[must_use]
    pub fn new(destination: PhoneNumber, raw_payload: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            destination,
            raw_payload,
            retry_count: 0,
            created_at: now,
            last_error: None,
        }
    }

    /// Record a failed delivery attempt.
    pub fn record_failure(&mut self, error: impl Into<String>) {
        self.retry_count += 1;
        self.last_error = Some(error.into());
    }

    #[must_use]
    pub fn exceeds(&self, max_retries: u32) -> bool {
        self.retry_count >= max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_failures() {
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let mut pending = PendingSignalMessage::new(
            PhoneNumber::new("+1234567890").unwrap(),
            serde_json::json!({"text": "hi"}),
            now,
        );
        assert!(!pending.exceeds(3));
        pending.record_failure("timeout");
        pending.record_failure("timeout");
        pending.record_failure("timeout");
        assert!(pending.exceeds(3));
        assert_eq!(pending.last_error.as_deref(), Some("timeout"));
    }
}
