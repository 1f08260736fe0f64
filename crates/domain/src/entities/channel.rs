//! A configured WhatsApp session ↔ Signal destination pairing

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{PhoneNumber, SessionName};

/// A single configured channel: one WhatsApp session paired with one
/// Signal destination number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub session_name: SessionName,
    pub signal_destination: PhoneNumber,
}

impl Channel {
    pub fn new(
        session_name: impl Into<String>,
        signal_destination: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let session_name = SessionName::new(session_name)?;
        let signal_destination = PhoneNumber::new(signal_destination)
            .map_err(|e| DomainError::InvalidChannel(e.to_string()))?;
        Ok(Self {
            session_name,
            signal_destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_valid_channel() {
        let channel = Channel::new("personal", "+1111111111").unwrap();
        assert_eq!(channel.session_name.as_str(), "personal");
    }

    #[test]
    fn rejects_invalid_destination() {
        assert!(Channel::new("personal", "abc").is_err());
    }

    #[test]
    fn rejects_empty_session_name() {
        assert!(Channel::new("", "+1111111111").is_err());
    }
}
