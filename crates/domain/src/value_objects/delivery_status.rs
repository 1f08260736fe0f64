//! Delivery status of a forwarded message

use serde::{Deserialize, Serialize};

/// Status of a `MessageMapping`'s delivery to the remote platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Accepted locally but not yet confirmed sent
    Pending,
    /// Handed off to the remote platform successfully
    Sent,
    /// Remote platform confirmed delivery to the device
    Delivered,
    /// Recipient has read the message
    Read,
    /// Delivery failed
    Failed,
}

impl DeliveryStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Failed => "failed",
        }
    }

    /// Map a WhatsApp engine ACK code onto a delivery status.
    ///
    /// Closed set per the webhook intake contract: -1 error, 0 pending,
    /// 1 server, 2 device, 3 read, 4 played.
    #[must_use]
    pub const fn from_ack_code(code: i32) -> Option<Self> {
        match code {
            -1 => Some(Self::Failed),
            0 => Some(Self::Pending),
            1 => Some(Self::Sent),
            2 => Some(Self::Delivered),
            3 | 4 => Some(Self::Read),
            _ => None,
        }
    }
}

impl std::str::FromStr for DeliveryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown delivery status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_code_mapping_matches_closed_set() {
        assert_eq!(DeliveryStatus::from_ack_code(-1), Some(DeliveryStatus::Failed));
        assert_eq!(DeliveryStatus::from_ack_code(0), Some(DeliveryStatus::Pending));
        assert_eq!(DeliveryStatus::from_ack_code(1), Some(DeliveryStatus::Sent));
        assert_eq!(DeliveryStatus::from_ack_code(2), Some(DeliveryStatus::Delivered));
        assert_eq!(DeliveryStatus::from_ack_code(3), Some(DeliveryStatus::Read));
        assert_eq!(DeliveryStatus::from_ack_code(4), Some(DeliveryStatus::Read));
        assert_eq!(DeliveryStatus::from_ack_code(99), None);
    }

    #[test]
    fn roundtrips_through_str() {
        for status in [
            DeliveryStatus::Pending,
            DeliveryStatus::Sent,
            DeliveryStatus::Delivered,
            DeliveryStatus::Read,
            DeliveryStatus::Failed,
        ] {
            let parsed: DeliveryStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }
}
