//! A cached WhatsApp contact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A locally cached snapshot of a WhatsApp contact's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: String,
    pub phone_number: String,
    pub name: Option<String>,
    pub push_name: Option<String>,
    pub short_name: Option<String>,
    pub is_group: bool,
    pub is_blocked: bool,
    pub is_my_contact: bool,
    pub cached_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contact {
    /// The best available name for this contact: saved name, then
    /// push name, then the bare phone number.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.push_name.as_deref())
            .unwrap_or(&self.phone_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(now: DateTime<Utc>) -> Contact {
        Contact {
            contact_id: "1234567890@c.us".to_string(),
            phone_number: "+1234567890".to_string(),
            name: None,
            push_name: None,
            short_name: None,
            is_group: false,
            is_blocked: false,
            is_my_contact: true,
            cached_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn prefers_saved_name() {
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let mut contact = base(now);
        contact.name = Some("Alice".to_string());
        contact.push_name = Some("ally".to_string());
        assert_eq!(contact.display_name(), "Alice");
    }

    #[test]
    fn falls_back_to_push_name() {
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let mut contact = base(now);
        contact.push_name = Some("ally".to_string());
        assert_eq!(contact.display_name(), "ally");
    }

    #[test]
    fn falls_back_to_phone_number() {
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let contact = base(now);
        assert_eq!(contact.display_name(), "+1234567890");
    }
}
