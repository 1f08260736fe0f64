//! A cached WhatsApp group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::SessionName;

/// A locally cached snapshot of a WhatsApp group's metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub group_id: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub participant_count: u32,
    pub session_name: SessionName,
    pub cached_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    /// The best available label for this group: its subject, else its
    /// raw group id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.subject.as_deref().unwrap_or(&self.group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(now: DateTime<Utc>) -> Group {
        Group {
            group_id: "123456789012345@g.us".to_string(),
            subject: None,
            description: None,
            participant_count: 3,
            session_name: SessionName::new("personal").unwrap(),
            cached_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn prefers_subject() {
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let mut group = base(now);
        group.subject = Some("Family".to_string());
        assert_eq!(group.display_name(), "Family");
    }

    #[test]
    fn falls_back_to_group_id() {
        let now = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let group = base(now);
        assert_eq!(group.display_name(), "123456789012345@g.us");
    }
}
