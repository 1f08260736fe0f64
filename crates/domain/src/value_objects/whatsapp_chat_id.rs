//! WhatsApp chat id (jid) value object
//!
//! A WhatsApp chat id is one of three shapes:
//!   - `<digits>@c.us`   — a direct contact
//!   - `<digits>@g.us`   — a group
//!   - `<digits>@lid`    — a WhatsApp internal linked identity, not
//!     resolvable through the contacts API (see `GLOSSARY`)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::validation::validate_suffixed_id;

/// Suffix kind of a WhatsApp chat id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatIdKind {
    /// `@c.us` — direct contact
    Contact,
    /// `@g.us` — group
    Group,
    /// `@lid` — internal linked identity
    LinkedId,
}

/// A validated WhatsApp chat id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WhatsAppChatId(String);

impl WhatsAppChatId {
    const GROUP_SUFFIX: &'static str = "@g.us";
    const LID_SUFFIX: &'static str = "@lid";
    const CONTACT_SUFFIX: &'static str = "@c.us";

    /// Parse and validate a WhatsApp chat id
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();

        let local = value
            .strip_suffix(Self::GROUP_SUFFIX)
            .or_else(|| value.strip_suffix(Self::LID_SUFFIX))
            .or_else(|| value.strip_suffix(Self::CONTACT_SUFFIX))
            .ok_or_else(|| DomainError::InvalidChatId(value.clone()))?;

        if !validate_suffixed_id(local) {
            return Err(DomainError::InvalidChatId(value));
        }

        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn kind(&self) -> ChatIdKind {
        if self.0.ends_with(Self::GROUP_SUFFIX) {
            ChatIdKind::Group
        } else if self.0.ends_with(Self::LID_SUFFIX) {
            ChatIdKind::LinkedId
        } else {
            ChatIdKind::Contact
        }
    }

    #[must_use]
    pub fn is_group(&self) -> bool {
        self.kind() == ChatIdKind::Group
    }

    /// The numeric id without its platform suffix
    #[must_use]
    pub fn numeric_id(&self) -> &str {
        self.0
            .strip_suffix(Self::GROUP_SUFFIX)
            .or_else(|| self.0.strip_suffix(Self::LID_SUFFIX))
            .or_else(|| self.0.strip_suffix(Self::CONTACT_SUFFIX))
            .unwrap_or(&self.0)
    }
}

impl fmt::Display for WhatsAppChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
