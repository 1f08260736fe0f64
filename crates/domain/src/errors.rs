//! Domain-level errors
//!
//! Pure validation and invariant failures that do not depend on any
//! infrastructure concern (no IO, no network, no timing).

use thiserror::Error;

/// Errors raised while constructing or validating domain types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A phone number failed E.164-ish validation (see `PhoneNumber`)
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),

    /// A WhatsApp chat id (jid) was malformed
    #[error("invalid whatsapp chat id: {0}")]
    InvalidChatId(String),

    /// A session name failed validation
    #[error("invalid session name: {0}")]
    InvalidSessionName(String),

    /// A channel definition was invalid (empty field, duplicate, etc.)
    #[error("invalid channel configuration: {0}")]
    InvalidChannel(String),

    /// The channel set as a whole was invalid (e.g. zero channels)
    #[error("invalid channel set: {0}")]
    InvalidChannelSet(String),

    /// A message mapping violated one of its invariants
    #[error("invalid message mapping: {0}")]
    InvalidMessageMapping(String),
}
