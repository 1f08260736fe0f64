//! WhatsApp engine integration
//!
//! A thin REST client implementing `application::ports::WhatsAppEnginePort`
//! against a session-scoped WhatsApp engine, plus the webhook envelope
//! types the presentation layer's intake handler deserializes.

pub mod client;
pub mod webhook;

pub use client::{WhatsAppClient, WhatsAppClientConfig, WhatsAppError};
pub use webhook::{MediaPayload, ReactionPayload, WebhookEnvelope, WebhookEvent, WebhookPayload};
