//! Signal daemon integration
//!
//! Owns the JSON-RPC/REST client against the polled Signal daemon
//! (spec §6) and the long-poll loop that drives `MessageService`
//! (spec §4.H), mirroring `integration_whatsapp`'s one-crate-per-
//! collaborator convention.

pub mod client;
pub mod error;
pub mod poller;

pub use client::{SignalClient, SignalClientConfig};
pub use error::SignalError;
pub use poller::{DeviceInit, Poll, PollerConfig, SignalDaemonDeviceInit, SignalPoller};
