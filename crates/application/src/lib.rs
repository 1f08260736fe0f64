//! Application layer - Use cases and orchestration
//!
//! Contains the bridge orchestration logic, port definitions, and
//! domain-adjacent services. Depends only on `domain` and async/tracing
//! infrastructure; never on a concrete adapter crate.

pub mod error;
pub mod ports;
pub mod privacy;
pub mod services;

pub use error::BridgeError;
pub use ports::*;
pub use privacy::MaskingMode;
pub use services::*;
