//! Container restart escalation port
//!
//! Implemented by an infrastructure adapter that performs the
//! configured restart strategy (spec §4.I, §6): `webhook` POSTs a
//! restart request, `docker` is reserved, `off` is a no-op.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::error::BridgeError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContainerRestartPort: Send + Sync {
    /// Trigger the configured restart strategy for `container_name`.
    async fn restart(&self, container_name: &str) -> Result<(), BridgeError>;
}
