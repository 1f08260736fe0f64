//! Channel configuration: WhatsApp session ↔ Signal destination pairs.

use application::BridgeError;
use domain::entities::Channel;
use domain::value_objects::{PhoneNumber, SessionName};
use serde::{Deserialize, Serialize};

/// One configured `(whatsapp_session, signal_destination)` pairing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelConfig {
    pub whatsapp_session_name: String,
    pub signal_destination_phone_number: String,
}

/// Parse configured channel pairs into validated domain entities, in
/// the order they were declared.
pub fn into_domain_channels(configs: &[ChannelConfig]) -> Result<Vec<Channel>, BridgeError> {
    configs
        .iter()
        .map(|c| {
            let session = SessionName::new(&c.whatsapp_session_name)?;
            let destination = PhoneNumber::new(&c.signal_destination_phone_number)?;
            Channel::new(session, destination).map_err(BridgeError::from)
        })
        .collect()
}
