//! Channel Router — bijective map between WhatsApp sessions and Signal
//! destinations (spec §4.A)
//!
//! Configuration is immutable after construction; validation happens
//! once at build time so that every later lookup is infallible.

use std::collections::HashMap;

use parking_lot::RwLock;

use domain::entities::Channel;

use crate::error::BridgeError;

struct RouterTable {
    /// Config order, preserved for deterministic recovery heuristics.
    sessions: Vec<String>,
    by_session: HashMap<String, String>,
    by_destination: HashMap<String, String>,
}

/// An immutable, thread-safe bijection between session names and
/// Signal destination numbers.
#[derive(Debug)]
pub struct ChannelRouter {
    table: RwLock<RouterTable>,
}

impl std::fmt::Debug for RouterTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterTable")
            .field("sessions", &self.sessions)
            .finish()
    }
}

impl ChannelRouter {
    /// Build a router from configured channels, failing precisely on
    /// empty fields, duplicate sessions/destinations, or an empty set.
    pub fn new(channels: Vec<Channel>) -> Result<Self, BridgeError> {
        if channels.is_empty() {
            return Err(BridgeError::Configuration(
                "at least one channel must be configured".to_string(),
            ));
        }

        let mut sessions = Vec::with_capacity(channels.len());
        let mut by_session = HashMap::with_capacity(channels.len());
        let mut by_destination = HashMap::with_capacity(channels.len());

        for channel in channels {
            let session = channel.session_name.as_str().to_string();
            let destination = channel.signal_destination.as_str().to_string();

            if by_session.contains_key(&session) {
                return Err(BridgeError::Configuration(format!(
                    "duplicate session name: {session}"
                )));
            }
            if by_destination.contains_key(&destination) {
                return Err(BridgeError::Configuration(format!(
                    "duplicate signal destination: {destination}"
                )));
            }

            sessions.push(session.clone());
            by_session.insert(session.clone(), destination.clone());
            by_destination.insert(destination, session);
        }

        Ok(Self {
            table: RwLock::new(RouterTable {
                sessions,
                by_session,
                by_destination,
            }),
        })
    }

    /// The Signal destination paired with `session`.
    pub fn destination_of(&self, session: &str) -> Result<String, BridgeError> {
        self.table
            .read()
            .by_session
            .get(session)
            .cloned()
            .ok_or_else(|| BridgeError::NotFound(format!("no channel for session {session}")))
    }

    /// The session paired with `destination`.
    pub fn session_of(&self, destination: &str) -> Result<String, BridgeError> {
        self.table
            .read()
            .by_destination
            .get(destination)
            .cloned()
            .ok_or_else(|| {
                BridgeError::NotFound(format!("no channel for destination {destination}"))
            })
    }

    /// All configured session names, in configuration order.
    #[must_use]
    pub fn all_sessions(&self) -> Vec<String> {
        self.table.read().sessions.clone()
    }

    /// All configured destinations, in no particular order.
    #[must_use]
    pub fn all_destinations(&self) -> Vec<String> {
        self.table.read().by_destination.keys().cloned().collect()
    }

    #[must_use]
    pub fn is_valid_session(&self, session: &str) -> bool {
        self.table.read().by_session.contains_key(session)
    }

    #[must_use]
    pub fn is_valid_destination(&self, destination: &str) -> bool {
        self.table.read().by_destination.contains_key(destination)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.table.read().sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(session: &str, destination: &str) -> Channel {
        Channel::new(session, destination).unwrap()
    }

    #[test]
    fn rejects_empty_channel_set() {
        assert!(ChannelRouter::new(Vec::new()).is_err());
    }

    #[test]
    fn rejects_duplicate_session() {
        let channels = vec![
            channel("personal", "+1111111111"),
            channel("personal", "+2222222222"),
        ];
        assert!(ChannelRouter::new(channels).is_err());
    }

    #[test]
    fn rejects_duplicate_destination() {
        let channels = vec![
            channel("personal", "+1111111111"),
            channel("business", "+1111111111"),
        ];
        assert!(ChannelRouter::new(channels).is_err());
    }

    #[test]
    fn is_bijective() {
        let channels = vec![
            channel("personal", "+1111111111"),
            channel("business", "+2222222222"),
        ];
        let router = ChannelRouter::new(channels).unwrap();

        for session in router.all_sessions() {
            let destination = router.destination_of(&session).unwrap();
            assert_eq!(router.session_of(&destination).unwrap(), session);
        }
    }

    #[test]
    fn preserves_configuration_order() {
        let channels = vec![
            channel("first", "+1111111111"),
            channel("second", "+2222222222"),
            channel("third", "+3333333333"),
        ];
        let router = ChannelRouter::new(channels).unwrap();
        assert_eq!(router.all_sessions(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unknown_lookups_fail() {
        let router = ChannelRouter::new(vec![channel("personal", "+1111111111")]).unwrap();
        assert!(router.destination_of("missing").is_err());
        assert!(router.session_of("+9999999999").is_err());
        assert!(!router.is_valid_session("missing"));
        assert!(!router.is_valid_destination("+9999999999"));
    }

    #[test]
    fn count_matches_configured_channels() {
        let channels = vec![
            channel("personal", "+1111111111"),
            channel("business", "+2222222222"),
        ];
        let router = ChannelRouter::new(channels).unwrap();
        assert_eq!(router.count(), 2);
    }
}
