//! Domain entities

mod channel;
mod contact;
mod group;
mod message_mapping;
mod pending_signal_message;

pub use channel::Channel;
pub use contact::Contact;
pub use group::Group;
pub use message_mapping::MessageMapping;
pub use pending_signal_message::PendingSignalMessage;
