//! Value objects shared across the bridge's domain model

mod delivery_status;
mod media_type;
mod phone_number;
mod session_name;
mod validation;
mod whatsapp_chat_id;

pub use delivery_status::DeliveryStatus;
pub use media_type::MediaType;
pub use phone_number::PhoneNumber;
pub use session_name::SessionName;
pub use validation::{MIN_PHONE_DIGITS, validate_phone_digits, validate_suffixed_id};
pub use whatsapp_chat_id::WhatsAppChatId;
