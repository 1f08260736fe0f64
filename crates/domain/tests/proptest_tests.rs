//! Property-based tests for domain value objects
//!
//! These tests use proptest to verify invariants across many random inputs.

use domain::value_objects::{PhoneNumber, SessionName, WhatsAppChatId};
use proptest::prelude::*;

mod phone_number_tests {
    use super::*;

    proptest! {
        #[test]
        fn valid_digit_strings_accepted(digits in "[0-9]{7,20}") {
            let result = PhoneNumber::new(digits.clone());
            prop_assert!(result.is_ok());
            let phone = result.unwrap();
            prop_assert_eq!(phone.digits(), digits);
        }

        #[test]
        fn plus_prefixed_digit_strings_accepted(digits in "[0-9]{7,20}") {
            let with_plus = format!("+{digits}");
            let result = PhoneNumber::new(with_plus);
            prop_assert!(result.is_ok());
            let phone = result.unwrap();
            prop_assert_eq!(phone.digits(), digits);
        }

        #[test]
        fn too_short_digit_strings_rejected(digits in "[0-9]{1,6}") {
            prop_assert!(PhoneNumber::new(digits).is_err());
        }

        #[test]
        fn too_long_digit_strings_rejected(digits in "[0-9]{21,30}") {
            prop_assert!(PhoneNumber::new(digits).is_err());
        }

        #[test]
        fn strings_with_letters_rejected(
            digits in "[0-9]{3,10}",
            letters in "[a-zA-Z]{1,5}"
        ) {
            let mixed = format!("{digits}{letters}");
            prop_assert!(PhoneNumber::new(mixed).is_err());
        }

        #[test]
        fn serialization_roundtrip(digits in "[0-9]{7,20}") {
            let phone = PhoneNumber::new(digits).unwrap();
            let json = serde_json::to_string(&phone).unwrap();
            let deserialized: PhoneNumber = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(phone, deserialized);
        }
    }
}

mod whatsapp_chat_id_tests {
    use super::*;

    proptest! {
        #[test]
        fn valid_contact_ids_accepted(digits in "[0-9]{7,25}") {
            let id = format!("{digits}@c.us");
            let result = WhatsAppChatId::new(id);
            prop_assert!(result.is_ok());
            prop_assert!(!result.unwrap().is_group());
        }

        #[test]
        fn valid_group_ids_accepted(digits in "[0-9]{7,25}") {
            let id = format!("{digits}@g.us");
            let result = WhatsAppChatId::new(id);
            prop_assert!(result.is_ok());
            prop_assert!(result.unwrap().is_group());
        }

        #[test]
        fn unknown_suffixes_rejected(digits in "[0-9]{7,25}", suffix in "[a-z.]{3,12}") {
            prop_assume!(!["c.us", "g.us", "lid"].contains(&suffix.as_str()));
            let id = format!("{digits}@{suffix}");
            prop_assert!(WhatsAppChatId::new(id).is_err());
        }

        #[test]
        fn numeric_id_strips_suffix(digits in "[0-9]{7,25}") {
            let id = WhatsAppChatId::new(format!("{digits}@c.us")).unwrap();
            prop_assert_eq!(id.numeric_id(), digits);
        }
    }
}

mod session_name_tests {
    use super::*;

    proptest! {
        #[test]
        fn nonempty_names_accepted(name in "[a-zA-Z0-9_-]{1,40}") {
            let result = SessionName::new(name.clone());
            prop_assert!(result.is_ok());
            let session_name = result.unwrap();
            prop_assert_eq!(session_name.as_str(), name);
        }

        #[test]
        fn whitespace_only_names_rejected(spaces in " {1,10}") {
            prop_assert!(SessionName::new(spaces).is_err());
        }
    }
}
