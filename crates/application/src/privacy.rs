//! Privacy/logging helpers — phone, message-id, and content masking
//! used throughout the bridge before anything reaches a log line
//! (spec §4.M)
//!
//! Masking is controlled by an explicit `MaskingMode` passed at each
//! call site rather than a generic keyed context map: the call site
//! always knows statically whether it is in a verbose debugging path,
//! so a typed parameter closes off the stringly-keyed collision risk
//! without the indirection of a context lookup.

/// Whether masking is active for a given logging call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskingMode {
    /// Mask phones, message ids, and content before logging.
    Masked,
    /// Log values as-is; only used on opt-in debug paths.
    Verbose,
}

/// Mask a phone number to `"***" + last4`.
#[must_use]
pub fn mask_phone(phone: &str, mode: MaskingMode) -> String {
    if mode == MaskingMode::Verbose {
        return phone.to_string();
    }
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return "***".to_string();
    }
    format!("***{}", &digits[digits.len() - 4..])
}

/// Mask a message id to its first 8 characters plus an ellipsis.
#[must_use]
pub fn mask_message_id(id: &str, mode: MaskingMode) -> String {
    if mode == MaskingMode::Verbose {
        return id.to_string();
    }
    if id.len() <= 8 {
        format!("{id}...")
    } else {
        format!("{}...", &id[..8])
    }
}

/// Mask message content entirely.
#[must_use]
pub fn mask_content(content: &str, mode: MaskingMode) -> String {
    if mode == MaskingMode::Verbose {
        content.to_string()
    } else {
        "[hidden]".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_phone_to_last_four() {
        assert_eq!(mask_phone("+1234567890", MaskingMode::Masked), "***7890");
    }

    #[test]
    fn masks_short_phone_fully() {
        assert_eq!(mask_phone("12", MaskingMode::Masked), "***");
    }

    #[test]
    fn verbose_mode_skips_phone_masking() {
        assert_eq!(mask_phone("+1234567890", MaskingMode::Verbose), "+1234567890");
    }

    #[test]
    fn masks_message_id_to_first_eight() {
        assert_eq!(mask_message_id("abcdefghijklmnop", MaskingMode::Masked), "abcdefgh...");
    }

    #[test]
    fn short_message_id_still_gets_ellipsis() {
        assert_eq!(mask_message_id("abc", MaskingMode::Masked), "abc...");
    }

    #[test]
    fn verbose_mode_skips_id_masking() {
        assert_eq!(mask_message_id("abcdefghijklmnop", MaskingMode::Verbose), "abcdefghijklmnop");
    }

    #[test]
    fn masks_content_unconditionally_in_masked_mode() {
        assert_eq!(mask_content("hello there", MaskingMode::Masked), "[hidden]");
    }

    #[test]
    fn verbose_mode_reveals_content() {
        assert_eq!(mask_content("hello there", MaskingMode::Verbose), "hello there");
    }
}
