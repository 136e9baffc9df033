//! Kenyan MSISDN normalization.

use std::fmt::Display;

/// Normalize a phone number to the `254XXXXXXXXX` form Daraja expects.
///
/// 9 characters get `254` prepended, 10 characters lose their leading digit
/// and get `254` prepended. Any other length is returned as-is, including
/// already prefixed 12-digit numbers. Malformed numbers are not rejected
/// here. Empty input and `0` yield `None`.
pub fn normalize_phone_number(phone: impl Display) -> Option<String> {
    let phone = phone.to_string();
    if phone.is_empty() || phone == "0" {
        return None;
    }
    let normalized = match phone.chars().count() {
        9 => format!("254{phone}"),
        10 => format!("254{}", phone.chars().skip(1).collect::<String>()),
        _ => phone,
    };
    Some(normalized)
}
