//! # Address Codec
//!
//! Canonical text forms for addresses and build identifiers.
//!
//! Every address that leaves this crate is rendered as lowercase hex with a
//! `0x` prefix and no padding (`0x1a2b`), and every build identifier as an
//! uppercase, hyphen-grouped UUID (`12345678-90AB-CDEF-1234-567890ABCDEF`).
//! Symbolication services key on these strings, so the formatting must be
//! stable and the parsing lenient.

use std::borrow::Cow;

use uuid::Uuid;

/// Number of hex digits in a 128-bit build identifier.
const UUID_HEX_DIGITS: usize = 32;

/// Format an address as `0x`-prefixed lowercase hex without leading zeros.
///
/// ```rust
/// use stackmark_core::codec::format_hex;
///
/// assert_eq!(format_hex(0x1_0000_4000), "0x100004000");
/// assert_eq!(format_hex(0), "0x0");
/// ```
pub fn format_hex(value: u64) -> String
{
    format!("{value:#x}")
}

/// Parse a hexadecimal address.
///
/// A `0x`/`0X` prefix is optional. Surrounding whitespace is ignored. Anything
/// that is not a hex integer fitting in 64 bits yields `None`.
///
/// ```rust
/// use stackmark_core::codec::parse_hex;
///
/// assert_eq!(parse_hex("0x100004000"), Some(0x1_0000_4000));
/// assert_eq!(parse_hex("0XFF"), Some(0xff));
/// assert_eq!(parse_hex("ff"), Some(0xff));
/// assert_eq!(parse_hex("0x"), None);
/// assert_eq!(parse_hex("zz"), None);
/// ```
pub fn parse_hex(text: &str) -> Option<u64>
{
    let trimmed = text.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);

    // from_str_radix tolerates a leading '+', hex text never carries one
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    u64::from_str_radix(digits, 16).ok()
}

/// Format a raw 16-byte build identifier as canonical UUID text.
pub fn format_uuid_bytes(bytes: &[u8; 16]) -> String
{
    let mut buffer = Uuid::encode_buffer();
    Uuid::from_bytes(*bytes).hyphenated().encode_upper(&mut buffer).to_owned()
}

/// Normalize UUID text to the canonical uppercase 8-4-4-4-12 form.
///
/// Hyphens are stripped before inspection, so both grouped and ungrouped
/// inputs of either case are accepted. Input that does not consist of exactly
/// 32 hex digits once hyphens are removed is returned unchanged.
///
/// ```rust
/// use stackmark_core::codec::normalize_uuid;
///
/// assert_eq!(
///     normalize_uuid("1234567890abcdef1234567890abcdef"),
///     "12345678-90AB-CDEF-1234-567890ABCDEF"
/// );
/// assert_eq!(normalize_uuid("not-a-uuid"), "not-a-uuid");
/// ```
pub fn normalize_uuid(text: &str) -> Cow<'_, str>
{
    let digits: String = text.chars().filter(|c| *c != '-').collect();
    if digits.len() != UUID_HEX_DIGITS || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Cow::Borrowed(text);
    }
    let Ok(uuid) = Uuid::try_parse(&digits) else {
        return Cow::Borrowed(text);
    };

    let mut buffer = Uuid::encode_buffer();
    let canonical = uuid.hyphenated().encode_upper(&mut buffer);
    if canonical == text {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(canonical.to_owned())
    }
}
