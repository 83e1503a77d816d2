//! Ordering-prefix conventions for set directory names.
//!
//! A `00` prefix on a set directory (`00-spring`) is an authoring marker. The
//! listing still orders sets by their raw directory name, where a `00` name
//! sorts below names starting with letters or later digits. URLs and display
//! use the *link name* with the prefix stripped.
//!
//! - `"00-spring"` → link name `"spring"`
//! - `"00_spring"` → link name `"spring"`
//! - `"2023-fall"` → link name `"2023-fall"` (no `00` prefix)

/// Ordering marker stripped from link names.
pub const ORDER_PREFIX: &str = "00";

/// Strip the `00` ordering prefix and the separator following it.
///
/// Only a single non-alphanumeric character after the prefix is treated as
/// the separator, so `"00spring"` keeps its letters.
pub fn link_name(name: &str) -> String {
    match name.strip_prefix(ORDER_PREFIX) {
        Some(rest) => {
            let mut chars = rest.chars();
            match chars.next() {
                Some(c) if !c.is_alphanumeric() => chars.as_str().to_string(),
                _ => rest.to_string(),
            }
        }
        None => name.to_string(),
    }
}

/// A year segment is exactly four ASCII digits.
pub fn is_year(segment: &str) -> bool {
    segment.len() == 4 && segment.bytes().all(|b| b.is_ascii_digit())
}
