//! Share token shape validation.
//!
//! Runs before any counter or store call so that malformed requests cost
//! nothing beyond a length check.

/// Exact length of every share token.
pub const TOKEN_LEN: usize = 32;

/// Returns true iff `raw` is exactly 32 ASCII alphanumeric characters.
pub fn validate(raw: &str) -> bool {
    raw.len() == TOKEN_LEN && raw.bytes().all(|b| b.is_ascii_alphanumeric())
}
