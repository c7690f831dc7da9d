//! ID generation utilities.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a unique turn ID.
///
/// # Example
///
/// ```rust
/// use smoothchat_core::identifier::generate_turn_id;
///
/// let id = generate_turn_id();
/// assert!(id.starts_with("turn_"));
/// assert_eq!(id.len(), 37); // "turn_" + 32 hex chars
/// ```
#[must_use]
pub fn generate_turn_id() -> String {
    format!("turn_{}", Uuid::new_v4().simple())
}

/// Current UTC timestamp.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}
