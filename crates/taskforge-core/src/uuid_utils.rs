//! UUID v7 utilities for time-ordered identifiers.
//!
//! Group and task ids are UUIDv7 so rows sort by creation time without an
//! extra index.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
