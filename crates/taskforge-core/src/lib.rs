//! # taskforge-core
//!
//! Core types, traits, and abstractions for the taskforge multi-tenant board.
//!
//! This crate provides the domain model (tenants, groups, tasks), the error
//! type, and the trait seams every other crate implements or consumes.

pub mod connection_string;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod outcome;
pub mod traits;
pub mod uuid_utils;

// Re-export commonly used types at crate root
pub use connection_string::redact_connection_string;
pub use error::{Error, Result};
pub use models::*;
pub use outcome::ActionResult;
pub use traits::*;
pub use uuid_utils::new_v7;
