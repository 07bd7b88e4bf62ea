//! # taskforge-provision
//!
//! Clients for the external services a tenant depends on.
//!
//! This crate provides:
//! - [`NeonProvisioner`]: allocates, renames and deletes tenant databases
//! - [`PineconeClient`]: creates and deletes search indexes, writes shadow records
//! - [`GeminiBackend`]: text embeddings for shadow records
//! - [`CommandMigrationRunner`]: external migration command per tenant database
//! - Index naming and environment helpers
//!
//! Enable the `mock` feature for in-memory implementations of every trait.

pub mod command;
pub mod config;
pub mod gemini;
pub mod index_name;
pub mod neon;
pub mod pinecone;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use command::CommandMigrationRunner;
pub use config::{env_or, parse_env_or, required_env, MigrationMode};
pub use gemini::{GeminiBackend, GeminiConfig};
pub use index_name::generate_index_name;
pub use neon::{extract_project_id, NeonConfig, NeonProvisioner};
pub use pinecone::{PineconeClient, PineconeConfig};
