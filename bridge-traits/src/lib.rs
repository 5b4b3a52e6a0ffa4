//! # Host Bridge Traits
//!
//! Storage abstraction that the media library core is written against.
//!
//! ## Overview
//!
//! The core never talks to a database driver directly. Every query unit
//! receives a [`DatabaseAdapter`](database::DatabaseAdapter) and issues
//! parameterized statements through it, so the relational engine can be
//! swapped (native sqlx today, anything that speaks SQL tomorrow) without
//! touching the query code.
//!
//! ## Error Handling
//!
//! Adapters report failures through [`BridgeError`](error::BridgeError).
//! Implementations should:
//!
//! - Convert driver-specific errors to `BridgeError`
//! - Provide actionable error messages
//! - Include error context (statement kind, parameter counts)
//!
//! ## Thread Safety
//!
//! Adapters must be `Send + Sync` so that a worker thread can own them while
//! query units borrow them across `.await` points.

pub mod database;
pub mod error;

pub use database::{DatabaseAdapter, DatabaseConfig, QueryRow, QueryValue, TransactionId};
pub use error::BridgeError;
