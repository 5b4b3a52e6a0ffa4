//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media library core:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the library and service crates
//! depend on. It establishes the logging conventions and the validated
//! configuration used to open a library.

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
