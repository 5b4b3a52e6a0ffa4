//! Workspace placeholder crate.
//!
//! Host applications can depend on `medialib-workspace` to pull in the
//! synchronous data provider without wiring each workspace crate
//! individually.

pub use core_service::*;
