//! ResolveIT Shared Types
//!
//! Domain types and errors shared by the real-time client and the tools built on it.

pub mod error;
pub mod types;

pub use error::*;
pub use types::*;
