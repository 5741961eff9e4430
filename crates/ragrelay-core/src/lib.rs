//! # RagRelay Core
//!
//! Configuration, error taxonomy, wire types and the upstream provider trait
//! shared by every RagRelay crate.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::RelayConfig;
pub use error::{RelayError, Result};
pub use traits::{ChatProvider, ChunkStream};
