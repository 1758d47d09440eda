//! alsession core - shared infrastructure for console session state
//!
//! Error types, logging, configuration, the `Guard` completion signal, the
//! identity/entitlement data model and the traits that collaborators implement.

pub mod async_utils;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod traits;
pub mod types;

pub use async_utils::*;
pub use config::*;
pub use error::*;
pub use guard::*;
pub use logging::*;
pub use traits::*;
pub use types::*;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use serde_json;
