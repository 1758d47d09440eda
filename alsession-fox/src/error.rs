//! Parser errors

use thiserror::Error;

pub type FoxResult<T> = Result<T, FoxError>;

/// Structural problems in raw feature data. `path` is the dotted location of
/// the offending value, empty for the root.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FoxError {
    #[error("Feature data at '{path}' is not an object (found {found})")]
    NotAnObject { path: String, found: &'static str },

    #[error("Experience descriptor at '{path}' is not valid: {reason}")]
    InvalidExperience { path: String, reason: String },
}

impl FoxError {
    /// Dotted path of the offending value
    pub fn path(&self) -> &str {
        match self {
            FoxError::NotAnObject { path, .. } => path,
            FoxError::InvalidExperience { path, .. } => path,
        }
    }
}
