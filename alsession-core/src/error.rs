//! Unified error handling for session state
//!
//! Structured error types with context and recovery suggestions. Resolution
//! failures fan out to every waiter on a guard, so they travel as `Arc<SessionError>`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};

pub type SessionResult<T> = Result<T, SessionError>;

/// Error context providing additional information for debugging and recovery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorContext {
    /// Unique error ID for tracking
    pub error_id: String,
    /// Timestamp when error occurred
    pub timestamp: DateTime<Utc>,
    /// Component where error originated
    pub component: String,
    /// Operation being performed when error occurred
    pub operation: Option<String>,
    /// Additional metadata
    pub metadata: HashMap<String, String>,
    /// Recovery suggestions
    pub recovery_suggestions: Vec<String>,
}

impl ErrorContext {
    pub fn new(component: &str) -> Self {
        Self {
            error_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            component: component.to_string(),
            operation: None,
            metadata: HashMap::new(),
            recovery_suggestions: Vec::new(),
        }
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.recovery_suggestions.push(suggestion.to_string());
        self
    }
}

/// Main error type for session state management
#[derive(Error, Debug)]
pub enum SessionError {
    /// A session descriptor or persisted record did not have the expected shape
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        context: ErrorContext,
    },

    #[error("Authentication error: {message}")]
    Authentication {
        message: String,
        context: ErrorContext,
    },

    /// `set_acting_account` was called without an account or identifier
    #[error("Must supply an account or account identifier")]
    MissingAccount,

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// An identity, entitlement or feature backend call failed
    #[error("Collaborator error: {message}")]
    Collaborator {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    #[error("Feature data error: {message}")]
    FeatureData {
        message: String,
        path: Option<String>,
        context: ErrorContext,
    },

    #[error("Operation timeout: {operation}")]
    Timeout {
        operation: String,
        duration_ms: u64,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
        context: ErrorContext,
    },

    /// The session was deactivated while a resolution was outstanding
    #[error("Session was deactivated before account resolution completed")]
    Deactivated,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl SessionError {
    /// Get the error context
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            SessionError::Validation { context, .. } => Some(context),
            SessionError::Authentication { context, .. } => Some(context),
            SessionError::Storage { context, .. } => Some(context),
            SessionError::Collaborator { context, .. } => Some(context),
            SessionError::FeatureData { context, .. } => Some(context),
            SessionError::Timeout { context, .. } => Some(context),
            SessionError::Config { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Check if error is recoverable by the caller retrying the same operation
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::Collaborator { .. } | SessionError::Timeout { .. }
        )
    }

    /// Log the error with appropriate level
    pub fn log(&self) {
        match self {
            SessionError::Validation { .. } | SessionError::Config { .. } => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Configuration or validation error"
                );
            }
            SessionError::Collaborator { .. } | SessionError::Timeout { .. } => {
                warn!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Collaborator or timeout error (may be recoverable)"
                );
            }
            SessionError::MissingAccount | SessionError::Deactivated => {
                warn!(error = %self, "Session operation rejected");
            }
            _ => {
                error!(
                    error_id = ?self.context().map(|c| &c.error_id),
                    error = %self,
                    "Error occurred"
                );
            }
        }
    }
}

/// Convenience macros for creating errors with context
#[macro_export]
macro_rules! validation_error {
    ($msg:expr, $field:expr, $component:expr) => {
        $crate::SessionError::Validation {
            message: $msg.to_string(),
            field: Some($field.to_string()),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check the field value and format"),
        }
    };
}

#[macro_export]
macro_rules! collaborator_error {
    ($msg:expr, $component:expr) => {
        $crate::SessionError::Collaborator {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component),
        }
    };
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SessionError::Collaborator {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component),
        }
    };
}

#[macro_export]
macro_rules! config_error {
    ($msg:expr, $component:expr) => {
        $crate::SessionError::Config {
            message: $msg.to_string(),
            source: None,
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check your session configuration file"),
        }
    };
}

#[macro_export]
macro_rules! storage_error {
    ($msg:expr, $component:expr, $source:expr) => {
        $crate::SessionError::Storage {
            message: $msg.to_string(),
            source: Some(Box::new($source)),
            context: $crate::ErrorContext::new($component)
                .with_suggestion("Check that the storage location exists and is writable"),
        }
    };
}
