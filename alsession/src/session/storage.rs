//! Session record persistence
//!
//! The persisted record is a single mutable slot in a namespaced cabinet.
//! Anything read back that is malformed or expired is erased on the spot so
//! that tampered or stale values never reach the rest of the session.

use alsession_core::{validation_error, Cabinet, SessionRecord, SessionResult};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Check that `raw` has the shape of a session record and convert it
pub fn validate_record(raw: &Value) -> SessionResult<SessionRecord> {
    let record: SessionRecord = serde_json::from_value(raw.clone()).map_err(|e| {
        validation_error!(
            format!("Malformed session record: {}", e),
            "authentication",
            "session_storage"
        )
    })?;

    let authentication = &record.authentication;
    if authentication.user.id.is_empty() {
        return Err(validation_error!(
            "Session user has an empty id",
            "authentication.user.id",
            "session_storage"
        ));
    }
    if authentication.account.id.is_empty() {
        return Err(validation_error!(
            "Session account has an empty id",
            "authentication.account.id",
            "session_storage"
        ));
    }
    if record.acting.as_ref().is_some_and(|acting| acting.id.is_empty()) {
        return Err(validation_error!(
            "Acting account has an empty id",
            "acting.id",
            "session_storage"
        ));
    }

    let checks = [
        ("authentication.user", authentication.user.check_attributes()),
        ("authentication.account", authentication.account.check_attributes()),
        (
            "acting",
            record
                .acting
                .as_ref()
                .map_or(Ok(()), |acting| acting.check_attributes()),
        ),
    ];
    for (field, check) in checks {
        if let Err(message) = check {
            return Err(validation_error!(
                format!("Malformed session record: {}", message),
                field,
                "session_storage"
            ));
        }
    }

    Ok(record)
}

/// Reads and writes the session record under one cabinet key
#[derive(Clone)]
pub struct RecordStore {
    cabinet: Arc<dyn Cabinet>,
    key: String,
}

impl RecordStore {
    pub fn new(cabinet: Arc<dyn Cabinet>, key: impl Into<String>) -> Self {
        Self {
            cabinet,
            key: key.into(),
        }
    }

    /// Load a usable record. Invalid or expired records are erased and
    /// reported as absent.
    pub fn load(&self) -> Option<SessionRecord> {
        let raw = match self.cabinet.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(
                    namespace = self.cabinet.namespace(),
                    key = %self.key,
                    error = %e,
                    "Failed to read persisted session"
                );
                return None;
            }
        };

        match validate_record(&raw) {
            Ok(record) if record.authentication.is_current() => {
                debug!(
                    user_id = %record.authentication.user.id,
                    "Restored persisted session"
                );
                Some(record)
            }
            Ok(record) => {
                debug!(
                    user_id = %record.authentication.user.id,
                    token_expiration = %record.authentication.token_expiration,
                    "Discarding expired persisted session"
                );
                self.erase();
                None
            }
            Err(e) => {
                warn!(
                    namespace = self.cabinet.namespace(),
                    key = %self.key,
                    error = %e,
                    "Persisted session failed validation; erasing it"
                );
                self.erase();
                None
            }
        }
    }

    /// Persist `record`. Storage failures are logged, not propagated.
    pub fn save(&self, record: &SessionRecord) {
        let result = serde_json::to_value(record)
            .map_err(Into::into)
            .and_then(|value| self.cabinet.set(&self.key, value));
        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "Failed to persist session");
        }
    }

    pub fn erase(&self) {
        if let Err(e) = self.cabinet.remove(&self.key) {
            warn!(key = %self.key, error = %e, "Failed to erase persisted session");
        }
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("namespace", &self.cabinet.namespace())
            .field("key", &self.key)
            .finish()
    }
}
