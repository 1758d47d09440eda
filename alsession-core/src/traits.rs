//! Collaborator trait definitions
//!
//! The session core never talks to a backend directly. Identity, entitlement,
//! feature and storage services are reached through these traits so that
//! transports can be swapped and tests can substitute in-memory doubles.

use crate::error::SessionResult;
use crate::types::*;
use async_trait::async_trait;
use serde_json::Value;

/// Identity/account backend
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Full account record for an account id
    async fn get_account_details(&self, account_id: &str) -> SessionResult<AimsAccount>;

    /// Accounts managed by the given primary account
    async fn get_managed_accounts(&self, primary_account_id: &str)
        -> SessionResult<Vec<AimsAccount>>;
}

/// Entitlement backend
#[async_trait]
pub trait EntitlementSource: Send + Sync {
    async fn get_entitlements(&self, account_id: &str) -> SessionResult<EntitlementCollection>;
}

/// Source of raw FOX (features/options/experiences) data
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Raw feature tree for an account; `Value::Null` when nothing is configured
    async fn get_feature_data(&self, account_id: &str) -> SessionResult<Value>;
}

/// Source of service endpoint data attached to resolved metadata
#[async_trait]
pub trait EndpointsSource: Send + Sync {
    async fn get_endpoints(&self, account_id: &str) -> SessionResult<Value>;
}

/// Credential exchange backend
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange username/password (and optionally an MFA code) for a session record
    async fn authenticate(
        &self,
        username: &str,
        password: &str,
        mfa_code: Option<&str>,
    ) -> SessionResult<Value>;

    /// Complete an MFA challenge using the session token it was issued with
    async fn authenticate_with_mfa_session_token(
        &self,
        session_token: &str,
        mfa_code: &str,
    ) -> SessionResult<Value>;

    /// Look up the authentication descriptor behind an existing access token
    async fn get_token_info(&self, access_token: &str) -> SessionResult<Value>;
}

/// Namespaced persistent key/value storage
pub trait Cabinet: Send + Sync {
    /// Namespace this cabinet stores under
    fn namespace(&self) -> &str;

    fn get(&self, key: &str) -> SessionResult<Option<Value>>;

    fn set(&self, key: &str, value: Value) -> SessionResult<()>;

    fn remove(&self, key: &str) -> SessionResult<()>;

    /// Erase everything in the namespace
    fn destroy(&self) -> SessionResult<()>;
}
