//! Session types and collaborator wiring

use alsession_core::{
    AccountDirectory, AimsAccount, AimsUser, Authenticator, EndpointsSource, EntitlementCollection,
    EntitlementSource, FeatureSource, SessionError,
};
use alsession_fox::FoxSnapshot;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Result of anything that waits on account resolution. Resolution errors
/// are shared between all waiters, hence the `Arc`.
pub type ResolutionResult<T> = Result<T, Arc<SessionError>>;

/// Everything resolved for one acting account in one resolution epoch
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMetadata {
    pub user: AimsUser,
    pub primary_account: AimsAccount,
    pub acting_account: AimsAccount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managed_accounts: Option<Vec<AimsAccount>>,
    pub primary_entitlements: EntitlementCollection,
    pub effective_entitlements: EntitlementCollection,
    pub fox_data: FoxSnapshot,
    pub endpoints_data: Option<Value>,
}

/// An acting account given either in full or by id only
#[derive(Debug, Clone, PartialEq)]
pub enum ActingAccountRef {
    Id(String),
    Account(AimsAccount),
}

impl ActingAccountRef {
    pub fn id(&self) -> &str {
        match self {
            ActingAccountRef::Id(id) => id,
            ActingAccountRef::Account(account) => &account.id,
        }
    }
}

impl From<AimsAccount> for ActingAccountRef {
    fn from(account: AimsAccount) -> Self {
        ActingAccountRef::Account(account)
    }
}

impl From<&str> for ActingAccountRef {
    fn from(id: &str) -> Self {
        ActingAccountRef::Id(id.to_string())
    }
}

impl From<String> for ActingAccountRef {
    fn from(id: String) -> Self {
        ActingAccountRef::Id(id)
    }
}

/// Overrides applied while establishing a session
#[derive(Debug, Clone, Default)]
pub struct AuthenticationOptions {
    /// Act as this account instead of the primary account
    pub acting_account: Option<ActingAccountRef>,
    /// Start with this location instead of the acting account's default
    pub location_id: Option<String>,
}

/// Backends the session talks to
#[derive(Clone)]
pub struct SessionClients {
    pub accounts: Arc<dyn AccountDirectory>,
    pub entitlements: Arc<dyn EntitlementSource>,
    pub features: Arc<dyn FeatureSource>,
    pub endpoints: Option<Arc<dyn EndpointsSource>>,
    pub authenticator: Option<Arc<dyn Authenticator>>,
}

impl SessionClients {
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        entitlements: Arc<dyn EntitlementSource>,
        features: Arc<dyn FeatureSource>,
    ) -> Self {
        Self {
            accounts,
            entitlements,
            features,
            endpoints: None,
            authenticator: None,
        }
    }

    pub fn with_endpoints(mut self, endpoints: Arc<dyn EndpointsSource>) -> Self {
        self.endpoints = Some(endpoints);
        self
    }

    pub fn with_authenticator(mut self, authenticator: Arc<dyn Authenticator>) -> Self {
        self.authenticator = Some(authenticator);
        self
    }
}

impl std::fmt::Debug for SessionClients {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionClients")
            .field("endpoints", &self.endpoints.is_some())
            .field("authenticator", &self.authenticator.is_some())
            .finish_non_exhaustive()
    }
}
