//! Shared fixtures and collaborator doubles for session tests

#![allow(dead_code)]

use alsession::{
    AccountDirectory, AimsAccount, Authenticator, ConsoleSession, EntitlementCollection,
    EntitlementRecord, EntitlementSource, FeatureSource, MemoryCabinet, SessionClients,
    SessionConfig, SessionResult,
};
use alsession_core::collaborator_error;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

pub const TOKEN: &str = "abig-fake.JUICY-token";

pub fn tomorrow() -> i64 {
    chrono::Utc::now().timestamp() + 86_400
}

pub fn an_hour_ago() -> i64 {
    chrono::Utc::now().timestamp() - 3_600
}

/// Authentication descriptor shaped like the identity service returns it
pub fn authentication(token_expiration: impl Into<Value>) -> Value {
    let token_expiration = token_expiration.into();
    json!({
        "user": {
            "id": "12345-ABCDE",
            "name": "Alert Logic",
            "email": "alertlogic@unknown.com",
            "active": true,
            "locked": false,
            "version": 1,
            "linked_users": [],
            "created": { "at": 0, "by": "ui-team" },
            "modified": { "at": 0, "by": "ui-team" }
        },
        "account": {
            "id": "2",
            "name": "Alert Logic",
            "active": false,
            "accessible_locations": ["location-a", "location-b"],
            "default_location": "location-a",
            "mfa_required": false,
            "created": { "at": 0, "by": "ui-team" },
            "modified": { "at": 0, "by": "ui-team" }
        },
        "token": TOKEN,
        "token_expiration": token_expiration
    })
}

pub fn example_session() -> Value {
    json!({ "authentication": authentication(tomorrow()) })
}

pub fn acting_account() -> AimsAccount {
    serde_json::from_value(json!({
        "id": "5",
        "name": "ACME Corp",
        "active": false,
        "version": 1,
        "accessible_locations": ["location-c", "location-d"],
        "default_location": "location-c",
        "created": { "at": 0, "by": "al-ui-team" },
        "modified": { "at": 0, "by": "al-ui-team" }
    }))
    .unwrap()
}

pub fn entitlements_for(account_id: &str) -> EntitlementCollection {
    EntitlementCollection::new(vec![
        EntitlementRecord::new(format!("product-{}", account_id)),
        EntitlementRecord::new("assess"),
    ])
}

/// In-memory stand-in for every backend the session talks to
#[derive(Default)]
pub struct FakeBackend {
    pub details_calls: AtomicUsize,
    pub managed_calls: AtomicUsize,
    pub entitlement_calls: AtomicUsize,
    pub feature_calls: AtomicUsize,
    pub auth_calls: AtomicUsize,
    features: Mutex<Value>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        let backend = Self::default();
        *backend.features.lock().unwrap() = json!({
            "dashboards": {
                "xp": { "available": ["classic", "beta"], "active": "beta" },
                "options": { "refresh": 30 }
            }
        });
        Arc::new(backend)
    }

    pub fn set_features(&self, features: Value) {
        *self.features.lock().unwrap() = features;
    }

    /// Hold feature fetches for `account_id` until [`release`](Self::release)
    pub fn hold(&self, account_id: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(account_id.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, account_id: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(account_id) {
            gate.notify_one();
        }
    }

    /// Make every fetch for `account_id` fail
    pub fn fail_for(&self, account_id: &str) {
        self.failing.lock().unwrap().insert(account_id.to_string());
    }

    fn check(&self, account_id: &str) -> SessionResult<()> {
        if self.failing.lock().unwrap().contains(account_id) {
            Err(collaborator_error!(
                format!("backend unavailable for {}", account_id),
                "fake_backend"
            ))
        } else {
            Ok(())
        }
    }

    pub fn clients(self: &Arc<Self>) -> SessionClients {
        SessionClients::new(self.clone(), self.clone(), self.clone())
            .with_authenticator(self.clone())
    }
}

#[async_trait]
impl AccountDirectory for FakeBackend {
    async fn get_account_details(&self, account_id: &str) -> SessionResult<AimsAccount> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        self.check(account_id)?;
        Ok(AimsAccount::new(account_id, format!("Account {}", account_id))
            .with_attribute("default_location", "defender-us-denver"))
    }

    async fn get_managed_accounts(&self, primary_account_id: &str) -> SessionResult<Vec<AimsAccount>> {
        self.managed_calls.fetch_add(1, Ordering::SeqCst);
        self.check(primary_account_id)?;
        Ok(vec![
            AimsAccount::new("5", "ACME Corp"),
            AimsAccount::new("67", "Big Bird & Friends, Inc."),
        ])
    }
}

#[async_trait]
impl EntitlementSource for FakeBackend {
    async fn get_entitlements(&self, account_id: &str) -> SessionResult<EntitlementCollection> {
        self.entitlement_calls.fetch_add(1, Ordering::SeqCst);
        self.check(account_id)?;
        Ok(entitlements_for(account_id))
    }
}

#[async_trait]
impl FeatureSource for FakeBackend {
    async fn get_feature_data(&self, account_id: &str) -> SessionResult<Value> {
        self.feature_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().unwrap().get(account_id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check(account_id)?;
        Ok(self.features.lock().unwrap().clone())
    }
}

#[async_trait]
impl Authenticator for FakeBackend {
    async fn authenticate(
        &self,
        _username: &str,
        _password: &str,
        _mfa_code: Option<&str>,
    ) -> SessionResult<Value> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        Ok(example_session())
    }

    async fn authenticate_with_mfa_session_token(
        &self,
        _session_token: &str,
        _mfa_code: &str,
    ) -> SessionResult<Value> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        Ok(example_session())
    }

    async fn get_token_info(&self, _access_token: &str) -> SessionResult<Value> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        let mut descriptor = authentication(tomorrow());
        if let Value::Object(fields) = &mut descriptor {
            fields.remove("token");
        }
        Ok(descriptor)
    }
}

pub struct Harness {
    pub session: ConsoleSession,
    pub backend: Arc<FakeBackend>,
    pub storage: MemoryCabinet,
}

/// Session over a fresh backend and empty storage
pub fn harness() -> Harness {
    harness_with(MemoryCabinet::new("al_session"), SessionConfig::default())
}

pub fn harness_with(storage: MemoryCabinet, config: SessionConfig) -> Harness {
    let backend = FakeBackend::new();
    let session =
        ConsoleSession::new(config, backend.clients(), Arc::new(storage.clone())).unwrap();
    Harness {
        session,
        backend,
        storage,
    }
}

/// Let spawned resolution tasks run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}
