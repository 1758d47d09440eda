//! Console session manager
//!
//! [`ConsoleSession`] owns the authenticated identity, the acting account and
//! the outcome of account resolution. Handles are cheap to clone and share a
//! single state; independent instances never share anything.

use super::resolver::{resolve_account, ResolutionRequest};
use super::storage::{validate_record, RecordStore};
use super::types::{
    AccountMetadata, ActingAccountRef, AuthenticationOptions, ResolutionResult, SessionClients,
};
use crate::events::{
    ActingAccountChangedEvent, ActingAccountResolvedEvent, BeforeRequestEvent, SessionEndedEvent,
    SessionStartedEvent,
};
use crate::notify::NotifyStream;
use alsession_core::{
    expiration_number, validation_error, AimsAccount, Cabinet, EntitlementCollection, Epoch,
    ErrorContext, Guard, SessionConfig, SessionDescriptor, SessionError, SessionRecord,
    SessionResult,
};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub record: Option<SessionRecord>,
    pub resolved: Option<Arc<AccountMetadata>>,
}

pub(crate) struct SessionInner {
    pub config: SessionConfig,
    pub clients: SessionClients,
    pub store: RecordStore,
    pub state: RwLock<SessionState>,
    pub resolution: Guard<Arc<AccountMetadata>, Arc<SessionError>>,
    pub detection: Guard<()>,
    pub notify: NotifyStream,
}

pub(crate) fn inactive_error(operation: &str) -> SessionError {
    SessionError::Authentication {
        message: format!("Cannot {} without an active session", operation),
        context: ErrorContext::new("console_session")
            .with_operation(operation)
            .with_suggestion("Authenticate before changing session state"),
    }
}

impl SessionInner {
    pub fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Token to put on outbound requests, only while the session is active
    fn active_token(&self) -> Option<String> {
        self.read_state()
            .record
            .as_ref()
            .filter(|record| record.authentication.is_current())
            .map(|record| record.authentication.token.clone())
    }

    /// Start a new resolution epoch. Must be called with the state lock held
    /// so epoch changes and completions are serialized.
    fn begin_epoch(&self, state: &mut SessionState) -> Epoch {
        state.resolved = None;
        self.resolution.rescind()
    }

    /// Run the pipeline for `epoch` in the background
    fn spawn_resolution(self: &Arc<Self>, epoch: Epoch, request: ResolutionRequest) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!(
                    epoch,
                    "No async runtime available; account resolution stays pending"
                );
                return;
            }
        };

        debug!(epoch, acting = %request.acting.id(), "Starting account resolution");
        let inner = Arc::clone(self);
        handle.spawn(async move {
            let result = resolve_account(&inner.clients, &inner.config, request).await;
            inner.finish_resolution(epoch, result);
        });
    }

    /// Publish the outcome of `epoch` unless a newer epoch has started
    fn finish_resolution(&self, epoch: Epoch, result: SessionResult<AccountMetadata>) {
        let resolved = {
            let mut state = self.write_state();
            if self.resolution.epoch() != epoch {
                debug!(
                    epoch,
                    current = self.resolution.epoch(),
                    "Discarding result of superseded resolution"
                );
                return;
            }

            match result {
                Ok(metadata) => {
                    let metadata = Arc::new(metadata);
                    if let Some(record) = state.record.as_mut() {
                        record.acting = Some(metadata.acting_account.clone());
                        self.store.save(record);
                    }
                    state.resolved = Some(Arc::clone(&metadata));
                    self.resolution.resolve_epoch(epoch, Arc::clone(&metadata));
                    info!(
                        epoch,
                        acting_account = %metadata.acting_account.id,
                        "Account resolution completed"
                    );
                    Some(metadata)
                }
                Err(error) => {
                    // The session stays authenticated; only the metadata is missing
                    error.log();
                    self.resolution.reject_epoch(epoch, Arc::new(error));
                    None
                }
            }
        };

        if let Some(metadata) = resolved {
            self.notify
                .trigger(&mut ActingAccountResolvedEvent { metadata });
        }
    }
}

/// Client-side state of one console session
#[derive(Clone)]
pub struct ConsoleSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl ConsoleSession {
    /// Create a session backed by `storage`. A valid persisted record is
    /// restored immediately and its resolution started; invalid or expired
    /// records are erased.
    pub fn new(
        config: SessionConfig,
        clients: SessionClients,
        storage: Arc<dyn Cabinet>,
    ) -> SessionResult<Self> {
        config.validate()?;

        let store = RecordStore::new(storage, config.storage_key.clone());
        let inner = Arc::new(SessionInner {
            config,
            clients,
            store,
            state: RwLock::new(SessionState::default()),
            resolution: Guard::new("resolution"),
            detection: Guard::new("detection"),
            notify: NotifyStream::new(),
        });

        let weak = Arc::downgrade(&inner);
        inner
            .notify
            .attach(move |event: &mut BeforeRequestEvent| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let Some(token) = inner.active_token() {
                    event
                        .request
                        .headers
                        .insert(inner.config.auth_header.clone(), token);
                }
            });

        let session = Self { inner };
        if let Some(record) = session.inner.store.load() {
            info!(
                user_id = %record.authentication.user.id,
                "Resuming persisted session"
            );
            session.establish(record, None);
        }
        Ok(session)
    }

    /// Establish a session from a raw `{authentication, acting?}` value
    pub fn set_authentication(&self, proposal: &Value) -> SessionResult<()> {
        self.set_authentication_with(proposal, AuthenticationOptions::default())
    }

    /// Like [`set_authentication`](Self::set_authentication), applying an
    /// acting account and/or location override
    pub fn set_authentication_with(
        &self,
        proposal: &Value,
        options: AuthenticationOptions,
    ) -> SessionResult<()> {
        let mut record = match validate_record(proposal) {
            Ok(record) => record,
            Err(e) => {
                e.log();
                self.deactivate_session();
                return Err(e);
            }
        };

        if !record.authentication.is_current() {
            let e = SessionError::Authentication {
                message: "Session token is empty or already expired".to_string(),
                context: ErrorContext::new("console_session")
                    .with_operation("set_authentication")
                    .with_metadata(
                        "token_expiration",
                        &record.authentication.token_expiration.to_string(),
                    ),
            };
            e.log();
            self.deactivate_session();
            return Err(e);
        }

        let acting = options.acting_account;
        match &acting {
            Some(ActingAccountRef::Account(account)) => record.acting = Some(account.clone()),
            Some(ActingAccountRef::Id(_)) => record.acting = None,
            None => {}
        }
        if options.location_id.is_some() {
            record.bound_location_id = options.location_id;
        }

        let mut started = SessionStartedEvent {
            user_id: record.authentication.user.id.clone(),
            primary_account_id: record.authentication.account.id.clone(),
            acting_account_id: acting
                .as_ref()
                .map(|acting| acting.id().to_string())
                .or_else(|| record.acting.as_ref().map(|a| a.id.clone()))
                .unwrap_or_else(|| record.authentication.account.id.clone()),
        };

        self.inner.store.save(&record);
        self.establish(record, acting);
        info!(user_id = %started.user_id, "Session authenticated");
        self.inner.notify.trigger(&mut started);
        Ok(())
    }

    /// Install `record` as the current session and start resolving it
    fn establish(&self, record: SessionRecord, acting: Option<ActingAccountRef>) {
        let acting = acting
            .or_else(|| record.acting.clone().map(ActingAccountRef::Account))
            .unwrap_or_else(|| ActingAccountRef::Account(record.authentication.account.clone()));
        let request = ResolutionRequest {
            user: record.authentication.user.clone(),
            primary: record.authentication.account.clone(),
            acting,
        };

        let epoch = {
            let mut state = self.inner.write_state();
            state.record = Some(record);
            self.inner.begin_epoch(&mut state)
        };
        self.inner.spawn_resolution(epoch, request);
    }

    /// Replace the token of the current session and persist it
    pub fn set_token_info(&self, token: impl Into<String>, expiration: f64) -> SessionResult<()> {
        let expiration = expiration_number(expiration).ok_or_else(|| {
            validation_error!(
                "Token expiration must be a finite number",
                "authentication.token_expiration",
                "console_session"
            )
        })?;
        let mut state = self.inner.write_state();
        let record = state
            .record
            .as_mut()
            .ok_or_else(|| inactive_error("set token info"))?;
        record.authentication.token = token.into();
        record.authentication.token_expiration = expiration;
        self.inner.store.save(record);
        Ok(())
    }

    /// Switch the acting account and wait for it to resolve. `None` is
    /// rejected without touching the session.
    pub async fn set_acting_account(
        &self,
        account: Option<ActingAccountRef>,
    ) -> ResolutionResult<Arc<AccountMetadata>> {
        let Some(account) = account else {
            let e = SessionError::MissingAccount;
            e.log();
            return Err(Arc::new(e));
        };

        let (previous, request, epoch) = {
            let mut state = self.inner.write_state();
            let record = state
                .record
                .as_mut()
                .filter(|record| record.authentication.is_current())
                .ok_or_else(|| Arc::new(inactive_error("set acting account")))?;

            let previous = record.acting.clone();
            if let ActingAccountRef::Account(acting) = &account {
                record.acting = Some(acting.clone());
            }
            record.bound_location_id = None;
            self.inner.store.save(record);

            let request = ResolutionRequest {
                user: record.authentication.user.clone(),
                primary: record.authentication.account.clone(),
                acting: account,
            };
            let epoch = self.inner.begin_epoch(&mut state);
            (previous, request, epoch)
        };

        let mut changed = ActingAccountChangedEvent {
            previous,
            requested_id: request.acting.id().to_string(),
        };
        info!(
            epoch,
            acting_account = %changed.requested_id,
            "Acting account changed"
        );
        self.inner.spawn_resolution(epoch, request);
        self.inner.notify.trigger(&mut changed);

        self.inner.resolution.wait().await
    }

    /// Bind the session to a location, overriding the acting account's default
    pub fn set_active_datacenter(&self, location_id: impl Into<String>) -> SessionResult<()> {
        let mut state = self.inner.write_state();
        let record = state
            .record
            .as_mut()
            .ok_or_else(|| inactive_error("set active datacenter"))?;
        record.bound_location_id = Some(location_id.into());
        self.inner.store.save(record);
        Ok(())
    }

    /// Bound location, else the acting (or primary) account's default location
    pub fn get_active_datacenter(&self) -> Option<String> {
        let state = self.inner.read_state();
        let record = state.record.as_ref()?;
        record
            .bound_location_id
            .clone()
            .or_else(|| Some(record.acting.as_ref()?.default_location()?.to_string()))
            .or_else(|| {
                record
                    .authentication
                    .account
                    .default_location()
                    .map(str::to_string)
            })
    }

    /// Forget the session: clear memory, erase the persisted record and put
    /// resolution back into its initial pending state. Anyone still waiting
    /// on resolution is rejected.
    pub fn deactivate_session(&self) {
        let user_id = {
            let mut state = self.inner.write_state();
            state.resolved = None;
            let previous = state.record.take();
            self.inner
                .resolution
                .abandon(Arc::new(SessionError::Deactivated));
            previous.map(|record| record.authentication.user.id)
        };
        self.inner.store.erase();

        info!(user_id = ?user_id, "Session deactivated");
        self.inner
            .notify
            .trigger(&mut SessionEndedEvent { user_id });
    }

    /// True if a session is present and its token is non-empty and unexpired
    pub fn is_active(&self) -> bool {
        self.inner
            .read_state()
            .record
            .as_ref()
            .is_some_and(|record| record.authentication.is_current())
    }

    /// Event bus shared with the transport layer
    pub fn notify_stream(&self) -> &NotifyStream {
        &self.inner.notify
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn with_record<R>(&self, read: impl FnOnce(&SessionRecord) -> Option<R>) -> Option<R> {
        self.inner.read_state().record.as_ref().and_then(read)
    }

    pub fn get_session(&self) -> Option<SessionRecord> {
        self.with_record(|record| Some(record.clone()))
    }

    pub fn get_authentication(&self) -> Option<SessionDescriptor> {
        self.with_record(|record| Some(record.authentication.clone()))
    }

    pub fn get_token(&self) -> Option<String> {
        self.with_record(|record| Some(record.authentication.token.clone()))
    }

    /// Token expiry in (possibly fractional) seconds since the unix epoch
    pub fn get_token_expiry(&self) -> Option<f64> {
        self.with_record(|record| Some(record.authentication.expires_at()))
    }

    pub fn get_user_id(&self) -> Option<String> {
        self.with_record(|record| Some(record.authentication.user.id.clone()))
    }

    pub fn get_user_name(&self) -> Option<String> {
        self.with_record(|record| record.authentication.user.name().map(str::to_string))
    }

    pub fn get_user_email(&self) -> Option<String> {
        self.with_record(|record| record.authentication.user.email().map(str::to_string))
    }

    /// Id of the account the user belongs to
    pub fn get_user_account_id(&self) -> Option<String> {
        self.get_primary_account_id()
    }

    pub fn get_primary_account_id(&self) -> Option<String> {
        self.with_record(|record| Some(record.authentication.account.id.clone()))
    }

    pub fn get_primary_account(&self) -> Option<AimsAccount> {
        self.with_record(|record| Some(record.authentication.account.clone()))
    }

    pub fn get_user_accessible_locations(&self) -> Option<Vec<String>> {
        self.with_record(|record| record.authentication.account.accessible_locations())
    }

    /// Acting account, which is the primary account unless one was chosen
    pub fn get_acting_account(&self) -> Option<AimsAccount> {
        self.with_record(|record| {
            Some(
                record
                    .acting
                    .clone()
                    .unwrap_or_else(|| record.authentication.account.clone()),
            )
        })
    }

    pub fn get_acting_account_id(&self) -> Option<String> {
        self.get_acting_account().map(|account| account.id)
    }

    pub fn get_acting_account_name(&self) -> Option<String> {
        self.get_acting_account()?.name().map(str::to_string)
    }

    pub fn get_acting_account_accessible_locations(&self) -> Option<Vec<String>> {
        self.get_acting_account()?.accessible_locations()
    }

    pub fn get_acting_account_default_location(&self) -> Option<String> {
        self.get_acting_account()?
            .default_location()
            .map(str::to_string)
    }

    /// Wait for the current resolution epoch to settle
    pub async fn resolved(&self) -> ResolutionResult<Arc<AccountMetadata>> {
        self.inner.resolution.wait().await
    }

    /// Metadata of the last completed resolution, if the current epoch has one
    pub fn get_resolved_metadata(&self) -> Option<Arc<AccountMetadata>> {
        self.inner.read_state().resolved.clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.inner.resolution.is_fulfilled()
    }

    pub async fn get_primary_entitlements(&self) -> ResolutionResult<EntitlementCollection> {
        Ok(self.resolved().await?.primary_entitlements.clone())
    }

    pub fn get_primary_entitlements_sync(&self) -> Option<EntitlementCollection> {
        self.get_resolved_metadata()
            .map(|metadata| metadata.primary_entitlements.clone())
    }

    /// Entitlements of the acting account
    pub async fn get_effective_entitlements(&self) -> ResolutionResult<EntitlementCollection> {
        Ok(self.resolved().await?.effective_entitlements.clone())
    }

    pub fn get_effective_entitlements_sync(&self) -> Option<EntitlementCollection> {
        self.get_resolved_metadata()
            .map(|metadata| metadata.effective_entitlements.clone())
    }

    /// Accounts managed by the primary account. Fetched on demand when
    /// resolution was configured to skip them.
    pub async fn get_managed_accounts(&self) -> ResolutionResult<Vec<AimsAccount>> {
        let metadata = self.resolved().await?;
        if let Some(accounts) = &metadata.managed_accounts {
            return Ok(accounts.clone());
        }
        self.inner
            .clients
            .accounts
            .get_managed_accounts(&metadata.primary_account.id)
            .await
            .map_err(Arc::new)
    }
}

impl std::fmt::Debug for ConsoleSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSession")
            .field("active", &self.is_active())
            .field("resolution", &self.inner.resolution)
            .field("detection", &self.inner.detection)
            .finish_non_exhaustive()
    }
}
