//! alsession - client-side session state for multi-tenant consoles
//!
//! This crate tracks who is logged in and which account is acting, persists
//! that identity, and resolves per-account metadata (managed accounts,
//! entitlements, feature tree) before the application proceeds:
//!
//! - [`ConsoleSession`]: authentication, acting account, persistence, accessors
//! - Account resolution: concurrent collaborator fan-out gated by a [`Guard`]
//! - Detection cycle: `start_detection` / `end_detection` and the joint `ready()`
//! - [`NotifyStream`]: observer bus through which the transport layer
//!   picks up the auth header before each request
//!
//! Backends are injected through [`SessionClients`] and a [`Cabinet`]; every
//! session is an independent value, there is no global instance.
//!
//! [`Guard`]: alsession_core::Guard
//! [`Cabinet`]: alsession_core::Cabinet

pub mod cabinet;
pub mod events;
pub mod notify;
pub mod session;

pub use cabinet::{FileCabinet, MemoryCabinet};
pub use events::{
    ActingAccountChangedEvent, ActingAccountResolvedEvent, BeforeRequestEvent, RequestDescriptor,
    SessionEndedEvent, SessionStartedEvent,
};
pub use notify::{NotifyStream, Subscription};
pub use session::{
    AccountMetadata, ActingAccountRef, AuthenticationOptions, ConsoleSession, ResolutionResult,
    SessionClients,
};

pub use alsession_core::{
    init_logging, AccountDirectory, AimsAccount, AimsUser, Authenticator, Cabinet,
    EndpointsSource, EntitlementCollection, EntitlementRecord, EntitlementSource, FeatureSource,
    LoggingConfig, SessionConfig, SessionDescriptor, SessionError, SessionRecord, SessionResult,
};
pub use alsession_fox::{ExperienceDescriptor, FeatureNode, FoxSnapshot, OptionValue};
