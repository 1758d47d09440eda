//! Events published on a session's notification stream

use crate::session::AccountMetadata;
use alsession_core::AimsAccount;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Outbound request as seen by the transport layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub url: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Published by the transport right before a request goes out.
/// Subscribers may add headers to `request`.
#[derive(Debug, Clone, PartialEq)]
pub struct BeforeRequestEvent {
    pub request: RequestDescriptor,
}

impl BeforeRequestEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            request: RequestDescriptor {
                url: url.into(),
                ..RequestDescriptor::default()
            },
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.request.headers.get(name).map(String::as_str)
    }
}

/// A session was established through `set_authentication` or one of the
/// `authenticate*` flows
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStartedEvent {
    pub user_id: String,
    pub primary_account_id: String,
    pub acting_account_id: String,
}

/// The session was deactivated
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEndedEvent {
    pub user_id: Option<String>,
}

/// A different acting account was requested; resolution has started
#[derive(Debug, Clone, PartialEq)]
pub struct ActingAccountChangedEvent {
    pub previous: Option<AimsAccount>,
    pub requested_id: String,
}

/// Resolution for the current acting account finished successfully
#[derive(Debug, Clone)]
pub struct ActingAccountResolvedEvent {
    pub metadata: Arc<AccountMetadata>,
}
