//! Account resolution pipeline
//!
//! One run fans out to every collaborator concurrently and joins the results
//! into an [`AccountMetadata`]. The first failure short-circuits the join.
//! Epoch bookkeeping lives with the caller; this module only computes.

use super::types::{AccountMetadata, ActingAccountRef, SessionClients};
use alsession_core::{
    performance::measure_async, with_timeout, AimsAccount, AimsUser, ErrorContext, SessionConfig,
    SessionError, SessionResult,
};
use alsession_fox::{FoxError, FoxSnapshot};
use tracing::{debug, instrument};

/// Inputs of one resolution run, captured when the epoch starts
#[derive(Debug, Clone)]
pub struct ResolutionRequest {
    pub user: AimsUser,
    pub primary: AimsAccount,
    pub acting: ActingAccountRef,
}

pub(crate) fn feature_data_error(error: FoxError) -> SessionError {
    SessionError::FeatureData {
        message: error.to_string(),
        path: Some(error.path().to_string()),
        context: ErrorContext::new("account_resolver")
            .with_operation("parse_feature_data")
            .with_suggestion("Check the feature data returned for the acting account"),
    }
}

/// Run the full fan-out for `request`, bounded by the configured timeout
pub async fn resolve_account(
    clients: &SessionClients,
    config: &SessionConfig,
    request: ResolutionRequest,
) -> SessionResult<AccountMetadata> {
    measure_async(
        "resolve_account",
        with_timeout(
            fetch_all(clients, config, request),
            config.resolution_timeout_ms,
            "resolve_account",
        ),
    )
    .await
}

#[instrument(skip_all, fields(primary = %request.primary.id, acting = %request.acting.id()))]
async fn fetch_all(
    clients: &SessionClients,
    config: &SessionConfig,
    request: ResolutionRequest,
) -> SessionResult<AccountMetadata> {
    let ResolutionRequest {
        user,
        primary,
        acting,
    } = request;
    let acting_id = acting.id().to_string();
    let same_account = acting_id == primary.id;

    let acting_account = async {
        match acting {
            ActingAccountRef::Account(account) => Ok(account),
            ActingAccountRef::Id(_) if same_account => Ok(primary.clone()),
            ActingAccountRef::Id(id) => clients.accounts.get_account_details(&id).await,
        }
    };

    let managed_accounts = async {
        if config.resolve_managed_accounts {
            clients
                .accounts
                .get_managed_accounts(&primary.id)
                .await
                .map(Some)
        } else {
            Ok(None)
        }
    };

    let primary_entitlements = clients.entitlements.get_entitlements(&primary.id);

    // Same account: effective entitlements are the primary ones
    let acting_entitlements = async {
        if same_account {
            Ok(None)
        } else {
            clients
                .entitlements
                .get_entitlements(&acting_id)
                .await
                .map(Some)
        }
    };

    let fox_data = async {
        let raw = clients.features.get_feature_data(&acting_id).await?;
        FoxSnapshot::new(&raw).map_err(feature_data_error)
    };

    let endpoints_data = async {
        match &clients.endpoints {
            Some(endpoints) => endpoints.get_endpoints(&acting_id).await.map(Some),
            None => Ok(None),
        }
    };

    let (
        acting_account,
        managed_accounts,
        primary_entitlements,
        acting_entitlements,
        fox_data,
        endpoints_data,
    ) = futures::try_join!(
        acting_account,
        managed_accounts,
        primary_entitlements,
        acting_entitlements,
        fox_data,
        endpoints_data
    )?;

    let effective_entitlements =
        acting_entitlements.unwrap_or_else(|| primary_entitlements.clone());

    debug!(
        acting_account = %acting_account.id,
        managed_accounts = managed_accounts.as_ref().map(Vec::len),
        primary_entitlements = primary_entitlements.len(),
        effective_entitlements = effective_entitlements.len(),
        "Account resolution fetches joined"
    );

    Ok(AccountMetadata {
        user,
        primary_account: primary,
        acting_account,
        managed_accounts,
        primary_entitlements,
        effective_entitlements,
        fox_data,
        endpoints_data,
    })
}
