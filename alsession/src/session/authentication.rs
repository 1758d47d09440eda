//! Credential based authentication flows
//!
//! Each flow exchanges credentials through the configured [`Authenticator`]
//! and feeds the returned record through `set_authentication_with`.
//!
//! [`Authenticator`]: alsession_core::Authenticator

use super::manager::ConsoleSession;
use super::types::AuthenticationOptions;
use alsession_core::{Authenticator, ErrorContext, SessionError, SessionResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, instrument};

impl ConsoleSession {
    fn authenticator(&self, operation: &str) -> SessionResult<Arc<dyn Authenticator>> {
        self.inner
            .clients
            .authenticator
            .clone()
            .ok_or_else(|| SessionError::Authentication {
                message: "No authenticator configured".to_string(),
                context: ErrorContext::new("console_session")
                    .with_operation(operation)
                    .with_suggestion("Provide an authenticator via SessionClients::with_authenticator"),
            })
    }

    /// Authenticate with username and password (plus an MFA code if the
    /// account requires one)
    #[instrument(skip(self, password, mfa_code, options))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        mfa_code: Option<&str>,
        options: AuthenticationOptions,
    ) -> SessionResult<()> {
        let authenticator = self.authenticator("authenticate")?;
        let proposal = authenticator
            .authenticate(username, password, mfa_code)
            .await?;
        self.set_authentication_with(&proposal, options)?;
        info!("Authenticated with credentials");
        Ok(())
    }

    /// Complete an MFA challenge using the session token issued with it
    #[instrument(skip_all)]
    pub async fn authenticate_with_session_token(
        &self,
        session_token: &str,
        mfa_code: &str,
        options: AuthenticationOptions,
    ) -> SessionResult<()> {
        let authenticator = self.authenticator("authenticate_with_session_token")?;
        let proposal = authenticator
            .authenticate_with_mfa_session_token(session_token, mfa_code)
            .await?;
        self.set_authentication_with(&proposal, options)?;
        info!("Authenticated with MFA session token");
        Ok(())
    }

    /// Adopt an existing access token. The token-info lookup returns the bare
    /// authentication descriptor, which may omit the token itself.
    #[instrument(skip_all)]
    pub async fn authenticate_with_access_token(
        &self,
        access_token: &str,
        options: AuthenticationOptions,
    ) -> SessionResult<()> {
        let authenticator = self.authenticator("authenticate_with_access_token")?;
        let mut descriptor = authenticator.get_token_info(access_token).await?;

        if let Value::Object(fields) = &mut descriptor {
            fields
                .entry("token")
                .or_insert_with(|| Value::String(access_token.to_string()));
        }

        self.set_authentication_with(&json!({ "authentication": descriptor }), options)?;
        info!("Authenticated with access token");
        Ok(())
    }
}
