//! Supabase Backend Client
//!
//! Talks to the Supabase auth (`/auth/v1`) and edge function
//! (`/functions/v1`) endpoints over HTTPS. The session lives in memory for
//! the lifetime of the client.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Response;
use serde_json::{json, Value};

use super::{AuthSession, AuthUser, BackendClient, SessionTokens};
use crate::config::PaywallConfig;
use crate::error::{PaywallError, Result};

/// Supabase client wrapper
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    http: reqwest::Client,
    session: RwLock<Option<AuthSession>>,
}

impl SupabaseClient {
    /// Create a new client, failing fast on missing or insecure parameters
    pub fn new(url: &str, anon_key: &str) -> Result<Self> {
        let config =
            PaywallConfig::from_values(None, None, Some(url.to_string()), Some(anon_key.to_string()));
        Self::from_config(&config)
    }

    /// Create from the shared paywall configuration
    pub fn from_config(config: &PaywallConfig) -> Result<Self> {
        let (url, anon_key) = config.supabase()?;
        Ok(Self::unchecked(url, anon_key))
    }

    fn unchecked(url: &str, anon_key: &str) -> Self {
        Self {
            base_url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            http: reqwest::Client::new(),
            session: RwLock::new(None),
        }
    }

    /// Sign in with email and password, replacing any current session
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession> {
        let session = self
            .token_grant("password", &json!({ "email": email, "password": password }))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Sign in failed"))?;

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    /// Replace the current session (e.g. one restored by the host page)
    pub fn set_session(&self, session: Option<AuthSession>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    /// Sign out remotely and drop the local session
    pub async fn sign_out(&self) -> Result<()> {
        let Some(session) = self.current_session() else {
            return Ok(());
        };
        self.set_session(None);

        let response = self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
            .map_err(|e| PaywallError::Auth(e.to_string()))
            .inspect_err(|e| tracing::error!(error = %e, "Sign out failed"))?;

        if !response.status().is_success() {
            let err = PaywallError::Auth(error_message(response).await);
            tracing::error!(error = %err, "Sign out failed");
            return Err(err);
        }

        Ok(())
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession> {
        let session = self
            .token_grant("refresh_token", &json!({ "refresh_token": refresh_token }))
            .await?;
        tracing::debug!(user_id = %session.user.id, "Refreshed session");
        Ok(session)
    }

    async fn token_grant(&self, grant_type: &str, body: &Value) -> Result<AuthSession> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PaywallError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PaywallError::Auth(error_message(response).await));
        }

        response
            .json::<AuthSession>()
            .await
            .map_err(|e| PaywallError::Auth(format!("Malformed session: {e}")))
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn functions_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{name}", self.base_url)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl BackendClient for SupabaseClient {
    async fn get_session(&self) -> Result<Option<AuthSession>> {
        let Some(session) = self.current_session() else {
            return Ok(None);
        };

        if !session.is_expired(Utc::now()) {
            return Ok(Some(session));
        }

        let Some(refresh_token) = session.refresh_token.as_deref() else {
            tracing::debug!(user_id = %session.user.id, "Session expired without refresh token");
            self.set_session(None);
            return Ok(None);
        };

        match self.refresh(refresh_token).await {
            Ok(refreshed) => {
                self.set_session(Some(refreshed.clone()));
                Ok(Some(refreshed))
            }
            Err(e) => {
                // Rejected refresh tokens are dropped
                tracing::error!(error = %e, "Session refresh failed, signing out");
                self.set_session(None);
                Err(e)
            }
        }
    }

    async fn restore_session(&self, tokens: SessionTokens) -> Result<AuthSession> {
        let response = self
            .http
            .get(self.auth_url("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| PaywallError::Auth(e.to_string()))
            .inspect_err(|e| tracing::error!(error = %e, "Session restore failed"))?;

        if !response.status().is_success() {
            let err = PaywallError::Auth(error_message(response).await);
            tracing::error!(error = %err, "Session restore failed");
            return Err(err);
        }

        let user: AuthUser = response.json().await.map_err(|e| {
            let err = PaywallError::Auth(format!("Malformed user: {e}"));
            tracing::error!(error = %err, "Session restore failed");
            err
        })?;

        let session = AuthSession {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at: tokens.expires_at,
            user,
        };
        tracing::info!(user_id = %session.user.id, "Session restored");
        self.set_session(Some(session.clone()));
        Ok(session)
    }

    async fn invoke_function(&self, name: &str, payload: Option<&Value>) -> Result<Value> {
        // Functions that do not need a user still work with the anon key
        let token = match self.get_session().await {
            Ok(Some(session)) => session.access_token,
            Ok(None) | Err(_) => self.anon_key.clone(),
        };

        let mut request = self
            .http
            .post(self.functions_url(name))
            .header("apikey", &self.anon_key)
            .bearer_auth(token);
        if let Some(body) = payload {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PaywallError::upstream(name, e))?;

        let status = response.status();
        if !status.is_success() {
            let message = error_message(response).await;
            tracing::debug!(function = name, status = %status, "Backend function returned an error");
            return Err(PaywallError::upstream(name, message));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PaywallError::upstream(name, e))?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Status code plus the best error text the body offers
async fn error_message(response: Response) -> String {
    let status = response.status();
    let body: Value = response.json().await.unwrap_or_default();

    let text = ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .or_else(|| status.canonical_reason())
        .unwrap_or("request failed");

    format!("{}: {text}", status.as_u16())
}
