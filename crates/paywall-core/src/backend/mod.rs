//! Backend Client
//!
//! Auth session lookup and named backend function invocation. The checkout
//! adapter depends on this trait, never on Supabase directly.

mod supabase;

pub use supabase::SupabaseClient;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Authenticated user attached to a session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,

    #[serde(default)]
    pub email: Option<String>,
}

/// Opaque auth credential issued by the backend
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Absolute expiry; `None` means the token does not expire client-side
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub expires_at: Option<DateTime<Utc>>,

    pub user: AuthUser,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| now >= expires)
    }
}

/// Tokens handed over by an auth redirect or by the host page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionTokens {
    /// Tokens from separate values, with the expiry in Unix seconds
    ///
    /// Returns `None` for an empty access token.
    pub fn from_parts(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<i64>,
    ) -> Option<Self> {
        if access_token.is_empty() {
            return None;
        }
        Some(Self {
            access_token,
            refresh_token: refresh_token.filter(|token| !token.is_empty()),
            expires_at: expires_at.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    /// Parse an auth redirect fragment (`#access_token=..&refresh_token=..`)
    ///
    /// Returns `None` when the fragment carries no access token.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let fragment = fragment.trim_start_matches('#');
        let mut access_token = None;
        let mut refresh_token = None;
        let mut expires_at = None;

        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
            match key.as_ref() {
                "access_token" => access_token = Some(value.into_owned()),
                "refresh_token" => refresh_token = Some(value.into_owned()),
                "expires_at" => expires_at = value.parse::<i64>().ok(),
                _ => {}
            }
        }

        Self::from_parts(access_token?, refresh_token, expires_at)
    }
}

/// Backend capability set (Strategy pattern)
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait BackendClient: Send + Sync {
    /// Current auth session, or `None` when signed out
    async fn get_session(&self) -> Result<Option<AuthSession>>;

    /// Adopt a session from externally issued tokens
    ///
    /// Resolves the user behind the access token and makes the result the
    /// current session.
    async fn restore_session(&self, tokens: SessionTokens) -> Result<AuthSession>;

    /// Invoke a named backend function with an optional JSON body
    async fn invoke_function(&self, name: &str, payload: Option<&Value>) -> Result<Value>;
}
