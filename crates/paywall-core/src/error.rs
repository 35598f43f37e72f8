//! Paywall Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaywallError>;

/// Paywall errors
///
/// Every variant is surfaced to the caller after being logged once at the
/// failure site. Nothing in this crate recovers locally.
#[derive(Error, Debug)]
pub enum PaywallError {
    /// Missing or malformed configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// No session, or the session could not be retrieved
    #[error("Authentication error: {0}")]
    Auth(String),

    /// A backend function or vendor call failed
    #[error("Upstream error in {function}: {message}")]
    Upstream { function: String, message: String },

    /// Malformed or missing argument, rejected before any side effect
    #[error("Validation error: {0}")]
    Validation(String),

    /// The browser refused to navigate to a checkout or portal URL
    #[error("Navigation error: {0}")]
    Navigation(String),

    /// Purchase SDK failure
    #[error("Purchase operation '{operation}' failed: {source}")]
    Purchase {
        operation: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PaywallError {
    pub(crate) fn upstream(function: impl Into<String>, message: impl ToString) -> Self {
        Self::Upstream {
            function: function.into(),
            message: message.to_string(),
        }
    }

    /// Check if this error is retryable
    ///
    /// This layer has no retry policy, so the answer is always `false`.
    /// Callers that want to retry must decide that themselves.
    pub const fn is_retryable(&self) -> bool {
        false
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &str {
        match self {
            Self::Config(_) => "The paywall is not configured correctly.",
            Self::Auth(_) => "Please sign in again to continue.",
            Self::Upstream { .. } => "We couldn't reach the payment service. Please try again.",
            Self::Validation(_) => "Something went wrong starting checkout.",
            Self::Navigation(_) => "We couldn't open the checkout page. Please try again.",
            Self::Purchase { .. } => "The purchase could not be completed.",
            Self::Json(_) => "An unexpected error occurred.",
        }
    }
}
