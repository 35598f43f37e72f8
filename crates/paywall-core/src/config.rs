//! Paywall Configuration
//!
//! Secrets are supplied by the environment. Nothing here has a default: a
//! component asks for the values it uses and fails with
//! [`PaywallError::Config`] when one is missing or malformed.

use crate::error::{PaywallError, Result};

pub const REVENUECAT_API_KEY_VAR: &str = "REVENUECAT_PUBLIC_API_KEY";
pub const STRIPE_PUBLISHABLE_KEY_VAR: &str = "STRIPE_PUBLISHABLE_KEY";
pub const SUPABASE_URL_VAR: &str = "SUPABASE_URL";
pub const SUPABASE_ANON_KEY_VAR: &str = "SUPABASE_ANON_KEY";

/// Environment-provided secrets for every adapter
#[derive(Clone, Debug, Default)]
pub struct PaywallConfig {
    /// RevenueCat public API key
    pub revenuecat_api_key: Option<String>,

    /// Stripe publishable key (`pk_test_...` / `pk_live_...`)
    pub stripe_publishable_key: Option<String>,

    /// Supabase project URL, must be `https://`
    pub supabase_url: Option<String>,

    /// Supabase anonymous key
    pub supabase_anon_key: Option<String>,
}

impl PaywallConfig {
    /// Read from process environment variables
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok();
        Self::from_values(
            var(REVENUECAT_API_KEY_VAR),
            var(STRIPE_PUBLISHABLE_KEY_VAR),
            var(SUPABASE_URL_VAR),
            var(SUPABASE_ANON_KEY_VAR),
        )
    }

    /// Read values baked in at compile time
    ///
    /// Used by the WASM build, where there is no process environment.
    pub fn from_build_env() -> Self {
        Self::from_values(
            option_env!("REVENUECAT_PUBLIC_API_KEY").map(Into::into),
            option_env!("STRIPE_PUBLISHABLE_KEY").map(Into::into),
            option_env!("SUPABASE_URL").map(Into::into),
            option_env!("SUPABASE_ANON_KEY").map(Into::into),
        )
    }

    pub(crate) fn from_values(
        revenuecat_api_key: Option<String>,
        stripe_publishable_key: Option<String>,
        supabase_url: Option<String>,
        supabase_anon_key: Option<String>,
    ) -> Self {
        Self {
            revenuecat_api_key: non_blank(revenuecat_api_key),
            stripe_publishable_key: non_blank(stripe_publishable_key),
            supabase_url: non_blank(supabase_url),
            supabase_anon_key: non_blank(supabase_anon_key),
        }
    }

    /// Validated Supabase connection parameters
    pub fn supabase(&self) -> Result<(&str, &str)> {
        let (Some(url), Some(anon_key)) = (&self.supabase_url, &self.supabase_anon_key) else {
            tracing::error!(
                url_present = self.supabase_url.is_some(),
                key_present = self.supabase_anon_key.is_some(),
                "Missing Supabase configuration"
            );
            return Err(PaywallError::Config(format!(
                "{SUPABASE_URL_VAR} and {SUPABASE_ANON_KEY_VAR} must be set"
            )));
        };

        if !url.starts_with("https://") {
            tracing::error!(url = %url, "Invalid Supabase URL format");
            return Err(PaywallError::Config(format!(
                "{SUPABASE_URL_VAR} must start with https://"
            )));
        }

        Ok((url.as_str(), anon_key.as_str()))
    }
}

/// Check a Stripe publishable key
pub fn validate_publishable_key(key: Option<&str>) -> Result<&str> {
    let key = key.ok_or_else(|| {
        PaywallError::Config(format!("{STRIPE_PUBLISHABLE_KEY_VAR} is not set"))
    })?;

    if !key.starts_with("pk_") {
        return Err(PaywallError::Config(format!(
            "{STRIPE_PUBLISHABLE_KEY_VAR} must be a publishable key (pk_...)"
        )));
    }

    Ok(key)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_config() -> PaywallConfig {
        PaywallConfig::from_values(
            Some("rc_key".into()),
            Some("pk_test_123".into()),
            Some("https://project.supabase.co".into()),
            Some("anon".into()),
        )
    }

    #[test]
    fn test_blank_values_count_as_missing() {
        let config = PaywallConfig::from_values(Some("  ".into()), None, Some(String::new()), None);
        assert!(config.revenuecat_api_key.is_none());
        assert!(config.supabase_url.is_none());
    }

    #[test]
    fn test_supabase_requires_both_values() {
        let config = PaywallConfig {
            supabase_anon_key: None,
            ..full_config()
        };
        assert!(matches!(config.supabase(), Err(PaywallError::Config(_))));
    }

    #[test]
    fn test_supabase_requires_https() {
        let config = PaywallConfig {
            supabase_url: Some("http://project.supabase.co".into()),
            ..full_config()
        };
        assert!(matches!(config.supabase(), Err(PaywallError::Config(_))));
        assert_eq!(
            full_config().supabase().unwrap(),
            ("https://project.supabase.co", "anon")
        );
    }

    #[test]
    fn test_publishable_key_validation() {
        assert!(validate_publishable_key(None).is_err());
        assert!(validate_publishable_key(Some("sk_test_secret")).is_err());
        assert_eq!(validate_publishable_key(Some("pk_test_123")).unwrap(), "pk_test_123");
    }
}
