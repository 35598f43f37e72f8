//! Service Registry
//!
//! Builds every adapter once from a [`PaywallConfig`] and hands them out as
//! shared references. The registry is passed explicitly to whoever needs it.

use std::sync::Arc;

use crate::backend::{BackendClient, SupabaseClient};
use crate::checkout::{CheckoutService, Navigator};
use crate::config::PaywallConfig;
use crate::error::Result;
use crate::purchases::PurchaseService;

/// Shared adapters for one widget instance
#[derive(Clone)]
pub struct Services {
    /// Backend connection (auth + functions)
    pub backend: Arc<dyn BackendClient>,

    /// Stripe checkout adapter
    pub checkout: Arc<CheckoutService>,

    /// RevenueCat adapter
    pub purchases: Arc<PurchaseService>,
}

impl Services {
    /// Build from configuration
    ///
    /// Fails immediately if the backend connection parameters are missing or
    /// malformed. Stripe and RevenueCat keys are checked on first use.
    pub fn from_config(config: &PaywallConfig, navigator: Arc<dyn Navigator>) -> Result<Self> {
        let backend: Arc<dyn BackendClient> = Arc::new(SupabaseClient::from_config(config)?);
        Ok(Self::new(config, backend, navigator))
    }

    /// Build around an existing backend client
    pub fn new(
        config: &PaywallConfig,
        backend: Arc<dyn BackendClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let checkout = CheckoutService::from_config(config, backend.clone(), navigator);
        let purchases = PurchaseService::from_config(config);

        tracing::debug!(
            stripe_configured = config.stripe_publishable_key.is_some(),
            revenuecat_configured = config.revenuecat_api_key.is_some(),
            "Paywall services ready"
        );

        Self {
            backend,
            checkout: Arc::new(checkout),
            purchases: Arc::new(purchases),
        }
    }
}
