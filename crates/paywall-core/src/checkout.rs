//! Stripe Checkout Integration
//!
//! Implements the "Stripe Checkout (Hosted)" approach. Session creation and
//! pricing go through backend functions; this side only navigates the
//! browser to the hosted page the backend returns.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │   Paywall   │────▶│ Backend function│────▶│  Stripe Hosted  │
//! │   widget    │     │ (checkout URL)  │     │  Checkout Page  │
//! └─────────────┘     └─────────────────┘     └─────────────────┘
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::backend::BackendClient;
use crate::config::{validate_publishable_key, PaywallConfig};
use crate::error::{PaywallError, Result};
use crate::init::InitCell;
use crate::subscription::SubscriptionStatus;

pub const GET_PRICES_FN: &str = "get-stripe-prices";
pub const CREATE_CHECKOUT_SESSION_FN: &str = "create-stripe-checkout-session";
pub const GET_SUBSCRIPTION_FN: &str = "get-stripe-subscription";
pub const CREATE_PORTAL_SESSION_FN: &str = "create-stripe-portal-session";

/// Product the paywall sells
pub const PRODUCT_ID: &str = "prod_T4r20NLm3nFtof";

/// Where Stripe sends the customer after a successful checkout
pub const WELCOME_URL: &str = "https://daily-breathing.com/welcome/";

/// Full-page browser navigation
pub trait Navigator: Send + Sync {
    /// Origin of the current page, e.g. `https://example.com`
    fn origin(&self) -> String;

    fn navigate(&self, url: &str) -> Result<()>;
}

/// Loaded Stripe client library handle
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StripeHandle {
    pub publishable_key: String,
    pub live_mode: bool,
}

/// Loads the Stripe client library for a publishable key
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait StripeLoader: Send + Sync {
    async fn load(&self, publishable_key: &str) -> anyhow::Result<StripeHandle>;
}

/// Loader for hosted checkout, which needs no client-side Stripe code
#[derive(Clone, Copy, Debug, Default)]
pub struct HostedCheckoutLoader;

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl StripeLoader for HostedCheckoutLoader {
    async fn load(&self, publishable_key: &str) -> anyhow::Result<StripeHandle> {
        Ok(StripeHandle {
            publishable_key: publishable_key.to_string(),
            live_mode: publishable_key.starts_with("pk_live_"),
        })
    }
}

/// Billing plan
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Monthly,
    Yearly,
}

impl PlanType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Map a Stripe recurring interval
    pub fn from_interval(interval: &str) -> Option<Self> {
        match interval {
            "month" => Some(Self::Monthly),
            "year" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Request to create a checkout session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub price_id: String,
    pub plan_type: PlanType,
    pub user_id: String,

    /// Defaults to [`WELCOME_URL`]
    pub success_url: Option<String>,

    /// Defaults to `<origin>/?checkout=cancel`
    pub cancel_url: Option<String>,
}

impl CheckoutRequest {
    pub fn new(price_id: impl Into<String>, plan_type: PlanType, user_id: impl Into<String>) -> Self {
        Self {
            price_id: price_id.into(),
            plan_type,
            user_id: user_id.into(),
            success_url: None,
            cancel_url: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutSessionPayload<'a> {
    stripe_price_id: &'a str,
    plan_type: PlanType,
    user_id: &'a str,
    success_url: String,
    cancel_url: String,
}

/// Checkout session returned by the backend
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(default)]
    pub checkout_url: Option<String>,

    #[serde(default)]
    pub session_id: Option<String>,
}

/// One purchasable price, parsed from the price list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOption {
    pub id: String,
    pub unit_amount: Option<i64>,
    pub currency: String,
    pub plan_type: PlanType,
    pub nickname: Option<String>,
}

impl PriceOption {
    /// e.g. `9.99 USD`
    pub fn display_amount(&self) -> Option<String> {
        let cents = self.unit_amount?;
        Some(format!(
            "{}.{:02} {}",
            cents / 100,
            cents % 100,
            self.currency.to_uppercase()
        ))
    }
}

/// Parse a `get-stripe-prices` response
///
/// Accepts a bare array or an object with a `prices` or `data` array. Entries
/// without an `id` or a monthly/yearly recurring interval are skipped.
pub fn price_options(data: &Value) -> Vec<PriceOption> {
    let list = data
        .as_array()
        .or_else(|| data.get("prices").and_then(Value::as_array))
        .or_else(|| data.get("data").and_then(Value::as_array));

    list.into_iter()
        .flatten()
        .filter_map(|price| {
            let id = price.get("id")?.as_str()?.to_string();
            let interval = price.pointer("/recurring/interval").and_then(Value::as_str);
            let Some(plan_type) = interval.and_then(PlanType::from_interval) else {
                tracing::debug!(price_id = %id, ?interval, "Skipping price without a supported interval");
                return None;
            };
            let text = |key: &str| price.get(key).and_then(Value::as_str).map(str::to_string);
            Some(PriceOption {
                id,
                unit_amount: price.get("unit_amount").and_then(Value::as_i64),
                currency: text("currency").unwrap_or_else(|| "usd".into()),
                plan_type,
                nickname: text("nickname"),
            })
        })
        .collect()
}

/// Checkout adapter
pub struct CheckoutService {
    backend: Arc<dyn BackendClient>,
    navigator: Arc<dyn Navigator>,
    loader: Arc<dyn StripeLoader>,
    publishable_key: Option<String>,
    product_id: String,
    stripe: InitCell<StripeHandle>,
}

impl CheckoutService {
    pub fn new(
        publishable_key: Option<String>,
        backend: Arc<dyn BackendClient>,
        navigator: Arc<dyn Navigator>,
        loader: Arc<dyn StripeLoader>,
    ) -> Self {
        Self {
            backend,
            navigator,
            loader,
            publishable_key,
            product_id: PRODUCT_ID.to_string(),
            stripe: InitCell::new(),
        }
    }

    /// Create with the hosted checkout loader
    pub fn from_config(
        config: &PaywallConfig,
        backend: Arc<dyn BackendClient>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self::new(
            config.stripe_publishable_key.clone(),
            backend,
            navigator,
            Arc::new(HostedCheckoutLoader),
        )
    }

    /// Load the Stripe handle once and cache it
    pub async fn initialize(&self) -> Result<&StripeHandle> {
        self.stripe
            .ensure_initialized(|| async {
                let key = validate_publishable_key(self.publishable_key.as_deref())?;
                let handle = self
                    .loader
                    .load(key)
                    .await
                    .map_err(|e| PaywallError::upstream("loadStripe", e))?;
                tracing::info!(live_mode = handle.live_mode, "Stripe loaded");
                Ok::<_, PaywallError>(handle)
            })
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to initialize Stripe"))
    }

    /// Raw price list for the product
    pub async fn get_prices(&self) -> Result<Value> {
        self.backend
            .invoke_function(GET_PRICES_FN, Some(&json!({ "productId": self.product_id })))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch prices"))
    }

    /// Ask the backend for a hosted checkout session
    ///
    /// Requires an authenticated session; without one no function is invoked.
    pub async fn create_checkout_session(&self, request: &CheckoutRequest) -> Result<CheckoutSession> {
        let session = match self.backend.get_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                tracing::error!("No active session found");
                return Err(PaywallError::Auth(
                    "Please sign in to create a checkout session".into(),
                ));
            }
            Err(e) => {
                tracing::error!(error = %e, "Session error");
                return Err(PaywallError::Auth(
                    "Authentication error. Please sign in again.".into(),
                ));
            }
        };

        tracing::debug!(user_id = %session.user.id, "Creating checkout session");

        let payload = CheckoutSessionPayload {
            stripe_price_id: &request.price_id,
            plan_type: request.plan_type,
            user_id: &request.user_id,
            success_url: request
                .success_url
                .clone()
                .unwrap_or_else(|| WELCOME_URL.to_string()),
            cancel_url: request
                .cancel_url
                .clone()
                .unwrap_or_else(|| format!("{}/?checkout=cancel", self.navigator.origin())),
        };

        let data = self
            .backend
            .invoke_function(CREATE_CHECKOUT_SESSION_FN, Some(&serde_json::to_value(&payload)?))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to create checkout session"))?;

        serde_json::from_value(data)
            .map_err(PaywallError::from)
            .inspect_err(|e| tracing::error!(error = %e, "Malformed checkout session"))
    }

    /// Navigate to the hosted checkout page
    ///
    /// An empty or missing URL is rejected before any navigation.
    pub fn redirect_to_checkout(&self, checkout_url: Option<&str>) -> Result<()> {
        let Some(url) = checkout_url.filter(|url| !url.trim().is_empty()) else {
            let err = PaywallError::Validation("No checkout URL provided".into());
            tracing::error!(error = %err, "Failed to redirect to checkout");
            return Err(err);
        };

        self.navigator
            .navigate(url)
            .inspect_err(|e| tracing::error!(error = %e, "Failed to redirect to checkout"))
    }

    /// Create a session and redirect to it
    pub async fn purchase_subscription(&self, request: &CheckoutRequest) -> Result<()> {
        let session = self.create_checkout_session(request).await?;
        self.redirect_to_checkout(session.checkout_url.as_deref())
    }

    /// Raw subscription record for the signed-in user
    pub async fn get_customer_subscriptions(&self) -> Result<Value> {
        self.backend
            .invoke_function(GET_SUBSCRIPTION_FN, None)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to get subscriptions"))
    }

    pub async fn restore_purchases(&self) -> Result<SubscriptionStatus> {
        let data = self.get_customer_subscriptions().await?;
        let status = SubscriptionStatus::from_response(&data);
        tracing::info!(active = status.has_active_subscription, "Restored purchases");
        Ok(status)
    }

    /// Billing portal URL for managing the subscription
    pub async fn get_manage_subscription_url(&self) -> Result<String> {
        let data = self
            .backend
            .invoke_function(CREATE_PORTAL_SESSION_FN, Some(&json!({})))
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to get portal URL"))?;

        data.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                let err = PaywallError::upstream(CREATE_PORTAL_SESSION_FN, "response has no url");
                tracing::error!(error = %err, "Failed to get portal URL");
                err
            })
    }
}
