//! Subscription status normalization

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether the signed-in user has a paid subscription
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub has_active_subscription: bool,

    /// Subscription record as returned by the backend, passed through as-is
    pub subscription: Option<Value>,
}

impl SubscriptionStatus {
    /// Normalize a `get-stripe-subscription` response
    ///
    /// Active means `hasStripeSubscription` is `true` and the subscription
    /// status is `active` or `trialing`.
    pub fn from_response(data: &Value) -> Self {
        let subscription = data
            .get("subscription")
            .filter(|s| !s.is_null())
            .cloned();

        let has_stripe_subscription = data
            .get("hasStripeSubscription")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let status = subscription
            .as_ref()
            .and_then(|s| s.get("status"))
            .and_then(Value::as_str);

        Self {
            has_active_subscription: has_stripe_subscription && status.is_some_and(is_active_status),
            subscription,
        }
    }
}

pub fn is_active_status(status: &str) -> bool {
    matches!(status, "active" | "trialing")
}
