//! RevenueCat REST client
//!
//! Implements [`PurchaseSdk`] against the RevenueCat v1 API using the public
//! (web) API key. Web purchases are paid through Stripe, so a purchase posts
//! the Stripe token of the completed checkout as a receipt.

use std::sync::{Arc, PoisonError, RwLock};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;

use super::{CustomerInfo, Offerings, Package, PurchaseSdk, PurchasesHandle};

const DEFAULT_BASE_URL: &str = "https://api.revenuecat.com/v1";

/// Platform header value for purchases made through Stripe
const PLATFORM: &str = "stripe";

#[derive(Deserialize)]
struct SubscriberResponse {
    subscriber: CustomerInfo,
}

/// RevenueCat SDK entry point
#[derive(Clone)]
pub struct RevenueCatClient {
    http: reqwest::Client,
    base_url: String,
}

impl Default for RevenueCatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl RevenueCatClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point at a different API root (proxies, tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PurchaseSdk for RevenueCatClient {
    async fn configure(
        &self,
        api_key: &str,
        app_user_id: &str,
    ) -> anyhow::Result<Arc<dyn PurchasesHandle>> {
        let handle = RevenueCatHandle {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            api_key: api_key.to_string(),
            app_user_id: RwLock::new(app_user_id.to_string()),
        };

        // Looking up the subscriber creates it on first sight
        handle.get_customer_info().await?;
        Ok(Arc::new(handle))
    }
}

/// Configured RevenueCat instance bound to one app user id
struct RevenueCatHandle {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    app_user_id: RwLock<String>,
}

impl RevenueCatHandle {
    fn url(&self, segments: &[&str]) -> anyhow::Result<Url> {
        let mut url = Url::parse(&self.base_url).context("invalid RevenueCat base URL")?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("RevenueCat base URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("X-Platform", PLATFORM)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> anyhow::Result<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body: serde_json::Value = response.json().await.unwrap_or_default();
            let message = body
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("request failed");
            anyhow::bail!("RevenueCat returned {status}: {message}");
        }
        Ok(response.json().await?)
    }

    async fn subscriber(&self, request: RequestBuilder) -> anyhow::Result<CustomerInfo> {
        let response: SubscriberResponse = self.send(request).await?;
        Ok(response.subscriber)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PurchasesHandle for RevenueCatHandle {
    fn app_user_id(&self) -> String {
        self.app_user_id
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn get_offerings(&self) -> anyhow::Result<Offerings> {
        let url = self.url(&["subscribers", &self.app_user_id(), "offerings"])?;
        self.send(self.http.get(url)).await
    }

    async fn purchase(&self, package: &Package) -> anyhow::Result<CustomerInfo> {
        let fetch_token = package
            .fetch_token
            .as_deref()
            .ok_or_else(|| anyhow!("package '{}' has no payment token", package.identifier))?;

        let url = self.url(&["receipts"])?;
        let body = json!({
            "app_user_id": self.app_user_id(),
            "fetch_token": fetch_token,
            "product_id": package.product_identifier,
        });
        self.subscriber(self.http.post(url).json(&body)).await
    }

    async fn restore_purchases(&self) -> anyhow::Result<CustomerInfo> {
        // Web purchases are attached to the app user id, so restoring means
        // re-reading the subscriber.
        self.get_customer_info().await
    }

    async fn get_customer_info(&self) -> anyhow::Result<CustomerInfo> {
        let url = self.url(&["subscribers", &self.app_user_id()])?;
        self.subscriber(self.http.get(url)).await
    }

    async fn identify(&self, app_user_id: &str) -> anyhow::Result<CustomerInfo> {
        let url = self.url(&["subscribers", "identify"])?;
        let body = json!({
            "app_user_id": self.app_user_id(),
            "new_app_user_id": app_user_id,
        });
        let info = self.subscriber(self.http.post(url).json(&body)).await?;

        *self
            .app_user_id
            .write()
            .unwrap_or_else(PoisonError::into_inner) = app_user_id.to_string();
        Ok(info)
    }
}
