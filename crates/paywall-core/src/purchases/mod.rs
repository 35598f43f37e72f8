//! Purchase Service
//!
//! Lazily configures the purchase SDK with an API key and an app user id,
//! then exposes the purchase lifecycle. Every SDK failure is logged and
//! returned as [`PaywallError::Purchase`] with the original cause attached.

mod revenuecat;

pub use revenuecat::RevenueCatClient;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{PaywallConfig, REVENUECAT_API_KEY_VAR};
use crate::error::{PaywallError, Result};
use crate::init::InitCell;

/// Purchasable package inside an offering
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub identifier: String,

    #[serde(alias = "platform_product_identifier")]
    pub product_identifier: String,

    /// Web purchases: the Stripe checkout session or subscription id that
    /// completed payment for this package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_token: Option<String>,
}

/// Group of packages presented together
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offering {
    pub identifier: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub packages: Vec<Package>,
}

/// All offerings for the current user
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offerings {
    #[serde(default)]
    pub current_offering_id: Option<String>,

    #[serde(default)]
    pub offerings: Vec<Offering>,
}

impl Offerings {
    /// The offering marked current, if any
    pub fn current(&self) -> Option<&Offering> {
        let id = self.current_offering_id.as_deref()?;
        self.offerings.iter().find(|o| o.identifier == id)
    }
}

/// Entitlement granted to a customer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entitlement {
    pub product_identifier: String,

    #[serde(default)]
    pub purchase_date: Option<DateTime<Utc>>,

    /// `None` for lifetime entitlements
    #[serde(default)]
    pub expires_date: Option<DateTime<Utc>>,
}

/// Customer record returned by most purchase operations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub original_app_user_id: String,

    #[serde(default)]
    pub entitlements: HashMap<String, Entitlement>,

    #[serde(default)]
    pub management_url: Option<String>,
}

impl CustomerInfo {
    pub fn has_active_entitlement(&self, entitlement: &str, now: DateTime<Utc>) -> bool {
        self.entitlements
            .get(entitlement)
            .is_some_and(|e| e.expires_date.is_none_or(|expires| expires > now))
    }
}

/// Purchase SDK entry point (Strategy pattern)
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PurchaseSdk: Send + Sync {
    /// Generate an anonymous app user id
    fn anonymous_app_user_id(&self) -> String {
        format!("$RCAnonymousID:{}", uuid::Uuid::new_v4().simple())
    }

    /// Configure the SDK and return the shared instance
    async fn configure(
        &self,
        api_key: &str,
        app_user_id: &str,
    ) -> anyhow::Result<Arc<dyn PurchasesHandle>>;
}

/// Configured purchase SDK instance
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PurchasesHandle: Send + Sync {
    /// App user id purchases are currently attributed to
    fn app_user_id(&self) -> String;

    async fn get_offerings(&self) -> anyhow::Result<Offerings>;

    async fn purchase(&self, package: &Package) -> anyhow::Result<CustomerInfo>;

    async fn restore_purchases(&self) -> anyhow::Result<CustomerInfo>;

    async fn get_customer_info(&self) -> anyhow::Result<CustomerInfo>;

    /// Switch to a known app user id
    async fn identify(&self, app_user_id: &str) -> anyhow::Result<CustomerInfo>;
}

/// Purchase adapter with single-flight lazy initialization
pub struct PurchaseService {
    api_key: Option<String>,
    sdk: Arc<dyn PurchaseSdk>,
    handle: InitCell<Arc<dyn PurchasesHandle>>,
}

impl PurchaseService {
    pub fn new(api_key: Option<String>, sdk: Arc<dyn PurchaseSdk>) -> Self {
        Self {
            api_key,
            sdk,
            handle: InitCell::new(),
        }
    }

    /// Create with the RevenueCat REST client
    pub fn from_config(config: &PaywallConfig) -> Self {
        Self::new(
            config.revenuecat_api_key.clone(),
            Arc::new(RevenueCatClient::new()),
        )
    }

    pub fn is_initialized(&self) -> bool {
        self.handle.is_initialized()
    }

    /// Configure the SDK once and return the shared instance
    ///
    /// Once ready, later calls return the same instance and ignore `user_id`.
    pub async fn initialize(&self, user_id: Option<&str>) -> Result<Arc<dyn PurchasesHandle>> {
        self.handle
            .ensure_initialized(|| async {
                let api_key = self.api_key.as_deref().ok_or_else(|| {
                    PaywallError::Config(format!("{REVENUECAT_API_KEY_VAR} is not configured"))
                })?;

                let app_user_id = user_id
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map_or_else(|| self.sdk.anonymous_app_user_id(), ToString::to_string);

                let handle = self
                    .sdk
                    .configure(api_key, &app_user_id)
                    .await
                    .map_err(|e| purchase_error("initialize", e))?;

                tracing::info!(app_user_id = %app_user_id, "Purchase SDK configured");
                Ok::<_, PaywallError>(handle)
            })
            .await
            .cloned()
            .inspect_err(|e| tracing::error!(error = %e, "Failed to initialize purchases"))
    }

    pub async fn get_offerings(&self) -> Result<Offerings> {
        let handle = self.initialize(None).await?;
        handle
            .get_offerings()
            .await
            .map_err(|e| logged("getOfferings", e))
    }

    pub async fn purchase_package(&self, package: &Package) -> Result<CustomerInfo> {
        let handle = self.initialize(None).await?;
        handle
            .purchase(package)
            .await
            .map_err(|e| logged("purchasePackage", e))
    }

    pub async fn restore_purchases(&self) -> Result<CustomerInfo> {
        let handle = self.initialize(None).await?;
        handle
            .restore_purchases()
            .await
            .map_err(|e| logged("restorePurchases", e))
    }

    pub async fn get_customer_info(&self) -> Result<CustomerInfo> {
        let handle = self.initialize(None).await?;
        handle
            .get_customer_info()
            .await
            .map_err(|e| logged("getCustomerInfo", e))
    }

    pub async fn identify(&self, user_id: &str) -> Result<CustomerInfo> {
        let handle = self.initialize(None).await?;
        handle
            .identify(user_id)
            .await
            .map_err(|e| logged("identify", e))
    }
}

fn purchase_error(operation: &'static str, source: anyhow::Error) -> PaywallError {
    PaywallError::Purchase { operation, source }
}

fn logged(operation: &'static str, source: anyhow::Error) -> PaywallError {
    let err = purchase_error(operation, source);
    tracing::error!(operation, error = %err, "Purchase operation failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSdk {
        configure_calls: AtomicUsize,
        configured_ids: Mutex<Vec<String>>,
        fail: bool,
    }

    struct FakeHandle {
        app_user_id: String,
    }

    fn customer(id: &str) -> CustomerInfo {
        CustomerInfo {
            original_app_user_id: id.to_string(),
            entitlements: HashMap::new(),
            management_url: None,
        }
    }

    #[async_trait]
    impl PurchaseSdk for FakeSdk {
        fn anonymous_app_user_id(&self) -> String {
            "$RCAnonymousID:fake".into()
        }

        async fn configure(
            &self,
            _api_key: &str,
            app_user_id: &str,
        ) -> anyhow::Result<Arc<dyn PurchasesHandle>> {
            self.configure_calls.fetch_add(1, Ordering::SeqCst);
            self.configured_ids.lock().unwrap().push(app_user_id.to_string());
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            if self.fail {
                anyhow::bail!("sdk unavailable");
            }
            Ok(Arc::new(FakeHandle {
                app_user_id: app_user_id.to_string(),
            }))
        }
    }

    #[async_trait]
    impl PurchasesHandle for FakeHandle {
        fn app_user_id(&self) -> String {
            self.app_user_id.clone()
        }

        async fn get_offerings(&self) -> anyhow::Result<Offerings> {
            Ok(Offerings::default())
        }

        async fn purchase(&self, _package: &Package) -> anyhow::Result<CustomerInfo> {
            anyhow::bail!("card declined")
        }

        async fn restore_purchases(&self) -> anyhow::Result<CustomerInfo> {
            Ok(customer(&self.app_user_id))
        }

        async fn get_customer_info(&self) -> anyhow::Result<CustomerInfo> {
            Ok(customer(&self.app_user_id))
        }

        async fn identify(&self, app_user_id: &str) -> anyhow::Result<CustomerInfo> {
            Ok(customer(app_user_id))
        }
    }

    fn service(sdk: Arc<FakeSdk>) -> PurchaseService {
        PurchaseService::new(Some("rc_public".into()), sdk)
    }

    #[tokio::test]
    async fn test_initialize_configures_once() {
        let sdk = Arc::new(FakeSdk::default());
        let service = service(sdk.clone());

        let first = service.initialize(Some("user-1")).await.unwrap();
        let second = service.initialize(Some("user-2")).await.unwrap();
        service.get_offerings().await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(sdk.configure_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.app_user_id(), "user-1");
    }

    #[tokio::test]
    async fn test_concurrent_initialize_is_single_flight() {
        let sdk = Arc::new(FakeSdk::default());
        let service = service(sdk.clone());

        let (a, b) = tokio::join!(service.initialize(None), service.get_customer_info());
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(sdk.configure_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_user_id_is_trimmed_or_anonymous() {
        let sdk = Arc::new(FakeSdk::default());
        service(sdk.clone()).initialize(Some("  user-9 ")).await.unwrap();
        service(sdk.clone()).initialize(Some("   ")).await.unwrap();

        assert_eq!(
            *sdk.configured_ids.lock().unwrap(),
            vec!["user-9".to_string(), "$RCAnonymousID:fake".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_api_key_is_config_error() {
        let sdk = Arc::new(FakeSdk::default());
        let service = PurchaseService::new(None, sdk.clone());

        assert!(matches!(
            service.get_offerings().await,
            Err(PaywallError::Config(_))
        ));
        assert_eq!(sdk.configure_calls.load(Ordering::SeqCst), 0);
        assert!(!service.is_initialized());
    }

    #[tokio::test]
    async fn test_sdk_failures_are_wrapped() {
        let sdk = Arc::new(FakeSdk {
            fail: true,
            ..Default::default()
        });
        let err = service(sdk).initialize(None).await.err().unwrap();
        assert!(matches!(err, PaywallError::Purchase { operation: "initialize", .. }));

        let service = service(Arc::new(FakeSdk::default()));
        let package = Package {
            identifier: "$rc_monthly".into(),
            product_identifier: "monthly".into(),
            fetch_token: None,
        };
        let err = service.purchase_package(&package).await.unwrap_err();
        assert!(matches!(err, PaywallError::Purchase { operation: "purchasePackage", .. }));
        assert!(err.to_string().contains("card declined"));
    }

    #[tokio::test]
    async fn test_identify_delegates_after_lazy_init() {
        let sdk = Arc::new(FakeSdk::default());
        let service = service(sdk.clone());

        let info = service.identify("user-42").await.unwrap();
        assert_eq!(info.original_app_user_id, "user-42");
        assert_eq!(sdk.configure_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_active_entitlement() {
        let now = Utc::now();
        let mut info = customer("u");
        info.entitlements.insert(
            "premium".into(),
            Entitlement {
                product_identifier: "monthly".into(),
                purchase_date: None,
                expires_date: Some(now + chrono::Duration::days(3)),
            },
        );
        info.entitlements.insert(
            "legacy".into(),
            Entitlement {
                product_identifier: "old".into(),
                purchase_date: None,
                expires_date: Some(now - chrono::Duration::days(3)),
            },
        );

        assert!(info.has_active_entitlement("premium", now));
        assert!(!info.has_active_entitlement("legacy", now));
        assert!(!info.has_active_entitlement("missing", now));
    }

    #[test]
    fn test_current_offering() {
        let offerings: Offerings = serde_json::from_value(serde_json::json!({
            "current_offering_id": "default",
            "offerings": [
                { "identifier": "default", "description": "Standard", "packages": [
                    { "identifier": "$rc_monthly", "platform_product_identifier": "prod_monthly" }
                ]}
            ]
        }))
        .unwrap();

        let current = offerings.current().unwrap();
        assert_eq!(current.packages[0].product_identifier, "prod_monthly");
    }
}
