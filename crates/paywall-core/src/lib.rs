//! # paywall-core
//!
//! Service adapters behind the Daily Breathing paywall widget.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Services                             │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌──────────────┐  │
//! │  │ PurchaseService │  │ CheckoutService │──│BackendClient │  │
//! │  │  (RevenueCat)   │  │    (Stripe)     │  │  (Supabase)  │  │
//! │  └─────────────────┘  └─────────────────┘  └──────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adapters initialize lazily and at most once; concurrent callers share one
//! in-flight initialization. Failures are logged where they happen and then
//! returned, never swallowed.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paywall_core::{CheckoutRequest, PaywallConfig, PlanType, Services};
//!
//! let services = Services::from_config(&PaywallConfig::from_env(), navigator)?;
//!
//! let request = CheckoutRequest::new("price_123", PlanType::Monthly, user_id);
//! services.checkout.purchase_subscription(&request).await?;
//! ```

pub mod backend;
pub mod checkout;
pub mod config;
pub mod error;
pub mod init;
pub mod purchases;
pub mod services;
pub mod subscription;

pub use backend::{AuthSession, AuthUser, BackendClient, SessionTokens, SupabaseClient};
pub use checkout::{
    CheckoutRequest, CheckoutService, CheckoutSession, HostedCheckoutLoader, Navigator, PlanType,
    PriceOption, StripeHandle, StripeLoader, price_options,
};
pub use config::PaywallConfig;
pub use error::{PaywallError, Result};
pub use init::InitCell;
pub use purchases::{
    CustomerInfo, Entitlement, Offering, Offerings, Package, PurchaseSdk, PurchaseService,
    PurchasesHandle, RevenueCatClient,
};
pub use services::Services;
pub use subscription::SubscriptionStatus;
