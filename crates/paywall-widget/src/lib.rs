//! Daily Breathing Paywall Widget
//!
//! Leptos-based WASM widget that mounts the paywall into a host page. The
//! mount policy ([`bootstrap`], [`auto_mount`]) is browser-independent; the
//! browser adapters and the UI only build for `wasm32`.
//!
//! Host pages either call `initDailyBreathingPaywall(containerId?)` or mark
//! an element with `data-daily-breathing-paywall` and let the widget find it.
//! A signed-in user reaches the widget either through an auth redirect
//! (tokens in the URL fragment) or through
//! `setDailyBreathingPaywallSession(accessToken, refreshToken?, expiresAt?)`.

pub mod auto_mount;
pub mod bootstrap;

#[cfg(target_arch = "wasm32")]
mod app;
#[cfg(target_arch = "wasm32")]
mod components;
#[cfg(target_arch = "wasm32")]
mod dom;
#[cfg(target_arch = "wasm32")]
mod logging;

pub use auto_mount::{AutoMountPolicy, Timer, auto_mount};
pub use bootstrap::{Bootstrapper, DEFAULT_CONTAINER_ID, Document, MARKER_ATTRIBUTE, Mounter, ReadyState};

#[cfg(target_arch = "wasm32")]
mod web {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use futures::future::{AbortHandle, abortable};
    use paywall_core::{PaywallConfig, Services, SessionTokens};
    use wasm_bindgen::prelude::*;

    use crate::auto_mount::{AutoMountPolicy, auto_mount};
    use crate::bootstrap::Bootstrapper;
    use crate::dom::{BrowserTimer, LeptosMounter, WebDocument, document_ready, navigator};
    use crate::logging;

    type WebBootstrapper = Bootstrapper<WebDocument, LeptosMounter>;

    struct Widget {
        services: Services,
        bootstrapper: Rc<WebBootstrapper>,
        auto_mount: Option<AbortHandle>,
    }

    thread_local! {
        static WIDGET: RefCell<Option<Widget>> = const { RefCell::new(None) };
    }

    /// WASM entry point
    #[wasm_bindgen(start)]
    pub fn start() {
        console_error_panic_hook::set_once();
        logging::init();

        let services = match Services::from_config(&PaywallConfig::from_build_env(), navigator()) {
            Ok(services) => services,
            Err(e) => {
                tracing::error!(error = %e, "Daily Breathing Paywall not started");
                return;
            }
        };

        let Some(document) = WebDocument::current() else {
            tracing::error!("No document available, paywall not started");
            return;
        };

        restore_from_redirect(&services);

        let ready = document_ready(document.inner());
        let bootstrapper = Rc::new(Bootstrapper::new(document, LeptosMounter::new(services.clone())));

        let task_bootstrapper = Rc::clone(&bootstrapper);
        let (task, handle) = abortable(async move {
            auto_mount(&task_bootstrapper, ready, &BrowserTimer, &AutoMountPolicy::default()).await;
        });
        wasm_bindgen_futures::spawn_local(async move {
            let _ = task.await;
        });

        WIDGET.with_borrow_mut(|widget| {
            *widget = Some(Widget {
                services,
                bootstrapper,
                auto_mount: Some(handle),
            });
        });
    }

    /// Adopt the session carried by an auth redirect fragment
    ///
    /// The fragment is removed from the address bar before the tokens are
    /// exchanged so they do not linger in history.
    fn restore_from_redirect(services: &Services) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let location = window.location();
        let Some(tokens) = location
            .hash()
            .ok()
            .and_then(|hash| SessionTokens::from_fragment(&hash))
        else {
            return;
        };

        let path = format!(
            "{}{}",
            location.pathname().unwrap_or_default(),
            location.search().unwrap_or_default()
        );
        if let Err(e) = window
            .history()
            .and_then(|history| history.replace_state_with_url(&JsValue::NULL, "", Some(&path)))
        {
            tracing::warn!(error = ?e, "Could not clear auth redirect fragment");
        }

        let backend = Arc::clone(&services.backend);
        wasm_bindgen_futures::spawn_local(async move {
            // Failures are logged by the backend client; the user stays signed out
            let _ = backend.restore_session(tokens).await;
        });
    }

    /// Sign the widget in with tokens the host page already holds
    ///
    /// `expires_at` is in Unix seconds. Resolves to the user id.
    #[wasm_bindgen(js_name = setDailyBreathingPaywallSession)]
    pub async fn set_daily_breathing_paywall_session(
        access_token: String,
        refresh_token: Option<String>,
        expires_at: Option<u32>,
    ) -> Result<String, JsValue> {
        let backend = WIDGET
            .with_borrow(|widget| widget.as_ref().map(|w| Arc::clone(&w.services.backend)))
            .ok_or_else(|| JsValue::from_str("Daily Breathing Paywall is not configured"))?;
        let tokens = SessionTokens::from_parts(access_token, refresh_token, expires_at.map(i64::from))
            .ok_or_else(|| JsValue::from_str("An access token is required"))?;

        backend
            .restore_session(tokens)
            .await
            .map(|session| session.user.id)
            .map_err(|e| JsValue::from_str(e.user_message()))
    }

    /// Mount the paywall into `container_id`, or the default container
    #[wasm_bindgen(js_name = initDailyBreathingPaywall)]
    pub fn init_daily_breathing_paywall(container_id: Option<String>) -> Result<web_sys::Element, JsValue> {
        let bootstrapper = WIDGET
            .with_borrow(|widget| widget.as_ref().map(|w| Rc::clone(&w.bootstrapper)))
            .ok_or_else(|| JsValue::from_str("Daily Breathing Paywall is not configured"))?;

        bootstrapper
            .init(container_id.as_deref())
            .ok_or_else(|| JsValue::from_str("Paywall container is not available"))
    }

    /// Stop looking for the marker attribute
    #[wasm_bindgen(js_name = disconnectDailyBreathingPaywall)]
    pub fn disconnect_daily_breathing_paywall() {
        WIDGET.with_borrow_mut(|widget| {
            if let Some(handle) = widget.as_mut().and_then(|w| w.auto_mount.take()) {
                handle.abort();
                tracing::debug!("Paywall auto-mount disconnected");
            }
        });
    }
}
