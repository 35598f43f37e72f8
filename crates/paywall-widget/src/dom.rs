//! Browser adapters for the bootstrapper and the checkout service

use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use leptos::prelude::*;
use paywall_core::{Navigator, PaywallError, Services};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Element, HtmlElement};

use crate::app::Paywall;
use crate::auto_mount::Timer;
use crate::bootstrap::{Document, Mounter, ReadyState};

/// Window property set once any widget copy has mounted the paywall
pub const INITIALIZED_FLAG: &str = "_dailyBreathingPaywallInitialized";

/// The page's `document`
#[derive(Clone)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    pub fn current() -> Option<Self> {
        let document = web_sys::window()?.document()?;
        Some(Self { document })
    }

    pub const fn inner(&self) -> &web_sys::Document {
        &self.document
    }
}

impl Document for WebDocument {
    type Element = Element;

    fn ready_state(&self) -> ReadyState {
        match self.document.ready_state().as_str() {
            "loading" => ReadyState::Loading,
            "interactive" => ReadyState::Interactive,
            _ => ReadyState::Complete,
        }
    }

    fn element_by_id(&self, id: &str) -> Option<Element> {
        self.document.get_element_by_id(id)
    }

    fn create_container(&self, id: &str) -> Option<Element> {
        let container = self.document.create_element("div").ok()?;
        container.set_id(id);
        self.document.body()?.append_child(&container).ok()?;
        Some(container)
    }

    fn find_marked(&self, attribute: &str) -> Option<Element> {
        self.document
            .query_selector(&format!("[{attribute}]"))
            .ok()
            .flatten()
    }

    fn attribute(&self, element: &Element, name: &str) -> Option<String> {
        element.get_attribute(name)
    }

    fn id(&self, element: &Element) -> String {
        element.id()
    }

    fn set_id(&self, element: &Element, id: &str) {
        element.set_id(id);
    }

    fn initialized_flag(&self) -> bool {
        web_sys::window()
            .and_then(|window| js_sys::Reflect::get(&window, &JsValue::from_str(INITIALIZED_FLAG)).ok())
            .is_some_and(|value| value.is_truthy())
    }

    fn set_initialized_flag(&self) {
        let Some(window) = web_sys::window() else {
            return;
        };
        if let Err(e) = js_sys::Reflect::set(&window, &JsValue::from_str(INITIALIZED_FLAG), &JsValue::TRUE) {
            tracing::warn!(error = ?e, "Could not set the paywall window flag");
        }
    }
}

/// Resolves on `DOMContentLoaded`
pub fn document_ready(document: &web_sys::Document) -> LocalBoxFuture<'static, ()> {
    let (tx, rx) = oneshot::channel::<()>();
    let listener = Closure::once(move || {
        let _ = tx.send(());
    });

    if let Err(e) = document
        .add_event_listener_with_callback("DOMContentLoaded", listener.as_ref().unchecked_ref())
    {
        tracing::warn!(error = ?e, "Could not listen for DOMContentLoaded");
        return Box::pin(async {});
    }
    listener.forget();

    Box::pin(async move {
        let _ = rx.await;
    })
}

/// `window.location` navigation
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn origin(&self) -> String {
        web_sys::window()
            .and_then(|window| window.location().origin().ok())
            .unwrap_or_default()
    }

    fn navigate(&self, url: &str) -> paywall_core::Result<()> {
        let window = web_sys::window()
            .ok_or_else(|| PaywallError::Navigation("no browser window".into()))?;
        window
            .location()
            .set_href(url)
            .map_err(|e| PaywallError::Navigation(format!("navigation to {url} failed: {e:?}")))
    }
}

/// `setTimeout` sleeps
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserTimer;

impl Timer for BrowserTimer {
    fn sleep(&self, duration: Duration) -> LocalBoxFuture<'static, ()> {
        let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
        let promise = js_sys::Promise::new(&mut |resolve, _reject| {
            if let Some(window) = web_sys::window() {
                let _ = window
                    .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis);
            }
        });

        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }
}

/// Mounts the [`Paywall`] component
pub struct LeptosMounter {
    services: Services,
}

impl LeptosMounter {
    pub const fn new(services: Services) -> Self {
        Self { services }
    }
}

impl Mounter<Element> for LeptosMounter {
    fn mount(&self, container: &Element) {
        let services = self.services.clone();
        let target: HtmlElement = container.clone().unchecked_into();
        leptos::mount::mount_to(target, move || view! { <Paywall services=services /> })
            .forget();
    }
}

/// Navigator shared with the service registry
pub fn navigator() -> Arc<dyn Navigator> {
    Arc::new(BrowserNavigator)
}
