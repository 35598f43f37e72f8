//! UI Components

use leptos::prelude::*;
use paywall_core::{PlanType, PriceOption};

/// Outcome line under the plans
#[component]
pub fn StatusBanner(message: ReadSignal<Option<String>>) -> impl IntoView {
    view! {
        <Show when=move || message.get().is_some()>
            <p class="dbp-status">{move || message.get().unwrap_or_default()}</p>
        </Show>
    }
}

/// Amount and billing interval of one price
#[component]
pub fn PriceLabel(price: PriceOption) -> impl IntoView {
    let interval = match price.plan_type {
        PlanType::Yearly => "/year",
        PlanType::Monthly => "/month",
    };
    let amount = price.display_amount().unwrap_or_else(|| "-".into());

    view! {
        <div class="dbp-price">
            {amount}<span>{interval}</span>
        </div>
    }
}
