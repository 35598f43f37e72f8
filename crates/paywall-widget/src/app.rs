//! Paywall Component

use leptos::ev::MouseEvent;
use leptos::prelude::*;
use paywall_core::{CheckoutRequest, PaywallError, PriceOption, Services, price_options};

use crate::components::{PriceLabel, StatusBanner};

/// Root paywall view
#[component]
pub fn Paywall(services: Services) -> impl IntoView {
    let (prices, set_prices) = signal(Vec::<PriceOption>::new());
    let (message, set_message) = signal(None::<String>);
    let (busy, set_busy) = signal(false);
    let (active, set_active) = signal(false);

    let report = move |err: &PaywallError| set_message.set(Some(err.user_message().to_string()));

    {
        let services = services.clone();
        leptos::task::spawn_local(async move {
            match services.checkout.get_prices().await {
                Ok(data) => set_prices.set(price_options(&data)),
                Err(e) => report(&e),
            }
        });
    }

    let subscribe = {
        let services = services.clone();
        move |price: PriceOption| {
            if busy.get() {
                return;
            }
            set_busy.set(true);
            set_message.set(None);

            let services = services.clone();
            leptos::task::spawn_local(async move {
                let session = match services.backend.get_session().await {
                    Ok(Some(session)) => session,
                    Ok(None) => {
                        set_message.set(Some("Please sign in to subscribe.".into()));
                        set_busy.set(false);
                        return;
                    }
                    Err(e) => {
                        report(&e);
                        set_busy.set(false);
                        return;
                    }
                };

                let request = CheckoutRequest::new(price.id, price.plan_type, session.user.id);
                if let Err(e) = services.checkout.purchase_subscription(&request).await {
                    report(&e);
                }
                set_busy.set(false);
            });
        }
    };

    let restore = {
        let services = services.clone();
        move |_: MouseEvent| {
            set_busy.set(true);
            let services = services.clone();
            leptos::task::spawn_local(async move {
                match services.checkout.restore_purchases().await {
                    Ok(status) => {
                        set_active.set(status.has_active_subscription);
                        set_message.set(Some(if status.has_active_subscription {
                            "Your subscription is active.".into()
                        } else {
                            "No active subscription found.".into()
                        }));
                    }
                    Err(e) => report(&e),
                }
                set_busy.set(false);
            });
        }
    };

    let manage = move |_: MouseEvent| {
        set_busy.set(true);
        let services = services.clone();
        leptos::task::spawn_local(async move {
            let result = match services.checkout.get_manage_subscription_url().await {
                Ok(url) => services.checkout.redirect_to_checkout(Some(&url)),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                report(&e);
            }
            set_busy.set(false);
        });
    };

    view! {
        <section class="dbp-paywall">
            <h2>"Daily Breathing Premium"</h2>

            <div class="dbp-plans">
                <For
                    each=move || prices.get()
                    key=|price| price.id.clone()
                    children=move |price| {
                        let subscribe = subscribe.clone();
                        let title = price.nickname.clone().unwrap_or_else(|| "Premium".into());
                        let selected = price.clone();
                        view! {
                            <div class="dbp-plan">
                                <h3>{title}</h3>
                                <PriceLabel price=price />
                                <button
                                    class="dbp-btn dbp-btn-primary"
                                    disabled=move || busy.get()
                                    on:click=move |_| subscribe(selected.clone())
                                >
                                    "Subscribe"
                                </button>
                            </div>
                        }
                    }
                />
            </div>

            <div class="dbp-actions">
                <button class="dbp-btn" disabled=move || busy.get() on:click=restore>
                    "Restore purchases"
                </button>
                <Show when=move || active.get()>
                    <button class="dbp-btn" disabled=move || busy.get() on:click=manage.clone()>
                        "Manage subscription"
                    </button>
                </Show>
            </div>

            <StatusBanner message=message />
        </section>
    }
}
