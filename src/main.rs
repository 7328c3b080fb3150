//! Leads Admin - Dioxus back-office for call-center leads
//!
//! Lists, filters and edits the `leads` table of a Supabase project
//! through its PostgREST interface. Fetches go through a per-view query
//! cache so filter changes, refreshes and mutations stay consistent.

mod api;
mod components;
mod config;
mod error;
mod models;
mod routes;
mod state;

use std::rc::Rc;
use std::sync::OnceLock;

use anyhow::Context;
use dioxus::prelude::*;

use api::{ApiClient, LeadStore, SupabaseLeadStore};
use components::common::ErrorMessage;
use config::{AppConfig, ConfigError};
use routes::Route;

static APP_CONFIG: OnceLock<Result<AppConfig, ConfigError>> = OnceLock::new();

fn main() {
    #[cfg(not(target_arch = "wasm32"))]
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("leads_admin=info"));
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(filter)
            .init();

        // Load environment variables
        dotenvy::dotenv().ok();
    }

    // A bad configuration is reported by the app itself, not by a blank page
    let config = AppConfig::from_env();
    match &config {
        Ok(config) => tracing::info!(
            "Using Supabase at {} (cache capacity {}, stale time {:?})",
            config.supabase_url,
            config.cache.capacity,
            config.cache.stale_time
        ),
        Err(e) => tracing::error!("Failed to load configuration: {}", e),
    }
    let _ = APP_CONFIG.set(config);

    dioxus::launch(App);
}

/// Handles shared by every view, provided as context at the root.
#[derive(Clone)]
pub struct AppServices {
    pub store: Rc<dyn LeadStore>,
    pub config: &'static AppConfig,
}

impl PartialEq for AppServices {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.store, &other.store) && std::ptr::eq(self.config, other.config)
    }
}

impl AppServices {
    fn connect(config: Option<&'static Result<AppConfig, ConfigError>>) -> anyhow::Result<Self> {
        let config = config
            .context("Configuration not loaded")?
            .as_ref()
            .map_err(Clone::clone)
            .context("Failed to load configuration")?;
        let client = ApiClient::new(&config.supabase_url, &config.supabase_anon_key)
            .context("Failed to create API client")?;

        Ok(Self {
            store: Rc::new(SupabaseLeadStore::new(client)),
            config,
        })
    }
}

#[component]
fn App() -> Element {
    let services = use_hook(|| AppServices::connect(APP_CONFIG.get()).map_err(|e| format!("{:#}", e)));

    match services {
        Ok(services) => rsx! { ServicesRoot { services } },
        Err(message) => rsx! {
            div { class: "min-h-screen flex items-center justify-center bg-gray-100 p-8",
                ErrorMessage { message }
            }
        },
    }
}

#[component]
fn ServicesRoot(services: AppServices) -> Element {
    use_context_provider(|| services);

    rsx! {
        Router::<Route> {}
    }
}

/// Layout component that wraps all routed views
#[component]
pub fn AppLayout() -> Element {
    rsx! {
        div { class: "h-screen flex flex-col bg-gray-100",
            TopBar {}

            // Main content - Outlet renders the matched route
            div { class: "flex-1 flex overflow-hidden",
                Outlet::<Route> {}
            }
        }
    }
}

#[component]
fn TopBar() -> Element {
    let services = use_context::<AppServices>();
    let host = services
        .config
        .supabase_url
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .to_string();

    rsx! {
        header { class: "bg-white border-b px-6 py-3 flex items-center justify-between",
            div { class: "flex items-center gap-3",
                span { class: "text-2xl", "\u{1F4CB}" }
                h1 { class: "text-xl font-bold text-gray-800", "Leads Admin" }
            }
            span { class: "text-sm text-gray-500 font-mono", "{host}" }
        }
    }
}
