//! Yew bindings for the laboratory resource layer.
//!
//! Screens use the hooks in [`hooks`]; everything they fetch goes through one
//! per-thread [`Cache`], so two components showing the same list share a
//! request and a result.

use payloads::APIClient;
use resources::{Cache, ConfigStore};
use yew::prelude::*;

pub mod hooks;
mod logs;
pub mod state;

pub use state::State;

thread_local! {
    static CACHE: Cache = Cache::new();
    static CONFIG: ConfigStore = ConfigStore::new();
}

/// The revalidation cache shared by every hook on this page.
pub fn cache() -> Cache {
    CACHE.with(Cache::clone)
}

/// The session's laboratory configuration cell.
pub fn config_store() -> ConfigStore {
    CONFIG.with(ConfigStore::clone)
}

// Global API client - configurable via environment or same-origin fallback
pub fn get_api_client() -> APIClient {
    // Try environment variable first (set at build time)
    let address = option_env!("BACKEND_URL")
        .map(|url| url.to_string())
        .unwrap_or_else(|| {
            web_sys::window()
                .and_then(|window| window.location().origin().ok())
                .unwrap_or_default()
        });

    APIClient {
        address,
        inner_client: reqwest::Client::new(),
    }
}

#[derive(Properties, PartialEq)]
pub struct AppProps {
    #[prop_or_default]
    pub children: Html,
}

/// Mount point for the laboratory screens: starts logging and loads the
/// laboratory configuration before anything else asks for it.
#[function_component]
pub fn App(props: &AppProps) -> Html {
    logs::init_logging();
    hooks::use_laboratory_config();
    props.children.clone()
}
