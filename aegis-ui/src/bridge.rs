use aegis_core::rest::{RestGateway, DEFAULT_API_BASE_URL};
use aegis_core::theme::PreferenceStore;
use aegis_core::AiGateway;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

pub type SharedGateway = Rc<dyn AiGateway>;

/// Proxy base URL, fixed at build time.
pub fn api_base_url() -> &'static str {
    option_env!("AEGIS_API_BASE_URL")
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(DEFAULT_API_BASE_URL)
}

pub fn gateway() -> SharedGateway {
    Rc::new(RestGateway::new(api_base_url()))
}

/// Browser local storage. Missing or blocked storage reads as empty.
pub struct LocalStorageStore {
    storage: Option<web_sys::Storage>,
}

impl LocalStorageStore {
    pub fn open() -> Self {
        let storage = web_sys::window().and_then(|w| w.local_storage().ok().flatten());
        if storage.is_none() {
            tracing::warn!("local storage unavailable; preferences will not persist");
        }
        Self { storage }
    }
}

impl PreferenceStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        self.storage.as_ref()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if let Err(err) = storage.set_item(key, value) {
                tracing::warn!(key, error = ?err, "failed to persist preference");
            }
        }
    }
}

fn dark_scheme_query() -> Option<web_sys::MediaQueryList> {
    web_sys::window().and_then(|w| w.match_media("(prefers-color-scheme: dark)").ok().flatten())
}

pub fn system_prefers_dark() -> bool {
    dark_scheme_query().map(|query| query.matches()).unwrap_or(false)
}

/// Call `on_change` with the new preference whenever the OS color scheme
/// flips. The listener lives for the rest of the page.
pub fn watch_system_scheme(on_change: impl Fn(bool) + 'static) {
    let Some(query) = dark_scheme_query() else {
        return;
    };
    let listener = Closure::<dyn Fn()>::new(move || on_change(system_prefers_dark()));
    if let Err(err) =
        query.add_event_listener_with_callback("change", listener.as_ref().unchecked_ref())
    {
        tracing::warn!(error = ?err, "failed to watch color scheme changes");
        return;
    }
    listener.forget();
}

/// Toggle the `dark` class on the document root.
pub fn apply_dark_class(dark: bool) {
    let Some(root) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.document_element())
    else {
        return;
    };
    if let Err(err) = root.class_list().toggle_with_force("dark", dark) {
        tracing::warn!(error = ?err, "failed to apply theme class");
    }
}
