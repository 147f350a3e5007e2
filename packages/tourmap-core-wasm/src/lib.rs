use serde::Serialize;
use wasm_bindgen::prelude::*;

// Create a console module for logging
pub mod console;
// Error types shared by every module
pub mod error;
// Page settings passed in from JS
pub mod config;
// Bundled route datasets
pub mod datasets;
// GeoJSON features and collections
pub mod features;
// Typed API payloads
pub mod models;
// HTTP transport and the REST client
pub mod http;
pub mod api;
// Loading/error/loaded tracking for API data
pub mod remote;
// Map surface
pub mod projection;
pub mod viewport;
pub mod basemap;
pub mod layers;
pub mod map_controller;
// Clicks and the popup panel
pub mod interaction;
pub mod popup;
// Live location
pub mod geolocation;
// Basemap and layer control panel
pub mod controls;
// Geostory browser
pub mod debounce;
pub mod pagination;
pub mod stories;
// Page composition and the JS classes
pub mod dashboard;
mod bindings;

pub use bindings::{StoryBrowserHandle, TourMap};
pub use dashboard::MapDashboard;
pub use error::{DashboardError, GeolocationError};
pub use map_controller::MapController;
pub use stories::StoryBrowser;

// Enable better panic messages in console during development
#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

// Use the macro from our console module
#[macro_export]
macro_rules! console_log {
    ($($t:tt)*) => ($crate::console::log(&format!($($t)*)))
}

use std::sync::Once;
static INIT: Once = Once::new();

// This sets up the wasm_bindgen start functionality
#[wasm_bindgen(start)]
pub fn start() {
    INIT.call_once(|| {
        // Set the panic hook for better error messages
        #[cfg(feature = "console_error_panic_hook")]
        console_error_panic_hook::set_once();

        // Route `log` records to the browser console
        console::init_logging();

        console_log!("WASM module initialized successfully");
    });
}

/// Basemap choices for pages that build their own picker.
#[wasm_bindgen(js_name = basemapOptions)]
pub fn basemap_options() -> Result<JsValue, JsValue> {
    let options: Vec<_> = basemap::BasemapKind::ALL
        .into_iter()
        .map(|kind| {
            serde_json::json!({
                "kind": kind,
                "name": kind.display_name(),
                "url": kind.url_template(),
                "enabled": kind.is_enabled(),
            })
        })
        .collect();
    options
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Human readable label for a feature property key, as the popup shows it.
#[wasm_bindgen(js_name = formatPropertyKey)]
pub fn format_property_key(key: &str) -> String {
    popup::format_property_key(key)
}
