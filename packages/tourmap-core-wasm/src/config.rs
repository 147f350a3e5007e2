use serde::{Deserialize, Serialize};
use wasm_bindgen::JsValue;

use crate::error::{DashboardError, Result};

pub const DEFAULT_MAP_API_BASE: &str = "http://127.0.0.1:8000/api";
pub const DEFAULT_STORY_API_BASE: &str = "http://localhost:8000/api";

/// Options forwarded to `watchPosition`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct GeolocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout_ms: u32,
    pub maximum_age_ms: u32,
}

impl Default for GeolocationOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 1_000,
        }
    }
}

/// Settings for the tour map page. Every field falls back to its default
/// so JS may pass `{}` or nothing at all.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    pub api_base_url: String,
    /// `[lon, lat]`
    pub initial_center: [f64; 2],
    pub initial_zoom: f64,
    pub fit_padding: f64,
    pub max_fit_zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub locate_zoom: f64,
    pub locate_duration_ms: u32,
    pub accuracy_radius_max: f64,
    pub geolocation: GeolocationOptions,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_MAP_API_BASE.to_string(),
            initial_center: [36.8219, -1.2921],
            initial_zoom: 10.0,
            fit_padding: 50.0,
            max_fit_zoom: 18.0,
            min_zoom: 0.0,
            max_zoom: 28.0,
            locate_zoom: 17.0,
            locate_duration_ms: 1_000,
            accuracy_radius_max: 50.0,
            geolocation: GeolocationOptions::default(),
        }
    }
}

/// Settings for the geostory browser page.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct StoryBrowserConfig {
    pub api_base_url: String,
    pub page_size: u32,
    pub debounce_ms: u32,
}

impl Default for StoryBrowserConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_STORY_API_BASE.to_string(),
            page_size: 12,
            debounce_ms: 500,
        }
    }
}

/// Decode a config object coming from JS, treating `undefined`/`null` as defaults.
pub fn from_js<T>(value: JsValue) -> Result<T>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if value.is_undefined() || value.is_null() {
        return Ok(T::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| DashboardError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let cfg: DashboardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.initial_center, [36.8219, -1.2921]);
        assert!(cfg.geolocation.enable_high_accuracy);
    }

    #[test]
    fn test_partial_override() {
        let cfg: DashboardConfig =
            serde_json::from_str(r#"{"apiBaseUrl":"https://api.example.org","maxFitZoom":15}"#)
                .unwrap();
        assert_eq!(cfg.api_base_url, "https://api.example.org");
        assert_eq!(cfg.max_fit_zoom, 15.0);
        assert_eq!(cfg.fit_padding, 50.0);

        let stories: StoryBrowserConfig = serde_json::from_str(r#"{"pageSize":24}"#).unwrap();
        assert_eq!(stories.page_size, 24);
        assert_eq!(stories.debounce_ms, 500);
    }
}
