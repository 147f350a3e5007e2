// Popup panel contents for a selected feature
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use serde_json::Value;

use crate::interaction::SelectedFeature;

const FALLBACK_TITLE: &str = "Feature Details";

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PopupRow {
    pub key: String,
    pub value: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PopupContent {
    pub title: String,
    pub rows: Vec<PopupRow>,
    /// `"lat, lon"` with six decimals.
    pub location: String,
}

impl PopupContent {
    pub fn from_selection(selected: &SelectedFeature) -> Self {
        let title = ["name", "title"]
            .iter()
            .find_map(|k| selected.properties.get(*k).and_then(|v| v.as_str()))
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_TITLE)
            .to_string();
        let rows = selected
            .properties
            .iter()
            .map(|(k, v)| PopupRow {
                key: format_property_key(k),
                value: format_property_value(k, v),
            })
            .collect();
        let [lon, lat] = selected.coordinates;
        Self {
            title,
            rows,
            location: format!("{:.6}, {:.6}", lat, lon),
        }
    }
}

/// `water_source_type` -> `Water Source Type`. Every word is capitalised,
/// including ones separated by spaces or punctuation.
pub fn format_property_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut at_word_start = true;
    for c in key.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if c.is_alphanumeric() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

pub fn format_property_value(key: &str, value: &Value) -> String {
    let lower = key.to_lowercase();
    match value {
        Value::Null => "N/A".to_string(),
        Value::Object(_) | Value::Array(_) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        Value::Number(n) if is_coordinate_key(&lower) => match n.as_f64() {
            Some(f) => format!("{:.6}", f),
            None => n.to_string(),
        },
        Value::String(s) if is_time_key(&lower) => format_timestamp(s).unwrap_or_else(|| s.clone()),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_coordinate_key(lower: &str) -> bool {
    ["coord", "lat", "lng", "lon"].iter().any(|k| lower.contains(k))
}

fn is_time_key(lower: &str) -> bool {
    lower.contains("date") || lower.contains("time")
}

fn format_timestamp(s: &str) -> Option<String> {
    const OUT: &str = "%Y-%m-%d %H:%M:%S";
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.format(OUT).to_string());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.format(OUT).to_string());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.format(OUT).to_string())
}
