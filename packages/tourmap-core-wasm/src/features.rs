use geo::Geometry;
use geojson::{JsonObject, JsonValue};
use log::{debug, warn};
use serde::Serialize;

use crate::error::{DashboardError, Result};

pub const DEFAULT_CRS: &str = "EPSG:4326";

/// Where a collection came from. Static collections are loaded once; remote
/// ones are replaced wholesale on every refresh.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollectionOrigin {
    Static,
    Remote,
}

/// A geometry in lon/lat with its attribute bag kept alongside it.
#[derive(Clone, Debug, PartialEq)]
pub struct GeoFeature {
    pub geometry: Geometry<f64>,
    pub properties: JsonObject,
}

impl GeoFeature {
    pub fn new(geometry: Geometry<f64>, properties: JsonObject) -> Self {
        Self { geometry, properties }
    }

    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties.get(key)
    }

    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(|v| v.as_str())
    }

    /// `name`, falling back to `title`, as used for marker labels.
    pub fn label(&self) -> Option<&str> {
        self.property_str("name")
            .or_else(|| self.property_str("title"))
            .filter(|s| !s.is_empty())
    }

    #[cfg(test)]
    pub fn as_point(&self) -> Option<geo::Coord<f64>> {
        match &self.geometry {
            Geometry::Point(p) => Some(p.0),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeatureCollection {
    pub name: Option<String>,
    pub crs: String,
    pub origin: CollectionOrigin,
    pub features: Vec<GeoFeature>,
}

impl FeatureCollection {
    pub fn new(origin: CollectionOrigin, features: Vec<GeoFeature>) -> Self {
        Self {
            name: None,
            crs: DEFAULT_CRS.to_string(),
            origin,
            features,
        }
    }

    /// Parse a GeoJSON FeatureCollection. Each feature is decoded on its
    /// own: one with no geometry, a malformed position or an unconvertible
    /// geometry is logged and skipped without failing the rest.
    pub fn parse(text: &str, origin: CollectionOrigin) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(text)?;
        let raw_features = match value.get("type").and_then(JsonValue::as_str) {
            Some("FeatureCollection") => match value.get("features") {
                Some(JsonValue::Array(items)) => items.clone(),
                Some(JsonValue::Null) | None => Vec::new(),
                Some(_) => {
                    return Err(DashboardError::Parse(
                        "\"features\" must be an array".to_string(),
                    ))
                }
            },
            Some("Feature") => vec![value.clone()],
            Some(other) => {
                return Err(DashboardError::Parse(format!(
                    "expected a FeatureCollection, got {}",
                    other
                )))
            }
            None => {
                return Err(DashboardError::Parse(
                    "not a GeoJSON object".to_string(),
                ))
            }
        };

        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        let crs = value
            .get("crs")
            .and_then(|crs| crs.get("properties"))
            .and_then(|p| p.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or(DEFAULT_CRS)
            .to_string();

        let total = raw_features.len();
        let features: Vec<GeoFeature> = raw_features
            .into_iter()
            .enumerate()
            .filter_map(|(index, raw)| decode_feature(index, raw))
            .collect();
        debug!("Parsed {} of {} features ({})", features.len(), total, crs);

        Ok(Self {
            name,
            crs,
            origin,
            features,
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn decode_feature(index: usize, raw: JsonValue) -> Option<GeoFeature> {
    let feature = match geojson::Feature::from_json_value(raw) {
        Ok(feature) => feature,
        Err(e) => {
            warn!("Skipping feature {}: {}", index, e);
            return None;
        }
    };
    let Some(geometry) = feature.geometry else {
        warn!("Skipping feature {} without geometry", index);
        return None;
    };
    match Geometry::<f64>::try_from(geometry) {
        Ok(geometry) => Some(GeoFeature {
            geometry,
            properties: feature.properties.unwrap_or_default(),
        }),
        Err(e) => {
            warn!("Skipping feature {}: {}", index, e);
            None
        }
    }
}
