use geo::{Coord, Geometry};
use geojson::JsonObject;
use log::debug;
use serde::Serialize;

use crate::layers::LayerId;
use crate::map_controller::MapController;
use crate::projection::to_lon_lat;
use crate::viewport::Pixel;

/// What the popup shows for a clicked feature. Geometry is never part of
/// the property map handed to the page.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct SelectedFeature {
    pub layer: LayerId,
    pub properties: JsonObject,
    /// `[lon, lat]`, or `[0, 0]` for anything that is not a point.
    pub coordinates: [f64; 2],
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum Selection {
    #[default]
    Idle,
    Selected {
        feature: SelectedFeature,
        /// Where the user clicked, Web Mercator.
        anchor: Coord<f64>,
    },
}

/// Click handling for the popup: idle until an interactive feature is hit,
/// back to idle on a miss or an explicit close.
#[derive(Default)]
pub struct FeatureInteraction {
    selection: Selection,
}

impl FeatureInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selected(&self) -> Option<&SelectedFeature> {
        match &self.selection {
            Selection::Selected { feature, .. } => Some(feature),
            Selection::Idle => None,
        }
    }

    pub fn handle_click(&mut self, map: &mut MapController, pixel: Pixel) -> Option<&SelectedFeature> {
        let Some(hit) = map.hit_test(pixel) else {
            self.close(map);
            return None;
        };
        let picked = map.feature(hit.layer, hit.index).map(|feature| {
            let mut properties = feature.source.properties.clone();
            properties.remove("geometry");
            let coordinates = match &feature.projected {
                Geometry::Point(p) => {
                    let c = to_lon_lat(p.0);
                    [c.x, c.y]
                }
                _ => [0.0, 0.0],
            };
            (properties, coordinates)
        });
        let Some((properties, coordinates)) = picked else {
            self.close(map);
            return None;
        };
        debug!("Selected feature {} of {} layer", hit.index, hit.layer);

        // Popup sits at the cursor, not at the feature
        map.set_popup_position(Some(hit.coordinate));
        self.selection = Selection::Selected {
            feature: SelectedFeature {
                layer: hit.layer,
                properties,
                coordinates,
            },
            anchor: hit.coordinate,
        };
        self.selected()
    }

    pub fn close(&mut self, map: &mut MapController) {
        self.selection = Selection::Idle;
        map.set_popup_position(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::datasets;
    use crate::features::{CollectionOrigin, FeatureCollection, GeoFeature};
    use crate::layers::MarkerKind;
    use crate::projection::to_mercator;
    use geo::LineString;

    fn map_with_water_points() -> MapController {
        let mut map = MapController::new("map", &DashboardConfig::default(), 1024.0, 768.0);
        let water = datasets::water_points().unwrap();
        map.replace_layer(LayerId::WaterPoints, &water, |_| MarkerKind::WaterPoint);
        map.fit_to_layer(LayerId::WaterPoints);
        map
    }

    fn pixel_at(map: &MapController, lon: f64, lat: f64) -> Pixel {
        map.viewport()
            .coordinate_to_pixel(to_mercator(Coord { x: lon, y: lat }))
    }

    #[test]
    fn test_click_opens_popup_for_daystar() {
        let mut map = map_with_water_points();
        let mut interaction = FeatureInteraction::new();
        let px = pixel_at(&map, 36.8013499, -1.2965247);
        let clicked = Pixel::new(px.x + 3.0, px.y - 2.0);

        let selected = interaction.handle_click(&mut map, clicked).unwrap();
        assert_eq!(
            selected.properties.get("name").and_then(|v| v.as_str()),
            Some("DayStar University Nairobi Campus")
        );
        assert!((selected.coordinates[0] - 36.8013499).abs() < 1e-9);
        assert!((selected.coordinates[1] + 1.2965247).abs() < 1e-9);

        // Anchored at the click, not the feature
        let anchor = map.popup_position().unwrap();
        let anchor_px = map.viewport().coordinate_to_pixel(anchor);
        assert!((anchor_px.x - clicked.x).abs() < 1e-6);
        assert!((anchor_px.y - clicked.y).abs() < 1e-6);
    }

    #[test]
    fn test_click_on_empty_map_closes() {
        let mut map = map_with_water_points();
        let mut interaction = FeatureInteraction::new();
        let px = pixel_at(&map, 36.8013499, -1.2965247);
        interaction.handle_click(&mut map, px);
        assert!(interaction.selected().is_some());

        assert!(interaction.handle_click(&mut map, Pixel::new(1.0, 1.0)).is_none());
        assert_eq!(interaction.selection(), &Selection::Idle);
        assert_eq!(map.popup_position(), None);
    }

    #[test]
    fn test_explicit_close() {
        let mut map = map_with_water_points();
        let mut interaction = FeatureInteraction::new();
        let px = pixel_at(&map, 37.0450167, -1.4412216);
        assert!(interaction.handle_click(&mut map, px).is_some());
        interaction.close(&mut map);
        assert!(interaction.selected().is_none());
        assert!(map.popup_position().is_none());
    }

    #[test]
    fn test_line_feature_falls_back_to_origin() {
        let mut map = MapController::new("map", &DashboardConfig::default(), 800.0, 600.0);
        let mut props = JsonObject::new();
        props.insert("name".into(), "Leg".into());
        props.insert("geometry".into(), "stale".into());
        let line = GeoFeature::new(
            Geometry::LineString(LineString::from(vec![(36.7, -1.2921), (36.9, -1.2921)])),
            props,
        );
        let fc = FeatureCollection::new(CollectionOrigin::Remote, vec![line]);
        map.replace_layer(LayerId::Places, &fc, |_| MarkerKind::Place);

        let mut interaction = FeatureInteraction::new();
        let px = pixel_at(&map, 36.8219, -1.2921);
        let selected = interaction.handle_click(&mut map, px).unwrap();
        assert_eq!(selected.coordinates, [0.0, 0.0]);
        assert!(!selected.properties.contains_key("geometry"));
    }
}
