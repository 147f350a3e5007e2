//! Owned map surface: viewport, basemap and the overlay stack.
//!
//! The controller never draws anything itself. JS asks for a [`Scene`]
//! after every change and renders it.

use geo::{Coord, Geometry, Point, Rect};
use geojson::JsonObject;
use log::{debug, info};
use serde::Serialize;

use crate::basemap::BasemapKind;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::features::{FeatureCollection, GeoFeature};
use crate::layers::{FeatureStyle, LayerId, MarkerKind, OverlayFeature, OverlayLayer};
use crate::projection::{to_lon_lat, to_mercator};
use crate::viewport::{Pixel, ViewAnimation, Viewport};

/// Result of hit-testing a click.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub layer: LayerId,
    pub index: usize,
    /// Clicked map coordinate, Web Mercator.
    pub coordinate: Coord<f64>,
}

pub struct MapController {
    target: String,
    viewport: Viewport,
    basemap: BasemapKind,
    layers: Vec<OverlayLayer>,
    popup_anchor: Option<Coord<f64>>,
    fit_padding: f64,
    max_fit_zoom: f64,
}

impl MapController {
    /// Mount a map into the element with id `target`.
    pub fn new(target: &str, config: &DashboardConfig, width: f64, height: f64) -> Self {
        let [lon, lat] = config.initial_center;
        let viewport = Viewport::new(
            to_mercator(Coord { x: lon, y: lat }),
            config.initial_zoom,
            width,
            height,
        )
        .with_zoom_bounds(config.min_zoom, config.max_zoom);

        debug!("Mounting map into #{} ({}x{})", target, width, height);
        Self {
            target: target.to_string(),
            viewport,
            basemap: BasemapKind::default(),
            layers: LayerId::STACK.into_iter().map(OverlayLayer::new).collect(),
            popup_anchor: None,
            fit_padding: config.fit_padding,
            max_fit_zoom: config.max_fit_zoom,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn basemap(&self) -> BasemapKind {
        self.basemap
    }

    /// Swap the tile source only; overlays and the view are left alone.
    pub fn set_basemap(&mut self, kind: BasemapKind) -> Result<()> {
        if !kind.is_enabled() {
            return Err(DashboardError::DisabledBasemap(kind.to_string()));
        }
        self.basemap = kind;
        Ok(())
    }

    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) {
        self.layer_mut(id).visible = visible;
    }

    pub fn is_layer_visible(&self, id: LayerId) -> bool {
        self.layer(id).visible
    }

    pub fn layer(&self, id: LayerId) -> &OverlayLayer {
        &self.layers[id.z_index()]
    }

    fn layer_mut(&mut self, id: LayerId) -> &mut OverlayLayer {
        &mut self.layers[id.z_index()]
    }

    /// Replace the whole content of `id` with `collection`, styling each
    /// feature via `kind_of`.
    pub fn replace_layer(
        &mut self,
        id: LayerId,
        collection: &FeatureCollection,
        kind_of: impl Fn(&GeoFeature) -> MarkerKind,
    ) -> usize {
        let features: Vec<OverlayFeature> = collection
            .features
            .iter()
            .map(|f| OverlayFeature::new(kind_of(f), f.clone()))
            .collect();
        let count = features.len();
        self.layer_mut(id).replace(features);
        info!("Added {} features to {} layer", count, id);
        count
    }

    /// Recenter and zoom so every feature of the layer is in view, keeping
    /// the configured padding and never zooming past the fit ceiling.
    pub fn fit_to_layer(&mut self, id: LayerId) -> bool {
        let coords: Vec<Coord<f64>> = self.layer(id).projected_coords().collect();
        self.fit_coords(&mut coords.into_iter())
    }

    fn fit_coords(&mut self, coords: &mut dyn Iterator<Item = Coord<f64>>) -> bool {
        let Some(first) = coords.next() else {
            return false;
        };
        let (mut min, mut max) = (first, first);
        for c in coords {
            min.x = min.x.min(c.x);
            min.y = min.y.min(c.y);
            max.x = max.x.max(c.x);
            max.y = max.y.max(c.y);
        }
        self.viewport
            .fit_extent(Rect::new(min, max), self.fit_padding, self.max_fit_zoom);
        true
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
    }

    /// Move the view to a lon/lat position. Returns the animation for the
    /// renderer to play.
    pub fn animate_to(&mut self, lon_lat: Coord<f64>, zoom: f64, duration_ms: u32) -> ViewAnimation {
        let center = to_mercator(lon_lat);
        let animation = self.viewport.animation_to(center, zoom, duration_ms);
        self.viewport.set_center_zoom(center, animation.zoom);
        animation
    }

    /// Topmost interactive feature under `pixel`. Layers are searched from
    /// the top of the stack down and the first match inside a layer wins.
    pub fn hit_test(&self, pixel: Pixel) -> Option<Hit> {
        let coordinate = self.viewport.pixel_to_coordinate(pixel);
        self.layers
            .iter()
            .rev()
            .filter(|layer| layer.visible && layer.id.is_interactive())
            .find_map(|layer| {
                layer
                    .features()
                    .iter()
                    .position(|f| !f.kind.is_location() && f.hit(&self.viewport, pixel))
                    .map(|index| Hit {
                        layer: layer.id,
                        index,
                        coordinate,
                    })
            })
    }

    pub fn feature(&self, layer: LayerId, index: usize) -> Option<&OverlayFeature> {
        self.layer(layer).features().get(index)
    }

    pub fn set_popup_position(&mut self, anchor: Option<Coord<f64>>) {
        self.popup_anchor = anchor;
    }

    #[cfg(test)]
    pub fn popup_position(&self) -> Option<Coord<f64>> {
        self.popup_anchor
    }

    /// Replace the live location marker and its accuracy circle.
    pub fn set_location_markers(&mut self, lon_lat: Coord<f64>, accuracy_radius: f64, properties: JsonObject) {
        let layer = self.layer_mut(LayerId::Location);
        layer.remove_kind(MarkerKind::CurrentLocation);
        layer.remove_kind(MarkerKind::Accuracy);

        let point = Geometry::Point(Point::from(lon_lat));
        let accuracy = OverlayFeature::new(
            MarkerKind::Accuracy,
            GeoFeature::new(point.clone(), JsonObject::new()),
        );
        let accuracy = match accuracy.style.clone() {
            FeatureStyle::Circle {
                fill,
                stroke,
                stroke_width,
                ..
            } => accuracy.with_style(FeatureStyle::Circle {
                radius: accuracy_radius,
                fill,
                stroke,
                stroke_width,
            }),
            _ => accuracy,
        };
        layer.push(accuracy);
        layer.push(OverlayFeature::new(
            MarkerKind::CurrentLocation,
            GeoFeature::new(point, properties),
        ));
    }

    pub fn clear_location_markers(&mut self) {
        let layer = self.layer_mut(LayerId::Location);
        layer.remove_kind(MarkerKind::CurrentLocation);
        layer.remove_kind(MarkerKind::Accuracy);
    }

    pub fn set_initial_location(&mut self, lon_lat: Coord<f64>) {
        let layer = self.layer_mut(LayerId::Location);
        layer.remove_kind(MarkerKind::InitialLocation);
        layer.push(OverlayFeature::new(
            MarkerKind::InitialLocation,
            GeoFeature::new(Geometry::Point(Point::from(lon_lat)), JsonObject::new()),
        ));
    }

    /// Number of live-tracking markers (position plus accuracy circle).
    #[cfg(test)]
    pub fn tracking_marker_count(&self) -> usize {
        let layer = self.layer(LayerId::Location);
        layer.count_kind(MarkerKind::CurrentLocation) + layer.count_kind(MarkerKind::Accuracy)
    }

    /// Snapshot for the renderer.
    pub fn scene(&self) -> Scene {
        let center = to_lon_lat(self.viewport.center);
        Scene {
            target: self.target.clone(),
            basemap: SceneBasemap {
                kind: self.basemap,
                url: self.basemap.url_template(),
            },
            view: SceneView {
                center: [self.viewport.center.x, self.viewport.center.y],
                center_lon_lat: [center.x, center.y],
                zoom: self.viewport.zoom,
                resolution: self.viewport.resolution(),
                width: self.viewport.width,
                height: self.viewport.height,
            },
            layers: self
                .layers
                .iter()
                .map(|layer| SceneLayer {
                    id: layer.id,
                    visible: layer.visible,
                    features: if layer.visible {
                        layer
                            .features()
                            .iter()
                            .map(|f| SceneFeature {
                                kind: f.kind,
                                pixels: f
                                    .pixels(&self.viewport)
                                    .into_iter()
                                    .map(|p| [p.x, p.y])
                                    .collect(),
                                style: f.style.clone(),
                                label: f.label.clone(),
                            })
                            .collect()
                    } else {
                        Vec::new()
                    },
                })
                .collect(),
            popup: self.popup_anchor.map(|anchor| {
                let px = self.viewport.coordinate_to_pixel(anchor);
                ScenePopup {
                    coordinate: [anchor.x, anchor.y],
                    pixel: [px.x, px.y],
                }
            }),
        }
    }

    /// Detach from the mount target and drop every layer.
    pub fn destroy(mut self) -> String {
        for layer in &mut self.layers {
            layer.clear();
        }
        self.layers.clear();
        self.popup_anchor = None;
        debug!("Detached map from #{}", self.target);
        self.target
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub target: String,
    pub basemap: SceneBasemap,
    pub view: SceneView,
    pub layers: Vec<SceneLayer>,
    pub popup: Option<ScenePopup>,
}

#[derive(Serialize, Debug)]
pub struct SceneBasemap {
    pub kind: BasemapKind,
    pub url: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SceneView {
    pub center: [f64; 2],
    pub center_lon_lat: [f64; 2],
    pub zoom: f64,
    pub resolution: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Serialize, Debug)]
pub struct SceneLayer {
    pub id: LayerId,
    pub visible: bool,
    pub features: Vec<SceneFeature>,
}

#[derive(Serialize, Debug)]
pub struct SceneFeature {
    pub kind: MarkerKind,
    pub pixels: Vec<[f64; 2]>,
    pub style: FeatureStyle,
    pub label: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ScenePopup {
    pub coordinate: [f64; 2],
    pub pixel: [f64; 2],
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasets;
    use crate::features::CollectionOrigin;

    fn controller() -> MapController {
        MapController::new("map", &DashboardConfig::default(), 800.0, 600.0)
    }

    fn point(lon: f64, lat: f64, name: &str) -> GeoFeature {
        let mut props = JsonObject::new();
        props.insert("name".into(), name.into());
        GeoFeature::new(Geometry::Point(Point::new(lon, lat)), props)
    }

    fn pixel_of(map: &MapController, lon: f64, lat: f64) -> Pixel {
        map.viewport()
            .coordinate_to_pixel(to_mercator(Coord { x: lon, y: lat }))
    }

    #[test]
    fn test_basemap_swap_keeps_view_and_overlays() {
        let mut map = controller();
        let water = datasets::water_points().unwrap();
        map.replace_layer(LayerId::WaterPoints, &water, |_| MarkerKind::WaterPoint);
        let before = *map.viewport();

        map.set_basemap(BasemapKind::Dark).unwrap();
        assert_eq!(map.basemap(), BasemapKind::Dark);
        assert_eq!(*map.viewport(), before);
        assert_eq!(map.layer(LayerId::WaterPoints).len(), 5);
        assert!(matches!(
            map.set_basemap(BasemapKind::Terrain),
            Err(DashboardError::DisabledBasemap(_))
        ));
        assert_eq!(map.basemap(), BasemapKind::Dark);
    }

    #[test]
    fn test_fit_single_feature_respects_ceiling() {
        let mut map = controller();
        assert!(!map.fit_to_layer(LayerId::Places));
        let f = point(36.8013499, -1.2965247, "DayStar");
        let collection = FeatureCollection::new(CollectionOrigin::Remote, vec![f]);
        map.replace_layer(LayerId::Places, &collection, |_| MarkerKind::Place);
        assert!(map.fit_to_layer(LayerId::Places));
        assert!(map.viewport().zoom <= DashboardConfig::default().max_fit_zoom);
    }

    #[test]
    fn test_topmost_layer_wins() {
        let mut map = controller();
        let spot = point(36.8219, -1.2921, "County stop");
        let county = FeatureCollection::new(CollectionOrigin::Static, vec![spot.clone()]);
        let places = FeatureCollection::new(
            CollectionOrigin::Remote,
            vec![point(36.8219, -1.2921, "Remote place"), spot],
        );
        map.replace_layer(LayerId::CountyRoutes, &county, |_| MarkerKind::Waypoint);
        map.replace_layer(LayerId::Places, &places, |_| MarkerKind::Place);

        let hit = map.hit_test(pixel_of(&map, 36.8219, -1.2921)).unwrap();
        assert_eq!(hit.layer, LayerId::Places);
        assert_eq!(hit.index, 0);

        map.set_layer_visible(LayerId::Places, false);
        let hit = map.hit_test(pixel_of(&map, 36.8219, -1.2921)).unwrap();
        assert_eq!(hit.layer, LayerId::CountyRoutes);
    }

    #[test]
    fn test_location_marker_is_not_hit() {
        let mut map = controller();
        map.set_location_markers(Coord { x: 36.8219, y: -1.2921 }, 50.0, JsonObject::new());
        map.set_initial_location(Coord { x: 36.8219, y: -1.2921 });
        assert_eq!(map.hit_test(pixel_of(&map, 36.8219, -1.2921)), None);
        assert_eq!(map.tracking_marker_count(), 2);

        // Replacing keeps exactly one of each
        map.set_location_markers(Coord { x: 36.83, y: -1.29 }, 10.0, JsonObject::new());
        assert_eq!(map.tracking_marker_count(), 2);
        map.clear_location_markers();
        assert_eq!(map.tracking_marker_count(), 0);
    }

    #[test]
    fn test_scene_hides_invisible_layers() {
        let mut map = controller();
        let route = datasets::tour_route().unwrap();
        map.replace_layer(LayerId::Routes, &route, |_| MarkerKind::RouteLine);
        map.set_popup_position(Some(map.viewport().center));

        let scene = map.scene();
        let routes = &scene.layers[LayerId::Routes.z_index()];
        assert_eq!(routes.features.len(), route.len());
        let popup = scene.popup.unwrap();
        assert_eq!(popup.pixel, [400.0, 300.0]);

        map.set_layer_visible(LayerId::Routes, false);
        assert!(map.scene().layers[0].features.is_empty());
        assert_eq!(map.destroy(), "map");
    }
}
