//! The tour map page: static route layers, API data, popup, live location
//! and the control panel, all behind one owned object.

use log::{error, info, warn};
use serde::Serialize;

use crate::api::ApiClient;
use crate::config::DashboardConfig;
use crate::controls::{ControlPanel, ControlsView};
use crate::datasets;
use crate::error::{DashboardError, Result};
use crate::features::{CollectionOrigin, FeatureCollection, GeoFeature};
use crate::geolocation::{GeolocationTracker, PositionSource, PositionUpdate};
use crate::http::HttpTransport;
use crate::interaction::FeatureInteraction;
use crate::layers::{LayerId, MarkerKind};
use crate::map_controller::{MapController, Scene};
use crate::models::{DailyRecap, RecapStats};
use crate::popup::PopupContent;
use crate::remote::{RemoteResource, RequestTicket};
use crate::viewport::{Pixel, ViewAnimation};

const PROCESSING_ERROR: &str = "Error processing GeoJSON data";

/// County stops are drawn bigger at the flag-off point.
fn county_marker_kind(feature: &GeoFeature) -> MarkerKind {
    match feature.property_str("type") {
        Some("starting_point") => MarkerKind::StartingPoint,
        _ => MarkerKind::Waypoint,
    }
}

/// Tickets for one press of "Refresh Data".
#[derive(Clone, Copy, Debug)]
pub struct RefreshTickets {
    pub places: RequestTicket,
    pub recaps: RequestTicket,
    pub stats: RequestTicket,
}

/// Responses to one refresh, in the order the tickets were issued.
pub struct RefreshResults {
    pub places: Result<FeatureCollection>,
    pub recaps: Result<Vec<DailyRecap>>,
    pub stats: Result<RecapStats>,
}

/// Request places, recaps and stats concurrently.
pub async fn fetch_refresh<T: HttpTransport>(client: &ApiClient<T>) -> RefreshResults {
    let (places, recaps, stats) = futures::join!(
        client.places_geojson(),
        client.daily_recaps(),
        client.recap_stats()
    );
    RefreshResults {
        places,
        recaps,
        stats,
    }
}

/// Header and panel indicators.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStatus {
    pub loading: bool,
    pub refresh_label: &'static str,
    pub error: Option<String>,
    pub recaps_error: Option<String>,
    pub stats_error: Option<String>,
    pub places_loaded: Option<String>,
    pub data_loaded: bool,
    pub tracking: bool,
    pub can_center: bool,
    pub location: Option<String>,
    pub location_error: Option<String>,
    pub recaps_on_map: usize,
    pub stats: Option<RecapStats>,
}

/// Everything the page draws after a change.
#[derive(Serialize, Debug)]
pub struct DashboardView {
    pub scene: Scene,
    pub controls: ControlsView,
    pub status: DashboardStatus,
    pub popup: Option<PopupContent>,
}

pub struct MapDashboard {
    config: DashboardConfig,
    map: MapController,
    interaction: FeatureInteraction,
    tracker: GeolocationTracker,
    controls: ControlPanel,
    places: RemoteResource<FeatureCollection>,
    recaps: RemoteResource<Vec<DailyRecap>>,
    stats: RemoteResource<RecapStats>,
}

impl MapDashboard {
    /// Mount the map and draw the bundled layers.
    pub fn new(target: &str, config: DashboardConfig, width: f64, height: f64) -> Self {
        let map = MapController::new(target, &config, width, height);
        let tracker = GeolocationTracker::new(config.accuracy_radius_max);
        let mut dashboard = Self {
            config,
            map,
            interaction: FeatureInteraction::new(),
            tracker,
            controls: ControlPanel::new(),
            places: RemoteResource::new(),
            recaps: RemoteResource::new(),
            stats: RemoteResource::new(),
        };
        dashboard.load_static_layers();
        dashboard
    }

    fn load_static_layers(&mut self) {
        let layers: [(LayerId, fn() -> Result<FeatureCollection>, fn(&GeoFeature) -> MarkerKind); 3] = [
            (LayerId::Routes, datasets::tour_route, |_| MarkerKind::RouteLine),
            (LayerId::CountyRoutes, datasets::county_routes, county_marker_kind),
            (LayerId::WaterPoints, datasets::water_points, |_| MarkerKind::WaterPoint),
        ];
        for (id, load, kind_of) in layers {
            match load() {
                Ok(collection) => {
                    self.map.replace_layer(id, &collection, kind_of);
                }
                Err(e) => error!("Error adding {} to map: {}", id, e),
            }
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn map(&self) -> &MapController {
        &self.map
    }

    pub fn tracker(&self) -> &GeolocationTracker {
        &self.tracker
    }

    fn has_remote_data(&self) -> bool {
        self.places.value().is_some()
    }

    pub fn places_loaded_count(&self) -> Option<usize> {
        self.places.value().map(|_| self.map.layer(LayerId::Places).len())
    }

    /// Start all API requests. Earlier requests still in flight are
    /// superseded.
    pub fn begin_refresh(&mut self) -> RefreshTickets {
        RefreshTickets {
            places: self.places.begin(),
            recaps: self.recaps.begin(),
            stats: self.stats.begin(),
        }
    }

    /// Remote places replace the whole layer; the view is fitted to them.
    pub fn finish_places(&mut self, ticket: RequestTicket, result: Result<FeatureCollection>) -> bool {
        let applied = self.places.finish_with(ticket, result, |e| match e {
            DashboardError::Parse(_) => PROCESSING_ERROR.to_string(),
            other => other.user_message(),
        });
        if !applied {
            return false;
        }
        if let Some(collection) = self.places.value() {
            self.map
                .replace_layer(LayerId::Places, collection, |_| MarkerKind::Place);
            if !collection.is_empty() {
                self.map.fit_to_layer(LayerId::Places);
            }
        }
        true
    }

    /// Recaps without a usable position are left off the map.
    pub fn finish_recaps(&mut self, ticket: RequestTicket, result: Result<Vec<DailyRecap>>) -> bool {
        if !self.recaps.finish(ticket, result) {
            return false;
        }
        if let Some(recaps) = self.recaps.value() {
            let features: Vec<GeoFeature> = recaps.iter().filter_map(DailyRecap::to_feature).collect();
            let skipped = recaps.len() - features.len();
            if skipped > 0 {
                warn!("Skipped {} daily recaps without coordinates", skipped);
            }
            let collection = FeatureCollection::new(CollectionOrigin::Remote, features);
            self.map
                .replace_layer(LayerId::Recaps, &collection, |_| MarkerKind::Recap);
        }
        true
    }

    pub fn finish_stats(&mut self, ticket: RequestTicket, result: Result<RecapStats>) -> bool {
        self.stats.finish(ticket, result)
    }

    /// Apply the responses of one refresh. Each part is fenced by its own
    /// ticket, so a newer refresh wins even if this one lands last.
    pub fn finish_refresh(&mut self, tickets: RefreshTickets, results: RefreshResults) {
        self.finish_places(tickets.places, results.places);
        self.finish_recaps(tickets.recaps, results.recaps);
        self.finish_stats(tickets.stats, results.stats);
    }

    /// One-shot position taken on mount. The view only moves there when no
    /// API data has arrived yet.
    pub fn apply_initial_position(&mut self, update: PositionUpdate) -> Option<ViewAnimation> {
        match update {
            Ok(sample) => {
                self.map.set_initial_location(sample.lon_lat());
                if self.has_remote_data() {
                    return None;
                }
                Some(self.map.animate_to(
                    sample.lon_lat(),
                    self.config.locate_zoom,
                    self.config.locate_duration_ms,
                ))
            }
            Err(e) => {
                error!("Geolocation error: {}", e);
                None
            }
        }
    }

    pub fn start_tracking(
        &mut self,
        source: &impl PositionSource,
        on_update: Box<dyn FnMut(PositionUpdate)>,
    ) -> bool {
        self.tracker
            .start(source, &self.config.geolocation, on_update)
    }

    pub fn on_location_update(&mut self, update: PositionUpdate) {
        self.tracker.on_update(&mut self.map, update);
    }

    pub fn stop_tracking(&mut self) {
        self.tracker.stop(&mut self.map);
    }

    pub fn center_on_me(&mut self) -> Option<ViewAnimation> {
        self.tracker.center_on_current_location(
            &mut self.map,
            self.config.locate_zoom,
            self.config.locate_duration_ms,
        )
    }

    /// Click on the map canvas.
    pub fn click(&mut self, pixel: Pixel) -> Option<PopupContent> {
        self.interaction
            .handle_click(&mut self.map, pixel)
            .map(PopupContent::from_selection)
    }

    pub fn close_popup(&mut self) {
        self.interaction.close(&mut self.map);
    }

    pub fn popup(&self) -> Option<PopupContent> {
        self.interaction.selected().map(PopupContent::from_selection)
    }

    pub fn set_basemap(&mut self, key: &str) -> Result<()> {
        self.map.set_basemap(key.parse()?)
    }

    pub fn set_layer_visible(&mut self, key: &str, visible: bool) -> Result<()> {
        let id: LayerId = key.parse()?;
        self.map.set_layer_visible(id, visible);
        if !visible && self.interaction.selected().is_some_and(|s| s.layer == id) {
            self.interaction.close(&mut self.map);
        }
        Ok(())
    }

    pub fn toggle_layers_menu(&mut self) -> bool {
        self.controls.toggle_layers_menu()
    }

    /// Fullscreen changed; the map has to pick up its new size.
    pub fn set_fullscreen(&mut self, fullscreen: bool, width: f64, height: f64) {
        self.controls.set_fullscreen(fullscreen);
        self.map.resize(width, height);
    }

    pub fn is_fullscreen(&self) -> bool {
        self.controls.is_fullscreen()
    }

    pub fn resize(&mut self, width: f64, height: f64) {
        self.map.resize(width, height);
    }

    pub fn status(&self) -> DashboardStatus {
        let loading = self.places.is_loading();
        DashboardStatus {
            loading,
            refresh_label: if loading { "Loading..." } else { "Refresh Data" },
            error: self.places.error().map(str::to_string),
            recaps_error: self
                .recaps
                .error()
                .map(|e| format!("Daily recaps unavailable: {}", e)),
            stats_error: self
                .stats
                .error()
                .map(|e| format!("Tour statistics unavailable: {}", e)),
            places_loaded: self
                .places_loaded_count()
                .filter(|_| !loading)
                .map(|n| format!("{} places loaded", n)),
            data_loaded: self.has_remote_data(),
            tracking: self.tracker.is_tracking(),
            can_center: self.tracker.last_sample().is_some(),
            location: self.tracker.status_line(),
            location_error: self.tracker.error().map(|e| e.to_string()),
            recaps_on_map: self.map.layer(LayerId::Recaps).len(),
            stats: self.stats.value().cloned(),
        }
    }

    pub fn scene(&self) -> Scene {
        self.map.scene()
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            scene: self.map.scene(),
            controls: self.controls.view(&self.map),
            status: self.status(),
            popup: self.popup(),
        }
    }

    /// Stop tracking and detach the map. Returns the mount target id.
    pub fn destroy(mut self) -> String {
        self.tracker.stop(&mut self.map);
        self.interaction.close(&mut self.map);
        info!("Destroying map dashboard");
        self.map.destroy()
    }
}
