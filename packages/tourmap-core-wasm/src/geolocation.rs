use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use futures::channel::oneshot;
use geo::Coord;
use geojson::JsonObject;
use log::{error, info};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Geolocation, PositionOptions};

use crate::config::GeolocationOptions;
use crate::error::GeolocationError;
use crate::map_controller::MapController;
use crate::viewport::ViewAnimation;

/// One fix from the position source.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Metres.
    pub accuracy: f64,
    /// Milliseconds since the epoch.
    pub timestamp: f64,
}

impl LocationSample {
    pub fn lon_lat(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }
}

impl fmt::Display for LocationSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.6}, {:.6} (±{:.0}m)",
            self.latitude, self.longitude, self.accuracy
        )
    }
}

pub type PositionUpdate = Result<LocationSample, GeolocationError>;

/// Live subscription to position updates; cancels itself when dropped.
pub struct WatchSubscription {
    id: i32,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl WatchSubscription {
    pub fn new(id: i32, cancel: impl FnOnce() + 'static) -> Self {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for WatchSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchSubscription").field("id", &self.id).finish()
    }
}

/// Access to the device position.
#[allow(async_fn_in_trait)]
pub trait PositionSource {
    /// Single fix.
    async fn current_position(&self, options: &GeolocationOptions) -> PositionUpdate;

    /// Continuous updates delivered to `on_update` until the returned
    /// subscription is cancelled or dropped.
    fn watch(
        &self,
        options: &GeolocationOptions,
        on_update: Box<dyn FnMut(PositionUpdate)>,
    ) -> Result<WatchSubscription, GeolocationError>;
}

/// Radius in pixels for the accuracy circle.
pub fn accuracy_radius(accuracy: f64, max_radius: f64) -> f64 {
    (accuracy / 10.0).min(max_radius)
}

#[derive(Debug, Default)]
enum TrackerState {
    #[default]
    Stopped,
    Tracking(WatchSubscription),
}

#[derive(Debug, Default)]
pub struct GeolocationTracker {
    state: TrackerState,
    last_sample: Option<LocationSample>,
    error: Option<GeolocationError>,
    max_radius: f64,
}

impl GeolocationTracker {
    pub fn new(max_radius: f64) -> Self {
        Self {
            max_radius,
            ..Default::default()
        }
    }

    pub fn is_tracking(&self) -> bool {
        matches!(self.state, TrackerState::Tracking(_))
    }

    pub fn last_sample(&self) -> Option<&LocationSample> {
        self.last_sample.as_ref()
    }

    pub fn error(&self) -> Option<&GeolocationError> {
        self.error.as_ref()
    }

    /// Subscribe to position updates. `on_update` must route samples back
    /// into [`on_update`](Self::on_update).
    pub fn start(
        &mut self,
        source: &impl PositionSource,
        options: &GeolocationOptions,
        on_update: Box<dyn FnMut(PositionUpdate)>,
    ) -> bool {
        if self.is_tracking() {
            return true;
        }
        self.error = None;
        match source.watch(options, on_update) {
            Ok(subscription) => {
                info!("Started location tracking (watch {})", subscription.id());
                self.state = TrackerState::Tracking(subscription);
                true
            }
            Err(e) => {
                error!("Geolocation error: {}", e);
                self.error = Some(e);
                false
            }
        }
    }

    /// Apply one update from the watch. Samples replace both markers;
    /// errors are recorded and leave the subscription running.
    pub fn on_update(&mut self, map: &mut MapController, update: PositionUpdate) {
        if !self.is_tracking() {
            return;
        }
        match update {
            Ok(sample) => {
                let mut properties = JsonObject::new();
                properties.insert("accuracy".into(), sample.accuracy.into());
                properties.insert("timestamp".into(), sample.timestamp.into());
                map.set_location_markers(
                    sample.lon_lat(),
                    accuracy_radius(sample.accuracy, self.max_radius),
                    properties,
                );
                self.last_sample = Some(sample);
                info!("Location updated: {}", sample);
            }
            Err(e) => {
                error!("Geolocation error: {}", e);
                self.error = Some(e);
            }
        }
    }

    /// Cancel the watch and remove both markers.
    pub fn stop(&mut self, map: &mut MapController) {
        if let TrackerState::Tracking(mut subscription) = std::mem::take(&mut self.state) {
            subscription.cancel();
            info!("Stopped location tracking (watch {})", subscription.id());
        }
        map.clear_location_markers();
        self.last_sample = None;
        self.error = None;
    }

    /// Fly to the last fix, if there is one.
    pub fn center_on_current_location(
        &self,
        map: &mut MapController,
        zoom: f64,
        duration_ms: u32,
    ) -> Option<ViewAnimation> {
        let sample = self.last_sample?;
        Some(map.animate_to(sample.lon_lat(), zoom, duration_ms))
    }

    /// `📍 Location: lat, lon (±acc m)` for the status bar.
    pub fn status_line(&self) -> Option<String> {
        self.last_sample
            .filter(|_| self.is_tracking())
            .map(|s| format!("📍 Location: {}", s))
    }
}

/// `navigator.geolocation`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserGeolocation;

impl BrowserGeolocation {
    fn api() -> Result<Geolocation, GeolocationError> {
        web_sys::window()
            .and_then(|w| w.navigator().geolocation().ok())
            .ok_or(GeolocationError::Unsupported)
    }

    fn position_options(options: &GeolocationOptions) -> PositionOptions {
        let opts = PositionOptions::new();
        opts.set_enable_high_accuracy(options.enable_high_accuracy);
        opts.set_timeout(options.timeout_ms);
        opts.set_maximum_age(options.maximum_age_ms);
        opts
    }
}

fn read_f64(target: &JsValue, key: &str) -> Option<f64> {
    js_sys::Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .and_then(|v| v.as_f64())
}

/// Decode a `GeolocationPosition`.
fn sample_from_js(position: &JsValue) -> PositionUpdate {
    let coords = js_sys::Reflect::get(position, &JsValue::from_str("coords"))
        .map_err(|_| GeolocationError::PositionUnavailable)?;
    match (
        read_f64(&coords, "latitude"),
        read_f64(&coords, "longitude"),
    ) {
        (Some(latitude), Some(longitude)) => Ok(LocationSample {
            latitude,
            longitude,
            accuracy: read_f64(&coords, "accuracy").unwrap_or_default(),
            timestamp: read_f64(position, "timestamp").unwrap_or_else(js_sys::Date::now),
        }),
        _ => Err(GeolocationError::PositionUnavailable),
    }
}

/// Decode a `GeolocationPositionError`.
fn error_from_js(err: &JsValue) -> GeolocationError {
    GeolocationError::from_code(read_f64(err, "code").unwrap_or_default() as u16)
}

impl PositionSource for BrowserGeolocation {
    async fn current_position(&self, options: &GeolocationOptions) -> PositionUpdate {
        let api = Self::api()?;
        let (tx, rx) = oneshot::channel::<PositionUpdate>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_success = {
            let tx = tx.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |position: JsValue| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(sample_from_js(&position));
                }
            })
        };
        let on_error = {
            let tx = tx.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Err(error_from_js(&err)));
                }
            })
        };

        api.get_current_position_with_error_callback_and_options(
            on_success.as_ref().unchecked_ref(),
            Some(on_error.as_ref().unchecked_ref()),
            &Self::position_options(options),
        )
        .map_err(|_| GeolocationError::Unsupported)?;

        // Both closures stay alive until one of them has fired
        let result = rx.await.unwrap_or(Err(GeolocationError::PositionUnavailable));
        drop((on_success, on_error));
        result
    }

    fn watch(
        &self,
        options: &GeolocationOptions,
        on_update: Box<dyn FnMut(PositionUpdate)>,
    ) -> Result<WatchSubscription, GeolocationError> {
        let api = Self::api()?;
        let on_update = Rc::new(RefCell::new(on_update));

        let on_success = {
            let on_update = on_update.clone();
            Closure::<dyn FnMut(JsValue)>::new(move |position: JsValue| {
                (&mut *on_update.borrow_mut())(sample_from_js(&position));
            })
        };
        let on_error = Closure::<dyn FnMut(JsValue)>::new(move |err: JsValue| {
            (&mut *on_update.borrow_mut())(Err(error_from_js(&err)));
        });

        let id = api
            .watch_position_with_error_callback_and_options(
                on_success.as_ref().unchecked_ref(),
                Some(on_error.as_ref().unchecked_ref()),
                &Self::position_options(options),
            )
            .map_err(|_| GeolocationError::Unsupported)?;

        Ok(WatchSubscription::new(id, move || {
            api.clear_watch(id);
            drop((on_success, on_error));
        }))
    }
}



#[cfg(all(test, target_arch = "wasm32"))]
mod browser_tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn field(opts: &PositionOptions, key: &str) -> JsValue {
        js_sys::Reflect::get(opts, &JsValue::from_str(key)).unwrap_or(JsValue::UNDEFINED)
    }

    #[wasm_bindgen_test]
    fn test_position_options_carry_config() {
        let opts = BrowserGeolocation::position_options(&GeolocationOptions {
            enable_high_accuracy: false,
            timeout_ms: 5_000,
            maximum_age_ms: 0,
        });
        assert_eq!(field(&opts, "enableHighAccuracy").as_bool(), Some(false));
        assert_eq!(field(&opts, "timeout").as_f64(), Some(5_000.0));
        assert_eq!(field(&opts, "maximumAge").as_f64(), Some(0.0));
    }
}
