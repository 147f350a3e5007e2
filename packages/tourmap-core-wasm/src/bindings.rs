// JS-facing classes for the two pages
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use js_sys::{Date, Function};
use log::{debug, error};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen::Serializer;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, Event};

use crate::api::ApiClient;
use crate::config::{from_js, DashboardConfig, StoryBrowserConfig};
use crate::dashboard::{fetch_refresh, MapDashboard};
use crate::error::{DashboardError, Result};
use crate::geolocation::{BrowserGeolocation, PositionSource, PositionUpdate};
use crate::http::FetchTransport;
use crate::stories::{FilterField, StoryBrowser, ViewMode};
use crate::viewport::{Pixel, ViewAnimation};

type Shared<T> = Rc<RefCell<T>>;

fn document() -> Result<Document> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or(DashboardError::NotMounted)
}

/// Plain JS objects rather than `Map`s, so the page can read the view
/// with ordinary property access.
fn to_js<T: Serialize>(value: &T) -> std::result::Result<JsValue, JsValue> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Decode a plain string such as `"list"` into one of our serde enums.
fn parse_key<T: DeserializeOwned>(key: &str) -> Result<T> {
    Ok(serde_json::from_value(serde_json::Value::String(key.to_string()))?)
}

fn element_size(element: &Element) -> (f64, f64) {
    (element.client_width() as f64, element.client_height() as f64)
}

/// Call the page's change listener. No borrow of the state may be held
/// here since the listener usually reads the view right back.
fn emit(callback: &Shared<Option<Function>>, view: JsValue, animation: Option<ViewAnimation>) {
    let Some(callback) = callback.borrow().clone() else {
        return;
    };
    let animation = animation
        .and_then(|a| to_js(&a).ok())
        .unwrap_or(JsValue::NULL);
    if let Err(e) = callback.call2(&JsValue::NULL, &view, &animation) {
        error!("change listener threw: {:?}", e);
    }
}

fn notify_map(state: &Shared<Option<MapDashboard>>, callback: &Shared<Option<Function>>, animation: Option<ViewAnimation>) {
    let view = match state.borrow().as_ref() {
        Some(dashboard) => to_js(&dashboard.view()).unwrap_or(JsValue::NULL),
        None => return,
    };
    emit(callback, view, animation);
}

/// The tour map page.
#[wasm_bindgen]
pub struct TourMap {
    state: Shared<Option<MapDashboard>>,
    client: Rc<ApiClient<FetchTransport>>,
    on_change: Shared<Option<Function>>,
    container: Option<Element>,
    fullscreen_listener: Option<Closure<dyn FnMut(Event)>>,
}

#[wasm_bindgen]
impl TourMap {
    /// Mount into the element with id `target`.
    #[wasm_bindgen(constructor)]
    pub fn new(target: &str, config: JsValue) -> std::result::Result<TourMap, JsValue> {
        let config: DashboardConfig = from_js(config)?;
        let container = document()?
            .get_element_by_id(target)
            .ok_or(DashboardError::NotMounted)?;
        let (width, height) = element_size(&container);
        let client = Rc::new(ApiClient::new(&config.api_base_url, FetchTransport));
        let dashboard = MapDashboard::new(target, config, width, height);

        let mut map = TourMap {
            state: Rc::new(RefCell::new(Some(dashboard))),
            client,
            on_change: Rc::new(RefCell::new(None)),
            container: Some(container),
            fullscreen_listener: None,
        };
        map.listen_fullscreen()?;
        Ok(map)
    }

    /// `callback(view, animation)` runs after every state change.
    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Function) {
        *self.on_change.borrow_mut() = Some(callback);
    }

    pub fn view(&self) -> std::result::Result<JsValue, JsValue> {
        let view = self.with(|d| d.view())?;
        to_js(&view)
    }

    /// Fetch places, recaps and stats.
    pub fn refresh(&self) -> std::result::Result<(), JsValue> {
        let tickets = self.with(|d| d.begin_refresh())?;
        self.notify(None);

        let state = self.state.clone();
        let on_change = self.on_change.clone();
        let client = self.client.clone();
        spawn_local(async move {
            let results = fetch_refresh(&client).await;
            if let Some(dashboard) = state.borrow_mut().as_mut() {
                dashboard.finish_refresh(tickets, results);
            }
            notify_map(&state, &on_change, None);
        });
        Ok(())
    }

    /// One-shot position request made when the page mounts.
    #[wasm_bindgen(js_name = locateOnce)]
    pub fn locate_once(&self) {
        let state = self.state.clone();
        let on_change = self.on_change.clone();
        spawn_local(async move {
            let options = match state.borrow().as_ref() {
                Some(d) => d.config().geolocation.clone(),
                None => return,
            };
            let update = BrowserGeolocation.current_position(&options).await;
            let animation = state
                .borrow_mut()
                .as_mut()
                .and_then(|d| d.apply_initial_position(update));
            notify_map(&state, &on_change, animation);
        });
    }

    /// Returns the popup content, or `undefined` when the click hit nothing.
    pub fn click(&self, x: f64, y: f64) -> std::result::Result<JsValue, JsValue> {
        let popup = self.with(|d| d.click(Pixel::new(x, y)))?;
        self.notify(None);
        to_js(&popup)
    }

    #[wasm_bindgen(js_name = closePopup)]
    pub fn close_popup(&self) -> std::result::Result<(), JsValue> {
        self.with(|d| d.close_popup())?;
        self.notify(None);
        Ok(())
    }

    #[wasm_bindgen(js_name = setBasemap)]
    pub fn set_basemap(&self, key: &str) -> std::result::Result<(), JsValue> {
        self.with(|d| d.set_basemap(key))??;
        self.notify(None);
        Ok(())
    }

    #[wasm_bindgen(js_name = setLayerVisible)]
    pub fn set_layer_visible(&self, key: &str, visible: bool) -> std::result::Result<(), JsValue> {
        self.with(|d| d.set_layer_visible(key, visible))??;
        self.notify(None);
        Ok(())
    }

    #[wasm_bindgen(js_name = toggleLayersMenu)]
    pub fn toggle_layers_menu(&self) -> std::result::Result<bool, JsValue> {
        let open = self.with(|d| d.toggle_layers_menu())?;
        self.notify(None);
        Ok(open)
    }

    /// The `fullscreenchange` listener picks up the result.
    #[wasm_bindgen(js_name = toggleFullscreen)]
    pub fn toggle_fullscreen(&self) -> std::result::Result<(), JsValue> {
        let container = self.container.as_ref().ok_or(DashboardError::NotMounted)?;
        let document = document()?;
        if document.fullscreen_element().is_none() {
            container.request_fullscreen()?;
        } else {
            document.exit_fullscreen();
        }
        Ok(())
    }

    pub fn resize(&self, width: f64, height: f64) -> std::result::Result<(), JsValue> {
        self.with(|d| d.resize(width, height))?;
        self.notify(None);
        Ok(())
    }

    #[wasm_bindgen(js_name = startTracking)]
    pub fn start_tracking(&self) -> std::result::Result<bool, JsValue> {
        let weak: Weak<RefCell<Option<MapDashboard>>> = Rc::downgrade(&self.state);
        let on_change = self.on_change.clone();
        let on_update = Box::new(move |update: PositionUpdate| {
            let Some(state) = weak.upgrade() else {
                return;
            };
            if let Some(dashboard) = state.borrow_mut().as_mut() {
                dashboard.on_location_update(update);
            }
            notify_map(&state, &on_change, None);
        });
        let started = self.with(|d| d.start_tracking(&BrowserGeolocation, on_update))?;
        self.notify(None);
        Ok(started)
    }

    #[wasm_bindgen(js_name = stopTracking)]
    pub fn stop_tracking(&self) -> std::result::Result<(), JsValue> {
        self.with(|d| d.stop_tracking())?;
        self.notify(None);
        Ok(())
    }

    #[wasm_bindgen(js_name = centerOnMe)]
    pub fn center_on_me(&self) -> std::result::Result<(), JsValue> {
        let animation = self.with(|d| d.center_on_me())?;
        if animation.is_some() {
            self.notify(animation);
        }
        Ok(())
    }

    /// Cancel tracking, drop the fullscreen listener and detach the map.
    pub fn destroy(&mut self) {
        if let Some(listener) = self.fullscreen_listener.take() {
            if let Ok(document) = document() {
                let _ = document.remove_event_listener_with_callback(
                    "fullscreenchange",
                    listener.as_ref().unchecked_ref(),
                );
            }
        }
        if let Some(dashboard) = self.state.borrow_mut().take() {
            let target = dashboard.destroy();
            debug!("Tour map removed from #{}", target);
        }
        self.container = None;
        self.on_change.borrow_mut().take();
    }
}

impl TourMap {
    fn listen_fullscreen(&mut self) -> Result<()> {
        let state = self.state.clone();
        let on_change = self.on_change.clone();
        let container = self.container.clone();
        let listener = Closure::<dyn FnMut(Event)>::new(move |_event: Event| {
            let fullscreen = document()
                .map(|d| d.fullscreen_element().is_some())
                .unwrap_or(false);
            let (width, height) = container.as_ref().map(element_size).unwrap_or_default();
            if let Some(dashboard) = state.borrow_mut().as_mut() {
                dashboard.set_fullscreen(fullscreen, width, height);
            }
            notify_map(&state, &on_change, None);
        });
        document()?
            .add_event_listener_with_callback("fullscreenchange", listener.as_ref().unchecked_ref())
            .map_err(|_| DashboardError::NotMounted)?;
        self.fullscreen_listener = Some(listener);
        Ok(())
    }

    fn with<R>(&self, f: impl FnOnce(&mut MapDashboard) -> R) -> Result<R> {
        let mut state = self.state.borrow_mut();
        let dashboard = state.as_mut().ok_or(DashboardError::NotMounted)?;
        Ok(f(dashboard))
    }

    fn notify(&self, animation: Option<ViewAnimation>) {
        notify_map(&self.state, &self.on_change, animation);
    }
}

impl Drop for TourMap {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn notify_stories(state: &Shared<StoryBrowser>, callback: &Shared<Option<Function>>) {
    let view = to_js(&state.borrow().view()).unwrap_or(JsValue::NULL);
    emit(callback, view, None);
}

fn spawn_story_fetch(
    state: Shared<StoryBrowser>,
    client: Rc<ApiClient<FetchTransport>>,
    on_change: Shared<Option<Function>>,
) {
    let (ticket, query) = state.borrow_mut().begin_fetch();
    notify_stories(&state, &on_change);
    spawn_local(async move {
        let result = client.geostories(&query).await;
        state.borrow_mut().finish_fetch(ticket, result);
        notify_stories(&state, &on_change);
    });
}

/// The geostory browser page.
#[wasm_bindgen]
pub struct StoryBrowserHandle {
    state: Shared<StoryBrowser>,
    client: Rc<ApiClient<FetchTransport>>,
    on_change: Shared<Option<Function>>,
    timer: Rc<Cell<Option<i32>>>,
    timer_callback: Option<Closure<dyn FnMut()>>,
}

#[wasm_bindgen]
impl StoryBrowserHandle {
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> std::result::Result<StoryBrowserHandle, JsValue> {
        let config: StoryBrowserConfig = from_js(config)?;
        let client = Rc::new(ApiClient::new(&config.api_base_url, FetchTransport));
        Ok(StoryBrowserHandle {
            state: Rc::new(RefCell::new(StoryBrowser::new(config))),
            client,
            on_change: Rc::new(RefCell::new(None)),
            timer: Rc::new(Cell::new(None)),
            timer_callback: None,
        })
    }

    #[wasm_bindgen(js_name = onChange)]
    pub fn on_change(&self, callback: Function) {
        *self.on_change.borrow_mut() = Some(callback);
    }

    pub fn view(&self) -> std::result::Result<JsValue, JsValue> {
        to_js(&self.state.borrow().view())
    }

    /// Fetch the current page, also used by "Refresh" and "Try Again".
    pub fn fetch(&self) {
        self.fetch_now();
    }

    /// Search box input. The request goes out once typing pauses.
    #[wasm_bindgen(js_name = setSearch)]
    pub fn set_search(&mut self, term: &str) -> std::result::Result<(), JsValue> {
        let delay = self.state.borrow_mut().set_search(term, Date::now());
        self.clear_timer();

        let state = self.state.clone();
        let client = self.client.clone();
        let on_change = self.on_change.clone();
        let timer = self.timer.clone();
        let callback = Closure::<dyn FnMut()>::new(move || {
            timer.set(None);
            let ready = state.borrow_mut().debounce_elapsed(Date::now());
            if ready {
                spawn_story_fetch(state.clone(), client.clone(), on_change.clone());
            }
        });
        let window = web_sys::window().ok_or(DashboardError::NotMounted)?;
        let handle = window.set_timeout_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            delay as i32,
        )?;
        self.timer.set(Some(handle));
        self.timer_callback = Some(callback);
        self.notify();
        Ok(())
    }

    /// `field` is `"location"` or `"author"`.
    #[wasm_bindgen(js_name = setFilter)]
    pub fn set_filter(&self, field: &str, value: &str) -> std::result::Result<(), JsValue> {
        let field: FilterField = parse_key(field)?;
        if self.state.borrow_mut().set_filter(field, value) {
            self.fetch_now();
        } else {
            self.notify();
        }
        Ok(())
    }

    #[wasm_bindgen(js_name = clearFilters)]
    pub fn clear_filters(&self) {
        self.clear_timer();
        self.state.borrow_mut().clear_filters();
        self.fetch_now();
    }

    #[wasm_bindgen(js_name = setPage)]
    pub fn set_page(&self, page: u32) {
        if self.state.borrow_mut().set_page(page) {
            self.fetch_now();
        }
    }

    #[wasm_bindgen(js_name = prevPage)]
    pub fn prev_page(&self) {
        if self.state.borrow_mut().prev_page() {
            self.fetch_now();
        }
    }

    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) {
        if self.state.borrow_mut().next_page() {
            self.fetch_now();
        }
    }

    #[wasm_bindgen(js_name = toggleFilterPanel)]
    pub fn toggle_filter_panel(&self) -> bool {
        let open = self.state.borrow_mut().toggle_filter_panel();
        self.notify();
        open
    }

    /// `"grid"` or `"list"`.
    #[wasm_bindgen(js_name = setViewMode)]
    pub fn set_view_mode(&self, mode: &str) -> std::result::Result<(), JsValue> {
        let mode: ViewMode = parse_key(mode)?;
        self.state.borrow_mut().set_view_mode(mode);
        self.notify();
        Ok(())
    }
}

impl StoryBrowserHandle {
    fn fetch_now(&self) {
        spawn_story_fetch(self.state.clone(), self.client.clone(), self.on_change.clone());
    }

    fn notify(&self) {
        notify_stories(&self.state, &self.on_change);
    }

    fn clear_timer(&self) {
        if let (Some(handle), Some(window)) = (self.timer.take(), web_sys::window()) {
            window.clear_timeout_with_handle(handle);
        }
    }
}

impl Drop for StoryBrowserHandle {
    fn drop(&mut self) {
        self.clear_timer();
    }
}
