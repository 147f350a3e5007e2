//! Browser checks for the JS-facing glue. Run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use tourmap_core_wasm::{basemap_options, StoryBrowserHandle, TourMap};
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

fn mount(id: &str) -> web_sys::Element {
    let document = web_sys::window().unwrap().document().unwrap();
    let div = document.create_element("div").unwrap();
    div.set_id(id);
    document.body().unwrap().append_child(&div).unwrap();
    div
}

#[wasm_bindgen_test]
fn mount_and_destroy_tour_map() {
    let div = mount("tour-map");
    let mut map = TourMap::new("tour-map", JsValue::UNDEFINED).unwrap();
    let view = map.view().unwrap();
    let scene = js_sys::Reflect::get(&view, &"scene".into()).unwrap();
    let target = js_sys::Reflect::get(&scene, &"target".into()).unwrap();
    assert_eq!(target.as_string().as_deref(), Some("tour-map"));

    map.set_basemap("satellite").unwrap();
    assert!(map.set_basemap("terrain").is_err());

    map.destroy();
    assert!(map.view().is_err());
    div.remove();
}

#[wasm_bindgen_test]
fn missing_container_is_an_error() {
    assert!(TourMap::new("nowhere", JsValue::UNDEFINED).is_err());
}

#[wasm_bindgen_test]
fn story_browser_view_modes() {
    let handle = StoryBrowserHandle::new(JsValue::UNDEFINED).unwrap();
    handle.set_view_mode("list").unwrap();
    assert!(handle.set_view_mode("carousel").is_err());
    assert!(handle.set_filter("county", "Nairobi").is_err());
    assert!(handle.toggle_filter_panel());
}

#[wasm_bindgen_test]
fn basemap_options_are_plain_objects() {
    let options: js_sys::Array = basemap_options().unwrap().into();
    assert_eq!(options.length(), 5);
    let first = options.get(0);
    let name = js_sys::Reflect::get(&first, &"name".into()).unwrap();
    assert_eq!(name.as_string().as_deref(), Some("OSM Default"));
}

#[wasm_bindgen_test]
fn start_installs_console_logger_once() {
    tourmap_core_wasm::start();
    tourmap_core_wasm::start();
    assert_eq!(log::max_level(), log::LevelFilter::Debug);
    log::info!("console logger reachable from tests");
}
