use wasm_bindgen::prelude::*;

// Bindings to the browser console
#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console)]
    pub fn log(s: &str);
}

/// Route `log` records to the browser console. Later calls are no-ops.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    if let Err(e) = console_log::init_with_level(log::Level::Debug) {
        log(&format!("Logger already installed: {}", e));
    }
}

// Native test runs have no console; records are dropped
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {}
