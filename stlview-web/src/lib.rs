/// STLView Web - WebGL2 STL viewers for `.stl-viewer` elements
///
/// With the `autostart` feature (default) every container in the page is
/// mounted once the document has loaded. Without it, call `initStlViewers`
/// from JavaScript, optionally with a JSON configuration.

use stlview_core::ViewerConfig;
use wasm_bindgen::prelude::*;

mod fetch;
mod input;
mod page;
mod renderer;
mod viewer;

pub use fetch::HttpFetcher;
pub use page::{DocumentPage, DocumentSurface};
pub use renderer::WebGlRenderer;
pub use viewer::SharedSession;

/// Viewers started by `initStlViewers`
#[wasm_bindgen]
pub struct StlViewers {
    sessions: Vec<SharedSession>,
}

#[wasm_bindgen]
impl StlViewers {
    /// Number of running viewers
    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Container ids, in document order
    pub fn ids(&self) -> Vec<String> {
        self.sessions
            .iter()
            .map(|session| session.borrow().id().to_string())
            .collect()
    }

    /// Stop every frame loop and abandon loads still in flight
    #[wasm_bindgen(js_name = stopAll)]
    pub fn stop_all(&self) {
        for session in &self.sessions {
            let session = session.borrow();
            session.loop_handle().stop();
            session.cancel_load();
        }
    }
}

/// Mount a viewer on every container in the page.
///
/// `config_json` overrides the defaults; missing keys keep their default.
#[wasm_bindgen(js_name = initStlViewers)]
pub fn init_stl_viewers(config_json: Option<String>) -> Result<StlViewers, JsValue> {
    let config = match config_json {
        Some(json) => {
            ViewerConfig::from_json(&json).map_err(|err| JsValue::from_str(&err.to_string()))?
        }
        None => ViewerConfig::default(),
    };
    let sessions = viewer::init(config)?;
    Ok(StlViewers { sessions })
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    console_log::init_with_level(log::Level::Debug)
        .map_err(|e| JsValue::from_str(&format!("Failed to init logger: {}", e)))?;

    #[cfg(feature = "autostart")]
    viewer::init_on_load()?;

    Ok(())
}
