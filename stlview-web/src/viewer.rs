//! Page-level orchestration: discovery, per-session frame loop and model load

use std::cell::RefCell;
use std::rc::Rc;

use stlview_core::bootstrap::log_load_event;
use stlview_core::loader::fetch_mesh;
use stlview_core::{ViewerBootstrapper, ViewerConfig, ViewerSession};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::Window;

use crate::fetch::HttpFetcher;
use crate::input;
use crate::page::DocumentPage;
use crate::renderer::WebGlRenderer;

pub type SharedSession = Rc<RefCell<ViewerSession<WebGlRenderer>>>;

fn window() -> Result<Window, JsValue> {
    web_sys::window().ok_or_else(|| JsValue::from_str("No window"))
}

fn request_animation_frame(callback: &Closure<dyn FnMut()>) -> Result<i32, JsValue> {
    window()?.request_animation_frame(callback.as_ref().unchecked_ref())
}

/// Set up a viewer for every container in the document and start loading
/// their models
pub fn init(config: ViewerConfig) -> Result<Vec<SharedSession>, JsValue> {
    let document = window()?
        .document()
        .ok_or_else(|| JsValue::from_str("No document"))?;
    let mut bootstrapper =
        ViewerBootstrapper::new(config).map_err(|err| JsValue::from_str(&err.to_string()))?;

    let page = DocumentPage::new(document);
    let mut containers = bootstrapper.discover_containers(&page);
    let mut surface = page.surface();
    let sessions: Vec<SharedSession> = bootstrapper
        .bootstrap(&mut containers, &mut surface)
        .into_iter()
        .map(|session| Rc::new(RefCell::new(session)))
        .collect();

    for session in &sessions {
        let canvas = session.borrow().renderer().canvas().clone();
        if let Err(err) = input::attach(session, &canvas) {
            log::error!("Failed to attach input listeners: {:?}", err);
        }
        if let Err(err) = animate(session.clone()) {
            log::error!("Failed to schedule animation frame: {:?}", err);
        }
        load(session.clone());
    }
    Ok(sessions)
}

/// Render a frame on every display refresh until the session's loop stops
fn animate(session: SharedSession) -> Result<(), JsValue> {
    let callback: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let next = callback.clone();

    *callback.borrow_mut() = Some(Closure::new(move || {
        let running = {
            let mut session = session.borrow_mut();
            match session.frame() {
                Ok(running) => running,
                Err(err) => {
                    log::error!("Viewer {}: {}", session.id(), err);
                    true
                }
            }
        };

        if !running {
            log::debug!("Animation stopped for {}", session.borrow().id());
            let _ = next.borrow_mut().take();
            return;
        }
        if let Some(callback) = next.borrow().as_ref() {
            if let Err(err) = request_animation_frame(callback) {
                log::error!("Failed to schedule animation frame: {:?}", err);
            }
        }
    }));

    if let Some(callback) = callback.borrow().as_ref() {
        request_animation_frame(callback)?;
    }
    Ok(())
}

/// Fetch and show the session's model in the background
fn load(session: SharedSession) {
    let (source, cancel) = {
        let mut session = session.borrow_mut();
        (session.source().to_string(), session.begin_load())
    };
    log::info!("Loading STL file: {}", source);

    wasm_bindgen_futures::spawn_local(async move {
        let outcome = fetch_mesh(&HttpFetcher, &source, &cancel, |event| {
            log_load_event(&source, event)
        })
        .await;
        session.borrow_mut().finish_load(outcome);
    });
}

/// Run `init` with the default configuration once the document has loaded
#[cfg(feature = "autostart")]
pub fn init_on_load() -> Result<(), JsValue> {
    let window = window()?;
    let ready = window
        .document()
        .map(|document| document.ready_state() == "complete")
        .unwrap_or(false);

    if ready {
        init_default();
        return Ok(());
    }

    let on_load = Closure::once(init_default);
    window.add_event_listener_with_callback("load", on_load.as_ref().unchecked_ref())?;
    on_load.forget();
    Ok(())
}

#[cfg(feature = "autostart")]
fn init_default() {
    match init(ViewerConfig::default()) {
        Ok(sessions) => log::info!("Started {} STL viewers", sessions.len()),
        Err(err) => log::error!("Failed to start STL viewers: {:?}", err),
    }
}
