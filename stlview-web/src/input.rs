//! Pointer and wheel input routed to a session's orbit controls

use std::cell::Cell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Event, HtmlCanvasElement, PointerEvent, WheelEvent};

use crate::viewer::SharedSession;

fn listen<E: JsCast + 'static>(
    canvas: &HtmlCanvasElement,
    event: &str,
    mut handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(move |event: Event| {
        if let Ok(event) = event.dyn_into::<E>() {
            handler(event);
        }
    });
    canvas.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    // Listeners live as long as the page
    closure.forget();
    Ok(())
}

/// Drag to orbit, wheel to zoom
pub fn attach(session: &SharedSession, canvas: &HtmlCanvasElement) -> Result<(), JsValue> {
    let last: Rc<Cell<Option<(i32, i32)>>> = Rc::new(Cell::new(None));

    {
        let last = last.clone();
        let canvas_ref = canvas.clone();
        listen(canvas, "pointerdown", move |event: PointerEvent| {
            last.set(Some((event.client_x(), event.client_y())));
            let _ = canvas_ref.set_pointer_capture(event.pointer_id());
        })?;
    }

    {
        let last = last.clone();
        let session = session.clone();
        let canvas_ref = canvas.clone();
        listen(canvas, "pointermove", move |event: PointerEvent| {
            let Some((x, y)) = last.get() else {
                return;
            };
            let (nx, ny) = (event.client_x(), event.client_y());
            last.set(Some((nx, ny)));
            let height = canvas_ref.client_height() as f32;
            if let Some(controls) = session.borrow_mut().controls_mut() {
                controls.handle_drag((nx - x) as f32, (ny - y) as f32, height);
            }
        })?;
    }

    for name in ["pointerup", "pointercancel"] {
        let last = last.clone();
        listen(canvas, name, move |_: PointerEvent| last.set(None))?;
    }

    let session = session.clone();
    listen(canvas, "wheel", move |event: WheelEvent| {
        let mut session = session.borrow_mut();
        if let Some(controls) = session.controls_mut().filter(|c| c.enable_zoom) {
            event.prevent_default();
            controls.handle_wheel(event.delta_y() as f32);
        }
    })?;

    Ok(())
}
