//! DOM-backed page and surface

use std::cell::RefCell;

use stlview_core::{ContainerDescriptor, Page, Surface, ViewerError, Viewport};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlCanvasElement};

use crate::renderer::WebGlRenderer;

fn describe(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{value:?}"))
}

/// Viewer containers found in a live document
pub struct DocumentPage {
    document: Document,
    elements: RefCell<Vec<Element>>,
}

impl DocumentPage {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            elements: RefCell::new(Vec::new()),
        }
    }

    /// Surface that mounts canvases into the containers found by the last
    /// discovery
    pub fn surface(&self) -> DocumentSurface {
        DocumentSurface {
            document: self.document.clone(),
            elements: self.elements.borrow().clone(),
        }
    }
}

impl Page for DocumentPage {
    fn containers(&self, container_class: &str, source_attribute: &str) -> Vec<ContainerDescriptor> {
        let nodes = match self.document.query_selector_all(&format!(".{container_class}")) {
            Ok(nodes) => nodes,
            Err(err) => {
                log::error!("Invalid container selector .{}: {}", container_class, describe(&err));
                return Vec::new();
            }
        };

        let elements: Vec<Element> = (0..nodes.length())
            .filter_map(|i| nodes.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect();

        let containers = elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                let viewport = Viewport::new(
                    element.client_width().max(0) as u32,
                    element.client_height().max(0) as u32,
                );
                let mut container = ContainerDescriptor::new(index, viewport);
                let id = element.id();
                if !id.is_empty() {
                    container.id = Some(id);
                }
                container.source = element.get_attribute(source_attribute);
                container
            })
            .collect();

        *self.elements.borrow_mut() = elements;
        containers
    }
}

/// Creates a WebGL2 canvas inside each container element
pub struct DocumentSurface {
    document: Document,
    elements: Vec<Element>,
}

impl DocumentSurface {
    fn surface_error(id: &str, reason: impl Into<String>) -> ViewerError {
        ViewerError::Surface {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

impl Surface for DocumentSurface {
    type Renderer = WebGlRenderer;

    fn attach(&mut self, id: &str, container: &ContainerDescriptor) -> Result<WebGlRenderer, ViewerError> {
        // Write generated ids back so the element can be found by id
        if let Some(element) = self.elements.get(container.index) {
            if element.id() != id {
                element.set_id(id);
            }
        }

        let element = self
            .document
            .get_element_by_id(id)
            .ok_or_else(|| ViewerError::MissingContainer(id.to_string()))?;

        let canvas = self
            .document
            .create_element("canvas")
            .map_err(|err| Self::surface_error(id, describe(&err)))?
            .dyn_into::<HtmlCanvasElement>()
            .map_err(|_| Self::surface_error(id, "created element is not a canvas"))?;
        element
            .append_child(&canvas)
            .map_err(|err| Self::surface_error(id, describe(&err)))?;
        log::debug!("Renderer canvas appended to container {}", id);

        WebGlRenderer::new(canvas).map_err(|err| Self::surface_error(id, err.to_string()))
    }
}
