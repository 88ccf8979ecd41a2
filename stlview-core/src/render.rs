//! Renderer seams implemented by each host
use crate::error::{RenderError, ViewerError};
use crate::projection::{OrthographicCamera, Viewport};
use crate::scene::{Color, Scene};
use crate::session::ContainerDescriptor;

/// Draws a scene into the output surface attached to one container
pub trait Renderer {
    fn set_clear_color(&mut self, color: Color);

    fn set_size(&mut self, viewport: Viewport);

    fn render(&mut self, scene: &Scene, camera: &OrthographicCamera) -> Result<(), RenderError>;
}

/// Attaches a renderer's output surface to a container
pub trait Surface {
    type Renderer: Renderer;

    /// Create a renderer whose output is mounted in the container with id
    /// `id`. Fails with `MissingContainer` when the host cannot find it.
    fn attach(
        &mut self,
        id: &str,
        container: &ContainerDescriptor,
    ) -> Result<Self::Renderer, ViewerError>;
}
