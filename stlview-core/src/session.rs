//! One viewer: its scene, camera, controls, renderer and loop
use std::fmt;

use crate::controls::OrbitControls;
use crate::edges::{sharp_edges, EdgeThreshold};
use crate::error::{LoadError, RenderError, StlError};
use crate::geometry::Mesh;
use crate::loader::CancelToken;
use crate::projection::{OrthographicCamera, Viewport};
use crate::render::Renderer;
use crate::run_loop::{LoopHandle, RunLoop};
use crate::scene::{LineMaterial, PhongMaterial, Scene, SceneObject};

/// A viewer mount point as reported by the host, in document order
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerDescriptor {
    pub index: usize,
    pub id: Option<String>,
    pub source: Option<String>,
    pub viewport: Viewport,
}

impl ContainerDescriptor {
    pub fn new(index: usize, viewport: Viewport) -> Self {
        Self {
            index,
            id: None,
            source: None,
            viewport,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Load progress of a session. `Rendering` and `LoadFailed` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    AwaitingModel,
    Rendering,
    LoadFailed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Created => "created",
            SessionState::AwaitingModel => "awaiting model",
            SessionState::Rendering => "rendering",
            SessionState::LoadFailed => "load failed",
        };
        f.write_str(name)
    }
}

/// How a loaded model is presented
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelStyle {
    pub material: PhongMaterial,
    pub line_material: LineMaterial,
    pub edge_threshold: EdgeThreshold,
}

pub struct ViewerSession<R> {
    id: String,
    source: String,
    viewport: Viewport,
    pub scene: Scene,
    pub camera: OrthographicCamera,
    controls: Option<OrbitControls>,
    renderer: R,
    style: ModelStyle,
    state: SessionState,
    run_loop: RunLoop,
    cancel: CancelToken,
}

impl<R: Renderer> ViewerSession<R> {
    pub fn new(
        id: String,
        source: String,
        viewport: Viewport,
        scene: Scene,
        camera: OrthographicCamera,
        renderer: R,
        style: ModelStyle,
    ) -> Self {
        Self {
            id,
            source,
            viewport,
            scene,
            camera,
            controls: None,
            renderer,
            style,
            state: SessionState::Created,
            run_loop: RunLoop::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn controls(&self) -> Option<&OrbitControls> {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitControls> {
        self.controls.as_mut()
    }

    pub fn set_controls(&mut self, controls: OrbitControls) {
        self.controls = Some(controls);
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.run_loop.frames()
    }

    pub fn start_loop(&mut self) -> LoopHandle {
        self.run_loop.start();
        log::debug!("Animation started for {}", self.id);
        self.run_loop.handle()
    }

    pub fn loop_handle(&self) -> LoopHandle {
        self.run_loop.handle()
    }

    /// Advance the controls and draw one frame.
    ///
    /// Returns `Ok(false)` once the loop has been stopped; the host should then
    /// stop scheduling frames.
    pub fn frame(&mut self) -> Result<bool, RenderError> {
        if !self.run_loop.is_running() {
            return Ok(false);
        }
        if let Some(controls) = self.controls.as_mut() {
            controls.update(&mut self.camera);
        }
        self.renderer.render(&self.scene, &self.camera)?;
        self.run_loop.record_frame();
        Ok(true)
    }

    /// Mark the model load as in flight and hand out its cancel token
    pub fn begin_load(&mut self) -> CancelToken {
        if self.state == SessionState::Created {
            self.state = SessionState::AwaitingModel;
        } else {
            log::warn!("Viewer {} started a second load while {}", self.id, self.state);
        }
        self.cancel.clone()
    }

    /// Abandon an in-flight load; the session then ends up in `LoadFailed`
    pub fn cancel_load(&self) {
        self.cancel.cancel();
    }

    /// Apply the outcome of the model load. Only the first completion counts.
    pub fn finish_load(&mut self, outcome: Result<Mesh, LoadError>) -> SessionState {
        if self.state != SessionState::AwaitingModel {
            log::warn!(
                "Ignoring model load completion for {} while {}",
                self.id,
                self.state
            );
            return self.state;
        }

        self.state = match outcome.and_then(|mesh| self.show_model(mesh)) {
            Ok(()) => SessionState::Rendering,
            Err(err) => {
                log::error!("Error loading STL file {}: {}", self.source, err);
                SessionState::LoadFailed
            }
        };
        self.state
    }

    /// Center the mesh, add it with its sharp-edge overlay and frame it
    fn show_model(&mut self, mut mesh: Mesh) -> Result<(), LoadError> {
        let bounds = mesh.bounding_box().ok_or(StlError::Empty)?;
        if let Some(offset) = mesh.center() {
            log::debug!("Centered {} by ({}, {}, {})", self.id, offset.x, offset.y, offset.z);
        }

        let segments = sharp_edges(&mesh, self.style.edge_threshold);
        log::info!(
            "STL file loaded for {}: {} triangles, {} sharp edges",
            self.id,
            mesh.triangles.len(),
            segments.len()
        );

        self.scene.add(SceneObject::Mesh {
            mesh,
            material: self.style.material,
        });
        self.scene.add(SceneObject::Lines {
            segments,
            material: self.style.line_material,
        });

        let max_dimension = bounds.max_dimension();
        if max_dimension > 0.0 {
            self.camera.fit_to_extent(max_dimension, self.viewport.aspect());
            log::debug!("Camera limits adjusted to the model ({})", max_dimension);
        } else {
            log::warn!("Model {} has no extent; keeping default camera limits", self.source);
        }
        Ok(())
    }
}

impl<R> fmt::Debug for ViewerSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewerSession")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("viewport", &self.viewport)
            .field("state", &self.state)
            .field("frames", &self.run_loop.frames())
            .finish()
    }
}
