//! Viewer discovery and per-container session setup
//!
//! Every failure is local to its container: it is logged and the remaining
//! containers are set up as usual.

use std::collections::HashSet;

use nalgebra::Point3;

use crate::config::ViewerConfig;
use crate::controls::OrbitControls;
use crate::error::{ConfigError, LoadError, ViewerError};
use crate::loader::{fetch_mesh, LoadEvent, MeshFetcher};
use crate::projection::OrthographicCamera;
use crate::render::{Renderer, Surface};
use crate::run_loop::LoopHandle;
use crate::scene::Scene;
use crate::session::{ContainerDescriptor, ModelStyle, SessionState, ViewerSession};

/// Source of viewer containers, in document order
pub trait Page {
    /// Every element carrying `container_class`, with the value of
    /// `source_attribute` when present
    fn containers(&self, container_class: &str, source_attribute: &str) -> Vec<ContainerDescriptor>;
}

/// Supplies identifiers for containers that lack one
pub trait IdGenerator {
    fn next_id(&mut self) -> String;
}

/// Random identifiers: nine base-36 characters drawn from a v4 UUID
#[derive(Debug, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&mut self) -> String {
        let mut value = uuid::Uuid::new_v4().as_u128();
        let mut out = String::with_capacity(9);
        for _ in 0..9 {
            let digit = (value % 36) as u32;
            value /= 36;
            out.push(char::from_digit(digit, 36).unwrap_or('0'));
        }
        out
    }
}

/// Deterministic identifiers `0`, `1`, `2`, ...
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: u64,
}

impl IdGenerator for SequentialIds {
    fn next_id(&mut self) -> String {
        let id = self.next.to_string();
        self.next += 1;
        id
    }
}

/// Sets up one independent viewer session per container
pub struct ViewerBootstrapper<G = RandomIds> {
    config: ViewerConfig,
    style: ModelStyle,
    ids: G,
    seen_ids: HashSet<String>,
    skipped: Vec<ViewerError>,
}

impl ViewerBootstrapper<RandomIds> {
    pub fn new(config: ViewerConfig) -> Result<Self, ConfigError> {
        Self::with_id_generator(config, RandomIds)
    }
}

impl<G: IdGenerator> ViewerBootstrapper<G> {
    pub fn with_id_generator(config: ViewerConfig, ids: G) -> Result<Self, ConfigError> {
        config.validate()?;
        let style = ModelStyle {
            material: config.material,
            line_material: config.line_material(),
            edge_threshold: config.edge_threshold()?,
        };
        Ok(Self {
            config,
            style,
            ids,
            seen_ids: HashSet::new(),
            skipped: Vec::new(),
        })
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// One diagnostic per container skipped by `bootstrap`, in document order
    pub fn skipped(&self) -> &[ViewerError] {
        &self.skipped
    }

    /// Every viewer container in `page`, in document order
    pub fn discover_containers<P: Page + ?Sized>(&self, page: &P) -> Vec<ContainerDescriptor> {
        let containers = page.containers(&self.config.container_class, &self.config.source_attribute);
        log::info!("Number of detected containers: {}", containers.len());
        containers
    }

    /// Create sessions for `containers` in order: scene, controls, then a
    /// started run loop. Models are not loaded yet.
    ///
    /// Containers that fail are logged and skipped.
    pub fn bootstrap<S: Surface>(
        &mut self,
        containers: &mut [ContainerDescriptor],
        surface: &mut S,
    ) -> Vec<ViewerSession<S::Renderer>> {
        let mut sessions = Vec::with_capacity(containers.len());
        for container in containers.iter_mut() {
            match self.create_session(container, surface) {
                Ok(mut session) => {
                    self.attach_controls(&mut session);
                    self.start_loop(&mut session);
                    sessions.push(session);
                }
                Err(err) => {
                    log::error!("{}", err);
                    self.skipped.push(err);
                }
            }
        }
        sessions
    }

    /// Build the scene, camera, lights and renderer for one container.
    ///
    /// A generated identifier is written back into `container.id`.
    pub fn create_session<S: Surface>(
        &mut self,
        container: &mut ContainerDescriptor,
        surface: &mut S,
    ) -> Result<ViewerSession<S::Renderer>, ViewerError> {
        let source = container
            .source
            .clone()
            .filter(|s| !s.trim().is_empty())
            .ok_or(ViewerError::MissingSource {
                index: container.index,
            })?;
        log::info!("Initializing container {} with source: {}", container.index, source);

        let id = self.assign_id(container);
        let viewport = container.viewport;
        log::debug!(
            "Container {} dimensions - Width: {}, Height: {}",
            id,
            viewport.width,
            viewport.height
        );

        let mut renderer = surface.attach(&id, container)?;
        renderer.set_clear_color(self.config.background);
        renderer.set_size(viewport);

        let [x, y, z] = self.config.camera.position;
        let camera = OrthographicCamera::isometric(
            viewport,
            self.config.camera.half_height,
            Point3::new(x, y, z),
            self.config.camera.near,
            self.config.camera.far,
        );

        let mut scene = Scene::new(self.config.background);
        scene.ambient = Some(self.config.lighting.ambient);
        scene.directional = self.config.lighting.directional.clone();
        log::debug!(
            "Scene for {} has an ambient and {} directional lights",
            id,
            scene.directional.len()
        );

        Ok(ViewerSession::new(
            id,
            source,
            viewport,
            scene,
            camera,
            renderer,
            self.style,
        ))
    }

    /// Bind orbit controls to the session's camera, centered on the origin
    pub fn attach_controls<R: Renderer>(&self, session: &mut ViewerSession<R>) {
        let settings = &self.config.controls;
        let mut controls = OrbitControls::new(Point3::origin());
        controls.enable_rotate = settings.enable_rotate;
        controls.enable_zoom = settings.enable_zoom;
        controls.rotate_speed = settings.rotate_speed;
        controls.zoom_speed = settings.zoom_speed;
        session.set_controls(controls);
        log::debug!("OrbitControls initialized for {}", session.id());
    }

    /// Start the session's frame loop; the returned handle stops it
    pub fn start_loop<R: Renderer>(&self, session: &mut ViewerSession<R>) -> LoopHandle {
        session.start_loop()
    }

    /// Fetch, decode and show the session's model. Never retried.
    pub async fn load_model<R, F>(&self, session: &mut ViewerSession<R>, fetcher: &F) -> SessionState
    where
        R: Renderer,
        F: MeshFetcher,
    {
        let cancel = session.begin_load();
        let source = session.source().to_string();
        let outcome = fetch_mesh(fetcher, &source, &cancel, |event| log_load_event(&source, event)).await;
        session.finish_load(outcome)
    }

    fn assign_id(&mut self, container: &mut ContainerDescriptor) -> String {
        if let Some(id) = container.id.as_ref().filter(|id| !id.is_empty()) {
            if self.seen_ids.insert(id.clone()) {
                return id.clone();
            }
            log::warn!(
                "Container {} reuses id {}; assigning a new one",
                container.index,
                id
            );
        }

        let id = loop {
            let candidate = format!("{}{}", self.config.id_prefix, self.ids.next_id());
            if self.seen_ids.insert(candidate.clone()) {
                break candidate;
            }
        };
        container.id = Some(id.clone());
        id
    }
}

/// Report a load event on the log channel
pub fn log_load_event(source: &str, event: &LoadEvent) {
    match event {
        LoadEvent::Progress(progress) => match progress.ratio() {
            Some(ratio) => log::debug!("STL file loading progress: {:.2}%", ratio * 100.0),
            None => log::debug!("STL file loading progress: {} bytes", progress.loaded),
        },
        LoadEvent::Success(_) => log::info!("STL file loaded successfully: {}", source),
        LoadEvent::Failure(LoadError::Cancelled) => log::info!("Load of {} cancelled", source),
        LoadEvent::Failure(_) => {}
    }
}
