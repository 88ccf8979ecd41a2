//! Bootstrap, session lifecycle and run loop behaviour against in-memory hosts

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use stlview_core::stl::write_binary_stl;
use stlview_core::{
    ContainerDescriptor, LoadError, LoadProgress, Mesh, MeshFetcher, OrthographicCamera, Page,
    RenderError, Renderer, Scene, SceneObject, SequentialIds, SessionState, Surface,
    ViewerBootstrapper, ViewerConfig, ViewerError, ViewerSession, Viewport,
};

struct FixedPage(Vec<ContainerDescriptor>);

impl Page for FixedPage {
    fn containers(&self, _class: &str, _attribute: &str) -> Vec<ContainerDescriptor> {
        self.0.clone()
    }
}

#[derive(Default)]
struct RecordingRenderer {
    renders: Rc<RefCell<u64>>,
    last_object_count: usize,
}

impl Renderer for RecordingRenderer {
    fn set_clear_color(&mut self, _color: stlview_core::Color) {}

    fn set_size(&mut self, _viewport: Viewport) {}

    fn render(&mut self, scene: &Scene, _camera: &OrthographicCamera) -> Result<(), RenderError> {
        *self.renders.borrow_mut() += 1;
        self.last_object_count = scene.objects().len();
        Ok(())
    }
}

/// Mounts renderers on every container except the ids listed in `missing`
#[derive(Default)]
struct TestSurface {
    missing: Vec<String>,
    attached: Vec<String>,
}

impl Surface for TestSurface {
    type Renderer = RecordingRenderer;

    fn attach(&mut self, id: &str, _container: &ContainerDescriptor) -> Result<RecordingRenderer, ViewerError> {
        if self.missing.iter().any(|m| m == id) {
            return Err(ViewerError::MissingContainer(id.to_string()));
        }
        self.attached.push(id.to_string());
        Ok(RecordingRenderer::default())
    }
}

struct MapFetcher(HashMap<String, Result<Vec<u8>, LoadError>>);

impl MeshFetcher for MapFetcher {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>, LoadError> {
        let bytes = self
            .0
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(LoadError::Fetch(format!("404 for {url}"))))?;
        progress(LoadProgress {
            loaded: bytes.len() as u64,
            total: Some(bytes.len() as u64),
        });
        Ok(bytes)
    }
}

fn viewport() -> Viewport {
    Viewport::new(800, 600)
}

fn container(index: usize, source: &str) -> ContainerDescriptor {
    ContainerDescriptor::new(index, viewport()).with_source(source)
}

fn bootstrapper() -> ViewerBootstrapper<SequentialIds> {
    ViewerBootstrapper::with_id_generator(ViewerConfig::default(), SequentialIds::default()).unwrap()
}

fn fetcher() -> MapFetcher {
    let mut models = HashMap::new();
    models.insert("cube.stl".to_string(), Ok(write_binary_stl(&Mesh::cube(6.0))));
    models.insert("broken.stl".to_string(), Ok(b"solid nope\n facet".to_vec()));
    MapFetcher(models)
}

#[test]
fn test_one_session_per_container_with_source() {
    let page = FixedPage(vec![
        container(0, "cube.stl"),
        ContainerDescriptor::new(1, viewport()),
        container(2, "other.stl"),
        ContainerDescriptor::new(3, viewport()).with_source("   "),
    ]);
    let mut boot = bootstrapper();
    let mut containers = boot.discover_containers(&page);
    assert_eq!(containers.len(), 4);

    let sessions = boot.bootstrap(&mut containers, &mut TestSurface::default());

    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].source(), "cube.stl");
    assert_eq!(sessions[1].source(), "other.stl");
    // Skipped containers are left without an id
    assert!(containers[1].id.is_none());
    assert_eq!(
        boot.skipped(),
        [
            ViewerError::MissingSource { index: 1 },
            ViewerError::MissingSource { index: 3 },
        ]
    );
}

#[test]
fn test_missing_source_is_reported() {
    let mut boot = bootstrapper();
    let mut bare = ContainerDescriptor::new(7, viewport());

    let err = boot
        .create_session(&mut bare, &mut TestSurface::default())
        .unwrap_err();
    assert_eq!(err, ViewerError::MissingSource { index: 7 });
}

#[test]
fn test_ids_are_generated_and_written_back() {
    let mut boot = bootstrapper();
    let mut containers = vec![
        container(0, "a.stl"),
        container(1, "b.stl").with_id("hero"),
        container(2, "c.stl"),
    ];
    let sessions = boot.bootstrap(&mut containers, &mut TestSurface::default());

    let ids: Vec<_> = sessions.iter().map(|s| s.id().to_string()).collect();
    assert_eq!(ids, vec!["stl-viewer-0", "hero", "stl-viewer-1"]);
    assert_eq!(containers[0].id.as_deref(), Some("stl-viewer-0"));
}

#[test]
fn test_duplicate_explicit_id_is_replaced() {
    let mut boot = bootstrapper();
    let mut containers = vec![
        container(0, "a.stl").with_id("twin"),
        container(1, "b.stl").with_id("twin"),
    ];
    let sessions = boot.bootstrap(&mut containers, &mut TestSurface::default());

    assert_eq!(sessions.len(), 2);
    assert_ne!(sessions[0].id(), sessions[1].id());
}

#[test]
fn test_generated_ids_avoid_explicit_ones() {
    let mut boot = bootstrapper();
    let mut containers = vec![
        container(0, "a.stl").with_id("stl-viewer-0"),
        container(1, "b.stl"),
    ];
    let sessions = boot.bootstrap(&mut containers, &mut TestSurface::default());

    assert_eq!(sessions[1].id(), "stl-viewer-1");
}

#[test]
fn test_missing_container_does_not_stop_siblings() {
    let mut boot = bootstrapper();
    let mut surface = TestSurface {
        missing: vec!["gone".to_string()],
        ..Default::default()
    };
    let mut containers = vec![
        container(0, "a.stl").with_id("gone"),
        container(1, "b.stl").with_id("here"),
    ];
    let sessions = boot.bootstrap(&mut containers, &mut surface);

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id(), "here");
    assert_eq!(surface.attached, vec!["here"]);
    assert_eq!(
        boot.skipped(),
        [ViewerError::MissingContainer("gone".to_string())]
    );
}

#[test]
fn test_session_setup_defaults() {
    let mut boot = bootstrapper();
    let mut containers = vec![container(0, "cube.stl")];
    let sessions = boot.bootstrap(&mut containers, &mut TestSurface::default());
    let session = &sessions[0];

    assert_eq!(session.state(), SessionState::Created);
    assert!(session.scene.is_empty());
    assert!(session.scene.ambient.is_some());
    assert_eq!(session.scene.directional.len(), 2);
    assert_eq!(session.camera.top, 50.0);
    assert!(session.controls().is_some_and(|c| c.enable_rotate && c.enable_zoom));
    assert!(session.loop_handle().is_running());
}

#[test]
fn test_successful_load_centers_and_fits_model() {
    let mut boot = bootstrapper();
    let mut containers = vec![container(0, "cube.stl")];
    let mut session = boot
        .bootstrap(&mut containers, &mut TestSurface::default())
        .remove(0);

    let state = pollster::block_on(boot.load_model(&mut session, &fetcher()));
    assert_eq!(state, SessionState::Rendering);

    let objects = session.scene.objects();
    assert_eq!(objects.len(), 2);
    match &objects[0] {
        SceneObject::Mesh { mesh, .. } => {
            let center = mesh.bounding_box().unwrap().center();
            assert!(center.coords.norm() < 1e-5);
        }
        other => panic!("expected mesh, got {other:?}"),
    }
    match &objects[1] {
        SceneObject::Lines { segments, .. } => assert_eq!(segments.len(), 12),
        other => panic!("expected lines, got {other:?}"),
    }

    // D = 6, A = 800 / 600
    let aspect = 800.0 / 600.0;
    assert!((session.camera.left + 6.0 * aspect / 2.0).abs() < 1e-5);
    assert!((session.camera.right - 6.0 * aspect / 2.0).abs() < 1e-5);
    assert_eq!(session.camera.top, 3.0);
    assert_eq!(session.camera.bottom, -3.0);
}

#[test]
fn test_failed_load_leaves_siblings_rendering() {
    let mut boot = bootstrapper();
    let mut containers = vec![
        container(0, "missing.stl"),
        container(1, "broken.stl"),
        container(2, "cube.stl"),
    ];
    let mut sessions = boot.bootstrap(&mut containers, &mut TestSurface::default());
    let fetcher = fetcher();

    // Completion order differs from document order
    for index in [2, 0, 1] {
        pollster::block_on(boot.load_model(&mut sessions[index], &fetcher));
    }

    assert_eq!(sessions[0].state(), SessionState::LoadFailed);
    assert_eq!(sessions[1].state(), SessionState::LoadFailed);
    assert_eq!(sessions[2].state(), SessionState::Rendering);
    assert!(sessions[0].scene.is_empty());

    // A failed session keeps rendering its empty scene
    assert_eq!(sessions[0].frame(), Ok(true));
    assert_eq!(sessions[0].renderer().last_object_count, 0);
}

#[test]
fn test_rendering_is_final() {
    let mut boot = bootstrapper();
    let mut containers = vec![container(0, "cube.stl")];
    let mut session = boot
        .bootstrap(&mut containers, &mut TestSurface::default())
        .remove(0);
    pollster::block_on(boot.load_model(&mut session, &fetcher()));

    let state = session.finish_load(Err(LoadError::Fetch("late".into())));
    assert_eq!(state, SessionState::Rendering);
    assert_eq!(session.scene.objects().len(), 2);
}

#[test]
fn test_cancelled_load_fails_session() {
    let mut boot = bootstrapper();
    let mut containers = vec![container(0, "cube.stl")];
    let mut session: ViewerSession<RecordingRenderer> = boot
        .bootstrap(&mut containers, &mut TestSurface::default())
        .remove(0);

    let cancel = session.begin_load();
    session.cancel_load();
    assert!(cancel.is_cancelled());

    let outcome = pollster::block_on(stlview_core::loader::fetch_mesh(
        &fetcher(),
        "cube.stl",
        &cancel,
        |_| {},
    ));
    assert_eq!(session.finish_load(outcome), SessionState::LoadFailed);
    assert!(session.scene.is_empty());
}

#[test]
fn test_render_loop_counts_frames_until_stopped() {
    let mut boot = bootstrapper();
    let mut containers = vec![container(0, "cube.stl")];
    let mut session = boot
        .bootstrap(&mut containers, &mut TestSurface::default())
        .remove(0);
    let renders = session.renderer().renders.clone();
    let handle = session.loop_handle();

    let mut previous = 0;
    for _ in 0..100 {
        assert_eq!(session.frame(), Ok(true));
        let now = *renders.borrow();
        assert!(now > previous);
        previous = now;
    }
    assert_eq!(session.frames(), 100);

    handle.stop();
    assert_eq!(session.frame(), Ok(false));
    assert_eq!(*renders.borrow(), 100);
}

#[test]
fn test_frame_applies_pending_orbit_input() {
    let mut boot = bootstrapper();
    let mut containers = vec![container(0, "cube.stl")];
    let mut session = boot
        .bootstrap(&mut containers, &mut TestSurface::default())
        .remove(0);
    let before = session.camera.position;

    if let Some(controls) = session.controls_mut() {
        controls.handle_drag(120.0, 0.0, 600.0);
    }
    session.frame().unwrap();

    assert_ne!(session.camera.position, before);
}
