//! STLView Core Library - host-independent STL viewer logic
//!
//! Decodes STL models, extracts sharp edges, drives the orthographic camera
//! and orbit controls, and sets up one viewer session per page container.
//! Hosts supply the page, the transport and the renderer.

pub mod bootstrap;
pub mod config;
pub mod controls;
pub mod edges;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod projection;
pub mod render;
pub mod run_loop;
pub mod scene;
pub mod session;
pub mod stl;

// Re-export commonly used types
pub use bootstrap::{IdGenerator, Page, RandomIds, SequentialIds, ViewerBootstrapper};
pub use config::ViewerConfig;
pub use controls::OrbitControls;
pub use edges::{EdgeSegment, EdgeThreshold};
pub use error::{ConfigError, LoadError, RenderError, StlError, ViewerError};
pub use geometry::{BoundingBox, Mesh, Triangle, Vertex};
pub use loader::{CancelToken, LoadEvent, LoadProgress, MeshFetcher};
pub use projection::{OrthographicCamera, Viewport};
pub use render::{Renderer, Surface};
pub use run_loop::LoopHandle;
pub use scene::{Color, Scene, SceneObject};
pub use session::{ContainerDescriptor, SessionState, ViewerSession};
