//! Terminal implementations of the viewer host seams: STL files named on the
//! command line stand in for page containers.

use std::fs;
use std::path::PathBuf;

use stlview_core::{
    ContainerDescriptor, LoadError, LoadProgress, MeshFetcher, Page, Surface, ViewerError,
    Viewport,
};

use crate::renderer::AsciiRenderer;

/// Every path is a container whose source is the path itself
pub struct FilePage {
    paths: Vec<PathBuf>,
    viewport: Viewport,
}

impl FilePage {
    pub fn new(paths: Vec<PathBuf>, viewport: Viewport) -> Self {
        Self { paths, viewport }
    }
}

impl Page for FilePage {
    fn containers(&self, _container_class: &str, _source_attribute: &str) -> Vec<ContainerDescriptor> {
        self.paths
            .iter()
            .enumerate()
            .map(|(index, path)| {
                ContainerDescriptor::new(index, self.viewport).with_source(path.to_string_lossy())
            })
            .collect()
    }
}

/// Hands each viewer its own full-screen ASCII renderer
#[derive(Debug, Default)]
pub struct TerminalSurface;

impl Surface for TerminalSurface {
    type Renderer = AsciiRenderer;

    fn attach(&mut self, id: &str, container: &ContainerDescriptor) -> Result<AsciiRenderer, ViewerError> {
        let viewport = container.viewport;
        if viewport.width == 0 || viewport.height == 0 {
            return Err(ViewerError::Surface {
                id: id.to_string(),
                reason: "terminal has no room to draw".to_string(),
            });
        }
        Ok(AsciiRenderer::new(viewport))
    }
}

/// Reads models from the local filesystem
#[derive(Debug, Default)]
pub struct FileFetcher;

impl MeshFetcher for FileFetcher {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>, LoadError> {
        let total = fs::metadata(url).ok().map(|meta| meta.len());
        let bytes = fs::read(url).map_err(|err| LoadError::Fetch(format!("{url}: {err}")))?;
        progress(LoadProgress {
            loaded: bytes.len() as u64,
            total,
        });
        Ok(bytes)
    }
}
