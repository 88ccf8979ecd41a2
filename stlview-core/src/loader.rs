//! Asynchronous model loading
//!
//! A load reports through [`LoadEvent`]s: any number of `Progress` events
//! followed by exactly one `Success` or `Failure`.

use std::cell::Cell;
use std::rc::Rc;

use crate::error::LoadError;
use crate::geometry::Mesh;
use crate::stl;

/// Bytes received so far and, when the transport knows it, the total
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadProgress {
    pub loaded: u64,
    pub total: Option<u64>,
}

impl LoadProgress {
    /// Completed fraction in `0.0..=1.0`, if the total is known
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.loaded as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadEvent {
    Progress(LoadProgress),
    Success(Mesh),
    Failure(LoadError),
}

/// Transport that retrieves raw model bytes for a URL
#[allow(async_fn_in_trait)]
pub trait MeshFetcher {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>, LoadError>;
}

/// Shared flag that abandons a load when set
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Rc<Cell<bool>>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// Fetch and decode the model at `url`.
///
/// Every event, including the final one, is passed to `on_event`; the final
/// outcome is also returned. Cancellation is observed before the fetch starts
/// and again once it resumes, so a cancelled load never yields a mesh.
pub async fn fetch_mesh<F, E>(
    fetcher: &F,
    url: &str,
    cancel: &CancelToken,
    mut on_event: E,
) -> Result<Mesh, LoadError>
where
    F: MeshFetcher,
    E: FnMut(&LoadEvent),
{
    let outcome = fetch_and_decode(fetcher, url, cancel, &mut on_event).await;
    let event = match &outcome {
        Ok(mesh) => LoadEvent::Success(mesh.clone()),
        Err(err) => LoadEvent::Failure(err.clone()),
    };
    on_event(&event);
    outcome
}

async fn fetch_and_decode<F, E>(
    fetcher: &F,
    url: &str,
    cancel: &CancelToken,
    on_event: &mut E,
) -> Result<Mesh, LoadError>
where
    F: MeshFetcher,
    E: FnMut(&LoadEvent),
{
    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }

    let mut report = |progress: LoadProgress| {
        if !cancel.is_cancelled() {
            on_event(&LoadEvent::Progress(progress));
        }
    };
    let bytes = fetcher.fetch(url, &mut report).await?;

    if cancel.is_cancelled() {
        return Err(LoadError::Cancelled);
    }
    Ok(stl::parse_stl(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<Vec<u8>, LoadError>);

    impl MeshFetcher for Canned {
        async fn fetch(
            &self,
            _url: &str,
            progress: &mut dyn FnMut(LoadProgress),
        ) -> Result<Vec<u8>, LoadError> {
            let bytes = self.0.clone()?;
            progress(LoadProgress {
                loaded: bytes.len() as u64,
                total: Some(bytes.len() as u64),
            });
            Ok(bytes)
        }
    }

    #[test]
    fn test_progress_ratio() {
        let half = LoadProgress {
            loaded: 50,
            total: Some(100),
        };
        assert_eq!(half.ratio(), Some(0.5));
        let unknown = LoadProgress {
            loaded: 50,
            total: None,
        };
        assert_eq!(unknown.ratio(), None);
    }

    #[test]
    fn test_success_emits_progress_then_success() {
        let fetcher = Canned(Ok(stl::write_binary_stl(&Mesh::cube(1.0))));
        let mut events = Vec::new();
        let result = pollster::block_on(fetch_mesh(&fetcher, "cube.stl", &CancelToken::new(), |e| {
            events.push(e.clone())
        }));

        assert_eq!(result.unwrap().triangles.len(), 12);
        assert!(matches!(events[0], LoadEvent::Progress(_)));
        assert!(matches!(events.last(), Some(LoadEvent::Success(_))));
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let fetcher = Canned(Ok(b"not an stl".to_vec()));
        let mut last = None;
        let result = pollster::block_on(fetch_mesh(&fetcher, "bad.stl", &CancelToken::new(), |e| {
            last = Some(e.clone())
        }));

        assert!(matches!(result, Err(LoadError::Decode(_))));
        assert!(matches!(last, Some(LoadEvent::Failure(LoadError::Decode(_)))));
    }

    #[test]
    fn test_cancelled_load_yields_no_mesh() {
        let fetcher = Canned(Ok(stl::write_binary_stl(&Mesh::cube(1.0))));
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = pollster::block_on(fetch_mesh(&fetcher, "cube.stl", &cancel, |_| {}));
        assert_eq!(result, Err(LoadError::Cancelled));
    }
}
