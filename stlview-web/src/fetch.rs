//! Model loading over the browser `fetch` API

use stlview_core::{LoadError, LoadProgress, MeshFetcher};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

fn fetch_error(value: JsValue) -> LoadError {
    LoadError::Fetch(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}

/// Byte count from a `Content-Length` header value
pub fn parse_content_length(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.trim().parse().ok())
}

/// Fetches models relative to the current document
#[derive(Debug, Default)]
pub struct HttpFetcher;

impl MeshFetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(LoadProgress),
    ) -> Result<Vec<u8>, LoadError> {
        let window = web_sys::window().ok_or_else(|| LoadError::Fetch("No window".into()))?;
        let response: Response = JsFuture::from(window.fetch_with_str(url))
            .await
            .map_err(fetch_error)?
            .dyn_into()
            .map_err(fetch_error)?;

        if !response.ok() {
            return Err(LoadError::Fetch(format!(
                "HTTP {} {} for {}",
                response.status(),
                response.status_text(),
                url
            )));
        }

        let total = parse_content_length(response.headers().get("content-length").ok().flatten());
        progress(LoadProgress { loaded: 0, total });

        let buffer = JsFuture::from(response.array_buffer().map_err(fetch_error)?)
            .await
            .map_err(fetch_error)?;
        let bytes = js_sys::Uint8Array::new(&buffer).to_vec();

        let loaded = bytes.len() as u64;
        progress(LoadProgress {
            loaded,
            total: total.or(Some(loaded)),
        });
        Ok(bytes)
    }
}
