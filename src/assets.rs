//! Page Assets
//!
//! Serves the single page at `/`. A file on disk wins over the page compiled
//! into the binary, so the page can be edited without rebuilding.

use std::path::PathBuf;
use std::time::SystemTime;

use axum::http::header::{CONTENT_TYPE, IF_MODIFIED_SINCE, LAST_MODIFIED};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::{debug, info};

use crate::config::AssetConfig;
use crate::error::RelayError;

/// Page compiled into the binary
pub const EMBEDDED_PAGE: &[u8] = include_bytes!("../assets/toolshop.html");

const HTML: &str = "text/html; charset=utf-8";

/// Where a served page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    Override,
    Embedded,
}

/// Page bytes plus what cache validation needs
#[derive(Debug, Clone)]
pub struct Asset {
    pub bytes: Bytes,
    pub modified: Option<SystemTime>,
    pub origin: AssetOrigin,
}

impl Asset {
    /// Render as a response, answering `304` when the client copy is current
    pub fn into_response_for(self, request_headers: &HeaderMap) -> Response {
        let last_modified = self.modified.map(httpdate::fmt_http_date);

        if let (Some(modified), Some(since)) = (self.modified, if_modified_since(request_headers)) {
            // HTTP dates carry whole seconds only
            if httpdate::parse_http_date(&httpdate::fmt_http_date(modified)).is_ok_and(|m| m <= since) {
                let mut response = StatusCode::NOT_MODIFIED.into_response();
                if let Some(value) = last_modified.and_then(|v| HeaderValue::from_str(&v).ok()) {
                    response.headers_mut().insert(LAST_MODIFIED, value);
                }
                return response;
            }
        }

        let mut response = self.bytes.into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(HTML));
        if let Some(value) = last_modified.and_then(|v| HeaderValue::from_str(&v).ok()) {
            headers.insert(LAST_MODIFIED, value);
        }
        response
    }
}

fn if_modified_since(headers: &HeaderMap) -> Option<SystemTime> {
    let value = headers.get(IF_MODIFIED_SINCE)?.to_str().ok()?;
    httpdate::parse_http_date(value).ok()
}

/// Looks up the page for a request path
#[derive(Debug, Clone)]
pub struct AssetStore {
    override_path: Option<PathBuf>,
    fallback: &'static [u8],
}

impl AssetStore {
    pub fn new(override_path: Option<PathBuf>) -> Self {
        Self::with_fallback(override_path, EMBEDDED_PAGE)
    }

    pub fn with_fallback(override_path: Option<PathBuf>, fallback: &'static [u8]) -> Self {
        Self {
            override_path,
            fallback,
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self::new(config.override_path.clone())
    }

    /// The page for `path`, or `None` for anything but `/`
    pub async fn lookup(&self, path: &str) -> Result<Option<Asset>, RelayError> {
        if path != "/" {
            return Ok(None);
        }

        if let Some(path) = &self.override_path {
            match tokio::fs::metadata(path).await {
                Ok(metadata) if metadata.is_file() => {
                    info!("Serving external {}", path.display());
                    let bytes = tokio::fs::read(path).await.map_err(RelayError::Asset)?;
                    return Ok(Some(Asset {
                        bytes: Bytes::from(bytes),
                        modified: metadata.modified().ok(),
                        origin: AssetOrigin::Override,
                    }));
                }
                Ok(_) => debug!("{} is not a file, using embedded page", path.display()),
                Err(e) => debug!("No override page at {}: {}", path.display(), e),
            }
        }

        info!("Serving embedded page");
        Ok(Some(Asset {
            bytes: Bytes::from_static(self.fallback),
            modified: None,
            origin: AssetOrigin::Embedded,
        }))
    }
}
