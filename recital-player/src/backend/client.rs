//! HTTP client for the synthesis backend
//!
//! Speaks the backend's small API: request a manifest for a block of text,
//! fetch numbered segments, and post export requests. Every call observes a
//! cancellation token so a superseded playback attempt stops promptly.

use crate::error::{Error, Result};
use recital_common::api::{ErrorBody, Manifest, SynthesisRequest};
use reqwest::header::CACHE_CONTROL;
use reqwest::StatusCode;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Client for the synthesis backend.
#[derive(Clone)]
pub struct SynthesisClient {
    http: reqwest::Client,
    base_url: String,
}

impl SynthesisClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// - `base_url`: Backend base URL, with or without trailing slash
    /// - `timeout`: Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Request synthesis of `text` and return the segment manifest.
    ///
    /// A manifest with zero segments is treated as a backend failure.
    pub async fn request_manifest(
        &self,
        text: &str,
        lang: &str,
        cancel: &CancellationToken,
    ) -> Result<Manifest> {
        let url = format!("{}/api/manifest", self.base_url);
        debug!("Requesting manifest from {} (lang={})", url, lang);

        let request = self.http.post(&url).json(&SynthesisRequest {
            text: text.to_string(),
            lang: lang.to_string(),
        });

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = request.send() => {
                result.map_err(|e| Error::Network(format!("Manifest request failed: {}", e)))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Manifest(Self::extract_error(status, response).await));
        }

        let manifest: Manifest = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = response.json() => {
                result.map_err(|e| Error::Manifest(format!("Invalid manifest body: {}", e)))?
            }
        };

        if manifest.count == 0 {
            return Err(Error::Manifest(
                "Backend produced no audio segments".to_string(),
            ));
        }

        info!(
            "Manifest received: session={}, {} segments",
            manifest.session, manifest.count
        );
        Ok(manifest)
    }

    /// Fetch one segment's encoded bytes.
    ///
    /// Sent with `Cache-Control: no-cache` so an intermediary never serves
    /// a stale body for a reused session id.
    pub async fn fetch_segment(
        &self,
        session: &str,
        index: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/api/chunk/{}/{}", self.base_url, session, index);
        debug!("Fetching segment {} from {}", index, url);

        let request = self.http.get(&url).header(CACHE_CONTROL, "no-cache");

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = request.send() => {
                result.map_err(|e| Error::Network(format!("Segment {} request failed: {}", index, e)))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("Segment {} fetch returned HTTP {}", index, status);
            return Err(Error::SegmentFetch {
                index,
                status: status.as_u16(),
            });
        }

        let bytes = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            result = response.bytes() => {
                result.map_err(|e| Error::Network(format!("Segment {} body read failed: {}", index, e)))?
            }
        };

        debug!("Segment {} fetched: {} bytes", index, bytes.len());
        Ok(bytes.to_vec())
    }

    /// Ask the backend to render `text` as a downloadable file.
    ///
    /// The backend stores the result for later pickup; the response body is
    /// not consumed here.
    pub async fn request_export(&self, text: &str, lang: &str) -> Result<()> {
        let url = format!("{}/api/export", self.base_url);
        debug!("Requesting export from {}", url);

        let response = self
            .http
            .post(&url)
            .json(&SynthesisRequest {
                text: text.to_string(),
                lang: lang.to_string(),
            })
            .send()
            .await
            .map_err(|e| Error::Network(format!("Export request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Manifest(Self::extract_error(status, response).await));
        }

        info!("Export accepted by backend");
        Ok(())
    }

    /// Pull the most useful error message out of a failure response.
    ///
    /// Prefers the backend's `{"error": ...}` JSON body, then any plain
    /// text body, then the bare status code.
    async fn extract_error(status: StatusCode, response: reqwest::Response) -> String {
        match response.text().await {
            Ok(body) if !body.is_empty() => {
                match serde_json::from_str::<ErrorBody>(&body) {
                    Ok(parsed) => parsed.error,
                    Err(_) => format!("HTTP {}: {}", status.as_u16(), body.trim()),
                }
            }
            _ => format!("HTTP {}", status.as_u16()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_slash_trimmed() {
        let client =
            SynthesisClient::new("http://localhost:5000/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000");
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let client =
            SynthesisClient::new("http://127.0.0.1:1", Duration::from_secs(5)).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = client.request_manifest("hola", "es", &cancel).await;
        assert!(matches!(result, Err(Error::Cancelled)));
    }
}
