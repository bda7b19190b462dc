//! reqwest-backed [`ScoreClient`] for the `/score_csv` endpoint.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use scorelens_core::config::ServiceConfig;
use scorelens_core::{PageQuery, PageResult, UploadFile};

use crate::client::{ProgressFn, ScoreClient};
use crate::error::ScoreError;
use crate::wire::{self, FieldNames};

const DEFAULT_CHUNK_BYTES: usize = 64 * 1024;

/// HTTP client for the remote scoring service.
pub struct HttpScoreClient {
    base_url: String,
    http: reqwest::Client,
    names: FieldNames,
    chunk_bytes: usize,
}

impl HttpScoreClient {
    /// Create a client with default field names and no request timeout.
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
            names: FieldNames::default(),
            chunk_bytes: DEFAULT_CHUNK_BYTES,
        }
    }

    /// Create a client from the service section of the config.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ScoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            names: FieldNames {
                score: config.score_field.clone(),
                prediction: config.prediction_field.clone(),
            },
            chunk_bytes: config.upload_chunk_bytes.max(1),
        })
    }

    pub fn with_chunk_bytes(mut self, chunk_bytes: usize) -> Self {
        self.chunk_bytes = chunk_bytes.max(1);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check that the service is up (`GET /health` → `{"status":"ok"}`).
    pub async fn health(&self) -> Result<(), ScoreError> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(3))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(wire::decode_error(status.as_u16(), &body).into());
        }

        let healthy = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(|s| s == "ok"))
            .unwrap_or(false);
        if healthy {
            Ok(())
        } else {
            Err(ScoreError::Network(format!("unexpected health response: {body}")))
        }
    }
}

#[async_trait]
impl ScoreClient for HttpScoreClient {
    async fn score_page(
        &self,
        file: &UploadFile,
        query: &PageQuery,
        progress: Option<ProgressFn>,
    ) -> Result<PageResult, ScoreError> {
        let url = format!("{}/score_csv", self.base_url);
        let body = progress_body(file.bytes.clone(), self.chunk_bytes, progress);
        let part = Part::stream_with_length(body, file.len()).file_name(file.name.clone());
        let form = Form::new().part("file", part);

        debug!(
            page = query.page,
            page_size = query.page_size.get(),
            percentile = query.percentile.get(),
            bytes = file.len(),
            "Scoring request to {}",
            url
        );

        let resp = self
            .http
            .post(&url)
            .query(&[
                ("page", query.page.to_string()),
                ("page_size", query.page_size.to_string()),
                ("percentile", query.percentile.to_string()),
            ])
            .multipart(form)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            let err = wire::decode_error(status.as_u16(), &text);
            warn!(%status, code = ?err.code(), "scoring service returned an error");
            return Err(err.into());
        }

        Ok(wire::decode_page(&text, query, &self.names)?)
    }
}

/// Wrap the file bytes in a chunked stream that reports how much of the body
/// has been handed to the transport.
fn progress_body(bytes: Bytes, chunk_bytes: usize, progress: Option<ProgressFn>) -> reqwest::Body {
    let total = bytes.len();
    if let Some(cb) = &progress {
        cb(if total == 0 { 100 } else { 0 });
    }

    let chunks: Vec<Bytes> = (0..total)
        .step_by(chunk_bytes.max(1))
        .map(|start| bytes.slice(start..(start + chunk_bytes).min(total)))
        .collect();

    let mut sent = 0usize;
    let stream = futures::stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        if let Some(cb) = &progress {
            cb(percent(sent, total));
        }
        Ok::<Bytes, std::io::Error>(chunk)
    });
    reqwest::Body::wrap_stream(stream)
}

fn percent(sent: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    ((sent as u128 * 100) / total as u128).min(100) as u8
}
