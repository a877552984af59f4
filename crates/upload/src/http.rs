//! reqwest implementation of [`StorageApi`].
//!
//! Destination, finalize and status calls carry the API key in the
//! `Authorization` header. Part PUTs go straight to the pre-signed URL with
//! no extra headers besides `Content-Length`.

use bytes::Bytes;
use futures_util::StreamExt;
use mediadrop_protocol::{
    DEFAULT_PIPELINE, FinalizeRequest, PROCESS_PATH, ProcessingTask, STAGING_PATH, STATUS_PATH,
    StatusReport, StatusRequest, UploadDestination, endpoint,
};
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, HeaderMap, HeaderValue};
use reqwest::{Body, Response};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{ApiFuture, PartProgressFn, PartUpload, StorageApi};
use crate::error::ApiError;

/// Size of the slices a part body is streamed in.
const STREAM_SLICE: usize = 64 * 1024;

/// Endpoints and credentials of the media API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub api_key: String,
    pub staging_url: String,
    pub process_url: String,
    pub status_url: String,
    /// Processing pipeline requested on finalize.
    pub pipeline: String,
}

impl ApiConfig {
    /// Config with the standard paths under `base`.
    pub fn new(base: &str, api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            staging_url: endpoint(base, STAGING_PATH),
            process_url: endpoint(base, PROCESS_PATH),
            status_url: endpoint(base, STATUS_PATH),
            pipeline: DEFAULT_PIPELINE.to_string(),
        }
    }
}

/// Talks to the media API and the storage bucket over HTTP.
pub struct HttpStorageApi {
    api: reqwest::Client,
    parts: reqwest::Client,
    config: ApiConfig,
}

impl HttpStorageApi {
    /// Builds both HTTP clients. Fails if the key is not a valid header value.
    pub fn new(config: ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&config.api_key).map_err(|_| ApiError::InvalidKey)?,
        );

        let api = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;
        let parts = reqwest::Client::builder().build()?;

        Ok(Self { api, parts, config })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn put_part(
        &self,
        part: PartUpload,
        on_progress: PartProgressFn,
        cancel: CancellationToken,
    ) -> Result<(), ApiError> {
        if cancel.is_cancelled() {
            return Err(ApiError::Canceled);
        }

        let total = part.body.len() as u64;
        let slices: Vec<Bytes> = (0..part.body.len())
            .step_by(STREAM_SLICE)
            .map(|start| {
                let end = (start + STREAM_SLICE).min(part.body.len());
                part.body.slice(start..end)
            })
            .collect();

        let stream_cancel = cancel.clone();
        let mut loaded = 0u64;
        let stream = futures_util::stream::iter(slices).map(move |slice| {
            if stream_cancel.is_cancelled() {
                return Err(std::io::Error::other("part upload canceled"));
            }
            loaded += slice.len() as u64;
            on_progress(loaded, total);
            Ok::<Bytes, std::io::Error>(slice)
        });

        debug!(part = part.number, bytes = total, "sending part");
        let request = self
            .parts
            .put(&part.url)
            .header(CONTENT_LENGTH, total)
            .body(Body::wrap_stream(stream))
            .send();

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ApiError::Canceled),
            resp = request => resp,
        };
        let resp = match resp {
            Ok(resp) => resp,
            Err(_) if cancel.is_cancelled() => return Err(ApiError::Canceled),
            Err(e) => return Err(e.into()),
        };

        check_status(resp).await?;
        Ok(())
    }
}

/// Maps non-2xx responses to [`ApiError::Status`].
async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

impl StorageApi for HttpStorageApi {
    fn request_destination(&self) -> ApiFuture<'_, UploadDestination> {
        Box::pin(async move {
            let resp = self.api.post(&self.config.staging_url).send().await?;
            let body = check_status(resp).await?.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        })
    }

    fn upload_part(
        &self,
        part: PartUpload,
        on_progress: PartProgressFn,
        cancel: CancellationToken,
    ) -> ApiFuture<'_, ()> {
        Box::pin(self.put_part(part, on_progress, cancel))
    }

    fn finalize(&self, key: String) -> ApiFuture<'_, ProcessingTask> {
        Box::pin(async move {
            let form = FinalizeRequest {
                key,
                pipeline: self.config.pipeline.clone(),
            };
            let resp = self
                .api
                .post(&self.config.process_url)
                .form(&form)
                .send()
                .await?;
            let body = check_status(resp).await?.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        })
    }

    fn poll_status(&self, task_id: String) -> ApiFuture<'_, StatusReport> {
        Box::pin(async move {
            let form = StatusRequest { task_id };
            let resp = self
                .api
                .post(&self.config.status_url)
                .form(&form)
                .send()
                .await?;
            let body = check_status(resp).await?.text().await?;
            Ok(StatusReport { body })
        })
    }
}
