use std::time::Duration;

use futures_util::StreamExt;
use miner_core::{DownloadDescriptor, JobHandle, MiningParams, StartResponse, StatusSnapshot};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::Url;

use crate::wire::{error_message, parse_history, parse_start_response, parse_status};
use crate::{ApiError, FailureKind, History};

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Timeout for history, selection, status and download requests.
    pub request_timeout: Duration,
    /// The start call returns only when mining finishes, so it gets its own bound.
    pub start_timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            start_timeout: Duration::from_secs(6 * 60 * 60),
            max_download_bytes: 256 * 1024 * 1024,
        }
    }
}

/// The remote mining service.
#[async_trait::async_trait]
pub trait MiningApi: Send + Sync {
    /// Starts mining and resolves when the job is done.
    async fn start(&self, job: &JobHandle, params: &MiningParams) -> Result<StartResponse, ApiError>;

    async fn poll(&self, job: &JobHandle) -> Result<StatusSnapshot, ApiError>;

    async fn fetch_history(&self) -> Result<History, ApiError>;

    async fn select_job(&self, job: &JobHandle) -> Result<(), ApiError>;

    async fn download(&self, descriptor: &DownloadDescriptor) -> Result<Vec<u8>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestMiningApi {
    settings: ClientSettings,
    base: Url,
    client: reqwest::Client,
}

impl ReqwestMiningApi {
    pub fn new(settings: ClientSettings) -> Result<Self, ApiError> {
        let base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::new(
                FailureKind::InvalidUrl,
                format!("{} cannot be used as a base url", settings.base_url),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            settings,
            base,
            client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::new(FailureKind::InvalidUrl, "base url has no path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Turns a download descriptor into the URL to fetch.
    pub fn download_url(&self, descriptor: &DownloadDescriptor) -> Result<Url, ApiError> {
        match descriptor {
            DownloadDescriptor::Explicit(reference) => Url::parse(reference)
                .or_else(|_| self.base.join(reference))
                .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string())),
            DownloadDescriptor::ForJob(job) => {
                self.endpoint(&["api", "mining", job.as_str(), "download"])
            }
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<bytes::Bytes, ApiError> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| status.to_string());
            return Err(ApiError::new(FailureKind::HttpStatus(status.as_u16()), message));
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl MiningApi for ReqwestMiningApi {
    async fn start(&self, job: &JobHandle, params: &MiningParams) -> Result<StartResponse, ApiError> {
        let url = self.endpoint(&["api", "mining", job.as_str(), "start"])?;
        let body = serde_json::to_vec(params)
            .map_err(|err| ApiError::new(FailureKind::MalformedPayload, err.to_string()))?;
        let request = self
            .client
            .post(url)
            .timeout(self.settings.start_timeout)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body);
        let reply = self.send(request).await?;
        Ok(parse_start_response(&reply))
    }

    async fn poll(&self, job: &JobHandle) -> Result<StatusSnapshot, ApiError> {
        let url = self.endpoint(&["api", "mining", job.as_str(), "status"])?;
        let reply = self
            .send(self.client.get(url).header(ACCEPT, "application/json"))
            .await?;
        parse_status(&reply)
    }

    async fn fetch_history(&self) -> Result<History, ApiError> {
        let url = self.endpoint(&["api", "history"])?;
        let reply = self
            .send(self.client.get(url).header(ACCEPT, "application/json"))
            .await?;
        parse_history(&reply)
    }

    async fn select_job(&self, job: &JobHandle) -> Result<(), ApiError> {
        let url = self.endpoint(&["api", "history", "select"])?;
        let body = serde_json::json!({ "job_id": job.as_str() }).to_string();
        self.send(
            self.client
                .post(url)
                .header(CONTENT_TYPE, "application/json")
                .body(body),
        )
        .await?;
        Ok(())
    }

    async fn download(&self, descriptor: &DownloadDescriptor) -> Result<Vec<u8>, ApiError> {
        let url = self.download_url(descriptor)?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let max_bytes = self.settings.max_download_bytes;
        if let Some(content_len) = response.content_length() {
            if content_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(content_len),
                    },
                    "result too large",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > max_bytes {
                return Err(ApiError::new(
                    FailureKind::TooLarge {
                        max_bytes,
                        actual: Some(next_len),
                    },
                    "result too large",
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        Ok(bytes)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, err.to_string());
    }
    ApiError::new(FailureKind::Network, err.to_string())
}
