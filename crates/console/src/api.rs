//! HTTP calls to the execution and generation endpoints

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared::{GenerateRequest, GenerateResult, RunRequest, RunResult};

use crate::endpoints::Endpoints;

/// The request never produced a usable response body
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: Endpoints,
}

impl ApiClient {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoints,
        }
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunResult, ApiError> {
        self.post(&self.endpoints.run, request).await
    }

    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResult, ApiError> {
        self.post(&self.endpoints.generate, request).await
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// The status code is not checked: the backend puts its error payload in
    /// the body for non-2xx replies too.
    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let resp = self.http.post(url).json(body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            tracing::debug!("{} returned {}", url, status);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
