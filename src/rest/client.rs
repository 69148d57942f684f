//! Reqwest-backed job client.
//!
//! All job operations go through one noun under the public REST root and
//! authenticate with the session cookie obtained out of band. Each verb
//! has exactly one acceptable success status; anything else is surfaced
//! with the response body attached.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tracing::debug;
use uuid::Uuid;

use super::types::UploadJob;
use super::JobApi;
use crate::error::{CaravanError, Result};

/// Name of the authentication cookie the server expects
pub const AUTH_COOKIE_NAME: &str = ".ASPXAUTH";

const JOB_NOUN: &str = "sessionUpload";

/// Cookie-authenticated [`JobApi`] over the server's public REST root
#[derive(Debug, Clone)]
pub struct RestJobClient {
    client: reqwest::Client,
    base_url: String,
    auth_cookie: String,
}

impl RestJobClient {
    /// `base_url` is the REST root without a trailing slash, e.g.
    /// `https://host/Panopto/PublicAPI/REST`.
    pub fn new(client: reqwest::Client, base_url: String, auth_cookie: String) -> Self {
        RestJobClient {
            client,
            base_url,
            auth_cookie,
        }
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, JOB_NOUN)
    }

    fn resource_url(&self, id: Uuid) -> String {
        format!("{}/{}/{}", self.base_url, JOB_NOUN, id)
    }

    /// Send one request, insisting on `expected`; returns the body text
    async fn exchange(
        &self,
        method: Method,
        url: String,
        body: Option<&UploadJob>,
        expected: StatusCode,
    ) -> Result<String> {
        debug!(method = %method, url = %url, "job api request");
        let mut request = self.client.request(method, &url).header(
            reqwest::header::COOKIE,
            format!("{}={}", AUTH_COOKIE_NAME, self.auth_cookie),
        );
        if let Some(job) = body {
            request = request.json(job);
        }

        let response = request.send().await?;
        let actual = response.status();
        let text = response.text().await?;
        if actual != expected {
            return Err(CaravanError::UnexpectedStatus {
                expected: expected.as_u16(),
                actual: actual.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    async fn exchange_job(
        &self,
        method: Method,
        url: String,
        body: Option<&UploadJob>,
        expected: StatusCode,
    ) -> Result<UploadJob> {
        let text = self.exchange(method, url, body, expected).await?;
        serde_json::from_str(&text)
            .map_err(|e| CaravanError::InvalidJobResponse(format!("{e}: {text}")))
    }
}

#[async_trait]
impl JobApi for RestJobClient {
    async fn create(&self, folder_id: Uuid) -> Result<UploadJob> {
        let request = UploadJob::creation_request(folder_id);
        self.exchange_job(
            Method::POST,
            self.collection_url(),
            Some(&request),
            StatusCode::CREATED,
        )
        .await
    }

    async fn read(&self, id: Uuid) -> Result<UploadJob> {
        self.exchange_job(Method::GET, self.resource_url(id), None, StatusCode::OK)
            .await
    }

    async fn update(&self, job: &UploadJob) -> Result<UploadJob> {
        let id = job
            .id
            .ok_or_else(|| CaravanError::InvalidJobResponse("job has no id".to_string()))?;
        self.exchange_job(
            Method::PUT,
            self.resource_url(id),
            Some(job),
            StatusCode::OK,
        )
        .await
    }

    async fn delete(&self, id: Uuid) -> Result<UploadJob> {
        self.exchange_job(Method::DELETE, self.resource_url(id), None, StatusCode::OK)
            .await
    }
}
