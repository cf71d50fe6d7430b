//! Completion reporting to the control plane.
//!
//! Reporting is best-effort by design: by the time it runs the training
//! outcome already exists, so a reporting failure must never turn a
//! successful run into a failed one. The orchestrator logs and moves on.

use anyhow::{Context, Result};
use serde::Serialize;

/// Payload sent to the control plane when a run finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrainedPayload {
    pub deployment_uid: String,
    /// Whether the serving model should be updated (false when the eval
    /// gate stopped the upload).
    pub update_model: bool,
    /// Whether an API deployment follows this training run.
    pub with_api_deploy: bool,
}

/// Control-plane notification seam.
pub trait StatusReporter {
    fn report_trained(
        &self,
        payload: &TrainedPayload,
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// HTTP client for the core API.
pub struct CoreApiClient {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
}

const CORE_API_TOKEN_HEADER: &str = "Core-Api-Token";

impl CoreApiClient {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    /// PUT a JSON body to `route`, treating any non-2xx response as an
    /// error.
    async fn put_json<T: Serialize + ?Sized>(&self, route: &str, body: &T) -> Result<()> {
        let url = format!("{}{}", self.base_url, route);
        let response = self
            .http
            .put(&url)
            .header(CORE_API_TOKEN_HEADER, &self.api_token)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Request to core API at {url} failed"))?;

        response
            .error_for_status()
            .with_context(|| format!("Core API rejected the request to {route}"))?;
        Ok(())
    }
}

impl StatusReporter for CoreApiClient {
    async fn report_trained(&self, payload: &TrainedPayload) -> Result<()> {
        self.put_json("/deployment/trained", payload).await
    }
}
