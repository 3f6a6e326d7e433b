use crate::common::RunConfig;
use crate::transfer::request_headers;
use serde::{Deserialize, Serialize};

/// Request body sent to the issuance endpoint. The template comes from
/// config; `dir_name`/`ext` are derived from the chunk file per run.
#[derive(Clone, Debug, Serialize)]
pub struct IssueRequest {
    pub language: String,
    pub target_language: Vec<String>,
    pub dir_name: String,
    pub ext: String,
}

#[derive(Deserialize)]
struct IssueResponse {
    data: Option<IssueData>,
}

#[derive(Deserialize)]
struct IssueData {
    request_id: Option<String>,
}

/// Obtains an optional per-repetition correlation id before transfers begin.
///
/// Issuance is diagnostic, never load-bearing: any failure is logged as a
/// warning and the run proceeds without an id.
pub struct CorrelationIssuer {
    client: reqwest::Client,
    config: RunConfig,
}

impl CorrelationIssuer {
    pub fn new(client: reqwest::Client, config: RunConfig) -> Self {
        Self { client, config }
    }

    /// `None` without any network call when no issuance path is configured.
    pub async fn issue(&self, body: &IssueRequest, repetition: u32) -> Option<String> {
        let path = self.config.correlation_path()?;
        let url = self.config.endpoint(path);

        let response = match self
            .client
            .post(&url)
            .headers(request_headers(&self.config, None))
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(repetition, error = %err, "correlation id request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                repetition,
                status = response.status().as_u16(),
                "correlation id request rejected"
            );
            return None;
        }

        match response.json::<IssueResponse>().await {
            Ok(parsed) => {
                let id = parsed.data.and_then(|d| d.request_id);
                match &id {
                    Some(id) => tracing::info!(repetition, request_id = %id, "correlation id issued"),
                    None => tracing::warn!(repetition, "issuance response carried no request id"),
                }
                id
            }
            Err(err) => {
                tracing::warn!(repetition, error = %err, "malformed issuance response");
                None
            }
        }
    }
}

impl IssueRequest {
    /// Fill the configured template with the chunk file's name parts.
    pub fn from_config(config: &RunConfig, dir_name: &str, ext: &str) -> Self {
        Self {
            language: config.correlation_body.language.clone(),
            target_language: config.correlation_body.target_language.clone(),
            dir_name: dir_name.to_string(),
            ext: ext.to_string(),
        }
    }
}
