use crate::common::{RunConfig, UploadError};
use crate::transfer::request_headers;
use serde_json::{json, Map, Value};

/// Asks the server to assemble previously uploaded chunks into the final
/// file. Called only after every chunk of a repetition succeeded.
pub struct MergeCoordinator {
    client: reqwest::Client,
    config: RunConfig,
    url: String,
}

impl MergeCoordinator {
    pub fn new(client: reqwest::Client, config: RunConfig) -> Self {
        let url = config.endpoint(&config.paths.merge_chunks);
        Self {
            client,
            config,
            url,
        }
    }

    pub async fn merge(
        &self,
        file_id: &str,
        filename: &str,
        total_chunks: u32,
        correlation_id: Option<&str>,
    ) -> Result<(), UploadError> {
        let mut body = Map::new();
        body.insert("fileId".to_string(), json!(file_id));
        body.insert("filename".to_string(), json!(filename));
        body.insert("totalChunks".to_string(), json!(total_chunks));
        for field in self.config.active_fields() {
            body.insert(field.key.clone(), json!(field.value));
        }

        let response = self
            .client
            .post(&self.url)
            .headers(request_headers(&self.config, correlation_id))
            .header("x-chunk-total", total_chunks)
            .json(&Value::Object(body))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::MergeRejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(file_id, total_chunks, "chunks merged");
        Ok(())
    }
}
