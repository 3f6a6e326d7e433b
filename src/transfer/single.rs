use crate::common::{RunConfig, UploadError};
use crate::transfer::request_headers;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio_util::io::ReaderStream;

/// Whole-file, non-chunked upload path. The file is streamed, not buffered,
/// so large payloads don't balloon memory.
pub struct SingleShotUploader {
    client: reqwest::Client,
    config: RunConfig,
    url: String,
}

impl SingleShotUploader {
    pub fn new(client: reqwest::Client, config: RunConfig) -> Self {
        let url = config.endpoint(&config.paths.single_upload);
        Self {
            client,
            config,
            url,
        }
    }

    /// One request carrying the whole file. Timed from request start to
    /// response receipt; returns the elapsed wall-clock time on success.
    pub async fn send(
        &self,
        path: &Path,
        correlation_id: Option<&str>,
    ) -> Result<Duration, UploadError> {
        let file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let body = Body::wrap_stream(ReaderStream::new(file));
        let mut form = Form::new().part(
            "file",
            Part::stream_with_length(body, size).file_name(filename),
        );
        for field in self.config.active_fields() {
            form = form.text(field.key.clone(), field.value.clone());
        }

        let started = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .headers(request_headers(&self.config, correlation_id))
            .multipart(form)
            .send()
            .await?;
        let elapsed = started.elapsed();

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::TransferRejected {
                status: status.as_u16(),
            });
        }
        Ok(elapsed)
    }
}
