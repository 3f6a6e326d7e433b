use crate::common::{RunConfig, UploadError};
use crate::transfer::plan::TransferPlan;
use crate::transfer::pool::ChunkTransfer;
use crate::transfer::{io, request_headers};
use async_trait::async_trait;
use indicatif::ProgressBar;
use reqwest::multipart::{Form, Part};
use std::fs::File;
use std::sync::Arc;

/// Sends one chunk per call as a multipart POST. One instance serves all
/// workers of a single repetition; it holds that repetition's plan,
/// correlation id, and shared read-only file handle.
pub struct ChunkUploader {
    client: reqwest::Client,
    config: RunConfig,
    file: Arc<File>,
    filename: String,
    plan: TransferPlan,
    correlation_id: Option<String>,
    url: String,
    progress: Option<ProgressBar>,
}

impl ChunkUploader {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        client: reqwest::Client,
        config: RunConfig,
        file: Arc<File>,
        filename: String,
        plan: TransferPlan,
        correlation_id: Option<String>,
        progress: Option<ProgressBar>,
    ) -> Self {
        let url = config.endpoint(&config.paths.chunk_upload);
        Self {
            client,
            config,
            file,
            filename,
            plan,
            correlation_id,
            url,
            progress,
        }
    }
}

#[async_trait]
impl ChunkTransfer for ChunkUploader {
    /// Read `[start, end)` of the source file and submit it with the
    /// configured fields and headers. Single attempt, no retries.
    async fn send(&self, index: u32) -> Result<(), UploadError> {
        let range = self.plan.range(index)?;
        let payload = io::read_range(&self.file, range).await?;

        let mut form = Form::new();
        for field in self.config.active_fields() {
            form = form.text(field.key.clone(), field.value.clone());
        }
        form = form.part(
            "file",
            Part::bytes(payload.to_vec()).file_name(self.filename.clone()),
        );

        let response = self
            .client
            .post(&self.url)
            .headers(request_headers(&self.config, self.correlation_id.as_deref()))
            .header("x-chunk-index", index)
            .header("x-chunk-total", self.plan.total_chunks)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::TransferRejected {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            chunk_index = index,
            bytes = range.len(),
            total_chunks = self.plan.total_chunks,
            "chunk uploaded"
        );
        if let Some(progress) = &self.progress {
            progress.inc(1);
        }
        Ok(())
    }
}
