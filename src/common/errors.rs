use thiserror::Error;

/// Structured error types for everything that can go wrong during a run.
///
/// Correlation-id issuance failure is deliberately NOT a variant: it is soft,
/// logged as a warning, and the run proceeds without an id.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    #[error("chunk index {index} out of range (total chunks: {total})")]
    IndexOutOfRange { index: u32, total: u32 },

    /// A chunk or single-shot request came back non-2xx.
    #[error("upload rejected with status {status}")]
    TransferRejected { status: u16 },

    /// Every chunk landed but the server refused to assemble them.
    #[error("merge rejected with status {status}")]
    MergeRejected { status: u16 },

    /// Transport-level failure (refused, reset, DNS). Treated the same as a
    /// rejected transfer for abort purposes.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
