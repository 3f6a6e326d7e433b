pub mod config;
pub mod errors;

pub use config::RunConfig;
pub use errors::UploadError;
