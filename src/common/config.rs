use anyhow::{Context, Result};
use directories::ProjectDirs;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One configured key/value pair (extra form field or extra header).
/// Pairs with a blank key are kept in the file but skipped at run time.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Endpoint paths relative to the configured origin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointPaths {
    pub single_upload: String,
    pub chunk_upload: String,
    pub merge_chunks: String,
}

impl Default for EndpointPaths {
    fn default() -> Self {
        Self {
            single_upload: "/upload".to_string(),
            chunk_upload: "/upload-chunk".to_string(),
            merge_chunks: "/merge-chunks".to_string(),
        }
    }
}

/// Template body for the correlation-id issuance request.
/// `dir_name` and `ext` are filled in from the chunk file per run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CorrelationBody {
    pub language: String,
    pub target_language: Vec<String>,
    pub dir_name: String,
    pub ext: String,
}

impl Default for CorrelationBody {
    fn default() -> Self {
        Self {
            language: "KO".to_string(),
            target_language: vec!["EN".to_string(), "JP".to_string()],
            dir_name: String::new(),
            ext: String::new(),
        }
    }
}

/// Immutable per-run configuration.
///
/// Loaded once at startup (defaults -> TOML file -> `UPBENCH_*` env vars) and
/// only read afterwards. Optional fields are real `Option`s, never
/// empty-string sentinels.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub api_origin: String,
    /// How many independent repetitions of each strategy to run.
    pub repetitions: u32,
    /// Concurrent chunk workers within one chunked repetition.
    pub parallelism: usize,
    pub chunk_size_mib: u64,
    pub bearer_token: Option<String>,
    /// Issuance endpoint path; unset means no correlation ids are requested.
    pub correlation_path: Option<String>,
    pub correlation_body: CorrelationBody,
    pub paths: EndpointPaths,
    pub extra_fields: Vec<KeyValue>,
    pub extra_headers: Vec<KeyValue>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            api_origin: "http://localhost:3000".to_string(),
            repetitions: 1,
            parallelism: 4,
            chunk_size_mib: 10,
            bearer_token: None,
            correlation_path: None,
            correlation_body: CorrelationBody::default(),
            paths: EndpointPaths::default(),
            extra_fields: Vec::new(),
            extra_headers: Vec::new(),
        }
    }
}

impl RunConfig {
    /// Load from defaults, then `config.toml` in the platform config dir,
    /// then `UPBENCH_*` environment variables.
    pub fn load() -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = Self::config_path() {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("UPBENCH_").split("__"))
            .extract()
            .context("invalid configuration")
    }

    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "upbench").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    pub fn chunk_size_bytes(&self) -> u64 {
        self.chunk_size_mib * 1024 * 1024
    }

    /// Full URL for a configured path, tolerating a trailing slash on the origin.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_origin.trim_end_matches('/'), path)
    }

    /// Bearer token, with a blank value treated as absent.
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Issuance path, with a blank value treated as absent.
    pub fn correlation_path(&self) -> Option<&str> {
        self.correlation_path.as_deref().filter(|p| !p.is_empty())
    }

    /// Extra form fields with a non-blank key.
    pub fn active_fields(&self) -> impl Iterator<Item = &KeyValue> {
        self.extra_fields.iter().filter(|f| !f.key.is_empty())
    }

    /// Extra headers with a non-blank key. `Authorization` is always dropped
    /// here; the bearer-token header owns that name.
    pub fn active_headers(&self) -> impl Iterator<Item = &KeyValue> {
        self.extra_headers
            .iter()
            .filter(|h| !h.key.is_empty() && !h.key.eq_ignore_ascii_case("authorization"))
    }
}
