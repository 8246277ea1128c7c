// src/error.rs

use thiserror::Error;

/// A normalizer could not turn a raw cell into the expected scalar.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot parse {field} from {value:?}")]
pub struct UnparseableValue {
    pub field: &'static str,
    pub value: String,
}

impl UnparseableValue {
    pub fn new(field: &'static str, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }
}

/// Failures of the reconcile → merge core.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A reconciled table lacks one of the canonical columns.
    #[error("table {table} is missing column(s) {missing:?} (columns: {columns:?})")]
    SchemaShape {
        table: String,
        missing: Vec<&'static str>,
        columns: Vec<String>,
    },

    /// Only raised under the strict error policy.
    #[error(transparent)]
    Unparseable(#[from] UnparseableValue),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("building HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
