use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// Every way a report run can fail. The CLI is the single boundary that
/// turns one of these into a logged message and a non-zero exit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("output file {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("API token is not a valid header value")]
    InvalidToken,

    #[error("failed to build HTTP client")]
    BuildClient(#[source] reqwest::Error),

    #[error("unexpected HTTP response status {status} from {url}")]
    UnexpectedStatus {
        status: reqwest::StatusCode,
        url: String,
    },

    #[error("rate limited on {url}; gave up after {attempts} attempts")]
    RetriesExhausted { attempts: usize, url: String },

    #[error("request to {url} failed")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no scan detail fetched for result id {0}")]
    MissingDetail(String),

    #[error("failed to write CSV report")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
