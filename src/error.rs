use thiserror::Error;

/// Failures at the transport boundary. Each one is scoped to the single
/// request that produced it.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("timed out fetching {url}")]
    Timeout { url: String },

    #[error("unexpected search response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not extract text from PDF: {0}")]
    Pdf(String),
}

impl FetchError {
    pub fn http(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            return Self::Timeout { url: url.to_string() };
        }
        match source.status() {
            Some(status) => Self::Status {
                url: url.to_string(),
                status: status.as_u16(),
            },
            None => Self::Http {
                url: url.to_string(),
                source,
            },
        }
    }
}
