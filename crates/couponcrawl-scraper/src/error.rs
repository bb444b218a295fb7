use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("anti-bot challenge page served at {url}")]
    Challenge { url: String },

    #[error("HTTP client construction failed: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid selector \"{css}\" in strategy \"{strategy}\"")]
    InvalidSelector { strategy: String, css: String },

    #[error("invalid seed URL \"{url}\": {reason}")]
    Seed { url: String, reason: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("sink rejected record for {url}: {source}")]
    Sink {
        url: String,
        #[source]
        source: couponcrawl_core::SinkError,
    },
}
