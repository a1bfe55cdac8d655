//! Thin clients for the secondary stores: the analyzer index (via the
//! message broker), the search engine, and blob storage.

pub mod blob;
pub mod broker;
pub mod index;
pub mod search;

pub use blob::{BlobError, BlobStore, ObjectStoreBlobStore, decode_blob_ref};
pub use broker::{BrokerClient, ExchangeInfo};
pub use index::{AnalyzerIndexClient, IndexClient};
pub use search::{HttpSearchEngineClient, NoopSearchEngineClient, SearchEngineClient};

/// Errors from the HTTP-backed clients.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {context}")]
    Status { context: String, status: u16 },

    #[error("No analyzer exchange found in vhost {0}")]
    NoAnalyzerExchange(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
