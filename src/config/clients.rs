//! Settings for the secondary stores: message broker, search engine, and
//! blob storage.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// RabbitMQ management API settings.
///
/// Analyzer index requests and activity events go out through exchanges on
/// this broker. The daemon talks to the HTTP management API rather than AMQP,
/// which also gives it exchange discovery for analyzer routing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BrokerConfig {
    /// Management API base URL, e.g. `http://rabbitmq:15672`.
    #[serde(default = "default_management_url")]
    pub management_url: String,

    /// Virtual host the analyzer exchanges live in.
    #[serde(default = "default_vhost")]
    pub vhost: String,

    #[serde(default = "default_broker_user")]
    pub username: String,

    #[serde(default = "default_broker_pass")]
    pub password: String,

    /// Exchange activity events are published to.
    #[serde(default = "default_activity_exchange")]
    pub activity_exchange: String,

    /// Exchange for outbound email notification requests.
    #[serde(default = "default_notification_exchange")]
    pub notification_exchange: String,

    /// Routing key for email notification requests.
    #[serde(default = "default_email_routing_key")]
    pub email_routing_key: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            management_url: default_management_url(),
            vhost: default_vhost(),
            username: default_broker_user(),
            password: default_broker_pass(),
            activity_exchange: default_activity_exchange(),
            notification_exchange: default_notification_exchange(),
            email_routing_key: default_email_routing_key(),
        }
    }
}

/// Search engine settings for raw log documents.
///
/// Leaving `endpoint` unset disables the search integration entirely; the
/// jobs then run against a no-op client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Base URL of the OpenSearch/Elasticsearch host, e.g.
    /// `http://opensearch:9200`. Unset disables search indexing.
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,
}

/// Blob storage backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    /// Local filesystem storage rooted at `path`.
    Local { path: String },

    /// S3-compatible object storage.
    S3 {
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        /// Custom endpoint for MinIO and other S3-compatible stores.
        #[serde(default)]
        endpoint: Option<String>,
        #[serde(default)]
        access_key: Option<String>,
        #[serde(default)]
        secret_key: Option<String>,
    },
}

impl StorageConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::Local { path } if path.is_empty() => {
                Err(ConfigError::Validation("storage.path must not be empty".into()))
            }
            Self::S3 { bucket, .. } if bucket.is_empty() => {
                Err(ConfigError::Validation("storage.bucket must not be empty".into()))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Local {
            path: "/data/storage".into(),
        }
    }
}

fn default_management_url() -> String {
    "http://localhost:15672".into()
}

fn default_vhost() -> String {
    "analyzer".into()
}

fn default_broker_user() -> String {
    "rabbitmq".into()
}

fn default_broker_pass() -> String {
    "rabbitmq".into()
}

fn default_activity_exchange() -> String {
    "activity".into()
}

fn default_notification_exchange() -> String {
    "notification".into()
}

fn default_email_routing_key() -> String {
    "email".into()
}
