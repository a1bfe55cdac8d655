//! RabbitMQ management API client.
//!
//! The daemon is a low-volume publisher, so it talks to the broker's HTTP
//! management API instead of holding an AMQP connection. The same API also
//! serves exchange discovery for analyzer routing and message polling for
//! the log-ingestion worker.

use serde::Deserialize;
use serde_json::{Map, Value, json};

use super::ClientError;
use crate::config::BrokerConfig;

/// An exchange as reported by `GET /api/exchanges/{vhost}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfo {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ExchangeInfo {
    /// Whether this exchange is declared by an analyzer instance.
    pub fn is_analyzer(&self) -> bool {
        self.arguments.contains_key("analyzer")
    }

    /// Routing priority declared by the analyzer; lower wins. Missing or
    /// non-numeric values sort last.
    pub fn analyzer_priority(&self) -> i64 {
        match self.arguments.get("analyzer_priority") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(i64::MAX),
            Some(Value::String(s)) => s.parse().unwrap_or(i64::MAX),
            _ => i64::MAX,
        }
    }
}

/// A message polled from a queue via `POST /api/queues/{vhost}/{queue}/get`.
#[derive(Debug, Clone, Deserialize)]
pub struct PolledMessage {
    pub payload: String,
    #[serde(default)]
    pub routing_key: String,
}

pub struct BrokerClient {
    http: reqwest::Client,
    base_url: String,
    vhost: String,
    username: String,
    password: String,
}

impl BrokerClient {
    pub fn new(config: &BrokerConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: config.management_url.trim_end_matches('/').to_string(),
            vhost: config.vhost.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn vhost(&self) -> &str {
        &self.vhost
    }

    /// List all exchanges in the configured vhost.
    pub async fn list_exchanges(&self) -> Result<Vec<ExchangeInfo>, ClientError> {
        let url = format!("{}/api/exchanges/{}", self.base_url, self.encoded_vhost());
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                context: url,
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    /// Analyzer exchanges, ordered by priority (lowest number first).
    pub async fn analyzer_exchanges(&self) -> Result<Vec<ExchangeInfo>, ClientError> {
        let mut exchanges: Vec<ExchangeInfo> = self
            .list_exchanges()
            .await?
            .into_iter()
            .filter(ExchangeInfo::is_analyzer)
            .collect();
        if exchanges.is_empty() {
            return Err(ClientError::NoAnalyzerExchange(self.vhost.clone()));
        }
        exchanges.sort_by_key(ExchangeInfo::analyzer_priority);
        Ok(exchanges)
    }

    /// Publish a JSON payload to an exchange. Returns whether the broker
    /// routed the message to at least one queue.
    pub async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        payload: &Value,
    ) -> Result<bool, ClientError> {
        let url = format!(
            "{}/api/exchanges/{}/{}/publish",
            self.base_url,
            self.encoded_vhost(),
            exchange
        );
        let body = json!({
            "properties": { "content_type": "application/json" },
            "routing_key": routing_key,
            "payload": serde_json::to_string(payload)?,
            "payload_encoding": "string",
        });

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                context: url,
                status: response.status().as_u16(),
            });
        }

        #[derive(Deserialize)]
        struct PublishResponse {
            routed: bool,
        }
        let publish: PublishResponse = response.json().await?;
        Ok(publish.routed)
    }

    /// Pull up to `count` messages from a queue, acknowledging them.
    pub async fn get_messages(
        &self,
        queue: &str,
        count: u32,
    ) -> Result<Vec<PolledMessage>, ClientError> {
        let url = format!(
            "{}/api/queues/{}/{}/get",
            self.base_url,
            self.encoded_vhost(),
            queue
        );
        let body = json!({
            "count": count,
            "ackmode": "ack_requeue_false",
            "encoding": "auto",
        });

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status {
                context: url,
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    fn encoded_vhost(&self) -> String {
        // "/" is the only character needing escaping in practical vhost names
        self.vhost.replace('/', "%2F")
    }
}
