//! Search engine client for raw log documents.
//!
//! Logs live in one index per project (`logs-reportportal-{project_id}`)
//! on an Elasticsearch-compatible endpoint. When no endpoint is configured
//! the no-op client stands in and the daemon runs without search indexing.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::ClientError;
use crate::{config::SearchConfig, models::LogMessage};

#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Bulk-index the given log messages.
    async fn save(&self, logs: &[LogMessage]) -> Result<(), ClientError>;

    /// Delete every indexed log of the launch from the project's index.
    ///
    /// Errors are swallowed after logging: the index may simply not exist
    /// yet for this project, and the primary delete must not fail over it.
    async fn delete_logs_by_launch_and_project(&self, launch_id: i64, project_id: i64);
}

pub struct HttpSearchEngineClient {
    http: reqwest::Client,
    host: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpSearchEngineClient {
    /// Build a client for the configured endpoint; `None` when no endpoint
    /// is set.
    pub fn from_config(config: &SearchConfig) -> Result<Option<Self>, ClientError> {
        let Some(endpoint) = &config.endpoint else {
            return Ok(None);
        };
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Some(Self {
            http,
            host: endpoint.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        }))
    }

    fn index_name(project_id: i64) -> String {
        format!("logs-reportportal-{project_id}")
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => builder.basic_auth(user, Some(pass)),
            _ => builder,
        }
    }
}

#[async_trait]
impl SearchEngineClient for HttpSearchEngineClient {
    async fn save(&self, logs: &[LogMessage]) -> Result<(), ClientError> {
        if logs.is_empty() {
            return Ok(());
        }

        // One bulk body per project index.
        let mut bodies: HashMap<String, String> = HashMap::new();
        for log in logs {
            let doc = json!({
                "id": log.id,
                "message": log.log_message,
                "itemId": log.item_id,
                "@timestamp": log.log_time,
                "launchId": log.launch_id,
            });
            let entry = bodies.entry(Self::index_name(log.project_id)).or_default();
            entry.push_str("{\"create\":{ }}\n");
            entry.push_str(&serde_json::to_string(&doc)?);
            entry.push('\n');
        }

        for (index, body) in bodies {
            let url = format!("{}/{}/_bulk?refresh", self.host, index);
            let response = self
                .authed(self.http.put(&url))
                .header("content-type", "application/json")
                .body(body)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(ClientError::Status {
                    context: url,
                    status: response.status().as_u16(),
                });
            }
        }
        Ok(())
    }

    async fn delete_logs_by_launch_and_project(&self, launch_id: i64, project_id: i64) {
        let index = Self::index_name(project_id);
        let url = format!("{}/{}/_delete_by_query", self.host, index);
        let body = json!({ "query": { "match": { "launchId": launch_id } } });

        let result = self
            .authed(self.http.post(&url))
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status());
        if let Err(e) = result {
            // The index may not exist for this project; not worth failing
            // the cleanup run over.
            info!(index = %index, launch_id, error = %e, "Search engine delete failed");
        }
    }
}

/// Stand-in used when no search endpoint is configured.
pub struct NoopSearchEngineClient;

#[async_trait]
impl SearchEngineClient for NoopSearchEngineClient {
    async fn save(&self, logs: &[LogMessage]) -> Result<(), ClientError> {
        debug!(count = logs.len(), "Search engine disabled, dropping logs");
        Ok(())
    }

    async fn delete_logs_by_launch_and_project(&self, _launch_id: i64, _project_id: i64) {}
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_partial_json, method, path},
    };

    use super::*;

    fn client(server: &MockServer) -> HttpSearchEngineClient {
        HttpSearchEngineClient::from_config(&SearchConfig {
            endpoint: Some(server.uri()),
            username: None,
            password: None,
        })
        .unwrap()
        .unwrap()
    }

    fn log(id: i64, project_id: i64, launch_id: i64) -> LogMessage {
        LogMessage {
            id,
            project_id,
            launch_id: Some(launch_id),
            item_id: None,
            log_time: Utc::now(),
            log_message: format!("log {id}"),
        }
    }

    #[tokio::test]
    async fn save_bulks_per_project_index() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/logs-reportportal-1/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": false})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/logs-reportportal-2/_bulk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errors": false})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .save(&[log(1, 1, 10), log(2, 1, 10), log(3, 2, 20)])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn save_with_no_logs_is_a_no_op() {
        let server = MockServer::start().await;
        client(&server).save(&[]).await.unwrap();
    }

    #[tokio::test]
    async fn delete_by_launch_posts_match_query() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs-reportportal-7/_delete_by_query"))
            .and(body_partial_json(json!({"query": {"match": {"launchId": 42}}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deleted": 5})))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_logs_by_launch_and_project(42, 7).await;
    }

    #[tokio::test]
    async fn delete_errors_are_swallowed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/logs-reportportal-7/_delete_by_query"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        // Must not panic or propagate.
        client(&server).delete_logs_by_launch_and_project(42, 7).await;
    }

    #[test]
    fn unset_endpoint_yields_no_client() {
        let client = HttpSearchEngineClient::from_config(&SearchConfig::default()).unwrap();
        assert!(client.is_none());
    }
}
