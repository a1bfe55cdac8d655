//! Analyzer index client.
//!
//! Index maintenance requests go to whichever analyzer instance declared
//! the highest-priority exchange on the broker. Exchange discovery runs per
//! call; analyzers come and go and the jobs are infrequent enough that
//! caching is not worth the staleness.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, warn};

use super::{ClientError, broker::BrokerClient};
use crate::models::{CleanIndexByDateRangeRq, CleanIndexRq};

const CLEAN_ROUTE: &str = "clean";
const DELETE_ROUTE: &str = "delete";
const REMOVE_BY_LOG_TIME_ROUTE: &str = "remove_by_log_time";
const REMOVE_BY_LAUNCH_START_TIME_ROUTE: &str = "remove_by_launch_start_time";
const REMOVE_SUGGEST_ROUTE: &str = "suggest_info_remove";

#[async_trait]
pub trait IndexClient: Send + Sync {
    /// Remove the given documents from the project's index. Returns the
    /// number of documents handed to the analyzer.
    async fn clean_index(&self, project_id: i64, ids: &[i64]) -> Result<u64, ClientError>;

    /// Remove indexed documents whose log time predates the cutoff.
    async fn remove_from_index_less_than_log_date(
        &self,
        project_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<(), ClientError>;

    /// Remove indexed documents whose launch started before the cutoff.
    async fn remove_from_index_less_than_launch_date(
        &self,
        project_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<(), ClientError>;

    /// Drop the project's index entirely.
    async fn delete_index(&self, project_id: i64) -> Result<(), ClientError>;

    /// Drop the project's suggestion index.
    async fn remove_suggest(&self, project_id: i64) -> Result<(), ClientError>;
}

/// Broker-backed [`IndexClient`].
pub struct AnalyzerIndexClient {
    broker: Arc<BrokerClient>,
}

impl AnalyzerIndexClient {
    pub fn new(broker: Arc<BrokerClient>) -> Self {
        Self { broker }
    }

    /// Publish to the highest-priority analyzer exchange.
    async fn send(&self, route: &str, payload: serde_json::Value) -> Result<bool, ClientError> {
        let exchanges = self.broker.analyzer_exchanges().await?;
        // analyzer_exchanges never returns an empty list
        let target = &exchanges[0];
        let routed = self.broker.publish(&target.name, route, &payload).await?;
        if !routed {
            warn!(
                exchange = %target.name,
                route,
                "Analyzer request was not routed to any queue"
            );
        }
        Ok(routed)
    }
}

#[async_trait]
impl IndexClient for AnalyzerIndexClient {
    async fn clean_index(&self, project_id: i64, ids: &[i64]) -> Result<u64, ClientError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let rq = CleanIndexRq {
            project_id,
            log_ids: ids.to_vec(),
        };
        let routed = self.send(CLEAN_ROUTE, serde_json::to_value(&rq)?).await?;
        debug!(project_id, count = ids.len(), routed, "Index clean requested");
        Ok(if routed { ids.len() as u64 } else { 0 })
    }

    async fn remove_from_index_less_than_log_date(
        &self,
        project_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let rq = CleanIndexByDateRangeRq::up_to(project_id, cutoff);
        self.send(REMOVE_BY_LOG_TIME_ROUTE, serde_json::to_value(&rq)?).await?;
        Ok(())
    }

    async fn remove_from_index_less_than_launch_date(
        &self,
        project_id: i64,
        cutoff: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let rq = CleanIndexByDateRangeRq::up_to(project_id, cutoff);
        self.send(REMOVE_BY_LAUNCH_START_TIME_ROUTE, serde_json::to_value(&rq)?)
            .await?;
        Ok(())
    }

    async fn delete_index(&self, project_id: i64) -> Result<(), ClientError> {
        self.send(DELETE_ROUTE, json!(project_id)).await?;
        Ok(())
    }

    async fn remove_suggest(&self, project_id: i64) -> Result<(), ClientError> {
        self.send(REMOVE_SUGGEST_ROUTE, json!(project_id)).await?;
        Ok(())
    }
}
