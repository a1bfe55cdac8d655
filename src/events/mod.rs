//! Activity events and the message bus that publishes them.
//!
//! Cleanup jobs announce what they removed so the rest of the platform can
//! react (audit trail, notifications). Publishing is fire-and-forget: a
//! broker failure is logged and never rolls back the delete that triggered
//! the event.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    clients::BrokerClient,
    config::BrokerConfig,
    models::EmailNotificationRequest,
};

/// Events emitted by the cleanup jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    /// Expired user accounts were removed.
    UserDeleted { count: usize },
    /// Personal projects of expired users were removed.
    ProjectsDeleted { count: usize },
    /// Members of this shared project were removed with their accounts.
    UserUnassigned { project_id: i64 },
}

impl ActivityEvent {
    pub fn to_activity(&self) -> Activity {
        match self {
            Self::UserDeleted { count } => Activity {
                created_at: Utc::now(),
                action: "bulkDelete".into(),
                event_name: "bulkDeleteUser".into(),
                priority: "critical".into(),
                object_name: format!("{} {}", count, pluralize("user", *count)),
                object_type: "USER".into(),
                project_id: None,
                subject_name: "application".into(),
                subject_type: "APPLICATION".into(),
            },
            Self::ProjectsDeleted { count } => Activity {
                created_at: Utc::now(),
                action: "bulkDelete".into(),
                event_name: "bulkDeleteProject".into(),
                priority: "critical".into(),
                object_name: format!("{} personal {}", count, pluralize("project", *count)),
                object_type: "USER".into(),
                project_id: None,
                subject_name: "application".into(),
                subject_type: "APPLICATION".into(),
            },
            Self::UserUnassigned { project_id } => Activity {
                created_at: Utc::now(),
                action: "unassign".into(),
                event_name: "unassignUser".into(),
                priority: "medium".into(),
                object_name: "user".into(),
                object_type: "USER".into(),
                project_id: Some(*project_id),
                subject_name: "application".into(),
                subject_type: "APPLICATION".into(),
            },
        }
    }
}

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

/// Wire form of an activity event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub created_at: DateTime<Utc>,
    pub action: String,
    pub event_name: String,
    pub priority: String,
    pub object_name: String,
    pub object_type: String,
    pub project_id: Option<i64>,
    pub subject_name: String,
    pub subject_type: String,
}

impl Activity {
    /// Routing key: `activity.{project}.{object_type}.{event_name}`.
    /// Events without a project scope use the literal `null` segment.
    pub fn routing_key(&self) -> String {
        let project = self
            .project_id
            .map_or_else(|| "null".to_string(), |id| id.to_string());
        format!("activity.{}.{}.{}", project, self.object_type, self.event_name)
    }
}

#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish an activity event. Failures are logged and swallowed.
    async fn publish_activity(&self, event: ActivityEvent);

    /// Publish one email notification request per entry. Failures are
    /// logged and swallowed.
    async fn publish_email_notifications(&self, notifications: &[EmailNotificationRequest]);
}

/// [`MessageBus`] publishing through the broker's management API.
pub struct BrokerMessageBus {
    broker: Arc<BrokerClient>,
    activity_exchange: String,
    notification_exchange: String,
    email_routing_key: String,
}

impl BrokerMessageBus {
    pub fn new(broker: Arc<BrokerClient>, config: &BrokerConfig) -> Self {
        Self {
            broker,
            activity_exchange: config.activity_exchange.clone(),
            notification_exchange: config.notification_exchange.clone(),
            email_routing_key: config.email_routing_key.clone(),
        }
    }
}

#[async_trait]
impl MessageBus for BrokerMessageBus {
    async fn publish_activity(&self, event: ActivityEvent) {
        let activity = event.to_activity();
        let routing_key = activity.routing_key();
        let payload = match serde_json::to_value(&activity) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Failed to serialize activity event");
                return;
            }
        };
        if let Err(e) = self
            .broker
            .publish(&self.activity_exchange, &routing_key, &payload)
            .await
        {
            warn!(error = %e, routing_key, "Failed to publish activity event");
        }
    }

    async fn publish_email_notifications(&self, notifications: &[EmailNotificationRequest]) {
        for notification in notifications {
            let payload = match serde_json::to_value(notification) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize email notification");
                    continue;
                }
            };
            if let Err(e) = self
                .broker
                .publish(&self.notification_exchange, &self.email_routing_key, &payload)
                .await
            {
                warn!(
                    error = %e,
                    recipient = %notification.recipient,
                    "Failed to publish email notification"
                );
            }
        }
    }
}
