//! Domain and wire types shared by the cleanup jobs and the secondary-store
//! clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single log entry on its way to the search engine.
///
/// Produced by the ingestion path and bulk-saved through the
/// [`crate::clients::SearchEngineClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogMessage {
    pub id: i64,
    pub project_id: i64,
    pub launch_id: Option<i64>,
    pub item_id: Option<i64>,
    pub log_time: DateTime<Utc>,
    pub log_message: String,
}

/// A tombstone row from the `attachment_deletion` queue: an attachment whose
/// database row is already gone and whose blobs await physical deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionRecord {
    pub id: i64,
    pub file_id: Option<String>,
    pub thumbnail_id: Option<String>,
    pub creation_attachment_date: Option<DateTime<Utc>>,
    pub deletion_date: DateTime<Utc>,
}

/// An expired user together with their personal project, as selected by the
/// expired-user cleanup. A user owning several personal projects yields one
/// row per project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredUser {
    pub user_id: i64,
    pub personal_project_id: Option<i64>,
    pub email: String,
}

/// A user approaching the retention border: still present, but inactive
/// long enough that a warning email is due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiringUser {
    pub email: String,
    /// Days since the user's last login or API-key use.
    pub inactivity_days: i64,
    /// Days left until the account crosses the retention border.
    pub remaining_days: i64,
}

/// Request for a templated notification email, published to the message bus
/// when a user account is removed or about to expire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotificationRequest {
    pub recipient: String,
    pub template: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl EmailNotificationRequest {
    pub fn new(recipient: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            template: template.into(),
            params: Map::new(),
        }
    }
}

/// Index cleanup request: remove the given document ids from a project's
/// analyzer index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanIndexRq {
    #[serde(rename = "project")]
    pub project_id: i64,
    #[serde(rename = "ids")]
    pub log_ids: Vec<i64>,
}

/// Index cleanup request scoped by a time range instead of explicit ids.
///
/// The analyzer expects `yyyy-MM-dd HH:mm:ss` timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanIndexByDateRangeRq {
    #[serde(rename = "project")]
    pub project_id: i64,
    #[serde(rename = "interval_start_date", with = "analyzer_date_format")]
    pub interval_start_date: DateTime<Utc>,
    #[serde(rename = "interval_end_date", with = "analyzer_date_format")]
    pub interval_end_date: DateTime<Utc>,
}

impl CleanIndexByDateRangeRq {
    /// Request covering everything from the epoch up to `end`.
    pub fn up_to(project_id: i64, end: DateTime<Utc>) -> Self {
        Self {
            project_id,
            interval_start_date: DateTime::UNIX_EPOCH,
            interval_end_date: end,
        }
    }
}

mod analyzer_date_format {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(dt: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&dt.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let s = String::deserialize(de)?;
        NaiveDateTime::parse_from_str(&s, FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_index_rq_uses_wire_field_names() {
        let rq = CleanIndexRq {
            project_id: 7,
            log_ids: vec![1, 2, 3],
        };
        let json = serde_json::to_value(&rq).unwrap();
        assert_eq!(json["project"], 7);
        assert_eq!(json["ids"], serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn date_range_rq_uses_analyzer_timestamp_format() {
        let rq = CleanIndexByDateRangeRq::up_to(
            3,
            "2026-08-01T12:30:45Z".parse::<DateTime<Utc>>().unwrap(),
        );
        let json = serde_json::to_value(&rq).unwrap();
        assert_eq!(json["interval_start_date"], "1970-01-01 00:00:00");
        assert_eq!(json["interval_end_date"], "2026-08-01 12:30:45");
    }

    #[test]
    fn email_request_omits_empty_params() {
        let rq = EmailNotificationRequest::new("a@b.c", "userDeletionNotification");
        let json = serde_json::to_string(&rq).unwrap();
        assert!(!json.contains("params"));
    }
}
