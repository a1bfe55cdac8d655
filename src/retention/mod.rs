//! Per-project retention windows.
//!
//! Retention is configured per project through text attributes holding a
//! number of seconds. A missing, unparsable, or non-positive value means
//! the project opted out of that cleanup and is skipped.

use std::{collections::HashMap, sync::Arc};

use chrono::Duration;
use tracing::warn;

use crate::db::{DbResult, ProjectRepo};

/// The three project attributes that drive retention-based cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetentionKind {
    Launches,
    Logs,
    Attachments,
}

impl RetentionKind {
    /// Name of the project attribute holding the retention period in
    /// seconds.
    pub fn attribute_name(&self) -> &'static str {
        match self {
            Self::Launches => "job.keepLaunches",
            Self::Logs => "job.keepLogs",
            Self::Attachments => "job.keepScreenshots",
        }
    }
}

/// Resolve the retention window of every project carrying the attribute.
///
/// Projects with an invalid or non-positive period are logged and left out;
/// the caller simply never visits them.
pub async fn resolve(
    projects: &Arc<dyn ProjectRepo>,
    kind: RetentionKind,
) -> DbResult<HashMap<i64, Duration>> {
    let rows = projects.attribute_values(kind.attribute_name()).await?;

    let mut windows = HashMap::with_capacity(rows.len());
    for row in rows {
        match parse_period_secs(row.value.as_deref()) {
            Some(secs) => {
                windows.insert(row.project_id, Duration::seconds(secs));
            }
            None => {
                warn!(
                    project_id = row.project_id,
                    attribute = kind.attribute_name(),
                    value = row.value.as_deref().unwrap_or("<unset>"),
                    "Skipping project with invalid retention period"
                );
            }
        }
    }
    Ok(windows)
}

/// Parse a retention attribute value into a positive second count.
///
/// Returns `None` for unset, unparsable, or non-positive values.
pub fn parse_period_secs(value: Option<&str>) -> Option<i64> {
    let secs: i64 = value?.trim().parse().ok()?;
    (secs > 0).then_some(secs)
}
