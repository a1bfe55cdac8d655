//! Warning emails ahead of expired-user deletion.
//!
//! Users whose remaining retention time lands exactly on one of the
//! warning thresholds get a templated email telling them how long they
//! have been inactive and when the account goes away. The job shares its
//! retention window with the expired-user cleanup so the warnings and the
//! delete agree on the deadline.

use chrono::{Duration, Utc};
use serde_json::Value;

use crate::{
    config::JobSafety,
    jobs::{CleanerDeps, JobError},
    models::{EmailNotificationRequest, ExpiringUser},
};

pub const JOB_NAME: &str = "notify_user_expiration";

const EMAIL_TEMPLATE: &str = "userExpirationNotification";

/// Remaining-time marks, in days, at which a warning is sent. A user is
/// warned at most once per mark; between marks the job finds nothing.
const NOTIFY_THRESHOLDS: [i64; 3] = [1, 30, 60];

/// One pass over users approaching the retention border. Returns the
/// number of warning emails published.
pub async fn run(
    deps: &CleanerDeps,
    retention_days: Option<i64>,
    safety: &JobSafety,
) -> Result<u64, JobError> {
    let Some(days) = retention_days.filter(|days| *days > 0) else {
        tracing::debug!("User retention period is not configured, skipping");
        return Ok(0);
    };

    let expiring = deps.users.find_expiring(days, &NOTIFY_THRESHOLDS).await?;
    if expiring.is_empty() {
        return Ok(0);
    }

    if safety.dry_run {
        tracing::info!(users = expiring.len(), "DRY RUN: Would send expiration warnings");
        return Ok(0);
    }

    let notifications: Vec<EmailNotificationRequest> =
        expiring.iter().map(|user| notification(user, days)).collect();
    deps.bus.publish_email_notifications(&notifications).await;
    tracing::info!(sent = notifications.len(), "Published user expiration warnings");
    Ok(notifications.len() as u64)
}

fn notification(user: &ExpiringUser, retention_days: i64) -> EmailNotificationRequest {
    let mut request = EmailNotificationRequest::new(&user.email, EMAIL_TEMPLATE);
    request
        .params
        .insert("inactivityPeriod".into(), Value::from(inactivity_period(user, retention_days)));
    request.params.insert("remainingTime".into(), Value::from(remaining_time(user)));
    request.params.insert("deadlineDate".into(), Value::from(deadline_date(user)));
    request
}

fn remaining_time(user: &ExpiringUser) -> String {
    match user.remaining_days {
        1 => "tomorrow".to_string(),
        30 => "in 1 month".to_string(),
        60 => "in 2 months".to_string(),
        other => format!("{other} days"),
    }
}

fn deadline_date(user: &ExpiringUser) -> String {
    if user.remaining_days == 1 {
        "<b>today</b>".to_string()
    } else {
        let deadline = (Utc::now() + Duration::days(user.remaining_days)).date_naive();
        format!("before <b>{deadline}</b>")
    }
}

fn inactivity_period(user: &ExpiringUser, retention_days: i64) -> String {
    if user.remaining_days == 1 {
        format!("<b>almost {} months</b>", retention_days / 30)
    } else {
        format!("the past <b>{} months</b>", user.inactivity_days / 30)
    }
}
