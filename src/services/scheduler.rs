//! Task lifecycle control: per-user recurring evaluation jobs, stored as
//! `periodic_tasks` records and driven by a single scan loop. Enabling and
//! disabling are both idempotent flag writes; a job that fires once more
//! before it is disabled finds no active alerts and does nothing.

use std::time::Duration;

use futures_util::StreamExt;
use mongodb::Database;
use mongodb::bson::{doc, oid::ObjectId};
use mongodb::options::UpdateOptions;
use tokio::time;

use crate::AppState;
use crate::models::{Alert, PeriodicTask};
use crate::services::alert_checker;

const SCAN_INTERVAL_SECS: u64 = 60;

/// Port to the scheduling substrate: one recurring evaluation job per user,
/// keyed by user id, with an enable/disable flag. Production runs against
/// `Database`; tests drive the lifecycle through an in-memory double.
#[allow(async_fn_in_trait)]
pub trait SchedulerBackend {
    /// Upserts the user's task as enabled. Returns true when a new task
    /// record was created.
    async fn upsert_enabled_task(
        &self,
        user_id: ObjectId,
        interval_minutes: i64,
    ) -> Result<bool, String>;

    /// Flips the enabled flag. Returns false when no task record exists.
    async fn set_task_enabled(&self, user_id: ObjectId, enabled: bool) -> Result<bool, String>;

    async fn count_active_alerts(&self, user_id: ObjectId) -> Result<u64, String>;
}

impl SchedulerBackend for Database {
    async fn upsert_enabled_task(
        &self,
        user_id: ObjectId,
        interval_minutes: i64,
    ) -> Result<bool, String> {
        let tasks = self.collection::<PeriodicTask>("periodic_tasks");

        let res = tasks
            .update_one(
                doc! { "user_id": user_id },
                doc! {
                    "$set": { "enabled": true, "interval_minutes": interval_minutes },
                    "$setOnInsert": { "last_run_at": null },
                },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|e| e.to_string())?;

        Ok(res.upserted_id.is_some())
    }

    async fn set_task_enabled(&self, user_id: ObjectId, enabled: bool) -> Result<bool, String> {
        let tasks = self.collection::<PeriodicTask>("periodic_tasks");

        let res = tasks
            .update_one(
                doc! { "user_id": user_id },
                doc! { "$set": { "enabled": enabled } },
                None,
            )
            .await
            .map_err(|e| e.to_string())?;

        Ok(res.matched_count > 0)
    }

    async fn count_active_alerts(&self, user_id: ObjectId) -> Result<u64, String> {
        let alerts = self.collection::<Alert>("alerts");

        alerts
            .count_documents(doc! { "user_id": user_id, "is_active": true }, None)
            .await
            .map_err(|e| e.to_string())
    }
}

/// Guarantees a recurring evaluation task exists for this user and is
/// enabled. Called whenever an alert enters the active pool (creation,
/// reactivation).
pub async fn ensure_user_task(
    backend: &impl SchedulerBackend,
    user_id: ObjectId,
    interval_minutes: i64,
) -> Result<(), String> {
    let created = backend.upsert_enabled_task(user_id, interval_minutes).await?;

    if created {
        tracing::info!(user_id = %user_id, "created periodic evaluation task");
    }

    Ok(())
}

/// Disables (never deletes) the user's task if they have no active alerts
/// left. Keeping the record around makes re-enabling a flag flip.
pub async fn disable_task_if_idle(
    backend: &impl SchedulerBackend,
    user_id: ObjectId,
) -> Result<(), String> {
    let active = backend.count_active_alerts(user_id).await?;

    if active > 0 {
        return Ok(());
    }

    if !backend.set_task_enabled(user_id, false).await? {
        // Expected when every alert was deleted before one ever fired.
        tracing::warn!(user_id = %user_id, "no periodic task found to disable");
    } else {
        tracing::info!(user_id = %user_id, "disabled periodic task, no active alerts remain");
    }

    Ok(())
}

/// Unconditional disable, used when the task's user no longer exists.
pub async fn disable_user_task(
    backend: &impl SchedulerBackend,
    user_id: ObjectId,
) -> Result<(), String> {
    backend.set_task_enabled(user_id, false).await?;
    Ok(())
}

pub fn spawn_alert_scheduler(state: AppState) {
    tokio::spawn(async move {
        let mut interval = time::interval(Duration::from_secs(SCAN_INTERVAL_SECS));

        loop {
            interval.tick().await;

            if let Err(e) = run_due_tasks(&state).await {
                tracing::error!("alert scheduler scan failed: {e}");
            }
        }
    });
}

async fn run_due_tasks(state: &AppState) -> Result<(), String> {
    let now = chrono::Utc::now().timestamp();
    let tasks_col = state.db.collection::<PeriodicTask>("periodic_tasks");

    let mut cursor = tasks_col
        .find(doc! { "enabled": true }, None)
        .await
        .map_err(|e| e.to_string())?;

    while let Some(item) = cursor.next().await {
        let task = item.map_err(|e| e.to_string())?;
        if !task.is_due(now) {
            continue;
        }

        if let Err(e) = alert_checker::check_user_alerts(state, task.user_id).await {
            tracing::error!(user_id = %task.user_id, "alert check failed: {e}");
        }

        // An unstamped run makes the task due again next scan; engine
        // idempotence keeps the extra run harmless.
        if let Err(e) = tasks_col
            .update_one(
                doc! { "_id": task.id },
                doc! { "$set": { "last_run_at": now } },
                None,
            )
            .await
        {
            tracing::error!(user_id = %task.user_id, "failed to stamp task run time: {e}");
        }
    }

    Ok(())
}
