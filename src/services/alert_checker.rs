//! Per-user evaluation job: loads the active alert set and a price
//! snapshot, runs the pure engine, persists the transitions, and hands the
//! fired batch to the mailer. The fire write is filtered on
//! `is_active: true`, so even if the same tick is delivered twice only one
//! trigger record can be inserted per firing.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use futures_util::StreamExt;
use mongodb::Database;
use mongodb::bson::{doc, oid::ObjectId};

use crate::AppState;
use crate::models::{Alert, Company, TriggeredAlert, User};
use crate::services::{engine, scheduler};

pub async fn check_user_alerts(state: &AppState, user_id: ObjectId) -> Result<(), String> {
    let users = state.db.collection::<User>("users");

    let user = match users
        .find_one(doc! { "_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?
    {
        Some(u) => u,
        None => {
            tracing::warn!(user_id = %user_id, "evaluation task references a missing user, disabling it");
            scheduler::disable_user_task(&state.db, user_id).await?;
            return Ok(());
        }
    };

    let alerts_col = state.db.collection::<Alert>("alerts");

    let mut cursor = alerts_col
        .find(doc! { "user_id": user_id, "is_active": true }, None)
        .await
        .map_err(|e| e.to_string())?;

    let mut alerts: Vec<Alert> = Vec::new();
    while let Some(item) = cursor.next().await {
        alerts.push(item.map_err(|e| e.to_string())?);
    }

    if alerts.is_empty() {
        tracing::info!(username = %user.username, "no active alerts");
        scheduler::disable_task_if_idle(&state.db, user_id).await?;
        return Ok(());
    }

    tracing::info!(username = %user.username, count = alerts.len(), "checking active alerts");

    let prices = price_snapshot(&state.db, &alerts).await?;
    let now = Utc::now().timestamp();
    let result = engine::evaluate_user_alerts(&alerts, &prices, now);

    let triggered_col = state.db.collection::<TriggeredAlert>("triggered_alerts");
    let mut confirmed: HashSet<ObjectId> = HashSet::new();

    for update in &result.updates {
        if update.fired {
            let res = alerts_col
                .update_one(
                    doc! { "_id": update.alert_id, "is_active": true },
                    doc! { "$set": { "is_active": false, "condition_met_since": null } },
                    None,
                )
                .await
                .map_err(|e| e.to_string())?;

            // Lost the race against a concurrent run that already fired it.
            if res.matched_count == 0 {
                continue;
            }

            triggered_col
                .insert_one(
                    &TriggeredAlert {
                        id: ObjectId::new(),
                        user_id,
                        alert_id: update.alert_id,
                        timestamp: now,
                    },
                    None,
                )
                .await
                .map_err(|e| e.to_string())?;

            confirmed.insert(update.alert_id);
        } else {
            alerts_col
                .update_one(
                    doc! { "_id": update.alert_id },
                    doc! { "$set": { "condition_met_since": update.condition_met_since } },
                    None,
                )
                .await
                .map_err(|e| e.to_string())?;
        }
    }

    if !confirmed.is_empty() {
        tracing::info!(username = %user.username, count = confirmed.len(), "alerts triggered");

        let fired: Vec<Alert> = alerts
            .iter()
            .filter(|a| confirmed.contains(&a.id))
            .cloned()
            .collect();

        state.mailer.send_trigger_email(&user, &fired).await;
    }

    if !result.any_still_pending {
        scheduler::disable_task_if_idle(&state.db, user_id).await?;
    }

    Ok(())
}

/// Point-in-time read of current prices for the symbols these alerts watch.
async fn price_snapshot(db: &Database, alerts: &[Alert]) -> Result<HashMap<String, f64>, String> {
    let symbols: Vec<String> = alerts
        .iter()
        .map(|a| a.symbol.clone())
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let companies = db.collection::<Company>("companies");

    let mut cursor = companies
        .find(doc! { "stock_symbol": { "$in": symbols } }, None)
        .await
        .map_err(|e| e.to_string())?;

    let mut prices = HashMap::new();
    while let Some(item) = cursor.next().await {
        let company = item.map_err(|e| e.to_string())?;
        prices.insert(company.stock_symbol, company.current_price);
    }

    Ok(prices)
}
