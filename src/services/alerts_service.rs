use std::collections::{HashMap, HashSet};

use chrono::Utc;
use futures_util::StreamExt;
use mongodb::bson::{Bson, doc, oid::ObjectId};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};

use crate::AppState;
use crate::models::{Alert, AlertKind, Company, Comparator, TriggeredAlert};

pub async fn list_companies(state: &AppState) -> Result<Vec<Company>, String> {
    let companies = state.db.collection::<Company>("companies");

    let find_opts = FindOptions::builder()
        .sort(doc! { "stock_symbol": 1 })
        .build();

    let mut cursor = companies
        .find(None, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        items.push(res.map_err(|e| e.to_string())?);
    }

    Ok(items)
}

pub async fn find_company_by_symbol(
    state: &AppState,
    symbol: &str,
) -> Result<Option<Company>, String> {
    let companies = state.db.collection::<Company>("companies");

    companies
        .find_one(doc! { "stock_symbol": symbol.to_uppercase() }, None)
        .await
        .map_err(|e| e.to_string())
}

pub async fn create_alert(
    state: &AppState,
    user_id: ObjectId,
    symbol: &str,
    kind: AlertKind,
    comparator: Comparator,
    threshold: f64,
    duration_minutes: Option<i64>,
) -> Result<Alert, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let alert = Alert {
        id: ObjectId::new(),
        user_id,
        symbol: symbol.to_uppercase(),
        kind,
        comparator,
        threshold,
        duration_minutes,
        is_active: true,
        condition_met_since: None,
        created_at: Utc::now().timestamp(),
    };

    alerts
        .insert_one(&alert, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(alert)
}

/// The user's alerts, newest first, each annotated with whether it has ever
/// fired. Optional filters on `is_active` and on the has-ever-fired flag.
pub async fn list_user_alerts(
    state: &AppState,
    user_id: ObjectId,
    is_active: Option<bool>,
    triggered: Option<bool>,
) -> Result<Vec<(Alert, bool)>, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let mut filter = doc! { "user_id": user_id };
    if let Some(active) = is_active {
        filter.insert("is_active", active);
    }

    let find_opts = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();

    let mut cursor = alerts
        .find(filter, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let fired_ids = triggered_alert_ids(state, user_id).await?;

    let mut items = Vec::new();
    while let Some(res) = cursor.next().await {
        let alert = res.map_err(|e| e.to_string())?;
        let has_triggered = fired_ids.contains(&alert.id);

        if let Some(want) = triggered {
            if has_triggered != want {
                continue;
            }
        }

        items.push((alert, has_triggered));
    }

    Ok(items)
}

pub async fn get_user_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Option<Alert>, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    alerts
        .find_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())
}

pub async fn alert_has_triggered(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<bool, String> {
    let triggered = state.db.collection::<TriggeredAlert>("triggered_alerts");

    let count = triggered
        .count_documents(doc! { "user_id": user_id, "alert_id": alert_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(count > 0)
}

/// Deletes the alert and its trigger history. Returns false when the alert
/// does not exist or belongs to someone else.
pub async fn delete_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<bool, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let res = alerts
        .delete_one(doc! { "_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    if res.deleted_count == 0 {
        return Ok(false);
    }

    let triggered = state.db.collection::<TriggeredAlert>("triggered_alerts");
    triggered
        .delete_many(doc! { "alert_id": alert_id, "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(true)
}

/// Puts an alert back into the active pool with a fresh duration timer.
pub async fn reactivate_alert(
    state: &AppState,
    user_id: ObjectId,
    alert_id: ObjectId,
) -> Result<Option<Alert>, String> {
    let alerts = state.db.collection::<Alert>("alerts");

    let opts = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();

    alerts
        .find_one_and_update(
            doc! { "_id": alert_id, "user_id": user_id },
            doc! { "$set": { "is_active": true, "condition_met_since": null } },
            opts,
        )
        .await
        .map_err(|e| e.to_string())
}

/// The user's trigger history, newest first, with each record's alert
/// attached when it still exists.
pub async fn list_triggered(
    state: &AppState,
    user_id: ObjectId,
) -> Result<Vec<(TriggeredAlert, Option<Alert>)>, String> {
    let triggered = state.db.collection::<TriggeredAlert>("triggered_alerts");

    let find_opts = FindOptions::builder().sort(doc! { "timestamp": -1 }).build();

    let mut cursor = triggered
        .find(doc! { "user_id": user_id }, find_opts)
        .await
        .map_err(|e| e.to_string())?;

    let mut records: Vec<TriggeredAlert> = Vec::new();
    while let Some(res) = cursor.next().await {
        records.push(res.map_err(|e| e.to_string())?);
    }

    let alert_ids: Vec<ObjectId> = records
        .iter()
        .map(|t| t.alert_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let alerts_col = state.db.collection::<Alert>("alerts");
    let mut cursor = alerts_col
        .find(doc! { "_id": { "$in": alert_ids } }, None)
        .await
        .map_err(|e| e.to_string())?;

    let mut alerts: HashMap<ObjectId, Alert> = HashMap::new();
    while let Some(res) = cursor.next().await {
        let a = res.map_err(|e| e.to_string())?;
        alerts.insert(a.id, a);
    }

    Ok(records
        .into_iter()
        .map(|t| {
            let alert = alerts.get(&t.alert_id).cloned();
            (t, alert)
        })
        .collect())
}

async fn triggered_alert_ids(
    state: &AppState,
    user_id: ObjectId,
) -> Result<HashSet<ObjectId>, String> {
    let triggered = state.db.collection::<TriggeredAlert>("triggered_alerts");

    let values = triggered
        .distinct("alert_id", doc! { "user_id": user_id }, None)
        .await
        .map_err(|e| e.to_string())?;

    Ok(values
        .into_iter()
        .filter_map(|v| match v {
            Bson::ObjectId(id) => Some(id),
            _ => None,
        })
        .collect())
}
