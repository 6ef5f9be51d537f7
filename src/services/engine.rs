//! Pure alert evaluation core.
//!
//! Decides, for one user's active alerts and a price snapshot, which alerts
//! fire, which start or reset their duration timer, and whether anything is
//! left that still needs future checks. Performs no I/O and cannot fail on
//! well-formed input; persistence of the computed transitions is the
//! caller's job (see `alert_checker`).

use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;

use crate::models::{Alert, AlertKind};

/// New persisted state for one alert. `fired` marks the transition that must
/// also insert a trigger record.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertUpdate {
    pub alert_id: ObjectId,
    pub is_active: bool,
    pub condition_met_since: Option<i64>,
    pub fired: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EvaluationResult {
    /// State changes to apply. Alerts whose state did not move this cycle
    /// are omitted, which makes a duplicate run on unchanged inputs a no-op.
    pub updates: Vec<AlertUpdate>,
    /// Ids of alerts that fired this cycle, in input order.
    pub fired: Vec<ObjectId>,
    /// True if at least one alert is still active after this cycle. False
    /// for an empty input set: no more work, the caller should disable the
    /// user's recurring task.
    pub any_still_pending: bool,
}

/// Evaluates every alert in `alerts` against `prices` at time `now` (unix
/// seconds). Callers must pass only alerts with `is_active == true`; fired
/// alerts leave the active pool, which is what makes re-delivery of the
/// same job tick safe.
///
/// A symbol missing from the snapshot compares against 0.0, matching the
/// price store's default for a never-refreshed company.
pub fn evaluate_user_alerts(
    alerts: &[Alert],
    prices: &HashMap<String, f64>,
    now: i64,
) -> EvaluationResult {
    let mut result = EvaluationResult::default();

    for alert in alerts {
        let price = prices.get(&alert.symbol).copied().unwrap_or(0.0);
        let condition_met = alert.is_condition_met(price);
        let duration_met = alert.has_duration_met(now);

        if condition_met {
            if !duration_met {
                // Condition holds but the window has not elapsed. Start the
                // timer on the first true observation; later true cycles
                // leave it untouched.
                result.any_still_pending = true;
                if alert.condition_met_since.is_none() {
                    result.updates.push(AlertUpdate {
                        alert_id: alert.id,
                        is_active: true,
                        condition_met_since: Some(now),
                        fired: false,
                    });
                }
                continue;
            }

            result.updates.push(AlertUpdate {
                alert_id: alert.id,
                is_active: false,
                condition_met_since: None,
                fired: true,
            });
            result.fired.push(alert.id);
            continue;
        }

        // Condition false: one missed check erases a duration alert's
        // progress entirely.
        if alert.kind == AlertKind::Duration && alert.condition_met_since.is_some() {
            result.updates.push(AlertUpdate {
                alert_id: alert.id,
                is_active: true,
                condition_met_since: None,
                fired: false,
            });
        }
        result.any_still_pending = true;
    }

    result
}
