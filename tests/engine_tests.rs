use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use stockwatcher::models::{Alert, AlertKind, Comparator};
use stockwatcher::services::engine::evaluate_user_alerts;

const T0: i64 = 1_755_000_000;

fn threshold_alert(symbol: &str, comparator: Comparator, threshold: f64) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: ObjectId::new(),
        symbol: symbol.to_string(),
        kind: AlertKind::Threshold,
        comparator,
        threshold,
        duration_minutes: None,
        is_active: true,
        condition_met_since: None,
        created_at: T0 - 3600,
    }
}

fn duration_alert(
    symbol: &str,
    comparator: Comparator,
    threshold: f64,
    minutes: i64,
    since: Option<i64>,
) -> Alert {
    Alert {
        id: ObjectId::new(),
        user_id: ObjectId::new(),
        symbol: symbol.to_string(),
        kind: AlertKind::Duration,
        comparator,
        threshold,
        duration_minutes: Some(minutes),
        is_active: true,
        condition_met_since: since,
        created_at: T0 - 3600,
    }
}

fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
    pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
}

#[test]
fn threshold_alert_does_not_fire_below_target() {
    let alert = threshold_alert("AAPL", Comparator::GreaterThan, 200.0);
    let result = evaluate_user_alerts(&[alert], &prices(&[("AAPL", 150.0)]), T0);

    assert!(result.fired.is_empty());
    assert!(result.updates.is_empty());
    assert!(result.any_still_pending);
}

#[test]
fn threshold_alert_fires_on_first_true_evaluation() {
    let alert = threshold_alert("AAPL", Comparator::GreaterThan, 200.0);
    let result = evaluate_user_alerts(&[alert.clone()], &prices(&[("AAPL", 205.0)]), T0);

    assert_eq!(result.fired, vec![alert.id]);
    assert_eq!(result.updates.len(), 1);
    let update = &result.updates[0];
    assert!(update.fired);
    assert!(!update.is_active);
    assert_eq!(update.condition_met_since, None);
    assert!(!result.any_still_pending);
}

#[test]
fn threshold_less_than_fires_when_price_drops() {
    let alert = threshold_alert("TSLA", Comparator::LessThan, 600.0);
    let result = evaluate_user_alerts(&[alert.clone()], &prices(&[("TSLA", 590.0)]), T0);

    assert_eq!(result.fired, vec![alert.id]);
}

#[test]
fn price_equal_to_threshold_is_not_met() {
    let gt = threshold_alert("AAPL", Comparator::GreaterThan, 200.0);
    let lt = threshold_alert("AAPL", Comparator::LessThan, 200.0);
    let result = evaluate_user_alerts(&[gt, lt], &prices(&[("AAPL", 200.0)]), T0);

    assert!(result.fired.is_empty());
    assert!(result.any_still_pending);
}

#[test]
fn missing_price_compares_against_zero() {
    let lt = threshold_alert("NOPE", Comparator::LessThan, 10.0);
    let gt = threshold_alert("NOPE", Comparator::GreaterThan, 10.0);
    let result = evaluate_user_alerts(&[lt.clone(), gt], &prices(&[]), T0);

    // 0.0 < 10.0 fires; 0.0 > 10.0 does not.
    assert_eq!(result.fired, vec![lt.id]);
    assert!(result.any_still_pending);
}

#[test]
fn duration_timer_starts_on_first_true_observation() {
    let alert = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, None);
    let result = evaluate_user_alerts(&[alert.clone()], &prices(&[("TSLA", 590.0)]), T0);

    assert!(result.fired.is_empty());
    assert_eq!(result.updates.len(), 1);
    let update = &result.updates[0];
    assert!(update.is_active);
    assert_eq!(update.condition_met_since, Some(T0));
    assert!(result.any_still_pending);
}

#[test]
fn duration_alert_holds_midway_without_touching_the_timer() {
    let alert = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, Some(T0));
    let result = evaluate_user_alerts(&[alert], &prices(&[("TSLA", 590.0)]), T0 + 60 * 60);

    assert!(result.fired.is_empty());
    assert!(result.updates.is_empty());
    assert!(result.any_still_pending);
}

#[test]
fn duration_alert_fires_after_the_window_elapses() {
    let alert = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, Some(T0));
    let result = evaluate_user_alerts(&[alert.clone()], &prices(&[("TSLA", 590.0)]), T0 + 121 * 60);

    assert_eq!(result.fired, vec![alert.id]);
    let update = &result.updates[0];
    assert!(!update.is_active);
    assert_eq!(update.condition_met_since, None);
    assert!(!result.any_still_pending);
}

#[test]
fn duration_alert_fires_exactly_at_the_boundary() {
    let alert = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, Some(T0));
    let result = evaluate_user_alerts(&[alert.clone()], &prices(&[("TSLA", 590.0)]), T0 + 120 * 60);

    assert_eq!(result.fired, vec![alert.id]);
}

#[test]
fn one_missed_check_resets_the_duration_timer() {
    let alert = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, Some(T0));
    let result = evaluate_user_alerts(&[alert.clone()], &prices(&[("TSLA", 650.0)]), T0 + 30 * 60);

    assert!(result.fired.is_empty());
    assert_eq!(result.updates.len(), 1);
    let update = &result.updates[0];
    assert!(update.is_active);
    assert_eq!(update.condition_met_since, None);
    assert!(result.any_still_pending);

    // The condition re-enters at t0+40m: a fresh full window is required.
    let reset = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, None);
    let result = evaluate_user_alerts(&[reset], &prices(&[("TSLA", 590.0)]), T0 + 40 * 60);
    assert_eq!(result.updates[0].condition_met_since, Some(T0 + 40 * 60));
}

#[test]
fn threshold_alert_with_false_condition_produces_no_update() {
    // Only duration alerts carry timer state worth clearing.
    let alert = threshold_alert("AAPL", Comparator::GreaterThan, 200.0);
    let result = evaluate_user_alerts(&[alert], &prices(&[("AAPL", 100.0)]), T0);

    assert!(result.updates.is_empty());
}

#[test]
fn rerunning_on_unchanged_inputs_is_a_no_op() {
    let pending = duration_alert("TSLA", Comparator::LessThan, 600.0, 120, None);
    let snapshot = prices(&[("TSLA", 590.0)]);

    let first = evaluate_user_alerts(&[pending.clone()], &snapshot, T0);
    assert_eq!(first.updates.len(), 1);

    // Apply the computed transition, then evaluate again at the same time.
    let mut applied = pending;
    applied.condition_met_since = first.updates[0].condition_met_since;

    let second = evaluate_user_alerts(&[applied], &snapshot, T0);
    assert!(second.updates.is_empty());
    assert!(second.fired.is_empty());
    assert!(second.any_still_pending);
}

#[test]
fn fired_alerts_leave_the_pool_and_cannot_fire_twice() {
    let alert = threshold_alert("AAPL", Comparator::GreaterThan, 200.0);
    let snapshot = prices(&[("AAPL", 205.0)]);

    let first = evaluate_user_alerts(&[alert], &snapshot, T0);
    assert_eq!(first.fired.len(), 1);

    // The caller only ever passes active alerts; once fired, the alert is
    // gone from the input set, so a duplicate job run sees nothing.
    let second = evaluate_user_alerts(&[], &snapshot, T0);
    assert!(second.fired.is_empty());
    assert!(!second.any_still_pending);
}

#[test]
fn zero_alerts_means_no_more_work() {
    let result = evaluate_user_alerts(&[], &prices(&[]), T0);

    assert!(!result.any_still_pending);
    assert!(result.fired.is_empty());
    assert!(result.updates.is_empty());
}

#[test]
fn mixed_batch_fires_some_and_keeps_pending_flag() {
    let firing = threshold_alert("AAPL", Comparator::GreaterThan, 200.0);
    let waiting = threshold_alert("TSLA", Comparator::GreaterThan, 900.0);
    let result = evaluate_user_alerts(
        &[firing.clone(), waiting],
        &prices(&[("AAPL", 205.0), ("TSLA", 700.0)]),
        T0,
    );

    assert_eq!(result.fired, vec![firing.id]);
    assert!(result.any_still_pending);
}
