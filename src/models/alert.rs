use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertKind {
    #[serde(rename = "PRICE_THRESHOLD")]
    Threshold,
    #[serde(rename = "PRICE_DURATION")]
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparator {
    #[serde(rename = "GT")]
    GreaterThan,
    #[serde(rename = "LT")]
    LessThan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub symbol: String,

    pub kind: AlertKind,
    pub comparator: Comparator,
    pub threshold: f64,

    // Required iff kind == Duration; rejected at creation time otherwise.
    pub duration_minutes: Option<i64>,

    pub is_active: bool,

    // Set while a Duration alert's instantaneous condition holds but the
    // window has not yet elapsed. Unix seconds. Null in every other state.
    pub condition_met_since: Option<i64>,

    pub created_at: i64,
}

impl Alert {
    /// Instantaneous price comparison against the threshold.
    pub fn is_condition_met(&self, current_price: f64) -> bool {
        match self.comparator {
            Comparator::GreaterThan => current_price > self.threshold,
            Comparator::LessThan => current_price < self.threshold,
        }
    }

    /// Whether the duration requirement has elapsed as of `now` (unix
    /// seconds). Threshold alerts have no waiting period and always pass.
    /// Does not mutate any state.
    pub fn has_duration_met(&self, now: i64) -> bool {
        if self.kind != AlertKind::Duration {
            return true;
        }
        let Some(since) = self.condition_met_since else {
            return false;
        };
        let minutes = self.duration_minutes.unwrap_or(0);
        now >= since + minutes * 60
    }
}
