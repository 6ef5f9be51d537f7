use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Per-user recurring evaluation job record. Disabled (never deleted) when
/// the user runs out of active alerts, so re-enabling is a flag flip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodicTask {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,

    pub enabled: bool,
    pub interval_minutes: i64,

    pub last_run_at: Option<i64>,
}

impl PeriodicTask {
    /// A task that has never run is immediately due.
    pub fn is_due(&self, now: i64) -> bool {
        match self.last_run_at {
            None => true,
            Some(last) => now >= last + self.interval_minutes * 60,
        }
    }
}
