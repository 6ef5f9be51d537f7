use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// Append-only record of a single alert firing. An alert can accumulate
/// several of these across reactivations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggeredAlert {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub user_id: ObjectId,
    pub alert_id: ObjectId,

    pub timestamp: i64,
}
