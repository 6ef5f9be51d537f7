use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// A trackable stock. `current_price` is written only by the price refresh
/// job; everything else treats it as read-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(rename = "_id")]
    pub id: ObjectId,

    pub stock_symbol: String,

    #[serde(default)]
    pub current_price: f64,
}
