use mongodb::bson::{Document, doc};
use mongodb::{Database, IndexModel, options::IndexOptions};

// Starter ticker list, seeded when the companies collection is empty.
const DEFAULT_STOCKS: &[&str] = &[
    "AAPL", "TSLA", "AMZN", "MSFT", "NVDA", "GOOGL", "META", "NFLX", "JPM", "V",
    "BAC", "AMD", "PYPL", "DIS", "T", "PFE", "COST", "INTC", "KO", "TGT",
    "NKE", "SPY", "BA", "BABA", "XOM", "WMT", "GE", "CSCO", "VZ", "JNJ",
    "CVX", "PLTR", "SHOP", "SBUX", "SOFI", "HOOD", "RBLX", "SNAP", "UBER", "FDX",
    "ABBV", "ETSY", "MRNA", "LMT", "GM", "F", "RIVN", "LCID", "CCL", "DAL",
];

pub async fn ensure_indexes(db: &Database) -> Result<(), String> {
    // users: unique email and username
    {
        let col = db.collection::<mongodb::bson::Document>("users");

        let model = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;

        let model = IndexModel::builder()
            .keys(doc! { "username": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // companies: unique symbol
    {
        let col = db.collection::<mongodb::bson::Document>("companies");
        let model = IndexModel::builder()
            .keys(doc! { "stock_symbol": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // alerts: the checker scans per user by active flag
    {
        let col = db.collection::<mongodb::bson::Document>("alerts");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "is_active": 1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // triggered_alerts: history is listed per user, newest first
    {
        let col = db.collection::<mongodb::bson::Document>("triggered_alerts");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1, "timestamp": -1 })
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    // periodic_tasks: one task per user
    {
        let col = db.collection::<mongodb::bson::Document>("periodic_tasks");
        let model = IndexModel::builder()
            .keys(doc! { "user_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        col.create_index(model, None)
            .await
            .map_err(|e| e.to_string())?;
    }

    Ok(())
}

/// Seed documents for the companies collection, one per default ticker,
/// every price starting at 0 until the first refresh.
pub fn default_company_docs() -> Vec<Document> {
    DEFAULT_STOCKS
        .iter()
        .map(|symbol| doc! { "stock_symbol": *symbol, "current_price": 0.0 })
        .collect()
}

pub async fn seed_companies(db: &Database) -> Result<(), String> {
    let companies = db.collection::<Document>("companies");

    let existing = companies
        .count_documents(None, None)
        .await
        .map_err(|e| e.to_string())?;

    if existing > 0 {
        return Ok(());
    }

    companies
        .insert_many(default_company_docs(), None)
        .await
        .map_err(|e| e.to_string())?;

    tracing::info!(count = DEFAULT_STOCKS.len(), "seeded default companies");
    Ok(())
}
