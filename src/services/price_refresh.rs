use std::time::Duration;

use futures_util::StreamExt;
use mongodb::bson::doc;
use tokio::time;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::AppState;
use crate::models::Company;
use crate::services::fmp::QuoteError;

pub fn spawn_price_refresh(state: AppState) {
    let every = Duration::from_secs(state.settings.stock_interval_minutes as u64 * 60);

    tokio::spawn(async move {
        let mut interval = time::interval(every);

        loop {
            interval.tick().await;

            match refresh_prices(&state).await {
                Ok(n) => tracing::info!(updated = n, "price refresh cycle complete"),
                // A skipped cycle is tolerable, the next one self-heals.
                Err(e) => tracing::error!("price refresh cycle failed: {e}"),
            }
        }
    });
}

/// Fetches a batched quote for every tracked company and writes the new
/// prices back in one pass. Transport failures are retried with backoff;
/// payload failures abort the cycle without retrying. Symbols absent from
/// the response keep their previous price so a transient upstream gap does
/// not zero anything out.
pub async fn refresh_prices(state: &AppState) -> Result<u64, String> {
    let companies_col = state.db.collection::<Company>("companies");

    let mut cursor = companies_col
        .find(None, None)
        .await
        .map_err(|e| e.to_string())?;

    let mut companies: Vec<Company> = Vec::new();
    while let Some(item) = cursor.next().await {
        companies.push(item.map_err(|e| e.to_string())?);
    }

    if companies.is_empty() {
        tracing::info!("no companies to refresh");
        return Ok(0);
    }

    let symbols: Vec<String> = companies.iter().map(|c| c.stock_symbol.clone()).collect();

    let strategy = ExponentialBackoff::from_millis(2)
        .factor(1000)
        .map(jitter)
        .take(3);

    let quotes = RetryIf::spawn(
        strategy,
        || state.quotes.batch_quotes(&symbols),
        |e: &QuoteError| matches!(e, QuoteError::Transport(_)),
    )
    .await
    .map_err(|e| e.to_string())?;

    // One write pass, per symbol: the driver has no multi-document bulk
    // write, so an evaluation run racing this loop may see a mix of old and
    // new prices. Either value is a valid snapshot; the next cycle corrects
    // any drift.
    let mut updated = 0u64;
    for company in &companies {
        let Some(price) = quotes.get(&company.stock_symbol) else {
            continue;
        };

        let res = companies_col
            .update_one(
                doc! { "_id": company.id },
                doc! { "$set": { "current_price": *price } },
                None,
            )
            .await
            .map_err(|e| e.to_string())?;

        updated += res.matched_count;
    }

    Ok(updated)
}
