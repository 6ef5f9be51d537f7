use std::collections::HashMap;

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

const QUOTE_BASE_URL: &str = "https://financialmodelingprep.com/api/v3/quote/";

/// Transport failures are worth retrying; payload failures are not (a parse
/// error will not self-resolve).
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("quote request failed: {0}")]
    Transport(String),
    #[error("quote payload invalid: {0}")]
    Payload(String),
}

#[derive(Clone)]
pub struct FmpClient {
    http: Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct FmpQuote {
    symbol: String,
    price: f64,
}

impl FmpClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: Client::new(),
            api_key,
        }
    }

    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Fetches quotes for all `symbols` in one batched request and returns a
    /// symbol -> price map. Symbols the provider does not know are simply
    /// absent from the map.
    pub async fn batch_quotes(&self, symbols: &[String]) -> Result<HashMap<String, f64>, QuoteError> {
        if !self.has_key() {
            return Err(QuoteError::Transport(
                "FMP_API_KEY is missing in .env".to_string(),
            ));
        }

        let url = format!("{}{}", QUOTE_BASE_URL, symbols.join(","));
        let res = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str())])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(QuoteError::Transport(format!(
                "FMP quote failed: {status} {body}"
            )));
        }

        let quotes = res
            .json::<Vec<FmpQuote>>()
            .await
            .map_err(|e| QuoteError::Payload(e.to_string()))?;

        Ok(quotes.into_iter().map(|q| (q.symbol, q.price)).collect())
    }
}
