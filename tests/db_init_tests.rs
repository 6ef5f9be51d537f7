use std::collections::HashSet;

use stockwatcher::services::db_init::default_company_docs;

#[test]
fn seed_docs_cover_every_default_ticker_once() {
    let docs = default_company_docs();
    assert!(!docs.is_empty());

    // The companies collection has a unique index on stock_symbol; a
    // duplicate in the seed list would make the insert fail.
    let symbols: HashSet<&str> = docs
        .iter()
        .map(|d| d.get_str("stock_symbol").expect("stock_symbol set"))
        .collect();
    assert_eq!(symbols.len(), docs.len());
}

#[test]
fn seed_docs_start_every_price_at_zero() {
    for doc in default_company_docs() {
        assert_eq!(doc.get_f64("current_price").expect("current_price set"), 0.0);
    }
}
