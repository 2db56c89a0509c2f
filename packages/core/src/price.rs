//! Process-wide price snapshot.
//!
//! Populated once at startup from configuration and never mutated
//! afterwards, so it is shared as `Arc<PriceSnapshot>` without a lock.

use std::collections::HashMap;

use crate::error::AppError;

/// Immutable map of asset symbol → current price.
///
/// Symbols are stored lowercase; lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    prices: HashMap<String, f64>,
}

impl PriceSnapshot {
    /// Parse a `symbol=price` list separated by commas, e.g. `"icp=4.25,btc=61000"`.
    pub fn parse(list: &str) -> Result<Self, AppError> {
        let mut prices = HashMap::new();

        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (symbol, price) = entry.split_once('=').ok_or_else(|| {
                AppError::Config(format!("Invalid price entry '{}', expected symbol=price", entry))
            })?;

            let symbol = symbol.trim();
            if symbol.is_empty() {
                return Err(AppError::Config(format!("Missing symbol in price entry '{}'", entry)));
            }

            let price = price
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Config(format!("Invalid price for '{}': {}", symbol, price)))?;
            validate_price(symbol, price)?;

            prices.insert(symbol.to_ascii_lowercase(), price);
        }

        Ok(Self { prices })
    }

    pub fn from_pairs<I, S>(pairs: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let mut prices = HashMap::new();
        for (symbol, price) in pairs {
            validate_price(symbol.as_ref(), price)?;
            prices.insert(symbol.as_ref().to_ascii_lowercase(), price);
        }
        Ok(Self { prices })
    }

    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.prices.get(&symbol.to_ascii_lowercase()).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.get(symbol).is_some()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

fn validate_price(symbol: &str, price: f64) -> Result<(), AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Config(format!(
            "Price for '{}' must be a finite, non-negative number (got {})",
            symbol, price
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reads_multiple_symbols() {
        let snapshot = PriceSnapshot::parse("icp=4.25, btc=61000").unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("icp"), Some(4.25));
        assert_eq!(snapshot.get("btc"), Some(61000.0));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let snapshot = PriceSnapshot::parse("ICP=10").unwrap();
        assert_eq!(snapshot.get("icp"), Some(10.0));
        assert!(snapshot.contains("Icp"));
    }

    #[test]
    fn parse_ignores_trailing_separator() {
        let snapshot = PriceSnapshot::parse("icp=1,").unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn parse_rejects_entry_without_equals() {
        let err = PriceSnapshot::parse("icp:4").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn parse_rejects_non_numeric_price() {
        assert!(PriceSnapshot::parse("icp=cheap").is_err());
    }

    #[test]
    fn parse_rejects_negative_and_non_finite_prices() {
        assert!(PriceSnapshot::parse("icp=-1").is_err());
        assert!(PriceSnapshot::parse("icp=inf").is_err());
        assert!(PriceSnapshot::parse("icp=NaN").is_err());
    }

    #[test]
    fn from_pairs_builds_snapshot() {
        let snapshot = PriceSnapshot::from_pairs([("icp", 3.5)]).unwrap();
        assert_eq!(snapshot.get("ICP"), Some(3.5));
    }

    #[test]
    fn missing_symbol_returns_none() {
        let snapshot = PriceSnapshot::default();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.get("icp"), None);
    }
}
