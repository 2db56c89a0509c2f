//! Total-value-locked derivation.
//!
//! Locates the governance locked-amount series in a metrics document,
//! converts the e8s figure to whole tokens, prices it and scales the result
//! to billions of the price currency, rounded half-up to one decimal.

use serde_json::Value;

use crate::error::AppError;
use crate::metrics::AppMetrics;
use crate::price::PriceSnapshot;
use crate::types::{MetricsDocument, Subset};

/// Series holding the total amount locked in governance, in e8s.
pub const TARGET_METRIC: &str = "governance_total_locked_e8s";

/// Price snapshot symbol of the governance token.
pub const GOVERNANCE_ASSET: &str = "icp";

/// Base units per whole token.
pub const E8S_PER_TOKEN: f64 = 100_000_000.0;

/// Display scale: amounts are shown in billions.
pub const BILLION: f64 = 1_000_000_000.0;

/// Outcome of a derivation. Recomputed on every settled fetch, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedValue {
    amount: Option<f64>,
}

impl DerivedValue {
    pub fn found(amount: f64) -> Self {
        Self {
            amount: Some(amount),
        }
    }

    pub fn missing() -> Self {
        Self { amount: None }
    }

    pub fn is_present(&self) -> bool {
        self.amount.is_some()
    }

    /// Amount in billions, rounded to one decimal.
    pub fn amount(&self) -> Option<f64> {
        self.amount
    }
}

/// Derive the display value. Every failure collapses to [`DerivedValue::missing`]
/// and, when `metrics` is given, is counted by kind.
pub fn derive(
    document: &MetricsDocument,
    prices: &PriceSnapshot,
    metrics: Option<&AppMetrics>,
) -> DerivedValue {
    match try_derive(document, prices) {
        Ok(amount) => DerivedValue::found(amount),
        Err(err) => {
            tracing::debug!("TVL derivation failed ({}): {}", err.kind(), err);
            if let Some(metrics) = metrics {
                metrics
                    .derivation_failures_total
                    .with_label_values(&[err.kind()])
                    .inc();
            }
            DerivedValue::missing()
        }
    }
}

/// Same as [`derive`] but keeps the reason a value could not be produced.
pub fn try_derive(document: &MetricsDocument, prices: &PriceSnapshot) -> Result<f64, AppError> {
    let raw = locate_raw_figure(document)?;
    let locked_e8s = parse_raw_figure(raw)?;

    let price = prices.get(GOVERNANCE_ASSET).ok_or_else(|| {
        AppError::PriceUnavailable(format!("no price for '{}' in snapshot", GOVERNANCE_ASSET))
    })?;

    let tokens = locked_e8s / E8S_PER_TOKEN;
    let billions = tokens * price / BILLION;

    if !billions.is_finite() {
        return Err(AppError::MalformedValue(format!(
            "derived amount is not finite ({} e8s at {})",
            locked_e8s, price
        )));
    }

    Ok(round_one_decimal(billions))
}

/// First subset of the first series named [`TARGET_METRIC`].
pub fn locate_sample(document: &MetricsDocument) -> Result<&Subset, AppError> {
    let series = document
        .find_series(TARGET_METRIC)
        .ok_or_else(|| AppError::MetricNotFound(format!("no series named '{}'", TARGET_METRIC)))?;

    series
        .first_subset()
        .ok_or_else(|| AppError::MetricNotFound(format!("series '{}' has no subsets", TARGET_METRIC)))
}

/// Raw figure of the located sample.
pub fn locate_raw_figure(document: &MetricsDocument) -> Result<&Value, AppError> {
    locate_sample(document)?
        .figure()
        .ok_or_else(|| AppError::MalformedValue("sample value has no figure".to_string()))
}

/// Accepts a decimal string or a JSON number. The result must be finite.
pub fn parse_raw_figure(raw: &Value) -> Result<f64, AppError> {
    let parsed = match raw {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(AppError::MalformedValue("empty figure".to_string()));
            }
            text.parse::<f64>()
                .map_err(|_| AppError::MalformedValue(format!("non-numeric figure '{}'", text)))?
        }
        Value::Number(number) => number
            .as_f64()
            .ok_or_else(|| AppError::MalformedValue(format!("unrepresentable figure {}", number)))?,
        other => {
            return Err(AppError::MalformedValue(format!("unexpected figure type: {}", other)));
        }
    };

    if !parsed.is_finite() {
        return Err(AppError::MalformedValue(format!("non-finite figure {}", parsed)));
    }

    Ok(parsed)
}

/// Half-up rounding to one decimal place.
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
