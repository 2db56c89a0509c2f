//! Wire model of the staking metrics document.
//!
//! The endpoint emits Prometheus-style query results:
//!
//! ```json
//! { "metrics": [
//!     { "name": "governance_total_locked_e8s",
//!       "subsets": [ { "value": [1700000000, "50000000000000000"] } ] }
//! ] }
//! ```
//!
//! Only the top-level `metrics` array is required. Series and samples are
//! decoded leniently: a sibling series with a missing name or a `null`
//! subset list does not fail the document, and a bad figure only fails the
//! derivation that reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDocument {
    #[serde(deserialize_with = "lenient_series")]
    pub metrics: Vec<MetricSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSeries {
    /// Empty when the entry has no string name; never matches a lookup.
    #[serde(default, deserialize_with = "lenient_name")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_subsets")]
    pub subsets: Vec<Subset>,
}

/// One sample of a series. `value` is a `[timestamp, figure]` pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subset {
    #[serde(default, deserialize_with = "lenient_values")]
    pub value: Vec<Value>,
}

/// Entries that are not objects are skipped.
fn lenient_series<'de, D>(deserializer: D) -> Result<Vec<MetricSeries>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Vec::<Value>::deserialize(deserializer)?;
    Ok(entries
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

fn lenient_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(name) => Ok(name),
        _ => Ok(String::new()),
    }
}

/// A non-array becomes no subsets; a non-object subset keeps its position
/// but carries no value.
fn lenient_subsets<'de, D>(deserializer: D) -> Result<Vec<Subset>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(|item| serde_json::from_value(item).unwrap_or_default())
            .collect()),
        _ => Ok(Vec::new()),
    }
}

fn lenient_values<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(values) => Ok(values),
        _ => Ok(Vec::new()),
    }
}

impl MetricsDocument {
    /// First series with the given name. Names are not unique in practice.
    pub fn find_series(&self, name: &str) -> Option<&MetricSeries> {
        self.metrics.iter().find(|series| series.name == name)
    }
}

impl MetricSeries {
    pub fn first_subset(&self) -> Option<&Subset> {
        self.subsets.first()
    }
}

impl Subset {
    pub fn new(timestamp: impl Into<Value>, figure: impl Into<Value>) -> Self {
        Self {
            value: vec![timestamp.into(), figure.into()],
        }
    }

    /// Raw figure (second element of the pair), if present.
    pub fn figure(&self) -> Option<&Value> {
        self.value.get(1)
    }

    /// Sample timestamp, interpreted as unix seconds (fractional allowed).
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        let secs = match self.value.first()? {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        if !secs.is_finite() {
            return None;
        }
        let whole = secs.trunc() as i64;
        let nanos = ((secs - secs.trunc()) * 1e9).round() as u32;
        DateTime::<Utc>::from_timestamp(whole, nanos.min(999_999_999))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "metrics": [
            { "name": "governance_neurons_total", "subsets": [ { "value": [1700000000.5, "412"] } ] },
            { "name": "governance_total_locked_e8s", "subsets": [ { "value": [1700000000, "50000000000000000"] } ] },
            { "name": "governance_total_locked_e8s", "subsets": [ { "value": [1700000000, "1"] } ] }
        ]
    }"#;

    #[test]
    fn parses_prometheus_style_document() {
        let doc: MetricsDocument = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(doc.metrics.len(), 3);
        assert_eq!(doc.metrics[0].name, "governance_neurons_total");
    }

    #[test]
    fn find_series_returns_first_match() {
        let doc: MetricsDocument = serde_json::from_str(SAMPLE).unwrap();
        let series = doc.find_series("governance_total_locked_e8s").unwrap();
        let figure = series.first_subset().and_then(Subset::figure).unwrap();
        assert_eq!(figure, &Value::String("50000000000000000".into()));
    }

    #[test]
    fn missing_subsets_defaults_to_empty() {
        let doc: MetricsDocument =
            serde_json::from_str(r#"{ "metrics": [ { "name": "x" } ] }"#).unwrap();
        assert!(doc.metrics[0].subsets.is_empty());
        assert!(doc.metrics[0].first_subset().is_none());
    }

    #[test]
    fn missing_metrics_field_is_a_parse_error() {
        let result = serde_json::from_str::<MetricsDocument>(r#"{ "data": [] }"#);
        assert!(result.is_err());
    }

    #[test]
    fn broken_sibling_series_do_not_fail_the_document() {
        let doc: MetricsDocument = serde_json::from_str(
            r#"{ "metrics": [
                { "name": "other_series", "subsets": null },
                { "subsets": [] },
                { "name": 42, "subsets": "nope" },
                7,
                { "name": "governance_total_locked_e8s",
                  "subsets": [ { "value": [1700000000, "50000000000000000"] } ] }
            ] }"#,
        )
        .unwrap();

        let series = doc.find_series("governance_total_locked_e8s").unwrap();
        let figure = series.first_subset().and_then(Subset::figure).unwrap();
        assert_eq!(figure, &Value::String("50000000000000000".into()));
        assert!(doc.find_series("other_series").unwrap().subsets.is_empty());
        assert_eq!(doc.metrics.len(), 4);
    }

    #[test]
    fn malformed_subset_keeps_position_without_value() {
        let series: MetricSeries = serde_json::from_str(
            r#"{ "name": "x", "subsets": [ "junk", { "value": null } ] }"#,
        )
        .unwrap();
        assert_eq!(series.subsets.len(), 2);
        assert!(series.first_subset().and_then(Subset::figure).is_none());
        assert!(series.subsets[1].value.is_empty());
    }

    #[test]
    fn short_value_pair_has_no_figure() {
        let subset: Subset = serde_json::from_str(r#"{ "value": [1700000000] }"#).unwrap();
        assert!(subset.figure().is_none());
    }

    #[test]
    fn observed_at_reads_unix_seconds() {
        let subset = Subset::new(1_700_000_000, "1");
        let at = subset.observed_at().unwrap();
        assert_eq!(at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn observed_at_rejects_non_numeric_timestamp() {
        let subset = Subset::new(Value::Bool(true), "1");
        assert!(subset.observed_at().is_none());
    }
}
