//! Maps fetch and derivation outcomes onto the display string.
//!
//! Loading, absent and failed all render as the same non-breaking space so
//! the surrounding layout keeps its height. [`RenderStatus`] keeps them
//! apart for logs and metrics only.

use serde::Serialize;

use crate::cache::FetchState;
use crate::derive::DerivedValue;
use crate::types::MetricsDocument;

/// Blank placeholder. Deliberately not an empty string.
pub const PLACEHOLDER: &str = "\u{a0}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Loading,
    Value,
    Absent,
    Failed,
}

impl RenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenderStatus::Loading => "loading",
            RenderStatus::Value => "value",
            RenderStatus::Absent => "absent",
            RenderStatus::Failed => "failed",
        }
    }
}

/// Display string for the given states. Never fails.
pub fn render(state: &FetchState<MetricsDocument>, derived: Option<&DerivedValue>) -> String {
    match (state, derived.and_then(DerivedValue::amount)) {
        (FetchState::Success(_), Some(amount)) => format_billions(amount),
        _ => PLACEHOLDER.to_string(),
    }
}

pub fn classify(state: &FetchState<MetricsDocument>, derived: Option<&DerivedValue>) -> RenderStatus {
    match state {
        FetchState::Pending => RenderStatus::Loading,
        FetchState::Failure(_) => RenderStatus::Failed,
        FetchState::Success(_) => match derived {
            Some(value) if value.is_present() => RenderStatus::Value,
            _ => RenderStatus::Absent,
        },
    }
}

/// `"$" + amount (one decimal) + "B"`.
pub fn format_billions(amount: f64) -> String {
    format!("${:.1}B", amount)
}
