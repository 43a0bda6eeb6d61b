//! Wire schema for the analytics backend.
//!
//! DESIGN
//! ======
//! The backend nulls out NaN/Inf values and the chart payloads are produced
//! by an LLM, so decoding here is deliberately forgiving: numeric fields
//! accept `null`, string lists skip `null` entries, and charts decode from
//! any JSON value. Shape problems inside a chart are left for the chart
//! normalizer to classify.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// DASHBOARD AGGREGATE
// =============================================================================

/// The consolidated object the dashboard renders from (first element of `GET /data`).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    #[serde(default)]
    pub kpis: Kpis,
    #[serde(default)]
    pub monthly_data: Vec<MonthlyPoint>,
    #[serde(default)]
    pub region_data: Vec<RegionSlice>,
    /// Month rows pivoted by category: `{month, <category>: volume, ...}`.
    #[serde(default)]
    pub category_monthly_data: Vec<Map<String, Value>>,
    #[serde(default)]
    pub histogram_data: Vec<HistogramBin>,
    #[serde(default)]
    pub roas_category_data: Vec<CategoryRoas>,
    #[serde(default)]
    pub aov_days_data: Vec<AovWeek>,
    #[serde(default)]
    pub filter_lists: FilterLists,
}

/// Headline KPI values. Missing or null values read as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    #[serde(rename = "totalRevenue", default, deserialize_with = "null_as_default")]
    pub total_revenue: f64,
    #[serde(rename = "avgAOV", default, deserialize_with = "null_as_default")]
    pub avg_aov: f64,
    #[serde(rename = "avgLTV", default, deserialize_with = "null_as_default")]
    pub avg_ltv: f64,
    #[serde(rename = "avgCACPercent", default, deserialize_with = "null_as_default")]
    pub avg_cac_percent: f64,
    #[serde(rename = "avgROAS", default, deserialize_with = "null_as_default")]
    pub avg_roas: f64,
    #[serde(rename = "avgLifetime", default, deserialize_with = "null_as_default")]
    pub avg_lifetime: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    #[serde(default, deserialize_with = "null_as_default")]
    pub month: String,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub lost_revenue: Option<f64>,
    #[serde(default)]
    pub cac: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RegionSlice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub fill: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    #[serde(default)]
    pub num_purchases: Option<f64>,
    #[serde(default)]
    pub customer_count: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRoas {
    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(default)]
    pub avg_roas: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AovWeek {
    #[serde(default)]
    pub weeks_since_first: Option<f64>,
    #[serde(default)]
    pub avg_aov: Option<f64>,
}

/// Filter candidates and slider ceilings reported alongside every aggregate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterLists {
    #[serde(default, deserialize_with = "strings_skip_null")]
    pub regions: Vec<String>,
    #[serde(default, deserialize_with = "strings_skip_null")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "strings_skip_null")]
    pub tenure_list: Vec<String>,
    #[serde(default, deserialize_with = "strings_skip_null")]
    pub recency_list: Vec<String>,
    #[serde(default)]
    pub transactions_max: Option<f64>,
    #[serde(default)]
    pub discount_max: Option<f64>,
}

// =============================================================================
// CHAT + GRAPHS
// =============================================================================

/// Successful `POST /text/analyze` reply.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub summary: String,
    /// Server timestamp, ISO-8601 without offset.
    pub timestamp: Option<String>,
}

/// Successful `POST /graphs/generate` reply.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphSet {
    pub charts: Vec<Chart>,
    /// Plain-text list of the chart questions the backend derived.
    pub questions: Option<String>,
    pub timestamp: Option<String>,
}

/// One persisted analysis exchange from `GET /chat/history`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatHistoryRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub assistant_response: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// One persisted chart request from `GET /graphs/history`. Charts themselves are not stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphHistoryRow {
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_message: String,
    #[serde(default)]
    pub queries_text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// `GET /health` diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Health {
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub database: String,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

// =============================================================================
// CHART
// =============================================================================

/// A chart descriptor exactly as the backend sent it.
///
/// Decodes from any JSON value; non-string fields become `None`/defaults and
/// `data` is kept raw so the normalizer can classify it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct Chart {
    pub title: String,
    pub chart_type: String,
    pub data: Value,
    #[serde(rename = "xKey", skip_serializing_if = "Option::is_none")]
    pub x_key: Option<String>,
    #[serde(rename = "yKey", skip_serializing_if = "Option::is_none")]
    pub y_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub const DEFAULT_CHART_TITLE: &str = "Chart";

impl From<Value> for Chart {
    fn from(value: Value) -> Self {
        let text = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_owned);
        Self {
            title: text("title").unwrap_or_else(|| DEFAULT_CHART_TITLE.to_owned()),
            chart_type: text("chart_type").unwrap_or_default(),
            data: value.get("data").cloned().unwrap_or(Value::Null),
            x_key: text("xKey"),
            y_key: text("yKey"),
            error: text("error"),
        }
    }
}

// =============================================================================
// RESPONSE ENVELOPES
// =============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub charts: Option<Vec<Chart>>,
    #[serde(default, alias = "questions_text")]
    pub questions: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(crate) struct HistoryEnvelope<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default = "Vec::new")]
    pub history: Vec<T>,
    #[serde(default)]
    pub error: Option<String>,
}

// =============================================================================
// LENIENT DECODERS
// =============================================================================

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn strings_skip_null<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = Option::<Vec<Option<String>>>::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}
