//! Terminal rendering for the dashboard, chart views and chat transcripts.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every function here is a pure projection from state to text. Charts are
//! always drawn from a `ChartView`, so a malformed chart prints its own
//! placeholder line and never affects the charts around it.

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde_json::{Value, json};
use time::Date;
use time::macros::format_description;

use crate::chart::normalize::{PieSlice, Point, bar_label};
use crate::chart::{ChartView, PlotShape, RenderPlan, format_currency, format_number, normalize};
use crate::net::types::{Aggregate, Chart, Health, Kpis, MonthlyPoint};
use crate::state::filters::{DashboardState, FilterState, LoadStatus};
use crate::state::message::{Message, Role, group_by_date};

/// Width of the longest bar, in cells.
pub const BAR_WIDTH: usize = 32;
const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const MISSING_VALUE: &str = "–";

pub const DASHBOARD_FAILED: &str = "Could not load dashboard data. Check that the API is reachable and try again.";
pub const DASHBOARD_LOADING: &str = "Loading dashboard…";

// =============================================================================
// DASHBOARD
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KpiCard {
    pub label: &'static str,
    pub value: String,
}

#[must_use]
pub fn kpi_cards(kpis: &Kpis) -> Vec<KpiCard> {
    vec![
        KpiCard { label: "Total Revenue", value: format_currency(kpis.total_revenue) },
        KpiCard { label: "Avg Order Value", value: format_currency(kpis.avg_aov) },
        KpiCard { label: "Avg Lifetime Value", value: format_currency(kpis.avg_ltv) },
        KpiCard { label: "Avg CAC", value: format!("{:.1}%", kpis.avg_cac_percent) },
        KpiCard { label: "Avg ROAS", value: format!("{:.2}x", kpis.avg_roas) },
        KpiCard { label: "Avg Customer Lifetime", value: format!("{} days", format_number(kpis.avg_lifetime)) },
    ]
}

/// The dashboard's fixed sections expressed as chart descriptors, so they
/// go through the same normalizer as generated charts.
#[must_use]
pub fn dashboard_charts(aggregate: &Aggregate) -> Vec<Chart> {
    let monthly = |key: &str, pick: fn(&MonthlyPoint) -> Option<f64>| -> Vec<Value> {
        aggregate.monthly_data.iter().map(|row| json!({ "month": row.month, (key): pick(row) })).collect()
    };

    vec![
        section("Monthly Revenue", "area", "month", "revenue", monthly("revenue", |r| r.revenue)),
        section("Lost Revenue", "line", "month", "lost_revenue", monthly("lost_revenue", |r| r.lost_revenue)),
        section("Customer Acquisition Cost", "line", "month", "cac", monthly("cac", |r| r.cac)),
        section(
            "Transactions by Region",
            "pie",
            "name",
            "value",
            aggregate.region_data.iter().map(|r| json!({ "name": r.name, "value": r.value })).collect(),
        ),
        section("Volume by Category", "bar", "category", "volume", category_totals(&aggregate.category_monthly_data)),
        section(
            "Purchase Frequency",
            "bar",
            "num_purchases",
            "customer_count",
            aggregate
                .histogram_data
                .iter()
                .map(|b| json!({ "num_purchases": b.num_purchases, "customer_count": b.customer_count }))
                .collect(),
        ),
        section(
            "ROAS by Category",
            "bar",
            "category",
            "avg_roas",
            aggregate.roas_category_data.iter().map(|r| json!({ "category": r.category, "avg_roas": r.avg_roas })).collect(),
        ),
        section(
            "AOV by Weeks Since First Purchase",
            "line",
            "weeks_since_first",
            "avg_aov",
            aggregate
                .aov_days_data
                .iter()
                .map(|w| json!({ "weeks_since_first": w.weeks_since_first, "avg_aov": w.avg_aov }))
                .collect(),
        ),
    ]
}

fn section(title: &str, chart_type: &str, x_key: &str, y_key: &str, rows: Vec<Value>) -> Chart {
    Chart {
        title: title.to_owned(),
        chart_type: chart_type.to_owned(),
        data: Value::Array(rows),
        x_key: Some(x_key.to_owned()),
        y_key: Some(y_key.to_owned()),
        error: None,
    }
}

/// Sum the month-pivoted category volumes into one row per category.
fn category_totals(rows: &[serde_json::Map<String, Value>]) -> Vec<Value> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for row in rows {
        for (category, volume) in row.iter().filter(|(key, _)| key.as_str() != "month") {
            *totals.entry(category.as_str()).or_default() += volume.as_f64().unwrap_or(0.0);
        }
    }
    totals.into_iter().map(|(category, volume)| json!({ "category": category, "volume": volume })).collect()
}

/// Active filters as `key=value` pairs, or `none`.
#[must_use]
pub fn render_filters(filters: &FilterState) -> String {
    let params = filters.query_params();
    if params.is_empty() {
        return "Filters: none".to_owned();
    }
    let pairs: Vec<String> = params.iter().map(|(key, value)| format!("{key}={value}")).collect();
    format!("Filters: {}", pairs.join(", "))
}

#[must_use]
pub fn render_dashboard(state: &DashboardState) -> String {
    let aggregate = match (state.status, &state.aggregate) {
        (LoadStatus::Failed, _) => return DASHBOARD_FAILED.to_owned(),
        (LoadStatus::Ready, Some(aggregate)) => aggregate,
        _ => return DASHBOARD_LOADING.to_owned(),
    };

    let mut out = render_filters(&state.filters);
    out.push_str("\n\n");
    let cards = kpi_cards(&aggregate.kpis);
    let width = cards.iter().map(|card| card.label.len()).max().unwrap_or(0);
    for card in cards {
        let _ = writeln!(out, "{:<width$}  {}", card.label, card.value);
    }
    for chart in dashboard_charts(aggregate) {
        out.push('\n');
        out.push_str(&render_view(&normalize(&chart)));
    }
    out
}

#[must_use]
pub fn render_health(health: &Health) -> String {
    let mut out = format!("status: {}\ndatabase: {}", health.status, health.database);
    if let Some(environment) = &health.environment {
        let _ = write!(out, "\nenvironment: {environment}");
    }
    out
}

// =============================================================================
// CHART VIEWS
// =============================================================================

/// Draw one classified chart. Placeholders render as a single warning line.
#[must_use]
pub fn render_view(view: &ChartView) -> String {
    let detail = match view {
        ChartView::Render(plan) => return render_plan(plan),
        ChartView::Error { error, .. } => error.clone(),
        ChartView::NoData { .. } => "no data available".to_owned(),
        ChartView::ColumnsUndetermined { available, .. } if available.is_empty() => {
            "could not determine columns (no columns found)".to_owned()
        }
        ChartView::ColumnsUndetermined { available, .. } => {
            format!("could not determine columns (available: {})", available.join(", "))
        }
    };
    format!("⚠ {}: {detail}\n", view.title())
}

fn render_plan(plan: &RenderPlan) -> String {
    let mut out = format!("{}\n", plan.title);
    match &plan.shape {
        PlotShape::Bar { rotate_labels } => draw_bars(&mut out, &plan.points, *rotate_labels),
        PlotShape::Line { .. } | PlotShape::Area { .. } => draw_series(&mut out, plan),
        PlotShape::Pie { slices } => draw_pie(&mut out, slices),
    }
    out
}

fn draw_bars(out: &mut String, points: &[Point], rotate_labels: bool) {
    let labels: Vec<String> = points.iter().map(|p| bar_label(&p.label, rotate_labels)).collect();
    let width = labels.iter().map(|label| label.chars().count()).max().unwrap_or(0);
    let peak = points.iter().filter_map(|p| p.value).map(f64::abs).fold(0.0, f64::max);
    for (label, point) in labels.iter().zip(points) {
        let bar = "█".repeat(point.value.map_or(0, |v| scaled(v.abs(), peak, BAR_WIDTH)));
        let _ = writeln!(out, "  {label:<width$} │{bar} {}", value_text(point.value));
    }
}

fn draw_series(out: &mut String, plan: &RenderPlan) {
    let values: Vec<f64> = plan.points.iter().filter_map(|p| p.value).collect();
    let low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let spark: String = plan
        .points
        .iter()
        .map(|p| match p.value {
            Some(v) if high > low => SPARK_LEVELS[scaled(v - low, high - low, SPARK_LEVELS.len() - 1)],
            Some(_) => SPARK_LEVELS[0],
            None => ' ',
        })
        .collect();
    let _ = writeln!(out, "  {} over {}", plan.y_key, plan.x_key);
    let _ = writeln!(out, "  {spark}");
    if let (Some(first), Some(last)) = (plan.points.first(), plan.points.last()) {
        let _ = writeln!(out, "  {} … {}", first.label, last.label);
    }
    if values.is_empty() {
        let _ = writeln!(out, "  range: {MISSING_VALUE}");
    } else {
        let _ = writeln!(out, "  range: {} to {}", format_number(low), format_number(high));
    }
}

fn draw_pie(out: &mut String, slices: &[PieSlice]) {
    let width = slices.iter().filter(|s| s.show_label).map(|s| s.label.chars().count()).max().unwrap_or(0);
    let mut hidden = 0_usize;
    let mut hidden_share = 0.0;
    for slice in slices {
        if slice.show_label {
            let _ = writeln!(out, "  {:<width$} {:>5.1}%  {}", slice.label, slice.share * 100.0, format_number(slice.value));
        } else {
            hidden += 1;
            hidden_share += slice.share;
        }
    }
    if hidden > 0 {
        let _ = writeln!(out, "  + {hidden} small slice(s), {:.1}% combined", hidden_share * 100.0);
    }
}

fn value_text(value: Option<f64>) -> String {
    value.map_or_else(|| MISSING_VALUE.to_owned(), format_number)
}

/// `value / max` of `cells`, rounded. Zero when `max` is not positive.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn scaled(value: f64, max: f64, cells: usize) -> usize {
    if max.is_nan() || max <= 0.0 || !value.is_finite() {
        return 0;
    }
    ((value / max).clamp(0.0, 1.0) * cells as f64).round() as usize
}

// =============================================================================
// TRANSCRIPTS
// =============================================================================

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
    }
}

/// One message, with its charts drawn underneath and indented.
#[must_use]
pub fn render_message(message: &Message) -> String {
    let clock = format_description!("[hour]:[minute]");
    let stamp = message.timestamp.and_then(|ts| ts.format(clock).ok()).map(|t| format!("[{t}] ")).unwrap_or_default();
    let mut out = format!("{stamp}{}: {}\n", role_label(message.role), message.content);
    for chart in message.charts.iter().flatten() {
        for line in render_view(&normalize(chart)).lines() {
            let _ = writeln!(out, "    {line}");
        }
    }
    out
}

/// Messages partitioned under date dividers.
#[must_use]
pub fn render_transcript(messages: &[Message], today: Date) -> String {
    let mut out = String::new();
    for group in group_by_date(messages, today) {
        let _ = writeln!(out, "── {} ──", group.label);
        for message in group.messages {
            out.push_str(&render_message(message));
        }
    }
    out
}
