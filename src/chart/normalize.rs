//! Chart descriptor → render plan.
//!
//! DESIGN
//! ======
//! Chart descriptors come from the network (and, for the chart thread, from
//! an LLM), so nothing about their shape is trusted. `normalize` is the only
//! place that inspects `Chart::data`; it classifies each descriptor into
//! exactly one `ChartView` variant and everything downstream draws from that.
//!
//! Classification order:
//! 1. `chart_type == "error"` → `Error`.
//! 2. `data` missing, not an array, empty, or first row not an object → `NoData`.
//! 3. Axis keys resolve against the first row's keys (explicit key if present,
//!    otherwise first/second column).
//! 4. Fewer than two resolvable keys → `ColumnsUndetermined`.
//! 5. Otherwise `Render` with a shape chosen by type (unknown types plot as bars).

#[cfg(test)]
#[path = "normalize_test.rs"]
mod normalize_test;

use serde_json::{Map, Value};

use crate::net::api::UNKNOWN_SERVER_ERROR;
use crate::net::types::Chart;

/// Bar charts with more rows than this rotate and truncate category labels.
pub const BAR_LABEL_ROTATE_THRESHOLD: usize = 8;
/// Longest rotated bar label before truncation.
pub const BAR_LABEL_MAX_CHARS: usize = 12;
/// Pie slices below this share of the total draw without a label.
pub const PIE_LABEL_MIN_SHARE: f64 = 0.04;

// =============================================================================
// TYPES
// =============================================================================

/// Exactly one of these is produced per chart descriptor.
#[derive(Clone, Debug, PartialEq)]
pub enum ChartView {
    Render(RenderPlan),
    NoData { title: String },
    ColumnsUndetermined { title: String, available: Vec<String> },
    Error { title: String, error: String },
}

impl ChartView {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Render(plan) => &plan.title,
            Self::NoData { title } | Self::ColumnsUndetermined { title, .. } | Self::Error { title, .. } => title,
        }
    }

    #[must_use]
    pub fn is_renderable(&self) -> bool {
        matches!(self, Self::Render(_))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderPlan {
    pub title: String,
    pub x_key: String,
    pub y_key: String,
    pub points: Vec<Point>,
    pub shape: PlotShape,
}

/// One row projected onto the resolved axes.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub label: String,
    /// `None` when the y cell is missing or not numeric.
    pub value: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Monotone,
}

#[derive(Clone, Debug, PartialEq)]
pub enum PlotShape {
    Bar { rotate_labels: bool },
    Line { interpolation: Interpolation },
    Area { interpolation: Interpolation },
    Pie { slices: Vec<PieSlice> },
}

#[derive(Clone, Debug, PartialEq)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
    /// Fraction of the pie total, `0.0..=1.0`.
    pub share: f64,
    pub show_label: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ChartKind {
    Bar,
    Line,
    Area,
    Pie,
    Error,
}

impl ChartKind {
    /// Exact, case-sensitive match on the backend's `chart_type`.
    fn parse(raw: &str) -> Self {
        match raw {
            "line" => Self::Line,
            "area" => Self::Area,
            "pie" => Self::Pie,
            "error" => Self::Error,
            _ => Self::Bar,
        }
    }
}

// =============================================================================
// NORMALIZE
// =============================================================================

#[must_use]
pub fn normalize(chart: &Chart) -> ChartView {
    let title = chart.title.clone();
    let kind = ChartKind::parse(&chart.chart_type);

    if kind == ChartKind::Error {
        let error = chart.error.clone().unwrap_or_else(|| UNKNOWN_SERVER_ERROR.to_owned());
        return ChartView::Error { title, error };
    }

    let Some(rows) = chart.data.as_array().filter(|rows| !rows.is_empty()) else {
        return ChartView::NoData { title };
    };
    let Some(first) = rows[0].as_object() else {
        return ChartView::NoData { title };
    };

    let available: Vec<String> = first.keys().cloned().collect();
    let (Some(x_key), Some(y_key)) = (
        resolve_key(chart.x_key.as_deref(), first, 0),
        resolve_key(chart.y_key.as_deref(), first, 1),
    ) else {
        return ChartView::ColumnsUndetermined { title, available };
    };

    let points: Vec<Point> = rows
        .iter()
        .filter_map(Value::as_object)
        .map(|row| Point { label: cell_label(row.get(&x_key)), value: cell_number(row.get(&y_key)) })
        .collect();

    let shape = match kind {
        ChartKind::Line => PlotShape::Line { interpolation: Interpolation::Monotone },
        ChartKind::Area => PlotShape::Area { interpolation: Interpolation::Monotone },
        ChartKind::Pie => PlotShape::Pie { slices: pie_slices(&points) },
        ChartKind::Bar | ChartKind::Error => PlotShape::Bar { rotate_labels: points.len() > BAR_LABEL_ROTATE_THRESHOLD },
    };

    ChartView::Render(RenderPlan { title, x_key, y_key, points, shape })
}

/// The explicit key when it names a column of `row`, else the column at `fallback`.
fn resolve_key(explicit: Option<&str>, row: &Map<String, Value>, fallback: usize) -> Option<String> {
    match explicit {
        Some(key) if row.contains_key(key) => Some(key.to_owned()),
        _ => row.keys().nth(fallback).cloned(),
    }
}

fn cell_label(cell: Option<&Value>) -> String {
    match cell {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn cell_number(cell: Option<&Value>) -> Option<f64> {
    let number = match cell? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn pie_slices(points: &[Point]) -> Vec<PieSlice> {
    let values: Vec<f64> = points.iter().map(|p| p.value.unwrap_or(0.0).max(0.0)).collect();
    let total: f64 = values.iter().sum();
    points
        .iter()
        .zip(values)
        .map(|(point, value)| {
            let share = if total > 0.0 { value / total } else { 0.0 };
            PieSlice { label: point.label.clone(), value, share, show_label: share >= PIE_LABEL_MIN_SHARE }
        })
        .collect()
}

/// Category label as drawn under a bar. Rotated labels are cut to
/// [`BAR_LABEL_MAX_CHARS`] with a trailing ellipsis.
#[must_use]
pub fn bar_label(label: &str, rotate: bool) -> String {
    if !rotate || label.chars().count() <= BAR_LABEL_MAX_CHARS {
        return label.to_owned();
    }
    let mut short: String = label.chars().take(BAR_LABEL_MAX_CHARS - 1).collect();
    short.push('…');
    short
}
