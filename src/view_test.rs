use super::*;
use crate::net::types::{AovWeek, CategoryRoas, FilterLists, HistogramBin, RegionSlice};
use crate::state::filters::Facet;
use time::macros::{date, datetime};

fn sample_aggregate() -> Aggregate {
    let category_row = |month: &str, books: f64, toys: f64| {
        let mut row = serde_json::Map::new();
        row.insert("month".into(), json!(month));
        row.insert("Books".into(), json!(books));
        row.insert("Toys".into(), json!(toys));
        row
    };
    Aggregate {
        kpis: Kpis {
            total_revenue: 1_260_000.0,
            avg_aov: 84.2,
            avg_ltv: 2_400.0,
            avg_cac_percent: 12.345,
            avg_roas: 3.5,
            avg_lifetime: 412.0,
        },
        monthly_data: vec![
            MonthlyPoint { month: "Jan 2024".into(), revenue: Some(100.0), lost_revenue: Some(5.0), cac: Some(12.0) },
            MonthlyPoint { month: "Feb 2024".into(), revenue: Some(300.0), lost_revenue: None, cac: Some(11.0) },
        ],
        region_data: vec![
            RegionSlice { name: "West".into(), value: Some(70.0), fill: None },
            RegionSlice { name: "East".into(), value: Some(28.0), fill: None },
            RegionSlice { name: "North".into(), value: Some(2.0), fill: None },
        ],
        category_monthly_data: vec![category_row("Jan 2024", 3.0, 1.0), category_row("Feb 2024", 4.0, 2.0)],
        histogram_data: vec![HistogramBin { num_purchases: Some(1.0), customer_count: Some(40.0) }],
        roas_category_data: vec![CategoryRoas { category: "Books".into(), avg_roas: Some(2.5) }],
        aov_days_data: vec![AovWeek { weeks_since_first: Some(0.0), avg_aov: Some(80.0) }],
        filter_lists: FilterLists::default(),
    }
}

// =============================================================
// dashboard
// =============================================================

#[test]
fn kpi_cards_format_each_value() {
    let values: Vec<String> = kpi_cards(&sample_aggregate().kpis).into_iter().map(|card| card.value).collect();
    assert_eq!(values, vec!["$1.3M", "$84.20", "$2.4K", "12.3%", "3.50x", "412 days"]);
}

#[test]
fn dashboard_charts_all_render_from_a_full_aggregate() {
    let charts = dashboard_charts(&sample_aggregate());
    assert_eq!(charts.len(), 8);
    assert!(charts.iter().all(|chart| normalize(chart).is_renderable()));
}

#[test]
fn dashboard_charts_from_empty_aggregate_are_no_data() {
    let charts = dashboard_charts(&Aggregate::default());
    for chart in &charts {
        assert_eq!(normalize(chart), ChartView::NoData { title: chart.title.clone() });
    }
}

#[test]
fn category_volumes_are_summed_across_months() {
    let charts = dashboard_charts(&sample_aggregate());
    let volume = charts.iter().find(|chart| chart.title == "Volume by Category").unwrap();
    assert_eq!(volume.data, json!([{"category": "Books", "volume": 7.0}, {"category": "Toys", "volume": 3.0}]));
}

#[test]
fn failed_dashboard_shows_full_error() {
    let mut state = DashboardState::default();
    let requested = state.begin_fetch();
    state.apply_fetch(&requested, None);
    assert_eq!(render_dashboard(&state), DASHBOARD_FAILED);
}

#[test]
fn loading_dashboard_shows_loading_text() {
    assert_eq!(render_dashboard(&DashboardState::default()), DASHBOARD_LOADING);
}

#[test]
fn ready_dashboard_lists_filters_kpis_and_sections() {
    let mut state = DashboardState::default();
    let requested = state.begin_fetch();
    state.apply_fetch(&requested, Some(sample_aggregate()));
    state.toggle(Facet::Regions, "West");

    let text = render_dashboard(&state);

    assert!(text.starts_with("Filters: regions=West\n"));
    assert!(text.contains("Total Revenue"));
    assert!(text.contains("Transactions by Region"));
    assert!(text.contains("+ 1 small slice(s), 2.0% combined"));
}

#[test]
fn render_filters_without_selection() {
    assert_eq!(render_filters(&FilterState::default()), "Filters: none");
}

#[test]
fn render_health_includes_environment_when_present() {
    let health = Health {
        status: "ok".into(),
        database: "connected".into(),
        environment: Some("production".into()),
        timestamp: None,
    };
    assert_eq!(render_health(&health), "status: ok\ndatabase: connected\nenvironment: production");
}

// =============================================================
// chart views
// =============================================================

#[test]
fn placeholders_render_one_warning_line() {
    assert_eq!(render_view(&ChartView::NoData { title: "Sales".into() }), "⚠ Sales: no data available\n");
    assert_eq!(
        render_view(&ChartView::Error { title: "Revenue".into(), error: "LLM timeout".into() }),
        "⚠ Revenue: LLM timeout\n"
    );
    assert_eq!(
        render_view(&ChartView::ColumnsUndetermined { title: "T".into(), available: vec!["only".into()] }),
        "⚠ T: could not determine columns (available: only)\n"
    );
}

#[test]
fn bars_scale_to_the_largest_value() {
    let chart: Chart = serde_json::from_value(json!({
        "title": "Orders",
        "chart_type": "bar",
        "data": [{"day": "Mon", "n": 10}, {"day": "Tue", "n": 5}, {"day": "Wed", "n": "?"}]
    }))
    .unwrap();

    let text = render_view(&normalize(&chart));
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines[0], "Orders");
    assert_eq!(lines[1], format!("  Mon │{} 10", "█".repeat(BAR_WIDTH)));
    assert_eq!(lines[2], format!("  Tue │{} 5", "█".repeat(BAR_WIDTH / 2)));
    assert_eq!(lines[3], "  Wed │ –");
}

#[test]
fn line_renders_sparkline_and_range() {
    let chart: Chart = serde_json::from_value(json!({
        "title": "Trend",
        "chart_type": "line",
        "data": [{"m": "Jan", "v": 0}, {"m": "Feb", "v": 7}, {"m": "Mar", "v": null}]
    }))
    .unwrap();

    let text = render_view(&normalize(&chart));

    assert!(text.contains("  v over m\n"));
    assert!(text.contains("  ▁█ \n"));
    assert!(text.contains("  Jan … Mar\n"));
    assert!(text.contains("  range: 0 to 7\n"));
}

#[test]
fn scaled_handles_degenerate_inputs() {
    assert_eq!(scaled(5.0, 0.0, 10), 0);
    assert_eq!(scaled(f64::NAN, 1.0, 10), 0);
    assert_eq!(scaled(2.0, 1.0, 10), 10);
    assert_eq!(scaled(0.5, 1.0, 10), 5);
}

// =============================================================
// transcripts
// =============================================================

#[test]
fn transcript_groups_under_date_dividers() {
    let messages = vec![
        Message::user("old question", Some(datetime!(2024-12-01 09:00 UTC))),
        Message::assistant("old answer", Some(datetime!(2024-12-01 09:01 UTC))),
        Message::user("new question", Some(datetime!(2024-12-06 10:30 UTC))),
    ];

    let text = render_transcript(&messages, date!(2024-12-06));

    assert_eq!(
        text,
        "── 01/12/2024 ──\n\
         [09:00] You: old question\n\
         [09:01] Assistant: old answer\n\
         ── Today ──\n\
         [10:30] You: new question\n"
    );
}

#[test]
fn chart_replies_draw_each_chart_indented() {
    let charts = vec![
        serde_json::from_value::<Chart>(json!({"title": "Empty", "chart_type": "bar", "data": []})).unwrap(),
        serde_json::from_value::<Chart>(json!({"title": "Broken", "chart_type": "error", "error": "bad sql"})).unwrap(),
    ];
    let message = Message::assistant("Here are the charts.", None).with_charts(charts);

    assert_eq!(
        render_message(&message),
        "Assistant: Here are the charts.\n    ⚠ Empty: no data available\n    ⚠ Broken: bad sql\n"
    );
}
