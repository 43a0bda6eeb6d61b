//! Dashboard filter state and the refetch rule that follows it.
//!
//! SYSTEM CONTEXT
//! ==============
//! The dashboard re-queries `GET /data` whenever the filter tuple changes.
//! The trigger is the canonical query parameter list: `DashboardState`
//! remembers the parameters of the last request and `needs_fetch` compares
//! against them, so identical filters never refetch and nothing outside
//! `FilterState` can cause one.

#[cfg(test)]
#[path = "filters_test.rs"]
mod filters_test;

use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use crate::net::api::DashboardApi;
use crate::net::types::{Aggregate, FilterLists};

/// Slider ceiling used before any aggregate has been received.
pub const FALLBACK_TRANSACTIONS_MAX: f64 = 50.0;
/// Slider ceiling used before any aggregate has been received.
pub const FALLBACK_DISCOUNT_MAX: f64 = 1.0;

// =============================================================================
// FILTER VALUES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeWindow {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    #[default]
    All,
}

impl TimeWindow {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMonth => "1m",
            Self::ThreeMonths => "3m",
            Self::SixMonths => "6m",
            Self::OneYear => "1y",
            Self::All => "all",
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "1m" => Ok(Self::OneMonth),
            "3m" => Ok(Self::ThreeMonths),
            "6m" => Ok(Self::SixMonths),
            "1y" => Ok(Self::OneYear),
            "all" => Ok(Self::All),
            other => Err(format!("unknown time window '{other}' (expected 1m, 3m, 6m, 1y or all)")),
        }
    }
}

/// The categorical multi-select filters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Facet {
    Regions,
    Categories,
    Tenure,
    Recency,
}

impl Facet {
    pub const ALL: [Self; 4] = [Self::Regions, Self::Categories, Self::Tenure, Self::Recency];

    /// Query parameter name for this facet.
    #[must_use]
    pub fn param(self) -> &'static str {
        match self {
            Self::Regions => "regions",
            Self::Categories => "categories",
            Self::Tenure => "customerTenure",
            Self::Recency => "customerRecency",
        }
    }

    /// Candidate values for this facet from an aggregate's filter lists.
    #[must_use]
    pub fn candidates(self, lists: &FilterLists) -> &[String] {
        match self {
            Self::Regions => &lists.regions,
            Self::Categories => &lists.categories,
            Self::Tenure => &lists.tenure_list,
            Self::Recency => &lists.recency_list,
        }
    }
}

/// A numeric range filter. `max = None` means "up to the slider ceiling".
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NumericRange {
    pub min: f64,
    pub max: Option<f64>,
}

impl NumericRange {
    /// Set both bounds against `ceiling`. A max at or above the ceiling is stored as open.
    pub fn set(&mut self, min: f64, max: f64, ceiling: f64) {
        let min = if min.is_finite() { min.clamp(0.0, ceiling.max(0.0)) } else { 0.0 };
        self.min = min;
        self.max = (max.is_finite() && max < ceiling).then(|| max.max(min));
    }

    /// Upper bound as shown on the slider.
    #[must_use]
    pub fn upper(&self, ceiling: f64) -> f64 {
        self.max.unwrap_or(ceiling)
    }

    /// Re-apply the current bounds against a new ceiling. A max the ceiling
    /// has dropped to or below reopens; the min is clamped under it.
    pub fn refit(&mut self, ceiling: f64) {
        let (min, max) = (self.min, self.max.unwrap_or(f64::INFINITY));
        self.set(min, max, ceiling);
    }
}

/// Every dashboard query filter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    pub regions: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub tenure: BTreeSet<String>,
    pub recency: BTreeSet<String>,
    pub transactions: NumericRange,
    pub discount: NumericRange,
    pub time_window: TimeWindow,
}

impl FilterState {
    #[must_use]
    pub fn facet(&self, facet: Facet) -> &BTreeSet<String> {
        match facet {
            Facet::Regions => &self.regions,
            Facet::Categories => &self.categories,
            Facet::Tenure => &self.tenure,
            Facet::Recency => &self.recency,
        }
    }

    pub fn facet_mut(&mut self, facet: Facet) -> &mut BTreeSet<String> {
        match facet {
            Facet::Regions => &mut self.regions,
            Facet::Categories => &mut self.categories,
            Facet::Tenure => &mut self.tenure,
            Facet::Recency => &mut self.recency,
        }
    }

    /// Flip one value in a facet. Returns `true` if the value is now selected.
    pub fn toggle(&mut self, facet: Facet, value: &str) -> bool {
        let set = self.facet_mut(facet);
        if set.remove(value) {
            false
        } else {
            set.insert(value.to_owned());
            true
        }
    }

    /// `GET /data` query parameters. Defaults are omitted: empty lists,
    /// non-positive bounds and the `all` time window.
    #[must_use]
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        for facet in Facet::ALL {
            let values = self.facet(facet);
            if !values.is_empty() {
                params.push((facet.param(), values.iter().map(String::as_str).collect::<Vec<_>>().join(",")));
            }
        }
        push_positive(&mut params, "totalTransactionsMin", Some(self.transactions.min));
        push_positive(&mut params, "totalTransactionsMax", self.transactions.max);
        push_positive(&mut params, "discountMin", Some(self.discount.min));
        push_positive(&mut params, "discountMax", self.discount.max);
        if self.time_window != TimeWindow::All {
            params.push(("timeFilter", self.time_window.as_str().to_owned()));
        }
        params
    }
}

fn push_positive(params: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<f64>) {
    if let Some(value) = value.filter(|v| v.is_finite() && *v > 0.0) {
        params.push((key, value.to_string()));
    }
}

// =============================================================================
// DASHBOARD STATE
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// The last fetch returned nothing; the page shows a full error.
    Failed,
}

type QueryKey = Vec<(&'static str, String)>;

/// Filters plus everything learned from the last successful aggregate.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardState {
    pub filters: FilterState,
    pub aggregate: Option<Aggregate>,
    pub status: LoadStatus,
    /// Candidate lists from the last successful response.
    pub lists: FilterLists,
    pub transactions_ceiling: f64,
    pub discount_ceiling: f64,
    last_requested: Option<QueryKey>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            filters: FilterState::default(),
            aggregate: None,
            status: LoadStatus::Idle,
            lists: FilterLists::default(),
            transactions_ceiling: FALLBACK_TRANSACTIONS_MAX,
            discount_ceiling: FALLBACK_DISCOUNT_MAX,
            last_requested: None,
        }
    }
}

impl DashboardState {
    /// True when the filters differ from the last request (or nothing was requested yet).
    #[must_use]
    pub fn needs_fetch(&self) -> bool {
        self.last_requested.as_ref() != Some(&self.filters.query_params())
    }

    /// Record that a fetch for the current filters is starting.
    pub fn begin_fetch(&mut self) -> FilterState {
        self.last_requested = Some(self.filters.query_params());
        self.status = LoadStatus::Loading;
        self.filters.clone()
    }

    /// Apply a fetch result. Results for filters that were changed since
    /// are dropped; the newer request will land after them.
    pub fn apply_fetch(&mut self, requested: &FilterState, result: Option<Aggregate>) -> bool {
        if self.last_requested.as_ref() != Some(&requested.query_params()) {
            return false;
        }
        match result {
            Some(aggregate) => {
                if let Some(max) = aggregate.filter_lists.transactions_max.filter(|v| v.is_finite() && *v > 0.0) {
                    self.transactions_ceiling = max;
                    self.filters.transactions.refit(max);
                }
                if let Some(max) = aggregate.filter_lists.discount_max.filter(|v| v.is_finite() && *v > 0.0) {
                    self.discount_ceiling = max;
                    self.filters.discount.refit(max);
                }
                self.lists = aggregate.filter_lists.clone();
                self.aggregate = Some(aggregate);
                self.status = LoadStatus::Ready;
            }
            None => {
                self.aggregate = None;
                self.status = LoadStatus::Failed;
            }
        }
        true
    }

    pub fn toggle(&mut self, facet: Facet, value: &str) -> bool {
        self.filters.toggle(facet, value)
    }

    /// Select every candidate the last response offered for `facet`.
    pub fn select_all(&mut self, facet: Facet) {
        let all: BTreeSet<String> = facet.candidates(&self.lists).iter().cloned().collect();
        *self.filters.facet_mut(facet) = all;
    }

    pub fn clear(&mut self, facet: Facet) {
        self.filters.facet_mut(facet).clear();
    }

    pub fn set_transactions(&mut self, min: f64, max: f64) {
        self.filters.transactions.set(min, max, self.transactions_ceiling);
    }

    pub fn set_discount(&mut self, min: f64, max: f64) {
        self.filters.discount.set(min, max, self.discount_ceiling);
    }

    pub fn set_time_window(&mut self, window: TimeWindow) {
        self.filters.time_window = window;
    }

    /// Reset every filter and restore ceilings from the last response.
    pub fn clear_all(&mut self) {
        self.filters = FilterState::default();
        self.transactions_ceiling = positive_or(self.lists.transactions_max, FALLBACK_TRANSACTIONS_MAX);
        self.discount_ceiling = positive_or(self.lists.discount_max, FALLBACK_DISCOUNT_MAX);
    }
}

fn positive_or(value: Option<f64>, fallback: f64) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(fallback)
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Dashboard state bound to the API service that refreshes it.
pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    state: DashboardState,
}

impl Dashboard {
    pub fn new(api: Arc<dyn DashboardApi>) -> Self {
        Self { api, state: DashboardState::default() }
    }

    #[must_use]
    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Mutate filters. Changes take effect on the next [`Dashboard::sync`].
    pub fn state_mut(&mut self) -> &mut DashboardState {
        &mut self.state
    }

    /// Fetch if the filters changed since the last request. Returns `true` if a request was made.
    pub async fn sync(&mut self) -> bool {
        if !self.state.needs_fetch() {
            return false;
        }
        let requested = self.state.begin_fetch();
        let result = self.api.fetch_dashboard_data(&requested).await;
        match &result {
            Some(_) => info!(params = requested.query_params().len(), "dashboard refreshed"),
            None => warn!("dashboard fetch returned no data"),
        }
        self.state.apply_fetch(&requested, result);
        true
    }
}
