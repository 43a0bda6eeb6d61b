//! Client core for the e-commerce analytics dashboard API.
//!
//! - `net`: typed HTTP client behind the injectable `DashboardApi` service.
//! - `state`: dashboard filters and the two conversation threads.
//! - `chart`: chart descriptor classification and number formatting.
//! - `view`: terminal rendering used by the `exorvia` binary.

pub mod chart;
pub mod config;
pub mod net;
pub mod state;
pub mod view;
