//! Client-side state: conversation threads and dashboard filters.
//!
//! DESIGN
//! ======
//! Both chat panels share one generic thread (`conversation`) with a
//! strategy per panel (`analysis`, `graphs`). Filter state lives apart in
//! `filters` so dashboard refetches depend only on the filter tuple.

pub mod analysis;
pub mod conversation;
pub mod filters;
pub mod graphs;
pub mod message;
