//! Networking modules for the analytics backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` owns the HTTP calls and error normalization, `types` defines the
//! wire schema both conversation threads and the dashboard consume.

pub mod api;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
