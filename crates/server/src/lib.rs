//! HTTP control surface for the anisync daemon.

pub mod api;
pub mod metrics;
pub mod state;
