//! Shipping decision and COD risk engine for a checkout.
//!
//! A cart flows through origin planning, packaging, rate acquisition and rate
//! aggregation (see [`shipping`]); the [`risk`] module scores cash-on-delivery
//! risk from the same checkout context. [`reconciliation`] closes the loop by
//! comparing courier invoices with what checkout quoted.

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod reconciliation;
pub mod risk;
pub mod router;
pub mod shipping;
pub mod telemetry;

pub use router::{engine_router, EngineState};
