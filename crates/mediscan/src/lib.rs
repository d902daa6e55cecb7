//! MediScan prediction server
//!
//! Hosts the inference adapter and credential store behind an HTTP API,
//! together with health, readiness and Prometheus endpoints.

pub mod api;
pub mod config;
