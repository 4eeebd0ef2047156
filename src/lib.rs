//! Route Risk Core
//!
//! Streams newline-delimited JSON frames from a sensor hub, maps every
//! frame onto a fixed route graph as per-edge hazard severities, and keeps
//! a durable snapshot for the dashboard.

pub mod api;
pub mod constants;
pub mod logic;
