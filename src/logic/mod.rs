//! Logic Module - Ingest pipeline & risk engine
//!
//! bytes -> `serial` (lines) -> `record` (JSON records) -> `risk` (per-edge
//! severities) -> store + `board` (display snapshot).

pub mod config;
pub mod serial;
pub mod record;
pub mod risk;
pub mod pipeline;
pub mod board;
