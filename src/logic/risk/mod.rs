//! Risk Module
//!
//! Turns sensor records into per-edge hazard severities.
//!
//! ## Structure
//! - `types.rs` - EdgeRisk, Hazard, RiskState
//! - `topology.rs` - GraphEdge, SensorRole rules, Topology loading
//! - `mapper.rs` - RiskMapper (record -> full RiskState pass)
//! - `store.rs` - RiskStore trait, file and memory backends

pub mod types;
pub mod topology;
pub mod mapper;
pub mod store;

pub use types::{EdgeRisk, Hazard, RiskState, Severity, active_edges};
pub use topology::{
    Condition, GraphEdge, SensorRole, SensorRoleMapping, SensorRule, Topology, TopologyError,
};
pub use mapper::{MapOutcome, RiskMapper, UpdateMode};
pub use store::{FileRiskStore, MemoryRiskStore, RiskStore, StoreError};
