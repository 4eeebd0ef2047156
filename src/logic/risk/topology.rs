//! Topology - Graph edges and sensor roles
//!
//! The graph and its sensor mapping are loaded once at startup and never
//! change afterwards.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::{Hazard, Severity};
use crate::logic::record::SensorRecord;

// ============================================================================
// GRAPH
// ============================================================================

/// Directed pair of location names
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
}

impl GraphEdge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Edge key: `"{from}-{to}"`
    pub fn key(&self) -> String {
        format!("{}-{}", self.from, self.to)
    }
}

// ============================================================================
// SENSOR ROLES
// ============================================================================

/// Threshold condition of a sensor rule
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    Equals(f64),
    GreaterThan(f64),
}

impl Condition {
    pub fn holds(&self, value: f64) -> bool {
        match *self {
            Self::Equals(expected) => value == expected,
            Self::GreaterThan(limit) => value > limit,
        }
    }
}

/// Fixed rule attached to a sensor role
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRule {
    pub condition: Condition,
    pub hazard: Hazard,
    pub severity: Severity,
}

/// Logical sensor bound to edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorRole {
    Vibration,
    Water1,
    Water2,
    Smoke1,
    Smoke2,
    Tilt1,
    Tilt2,
}

impl SensorRole {
    pub const ALL: [SensorRole; 7] = [
        SensorRole::Vibration,
        SensorRole::Water1,
        SensorRole::Water2,
        SensorRole::Smoke1,
        SensorRole::Smoke2,
        SensorRole::Tilt1,
        SensorRole::Tilt2,
    ];

    /// Role name as written in topology files
    pub fn name(&self) -> &'static str {
        match self {
            Self::Vibration => "vibration",
            Self::Water1 => "water1",
            Self::Water2 => "water2",
            Self::Smoke1 => "smoke1",
            Self::Smoke2 => "smoke2",
            Self::Tilt1 => "tilt1",
            Self::Tilt2 => "tilt2",
        }
    }

    /// JSON field carrying this sensor's reading.
    ///
    /// Same text as the role name for the current firmware.
    pub fn field(&self) -> &'static str {
        self.name()
    }

    pub fn rule(&self) -> SensorRule {
        let (condition, hazard, severity) = match self {
            Self::Vibration => (Condition::Equals(1.0), Hazard::Earthquake, 1),
            Self::Water1 | Self::Water2 => (Condition::GreaterThan(1800.0), Hazard::Flood, 3),
            Self::Smoke1 => (Condition::GreaterThan(1500.0), Hazard::Fire, 4),
            Self::Smoke2 => (Condition::GreaterThan(3000.0), Hazard::Fire, 4),
            Self::Tilt1 | Self::Tilt2 => (Condition::Equals(1.0), Hazard::Landslide, 2),
        };
        SensorRule {
            condition,
            hazard,
            severity,
        }
    }

    /// Hazard and severity this role raises for `record`, if any
    pub fn evaluate(&self, record: &SensorRecord) -> Option<(Hazard, Severity)> {
        let rule = self.rule();
        let value = record.number(self.field())?;
        rule.condition
            .holds(value)
            .then_some((rule.hazard, rule.severity))
    }
}

impl std::fmt::Display for SensorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// edge-key -> ordered roles
pub type SensorRoleMapping = BTreeMap<String, Vec<SensorRole>>;

// ============================================================================
// TOPOLOGY
// ============================================================================

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("graph has no edges")]
    EmptyGraph,

    #[error("duplicate edge {0}")]
    DuplicateEdge(String),

    #[error("sensor mapping references unknown edge {0}")]
    UnknownEdge(String),

    #[error("failed to read topology file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid topology file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Graph edges plus their sensor roles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub edges: Vec<GraphEdge>,
    #[serde(default)]
    pub sensors: SensorRoleMapping,
}

impl Topology {
    /// Build and validate a topology
    pub fn new(edges: Vec<GraphEdge>, sensors: SensorRoleMapping) -> Result<Self, TopologyError> {
        let topology = Self { edges, sensors };
        topology.validate()?;
        Ok(topology)
    }

    /// Eight-edge route graph around Dehradun used by the field device
    pub fn builtin() -> Self {
        use SensorRole::*;

        let wiring: [(&str, &str, &[SensorRole]); 8] = [
            ("Dehradun", "Mussoorie", &[Vibration]),
            ("Dehradun", "Haridwar", &[Water1]),
            ("Dehradun", "Rishikesh", &[Smoke1]),
            ("Haridwar", "Rishikesh", &[Tilt1]),
            ("Mussoorie", "Rishikesh", &[Water2]),
            ("Mussoorie", "Chamba", &[Smoke2]),
            ("Chamba", "Tehri", &[]),
            ("Rishikesh", "Tehri", &[Tilt2]),
        ];

        let mut edges = Vec::with_capacity(wiring.len());
        let mut sensors = SensorRoleMapping::new();
        for (from, to, roles) in wiring {
            let edge = GraphEdge::new(from, to);
            sensors.insert(edge.key(), roles.to_vec());
            edges.push(edge);
        }

        Self { edges, sensors }
    }

    /// Load `{ "edges": [...], "sensors": {...} }` from disk
    pub fn from_json_file(path: &Path) -> Result<Self, TopologyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, TopologyError> {
        let topology: Topology = serde_json::from_str(content)?;
        topology.validate()?;
        Ok(topology)
    }

    pub fn validate(&self) -> Result<(), TopologyError> {
        if self.edges.is_empty() {
            return Err(TopologyError::EmptyGraph);
        }

        let mut keys = HashSet::with_capacity(self.edges.len());
        for edge in &self.edges {
            let key = edge.key();
            if !keys.insert(key.clone()) {
                return Err(TopologyError::DuplicateEdge(key));
            }
        }

        if let Some(unknown) = self.sensors.keys().find(|k| !keys.contains(k.as_str())) {
            return Err(TopologyError::UnknownEdge(unknown.clone()));
        }

        Ok(())
    }

    /// Roles declared on an edge (empty when unmapped)
    pub fn roles(&self, key: &str) -> &[SensorRole] {
        self.sensors.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.edges.iter().map(GraphEdge::key)
    }
}
