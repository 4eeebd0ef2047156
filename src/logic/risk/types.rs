//! Risk Types
//!
//! Per-edge hazard severities and the accumulated risk map.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};

/// Hazard kinds tracked per edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hazard {
    Fire,
    Flood,
    Earthquake,
    Landslide,
}

impl Hazard {
    pub const ALL: [Hazard; 4] = [
        Hazard::Fire,
        Hazard::Flood,
        Hazard::Earthquake,
        Hazard::Landslide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Flood => "flood",
            Self::Earthquake => "earthquake",
            Self::Landslide => "landslide",
        }
    }
}

impl std::fmt::Display for Hazard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity ordinal (0 = none)
pub type Severity = u8;

/// Risk of a single edge
///
/// Serialized as `{"fire":0,"flood":3,"earthquake":0,"landslide":0}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EdgeRisk {
    #[serde(default)]
    pub fire: Severity,
    #[serde(default)]
    pub flood: Severity,
    #[serde(default)]
    pub earthquake: Severity,
    #[serde(default)]
    pub landslide: Severity,
}

impl EdgeRisk {
    /// All-zero risk
    pub const NONE: EdgeRisk = EdgeRisk {
        fire: 0,
        flood: 0,
        earthquake: 0,
        landslide: 0,
    };

    pub fn get(&self, hazard: Hazard) -> Severity {
        match hazard {
            Hazard::Fire => self.fire,
            Hazard::Flood => self.flood,
            Hazard::Earthquake => self.earthquake,
            Hazard::Landslide => self.landslide,
        }
    }

    /// Set (not accumulate) one severity
    pub fn set(&mut self, hazard: Hazard, severity: Severity) {
        match hazard {
            Hazard::Fire => self.fire = severity,
            Hazard::Flood => self.flood = severity,
            Hazard::Earthquake => self.earthquake = severity,
            Hazard::Landslide => self.landslide = severity,
        }
    }

    pub fn is_clear(&self) -> bool {
        *self == Self::NONE
    }

    /// Highest severity across hazards
    pub fn max_severity(&self) -> Severity {
        Hazard::ALL.iter().map(|h| self.get(*h)).max().unwrap_or(0)
    }

    /// Hazards with non-zero severity
    pub fn active(&self) -> Vec<(Hazard, Severity)> {
        Hazard::ALL
            .iter()
            .map(|h| (*h, self.get(*h)))
            .filter(|(_, s)| *s > 0)
            .collect()
    }
}

/// Accumulated risk: edge-key -> EdgeRisk
pub type RiskState = BTreeMap<String, EdgeRisk>;

/// Counts of edges with any active hazard
pub fn active_edges(state: &RiskState) -> usize {
    state.values().filter(|r| !r.is_clear()).count()
}
