//! Risk Mapper
//!
//! Maps one sensor record onto every edge of the topology.
//!
//! In the default `Overwrite` mode each record recomputes *all* edges, so a
//! record that only carries `water1` resets every other edge to zero. This
//! matches what the field dashboard has always shown. `MergeCovered` only
//! rewrites edges whose sensors appear in the record.

use serde::{Deserialize, Serialize};

use super::topology::{Topology, TopologyError};
use super::types::{EdgeRisk, RiskState};
use crate::logic::record::SensorRecord;

/// How a record is merged into the accumulated state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateMode {
    /// Recompute every edge; edges without a matching reading drop to zero
    #[default]
    Overwrite,

    /// Recompute only edges with at least one reading in the record
    MergeCovered,
}

impl UpdateMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "overwrite" => Some(Self::Overwrite),
            "merge" | "merge_covered" | "merge-covered" => Some(Self::MergeCovered),
            _ => None,
        }
    }
}

/// Summary of one mapping pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MapOutcome {
    /// Edges whose risk was recomputed in this pass
    pub edges_updated: usize,

    /// Edges with any non-zero severity after the pass
    pub edges_at_risk: usize,

    /// Keys dropped because they are not part of the graph
    pub stale_removed: usize,
}

/// Record -> per-edge risk
#[derive(Debug, Clone)]
pub struct RiskMapper {
    topology: Topology,
    mode: UpdateMode,
    keys: Vec<String>,
}

impl RiskMapper {
    /// Fails fast on an empty or inconsistent topology
    pub fn new(topology: Topology, mode: UpdateMode) -> Result<Self, TopologyError> {
        topology.validate()?;
        let keys = topology.edge_keys().collect();
        Ok(Self {
            topology,
            mode,
            keys,
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn mode(&self) -> UpdateMode {
        self.mode
    }

    /// Edge keys in graph order
    pub fn edge_keys(&self) -> &[String] {
        &self.keys
    }

    /// Fresh risk for one edge
    pub fn edge_risk(&self, key: &str, record: &SensorRecord) -> EdgeRisk {
        let mut risk = EdgeRisk::NONE;
        for role in self.topology.roles(key) {
            if let Some((hazard, severity)) = role.evaluate(record) {
                risk.set(hazard, severity);
            }
        }
        risk
    }

    /// True when the record carries a reading for any role of the edge
    pub fn covers(&self, key: &str, record: &SensorRecord) -> bool {
        self.topology
            .roles(key)
            .iter()
            .any(|role| record.contains(role.field()))
    }

    /// Apply `record` to `state` in place.
    ///
    /// Afterwards `state` holds exactly one entry per graph edge.
    pub fn apply(&self, record: &SensorRecord, state: &mut RiskState) -> MapOutcome {
        let mut outcome = MapOutcome::default();

        let before = state.len();
        state.retain(|key, _| self.keys.contains(key));
        outcome.stale_removed = before - state.len();

        for key in &self.keys {
            let recompute = match self.mode {
                UpdateMode::Overwrite => true,
                UpdateMode::MergeCovered => self.covers(key, record),
            };

            if recompute {
                state.insert(key.clone(), self.edge_risk(key, record));
                outcome.edges_updated += 1;
            } else {
                state.entry(key.clone()).or_insert(EdgeRisk::NONE);
            }
        }

        outcome.edges_at_risk = super::types::active_edges(state);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::record::parse_line;
    use crate::logic::risk::topology::{GraphEdge, SensorRole, SensorRoleMapping};

    fn record(line: &str) -> SensorRecord {
        parse_line(line).unwrap().unwrap()
    }

    fn mapper(mode: UpdateMode) -> RiskMapper {
        RiskMapper::new(Topology::builtin(), mode).unwrap()
    }

    fn flood(level: u8) -> EdgeRisk {
        EdgeRisk {
            flood: level,
            ..EdgeRisk::NONE
        }
    }

    #[test]
    fn test_water1_sets_flood_and_zeroes_others() {
        let mapper = mapper(UpdateMode::Overwrite);
        let mut state = RiskState::new();
        state.insert(
            "Mussoorie-Chamba".to_string(),
            EdgeRisk {
                fire: 4,
                ..EdgeRisk::NONE
            },
        );

        let outcome = mapper.apply(&record(r#"{"water1": 1801}"#), &mut state);

        assert_eq!(state.len(), 8);
        assert_eq!(state["Dehradun-Haridwar"], flood(3));
        for (key, risk) in &state {
            if key != "Dehradun-Haridwar" {
                assert!(risk.is_clear(), "{} should be clear", key);
            }
        }
        assert_eq!(outcome.edges_updated, 8);
        assert_eq!(outcome.edges_at_risk, 1);
    }

    #[test]
    fn test_smoke2_boundary() {
        let mapper = mapper(UpdateMode::Overwrite);
        let mut state = RiskState::new();

        mapper.apply(&record(r#"{"smoke2": 3001}"#), &mut state);
        assert_eq!(state["Mussoorie-Chamba"].fire, 4);

        mapper.apply(&record(r#"{"smoke2": 3000}"#), &mut state);
        assert_eq!(state["Mussoorie-Chamba"].fire, 0);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mapper = mapper(UpdateMode::Overwrite);
        let rec = record(r#"{"vibration": 1, "tilt2": 1, "smoke1": 2000}"#);

        let mut once = RiskState::new();
        mapper.apply(&rec, &mut once);

        let mut twice = RiskState::new();
        mapper.apply(&rec, &mut twice);
        mapper.apply(&rec, &mut twice);

        assert_eq!(once, twice);
        assert_eq!(once["Dehradun-Mussoorie"].earthquake, 1);
        assert_eq!(once["Rishikesh-Tehri"].landslide, 2);
        assert_eq!(once["Dehradun-Rishikesh"].fire, 4);
    }

    #[test]
    fn test_unknown_fields_and_empty_record() {
        let mapper = mapper(UpdateMode::Overwrite);
        let mut state = RiskState::new();
        let outcome = mapper.apply(&record(r#"{"battery": 3.7}"#), &mut state);
        assert_eq!(state.len(), 8);
        assert!(state.values().all(EdgeRisk::is_clear));
        assert_eq!(outcome.edges_at_risk, 0);
    }

    #[test]
    fn test_stale_keys_removed() {
        let mapper = mapper(UpdateMode::Overwrite);
        let mut state = RiskState::new();
        state.insert("Old-Road".to_string(), flood(3));

        let outcome = mapper.apply(&record("{}"), &mut state);
        assert!(!state.contains_key("Old-Road"));
        assert_eq!(state.len(), 8);
        assert_eq!(outcome.stale_removed, 1);
    }

    #[test]
    fn test_multiple_roles_on_one_edge() {
        let mut sensors = SensorRoleMapping::new();
        sensors.insert(
            "A-B".to_string(),
            vec![SensorRole::Water1, SensorRole::Water2, SensorRole::Smoke1],
        );
        let topology = Topology::new(vec![GraphEdge::new("A", "B")], sensors).unwrap();
        let mapper = RiskMapper::new(topology, UpdateMode::Overwrite).unwrap();

        let mut state = RiskState::new();
        mapper.apply(&record(r#"{"water1": 10, "water2": 1900, "smoke1": 1501}"#), &mut state);
        assert_eq!(
            state["A-B"],
            EdgeRisk {
                fire: 4,
                flood: 3,
                ..EdgeRisk::NONE
            }
        );
    }

    #[test]
    fn test_merge_covered_keeps_uncovered_edges() {
        let mapper = mapper(UpdateMode::MergeCovered);
        let mut state = RiskState::new();

        mapper.apply(&record(r#"{"water1": 1801}"#), &mut state);
        assert_eq!(state.len(), 8);
        assert_eq!(state["Dehradun-Haridwar"], flood(3));

        let outcome = mapper.apply(&record(r#"{"smoke2": 3001}"#), &mut state);
        assert_eq!(outcome.edges_updated, 1);
        assert_eq!(state["Dehradun-Haridwar"], flood(3));
        assert_eq!(state["Mussoorie-Chamba"].fire, 4);

        mapper.apply(&record(r#"{"water1": 100}"#), &mut state);
        assert!(state["Dehradun-Haridwar"].is_clear());
        assert_eq!(state["Mussoorie-Chamba"].fire, 4);
    }

    #[test]
    fn test_mapper_rejects_invalid_topology() {
        let empty = Topology {
            edges: vec![],
            sensors: SensorRoleMapping::new(),
        };
        assert!(matches!(
            RiskMapper::new(empty, UpdateMode::Overwrite),
            Err(TopologyError::EmptyGraph)
        ));
    }

    #[test]
    fn test_update_mode_parse() {
        assert_eq!(UpdateMode::parse("overwrite"), Some(UpdateMode::Overwrite));
        assert_eq!(UpdateMode::parse(" Merge "), Some(UpdateMode::MergeCovered));
        assert_eq!(UpdateMode::parse("merge-covered"), Some(UpdateMode::MergeCovered));
        assert_eq!(UpdateMode::parse("max"), None);
    }
}
