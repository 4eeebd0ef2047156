//! Risk Board - what display collaborators read
//!
//! Holds the latest published risk map behind an `Arc` swap. Readers clone
//! the `Arc`; the pipeline never waits on a reader.

use std::sync::Arc;
use chrono::{DateTime, Local, Utc};
use parking_lot::RwLock;

use crate::logic::pipeline::PipelineStats;
use crate::logic::risk::{active_edges, RiskState};

/// Point-in-time view of the risk map
#[derive(Debug, Clone, Default)]
pub struct RiskSnapshot {
    pub risk: Arc<RiskState>,
    pub last_updated: Option<DateTime<Utc>>,
    /// Counters of the pipeline feeding this board
    pub stats: PipelineStats,
}

impl RiskSnapshot {
    /// "Last Updated: ..." in local time, as shown on the dashboard
    pub fn last_updated_label(&self) -> String {
        match self.last_updated {
            Some(at) => format!(
                "Last Updated: {}",
                at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
            ),
            None => "Last Updated: never".to_string(),
        }
    }

    pub fn edges_at_risk(&self) -> usize {
        active_edges(&self.risk)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskBoard {
    inner: Arc<RwLock<RiskSnapshot>>,
}

impl RiskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with a restored snapshot
    pub fn seed(&self, state: RiskState, last_updated: Option<DateTime<Utc>>) {
        let mut inner = self.inner.write();
        inner.risk = Arc::new(state);
        inner.last_updated = last_updated;
    }

    /// Publish the state produced by one applied record
    pub fn publish(&self, state: &RiskState, stats: PipelineStats) {
        let risk = Arc::new(state.clone());
        let mut inner = self.inner.write();
        inner.risk = risk;
        inner.last_updated = Some(Utc::now());
        inner.stats = stats;
    }

    /// Refresh counters without touching the risk map
    pub fn update_stats(&self, stats: PipelineStats) {
        self.inner.write().stats = stats;
    }

    pub fn snapshot(&self) -> RiskSnapshot {
        self.inner.read().clone()
    }
}
