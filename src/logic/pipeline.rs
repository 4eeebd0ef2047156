//! Risk Pipeline - per-line glue
//!
//! parse -> map -> persist -> publish, strictly one line at a time.
//! A rejected line never touches the state; a persistence failure is
//! returned to the caller and stops the run.

use std::sync::Arc;

use crate::logic::board::RiskBoard;
use crate::logic::record::{self, RecordRejected};
use crate::logic::risk::{MapOutcome, RiskMapper, RiskState, RiskStore, StoreError};

/// What happened to one line
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    /// Empty line
    Skipped,
    Rejected(RecordRejected),
    Applied(MapOutcome),
}

/// Counters for the current pipeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub lines_seen: u64,
    pub empty_skipped: u64,
    pub rejected_non_json: u64,
    pub rejected_malformed: u64,
    pub records_applied: u64,
}

pub struct RiskPipeline {
    mapper: RiskMapper,
    store: Arc<dyn RiskStore>,
    board: RiskBoard,
    state: RiskState,
    stats: PipelineStats,
}

impl RiskPipeline {
    /// Restore the prior state from `store` and seed `board` with it
    pub fn new(
        mapper: RiskMapper,
        store: Arc<dyn RiskStore>,
        board: RiskBoard,
    ) -> Result<Self, StoreError> {
        let state = store.load()?;
        if state.is_empty() {
            log::info!("[Pipeline] No stored risk snapshot, starting empty");
        } else {
            log::info!("[Pipeline] Restored risk snapshot with {} edges", state.len());
        }
        board.seed(state.clone(), store.last_updated());

        Ok(Self {
            mapper,
            store,
            board,
            state,
            stats: PipelineStats::default(),
        })
    }

    /// Run one decoded line through the pipeline
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome, StoreError> {
        self.stats.lines_seen += 1;
        let result = self.handle_line(line);
        if !matches!(result, Ok(LineOutcome::Applied(_))) {
            self.board.update_stats(self.stats);
        }
        result
    }

    fn handle_line(&mut self, line: &str) -> Result<LineOutcome, StoreError> {
        let record = match record::parse_line(line) {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.stats.empty_skipped += 1;
                return Ok(LineOutcome::Skipped);
            }
            Err(rejected) => {
                match &rejected {
                    RecordRejected::NonJson { line } => {
                        self.stats.rejected_non_json += 1;
                        log::warn!("[Pipeline] Non-JSON or incomplete line received: {}", line);
                    }
                    RecordRejected::Malformed { line, reason } => {
                        self.stats.rejected_malformed += 1;
                        log::error!("[Pipeline] JSON parse error for line: {} ({})", line, reason);
                    }
                }
                return Ok(LineOutcome::Rejected(rejected));
            }
        };

        log::debug!("[Pipeline] Parsed sensor record with {} fields", record.len());

        let outcome = self.mapper.apply(&record, &mut self.state);
        self.store.persist(&self.state)?;
        self.stats.records_applied += 1;
        self.board.publish(&self.state, self.stats);

        if outcome.edges_at_risk > 0 {
            log::info!(
                "[Pipeline] {} of {} edges at risk",
                outcome.edges_at_risk,
                self.state.len()
            );
        }

        Ok(LineOutcome::Applied(outcome))
    }

    pub fn state(&self) -> &RiskState {
        &self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn board(&self) -> &RiskBoard {
        &self.board
    }

    pub fn mapper(&self) -> &RiskMapper {
        &self.mapper
    }
}
