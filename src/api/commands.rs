//! Commands - surface for the dashboard shell
//!
//! connect / disconnect / manual update plus read-only risk queries. One
//! connection at a time; the pipeline is owned by the read loop task while
//! a session is live, and readers go through the board.

use std::sync::Arc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::logic::board::{RiskBoard, RiskSnapshot};
use crate::logic::pipeline::{PipelineStats, RiskPipeline};
use crate::logic::risk::{RiskMapper, RiskState, RiskStore, StoreError};
use crate::logic::serial::{
    FrameDecoder, RunSummary, SerialSession, SessionError, StopSignal, Transport,
};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Risk payload for the display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskStatus {
    pub connected: bool,
    pub risk: RiskState,
    pub edges_at_risk: usize,
    pub last_updated: Option<String>,
    pub last_updated_label: String,
    pub records_applied: u64,
    pub lines_rejected: u64,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("already connected")]
    AlreadyConnected,

    #[error("please connect to the sensor hub first")]
    NotConnected,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("read loop task failed: {0}")]
    Task(String),
}

struct ActiveSession {
    id: Uuid,
    stop: StopSignal,
    finished: StopSignal,
    handle: JoinHandle<Result<RunSummary, SessionError>>,
}

/// The single connection slot
enum Slot {
    Idle,
    /// Reserved by a `connect_serial` that is still opening its transport
    Connecting,
    Live(ActiveSession),
}

impl Slot {
    fn live(&self) -> Option<&ActiveSession> {
        match self {
            Slot::Live(active) => Some(active),
            _ => None,
        }
    }

    /// Take the live session out, leaving a reservation untouched
    fn take_live(&mut self) -> Option<ActiveSession> {
        match std::mem::replace(self, Slot::Idle) {
            Slot::Live(active) => Some(active),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Releases a `Connecting` reservation unless the connect went through
struct Reservation<'a> {
    slot: &'a Mutex<Slot>,
    armed: bool,
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut slot = self.slot.lock();
            if matches!(*slot, Slot::Connecting) {
                *slot = Slot::Idle;
            }
        }
    }
}

pub struct RiskService {
    pipeline: Arc<tokio::sync::Mutex<RiskPipeline>>,
    board: RiskBoard,
    max_line_bytes: usize,
    slot: Mutex<Slot>,
}

impl RiskService {
    /// Restores the stored snapshot; fails if the store cannot be read
    pub fn new(
        mapper: RiskMapper,
        store: Arc<dyn RiskStore>,
        max_line_bytes: usize,
    ) -> Result<Self, ServiceError> {
        let board = RiskBoard::new();
        let pipeline = RiskPipeline::new(mapper, store, board.clone())?;

        Ok(Self {
            pipeline: Arc::new(tokio::sync::Mutex::new(pipeline)),
            board,
            max_line_bytes,
            slot: Mutex::new(Slot::Idle),
        })
    }

    /// Open `transport` and start the read loop in the background
    pub async fn connect_serial<T>(&self, transport: T) -> Result<Uuid, ServiceError>
    where
        T: Transport + 'static,
    {
        // Claim the slot before the first await
        let previous = {
            let mut slot = self.slot.lock();
            match &*slot {
                Slot::Connecting => {
                    log::info!("Already connecting.");
                    return Err(ServiceError::AlreadyConnected);
                }
                Slot::Live(active) if !active.handle.is_finished() => {
                    log::info!("Already connected.");
                    return Err(ServiceError::AlreadyConnected);
                }
                _ => {}
            }
            match std::mem::replace(&mut *slot, Slot::Connecting) {
                Slot::Live(active) => Some(active),
                _ => None,
            }
        };
        let mut reservation = Reservation {
            slot: &self.slot,
            armed: true,
        };

        // Collect a loop that ended on its own; its outcome does not block a reconnect
        if let Some(previous) = previous {
            match Self::join(previous).await {
                Ok(summary) => {
                    log::info!("[Service] Previous session ended: {:?}", summary.reason)
                }
                Err(e) => log::warn!("[Service] Previous session ended with error: {}", e),
            }
        }

        let mut session =
            SerialSession::connect(transport, FrameDecoder::new(self.max_line_bytes)).await?;
        let id = session.id();
        let stop = StopSignal::new();
        let finished = StopSignal::new();

        let handle = {
            let pipeline = self.pipeline.clone();
            let stop = stop.clone();
            let finished = finished.clone();
            tokio::spawn(async move {
                let result = {
                    let mut pipeline = pipeline.lock().await;
                    session.run(&mut pipeline, &stop).await
                };
                if let Err(e) = session.disconnect().await {
                    log::warn!("[Service] Error closing transport: {}", e);
                }
                finished.stop();
                result
            })
        };

        *self.slot.lock() = Slot::Live(ActiveSession {
            id,
            stop,
            finished,
            handle,
        });
        reservation.armed = false;
        Ok(id)
    }

    /// Stop the read loop and wait for it to finish.
    ///
    /// Returns `None` when nothing was connected.
    pub async fn disconnect_serial(&self) -> Result<Option<RunSummary>, ServiceError> {
        let active = self.slot.lock().take_live();
        let Some(active) = active else {
            return Ok(None);
        };

        active.stop.stop();
        let summary = Self::join(active).await?;
        log::info!("Disconnected from sensor hub");
        Ok(Some(summary))
    }

    /// Resolves when the current read loop ends (immediately if none runs)
    pub async fn closed(&self) {
        let finished = self.slot.lock().live().map(|a| a.finished.clone());
        if let Some(finished) = finished {
            finished.stopped().await;
        }
    }

    /// Collect a read loop that already ended
    pub async fn reap(&self) -> Result<Option<RunSummary>, ServiceError> {
        let active = {
            let mut slot = self.slot.lock();
            match slot.live() {
                Some(a) if a.handle.is_finished() => slot.take_live(),
                _ => None,
            }
        };
        match active {
            Some(active) => Ok(Some(Self::join(active).await?)),
            None => Ok(None),
        }
    }

    async fn join(active: ActiveSession) -> Result<RunSummary, ServiceError> {
        let summary = active
            .handle
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))??;
        log::info!(
            "[Service] Session {} finished: {:?}, {} lines",
            active.id,
            summary.reason,
            summary.lines_decoded
        );
        Ok(summary)
    }

    pub fn is_connected(&self) -> bool {
        self.slot
            .lock()
            .live()
            .map(|a| !a.handle.is_finished())
            .unwrap_or(false)
    }

    /// Current session id, if connected
    pub fn session_id(&self) -> Option<Uuid> {
        self.slot.lock().live().map(|a| a.id)
    }

    /// Refresh requested by the user; only meaningful while connected
    pub fn manual_update(&self) -> Result<RiskStatus, ServiceError> {
        if !self.is_connected() {
            return Err(ServiceError::NotConnected);
        }
        log::info!("Manual update requested...");
        Ok(self.get_risk_status())
    }

    pub fn get_risk_status(&self) -> RiskStatus {
        let snapshot = self.board.snapshot();
        RiskStatus {
            connected: self.is_connected(),
            risk: (*snapshot.risk).clone(),
            edges_at_risk: snapshot.edges_at_risk(),
            last_updated: snapshot.last_updated.map(|t| t.to_rfc3339()),
            last_updated_label: snapshot.last_updated_label(),
            records_applied: snapshot.stats.records_applied,
            lines_rejected: snapshot.stats.rejected_non_json + snapshot.stats.rejected_malformed,
        }
    }

    pub fn get_risk_data(&self) -> Arc<RiskState> {
        self.board.snapshot().risk
    }

    pub fn get_pipeline_stats(&self) -> PipelineStats {
        self.board.snapshot().stats
    }

    pub fn snapshot(&self) -> RiskSnapshot {
        self.board.snapshot()
    }
}
