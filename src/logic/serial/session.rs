//! Serial Session - one live connection to the sensor hub
//!
//! Owns the transport, the line buffer and the connected flag. The read loop
//! has a single suspension point (waiting for the next chunk), where it also
//! watches the stop signal. Lines already decoded from a chunk are always
//! fully processed before the stop is observed.

use std::io;
use thiserror::Error;
use uuid::Uuid;

use super::decoder::FrameDecoder;
use super::signal::StopSignal;
use super::transport::{ReadChunk, Transport};
use crate::logic::pipeline::RiskPipeline;
use crate::logic::risk::StoreError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to open transport: {0}")]
    Open(#[source] io::Error),

    #[error("transport read failed: {0}")]
    Transport(#[source] io::Error),

    #[error("failed to persist risk state: {0}")]
    Persistence(#[from] StoreError),

    #[error("session is not connected")]
    NotConnected,
}

/// Why the read loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Stopped,
    EndOfStream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub reason: StopReason,
    pub chunks_read: u64,
    pub lines_decoded: u64,
    /// Bytes of the unterminated tail thrown away at the end
    pub fragment_dropped: usize,
}

pub struct SerialSession<T: Transport> {
    id: Uuid,
    transport: T,
    decoder: FrameDecoder,
    connected: bool,
}

impl<T: Transport> SerialSession<T> {
    /// Open `transport` and start a session around it
    pub async fn connect(mut transport: T, decoder: FrameDecoder) -> Result<Self, SessionError> {
        transport.open().await.map_err(SessionError::Open)?;

        let id = Uuid::new_v4();
        log::info!("[Serial] Session {} connected to {}", id, transport.describe());

        Ok(Self {
            id,
            transport,
            decoder,
            connected: true,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn decoder(&self) -> &FrameDecoder {
        &self.decoder
    }

    /// Read until the stream ends, the stop signal fires, or an error occurs.
    pub async fn run(
        &mut self,
        pipeline: &mut RiskPipeline,
        stop: &StopSignal,
    ) -> Result<RunSummary, SessionError> {
        if !self.connected {
            return Err(SessionError::NotConnected);
        }

        log::info!("[Serial] Session {} read loop started", self.id);
        let mut chunks_read = 0u64;
        let lines_before = self.decoder.lines_emitted();

        let result = loop {
            let chunk = tokio::select! {
                biased;
                _ = stop.stopped() => break Ok(StopReason::Stopped),
                chunk = self.transport.read_chunk() => chunk,
            };

            match chunk {
                Ok(ReadChunk::Data(bytes)) => {
                    chunks_read += 1;
                    if let Err(e) = Self::drain(&mut self.decoder, &bytes, pipeline) {
                        let abandoned = self.decoder.discard_complete_lines();
                        if abandoned > 0 {
                            log::warn!(
                                "[Serial] Dropped {} decoded lines after pipeline error",
                                abandoned
                            );
                        }
                        break Err(e);
                    }
                }
                Ok(ReadChunk::Eof) => {
                    log::info!("[Serial] Session {} reader done", self.id);
                    break Ok(StopReason::EndOfStream);
                }
                Err(e) => {
                    log::error!("[Serial] Error in read loop: {}", e);
                    break Err(SessionError::Transport(e));
                }
            }
        };

        let fragment_dropped = self.decoder.finish().map(|f| f.len()).unwrap_or(0);
        if fragment_dropped > 0 {
            log::debug!(
                "[Serial] Discarded {} bytes of unterminated input",
                fragment_dropped
            );
        }
        log::info!("[Serial] Session {} read loop stopped", self.id);

        let reason = result?;
        Ok(RunSummary {
            reason,
            chunks_read,
            lines_decoded: self.decoder.lines_emitted() - lines_before,
            fragment_dropped,
        })
    }

    fn drain(
        decoder: &mut FrameDecoder,
        bytes: &[u8],
        pipeline: &mut RiskPipeline,
    ) -> Result<(), SessionError> {
        for line in decoder.push(bytes) {
            pipeline.process_line(&line)?;
        }
        Ok(())
    }

    /// Close the transport and drop buffered input
    pub async fn disconnect(mut self) -> io::Result<()> {
        self.connected = false;
        self.decoder.clear();
        let result = self.transport.close().await;
        log::info!("[Serial] Session {} disconnected", self.id);
        result
    }
}

#[cfg(test)]
mod tests;
