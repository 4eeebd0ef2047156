//! Serial Module - Sensor hub link
//!
//! ## Structure
//! - `decoder.rs` - FrameDecoder (bytes -> trimmed lines)
//! - `transport.rs` - Transport trait, reader and device transports
//! - `signal.rs` - StopSignal for the read loop
//! - `session.rs` - SerialSession (connection state + read loop)

pub mod decoder;
pub mod transport;
pub mod signal;
pub mod session;

pub use decoder::{FrameDecoder, Lines};
pub use transport::{DeviceTransport, ReadChunk, ReaderTransport, Transport};
pub use signal::StopSignal;
pub use session::{RunSummary, SerialSession, SessionError, StopReason};
