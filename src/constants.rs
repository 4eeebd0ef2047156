//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every default can be overridden through an environment variable.

use std::path::PathBuf;

/// Device path meaning "read from stdin"
pub const STDIN_DEVICE: &str = "-";

/// Default device path
///
/// The serial port itself (baud rate, line settings) is configured outside
/// this process, e.g. `stty -F /dev/ttyUSB0 115200 raw`.
pub const DEFAULT_DEVICE: &str = STDIN_DEVICE;

/// Directory name under the local data dir
pub const DATA_DIR_NAME: &str = "route-risk";

/// Fixed key of the persisted risk snapshot
pub const RISK_DATA_KEY: &str = "riskData";

/// Default read chunk size (bytes)
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Largest partial line kept between chunks (64 KiB)
pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

/// Default status refresh interval (seconds)
pub const DEFAULT_REFRESH_SECS: u64 = 30;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Route Risk";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get device path from environment or use default
pub fn get_device() -> String {
    std::env::var("ROUTE_RISK_DEVICE")
        .unwrap_or_else(|_| DEFAULT_DEVICE.to_string())
}

/// Get data directory from environment or use the local data dir
pub fn get_data_dir() -> PathBuf {
    std::env::var("ROUTE_RISK_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(DATA_DIR_NAME)
        })
}

/// Get topology file from environment (None = builtin graph)
pub fn get_topology_path() -> Option<PathBuf> {
    std::env::var("ROUTE_RISK_TOPOLOGY")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
}

/// Get raw update mode string from environment
pub fn get_update_mode() -> Option<String> {
    std::env::var("ROUTE_RISK_UPDATE_MODE").ok()
}

/// Get refresh interval from environment or use default
pub fn get_refresh_secs() -> u64 {
    std::env::var("ROUTE_RISK_REFRESH_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|secs| *secs > 0)
        .unwrap_or(DEFAULT_REFRESH_SECS)
}
