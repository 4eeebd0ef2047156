//! Pipeline Configuration
//!
//! Collects the startup settings from `constants` into one value.

use std::path::PathBuf;

use crate::constants;
use crate::logic::risk::{Topology, TopologyError, UpdateMode};

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Device path, `-` for stdin
    pub device: String,

    /// Directory of the risk snapshot
    pub data_dir: PathBuf,

    /// Topology JSON file (None = builtin graph)
    pub topology_path: Option<PathBuf>,

    pub update_mode: UpdateMode,

    /// Status log interval
    pub refresh_secs: u64,

    pub chunk_size: usize,

    pub max_line_bytes: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            device: constants::DEFAULT_DEVICE.to_string(),
            data_dir: PathBuf::from(constants::DATA_DIR_NAME),
            topology_path: None,
            update_mode: UpdateMode::default(),
            refresh_secs: constants::DEFAULT_REFRESH_SECS,
            chunk_size: constants::DEFAULT_CHUNK_SIZE,
            max_line_bytes: constants::DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        let update_mode = match constants::get_update_mode() {
            Some(raw) => UpdateMode::parse(&raw).unwrap_or_else(|| {
                log::warn!("Unknown ROUTE_RISK_UPDATE_MODE '{}', using overwrite", raw);
                UpdateMode::Overwrite
            }),
            None => UpdateMode::default(),
        };

        Self {
            device: constants::get_device(),
            data_dir: constants::get_data_dir(),
            topology_path: constants::get_topology_path(),
            update_mode,
            refresh_secs: constants::get_refresh_secs(),
            ..Default::default()
        }
    }

    /// Topology from file, or the builtin graph
    pub fn load_topology(&self) -> Result<Topology, TopologyError> {
        match &self.topology_path {
            Some(path) => {
                log::info!("Loading topology from {:?}", path);
                Topology::from_json_file(path)
            }
            None => Ok(Topology::builtin()),
        }
    }
}
