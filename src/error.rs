//! Fatal, load-time/config failures. Degraded-but-recoverable runtime
//! conditions (missing sensors, empty Wi-Fi scans, unreachable routes) are
//! never represented here; they surface as `Option`s and status enums per
//! module instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to parse graph asset: {0}")]
    GraphParse(String),

    #[error("destination node {0:?} is not present in the graph")]
    UnknownDestination(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
