//! Error types for the enhancement orchestration layer.

use thiserror::Error;

use crate::enums::ScalarType;
use crate::scene::VolumeId;
use crate::volume_loader::VolumeLoaderError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Value {value} for '{key}' is outside [{min}, {max}]")]
    OutOfRange {
        key: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("Parameter keys '{first}' and '{second}' collide when compared case-insensitively")]
    DuplicateKey { first: String, second: String },

    #[error("Invalid parameter '{key}': {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Unknown algorithm '{0}'")]
    UnknownAlgorithm(String),

    #[error("Volume '{volume}' has {found} samples, double precision required")]
    ScalarTypePrecondition { volume: String, found: ScalarType },

    #[error("Input and output refer to the same volume ({0})")]
    SameVolume(VolumeId),

    #[error("Layout {0} is already registered with a different description")]
    LayoutConflict(u32),

    #[error("Layout {0} was never registered")]
    UnknownLayout(u32),

    #[error("Pane '{0}' is not part of the active layout")]
    UnknownPane(String),

    #[error("Could not allocate volume: {0}")]
    Allocation(String),

    #[error("Shape mismatch for '{role}': expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        role: String,
        expected: (usize, usize, usize),
        actual: (usize, usize, usize),
    },

    #[error("No derived volume exists for role '{0}'")]
    UnknownRole(String),

    #[error("Unknown volume {0}")]
    UnknownVolume(VolumeId),

    #[error("No volume selected")]
    NothingSelected,

    #[error("Action is already running")]
    Busy,

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Loader error: {0}")]
    Loader(#[from] VolumeLoaderError),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging error: {0}")]
    Logging(String),
}

impl Error {
    /// Errors the operator can fix by changing the selection or input.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ScalarTypePrecondition { .. }
                | Error::SameVolume(_)
                | Error::NothingSelected
                | Error::Busy
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
