//! Error Types
//!
//! Error handling for device acquisition and the event model.

use thiserror::Error;

/// Result type for evhub operations
pub type Result<T> = std::result::Result<T, EvhubError>;

/// evhub error types
#[derive(Error, Debug)]
pub enum EvhubError {
    /// A new axis would exceed the PointerCoords capacity
    #[error("Pointer coords full: cannot add axis {0} beyond {max} axes", max = crate::event::coords::PointerCoords::MAX_AXES)]
    PointerCoordsFull(u32),

    /// Axis id outside the addressable range
    #[error("Invalid axis id: {0}")]
    InvalidAxis(u32),

    /// Device node failed to open or answer capability queries
    #[error("Device open failed for {}: {source}", path.display())]
    DeviceOpenFailed {
        /// Device node path
        path: std::path::PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Serialized event data is truncated or inconsistent
    #[error("Malformed parcel: {0}")]
    MalformedParcel(String),

    /// A singular transform cannot be inverted
    #[error("Transform is not invertible")]
    NonInvertibleTransform,

    /// Virtual device setup error
    #[error("Uinput error: {0}")]
    Uinput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Low-level system call error
    #[error("System error: {0}")]
    Sys(#[from] nix::errno::Errno),
}
