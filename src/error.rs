//! Error types for the simulator.
//!
//! [`Error`] is the crate-level error. The engine itself only ever fails at
//! construction or reconfiguration, with [`Error::InvalidConfig`]; the other
//! variants come from the renderer and the driver.

/// A [`SimulationConfig`](crate::config::SimulationConfig) precondition that does not hold.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Grid side length is zero.
    #[error("size must be positive")]
    ZeroSize,

    /// Grid side length exceeds the memory budget.
    #[error("size {size} exceeds the maximum of {max}")]
    SizeTooLarge {
        /// The requested side length.
        size: usize,
        /// The largest accepted side length.
        max: usize,
    },

    /// A probability lies outside `[0, 1]` or is NaN.
    #[error("{name} must be within [0, 1], got {value}")]
    Probability {
        /// Config field name.
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// The illness duration range `[min, max)` contains no value.
    #[error("illness_duration {min}..{max} is empty")]
    EmptyDuration {
        /// Inclusive lower bound.
        min: u32,
        /// Exclusive upper bound.
        max: u32,
    },
}

/// Top-level error for the crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Construction or reconfiguration was given an invalid config.
    #[error("invalid config: {source}")]
    InvalidConfig {
        /// The failed precondition.
        #[from]
        source: ConfigError,
    },

    /// PNG encoding or saving failed.
    #[error("image error: {source}")]
    Image {
        /// The underlying image error.
        #[from]
        source: image::ImageError,
    },

    /// The driver task panicked or was aborted.
    #[error("driver task failed: {source}")]
    Driver {
        /// The underlying join error.
        #[from]
        source: tokio::task::JoinError,
    },

    /// Filesystem access failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Serializing run output failed.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
