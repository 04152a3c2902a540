//! Error types for gbcom-core
//!
//! Only conditions that stop a run live here. Problems found in the script
//! itself are reported as [`Diagnostic`](crate::script::Diagnostic)s and
//! never abort parsing.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors raised while loading or running a script
#[derive(Debug, Error)]
pub enum Error {
    /// The bus master or GPIO transport reported a failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// A transfer did not complete within the configured timeout
    #[error("Transport timeout")]
    Timeout,

    /// The bridge returned fewer bytes than a bus word
    #[error("Short response from bus: expected at least {expected} bytes, got {got}")]
    ShortResponse {
        /// Minimum number of bytes required
        expected: usize,
        /// Number of bytes actually received
        got: usize,
    },

    /// The script file could not be read
    #[error("Failed to read script {}: {source}", .path.display())]
    Script {
        /// Path of the script
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Writing read results to the output failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
