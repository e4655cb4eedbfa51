//! Error types for the CRUD benchmark harness
//!
//! This module defines the failure taxonomy shared by the dispatch engine,
//! the executors and the command-line front end.
//!
//! # Error Categories
//!
//! - **Configuration Errors**: bad batch sizes, counts, timeouts (fatal, raised before dispatch)
//! - **Remote Faults**: per-operation failures reported by the service
//! - **Transport Faults**: timeouts, security negotiation, connection loss, cancellation
//! - **Not Found**: nothing to operate on (unknown entity, empty working set)
//! - **File Errors**: I/O and CSV parsing while loading seed records or writing reports

use std::fmt;
use thiserror::Error;

/// Numeric fault codes reported by the service for a single operation
pub mod fault_code {
    /// The target record does not exist
    pub const RECORD_NOT_FOUND: u32 = 0x8004_0217;
    /// A record with the same id already exists
    pub const DUPLICATE_KEY: u32 = 0x8004_0237;
    /// Duplicate detection matched an existing record
    pub const DUPLICATE_DETECTED: u32 = 0x8004_0333;
    /// The entity is not part of the service catalog
    pub const UNKNOWN_ENTITY: u32 = 0x8004_1102;
    /// Fault raised by the service's fault injection settings
    pub const INJECTED: u32 = 0x8004_ffff;
}

/// A failure reported by the service for one operation
///
/// Remote faults are recoverable from the engine's point of view: inside a
/// continue-on-error batch they are recorded in the batch result and the
/// sibling operations still run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("0x{code:08x}: {message}")]
pub struct RemoteFault {
    /// Service fault code (see [`fault_code`])
    pub code: u32,
    /// Human readable fault message
    pub message: String,
}

impl RemoteFault {
    /// Create a RemoteFault with the given code and message
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Classification of channel-level failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFaultKind {
    /// The request did not complete within the configured timeout
    Timeout,
    /// Authentication or security negotiation with the service failed
    SecurityNegotiation,
    /// The connection to the service failed or was refused
    Connection,
    /// The run was cancelled before the request completed
    Cancelled,
}

impl fmt::Display for TransportFaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportFaultKind::Timeout => "timeout",
            TransportFaultKind::SecurityNegotiation => "security negotiation",
            TransportFaultKind::Connection => "connection",
            TransportFaultKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Main error type for the benchmark harness
///
/// Every variant except [`BenchError::RemoteFault`] aborts the run. Remote
/// faults only abort a run when they surface from the single-request strategy.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BenchError {
    /// Malformed or out-of-range settings
    ///
    /// Reported once before any request is sent.
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Description of the offending setting
        message: String,
    },

    /// The service rejected an operation
    #[error("Remote fault reported by the service")]
    RemoteFault(#[from] RemoteFault),

    /// The channel to the service is unusable
    ///
    /// This is a fatal error: no further batches are submitted.
    #[error("Transport fault ({kind}): {message}")]
    TransportFault {
        /// Kind of transport failure
        kind: TransportFaultKind,
        /// Description of the failure
        message: String,
    },

    /// Nothing to operate on
    #[error("{message}")]
    NotFound {
        /// Description of what was missing
        message: String,
    },

    /// I/O error while reading seed records or writing reports
    #[error("I/O error: {message}")]
    IoError {
        /// Description of the I/O error
        message: String,
    },

    /// CSV parsing error while reading seed records
    #[error("CSV parse error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    ParseError {
        /// Line number where the error occurred (if available)
        line: Option<u64>,
        /// Description of the parsing error
        message: String,
    },

    /// The executor broke its contract (task panicked, missing batch result)
    #[error("Internal executor error: {message}")]
    Internal {
        /// Description of the failure
        message: String,
    },
}

impl From<std::io::Error> for BenchError {
    fn from(error: std::io::Error) -> Self {
        BenchError::IoError {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for BenchError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        BenchError::ParseError {
            line,
            message: error.to_string(),
        }
    }
}

impl BenchError {
    /// Create an InvalidConfiguration error
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        BenchError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a TransportFault error
    pub fn transport(kind: TransportFaultKind, message: impl Into<String>) -> Self {
        BenchError::TransportFault {
            kind,
            message: message.into(),
        }
    }

    /// Create a TransportFault error for a cancelled run
    pub fn cancelled() -> Self {
        BenchError::transport(TransportFaultKind::Cancelled, "run cancelled")
    }

    /// Create a NotFound error
    pub fn not_found(message: impl Into<String>) -> Self {
        BenchError::NotFound {
            message: message.into(),
        }
    }

    /// Create an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        BenchError::Internal {
            message: message.into(),
        }
    }

    /// Whether this error is a transport-level fault
    pub fn is_transport(&self) -> bool {
        matches!(self, BenchError::TransportFault { .. })
    }

    /// Whether retrying the same request could succeed
    ///
    /// Only timeouts and connection faults qualify; cancellation and security
    /// negotiation failures are final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BenchError::TransportFault {
                kind: TransportFaultKind::Timeout | TransportFaultKind::Connection,
                ..
            }
        )
    }
}
