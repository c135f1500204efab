//! Error types for accelerator driver operations

use thiserror::Error;

/// Result type alias for driver operations
pub type Result<T> = std::result::Result<T, AccelError>;

/// Errors that can occur while driving the accelerator
#[derive(Debug, Error)]
pub enum AccelError {
    /// Configuration rejected before any register write
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Reason for rejection
        reason: String,
    },

    /// Status register read back all-ones during init
    #[error("Hardware unresponsive: status read {status:#010x}")]
    HardwareUnresponsive {
        /// Raw status value
        status: u32,
    },

    /// Inference requested while the device reports busy
    #[error("Accelerator busy, inference not started")]
    Busy,

    /// Completion wait exceeded its bound
    #[error("Operation timeout after {duration_ms}ms")]
    Timeout {
        /// Elapsed wait in milliseconds
        duration_ms: u64,
    },

    /// Device reported a non-zero error nibble
    #[error("Device error code {code:#x}")]
    DeviceError {
        /// 4-bit error code from the status register
        code: u8,
    },

    /// Result requested before completion was observed
    #[error("Inference not complete")]
    NotComplete,

    /// Busy cleared without done or error being reported
    #[error("Ambiguous completion: status {status:#010x} is neither busy, done nor error")]
    AmbiguousCompletion {
        /// Raw status value on the final re-check
        status: u32,
    },

    /// Parameter or frame buffer rejected
    #[error("Invalid buffer: {reason}")]
    InvalidBuffer {
        /// Reason for rejection
        reason: String,
    },

    /// Operation not permitted in the current controller state
    #[error("Accelerator in invalid state: {state}")]
    InvalidState {
        /// Current state description
        state: String,
    },

    /// Device-memory access outside every mapped window
    #[error("Device memory access out of bounds: {len} bytes at {address:#x}")]
    OutOfBounds {
        /// Physical start address
        address: u64,
        /// Access length in bytes
        len: usize,
    },

    /// Mapping a physical window failed
    #[error("Memory mapping failed: {reason}")]
    Mapping {
        /// Reason for failure
        reason: String,
    },

    /// I/O error while opening a memory device
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },
}

impl AccelError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create an invalid buffer error
    pub fn invalid_buffer(reason: impl Into<String>) -> Self {
        Self::InvalidBuffer {
            reason: reason.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(state: impl Into<String>) -> Self {
        Self::InvalidState {
            state: state.into(),
        }
    }

    /// Create a mapping error
    pub fn mapping(reason: impl Into<String>) -> Self {
        Self::Mapping {
            reason: reason.into(),
        }
    }

    /// Whether a reset followed by a retry may succeed.
    ///
    /// An unresponsive device and host-side mapping failures are not
    /// recovered by resetting the accelerator.
    pub const fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::HardwareUnresponsive { .. } | Self::Mapping { .. } | Self::Io { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_codes() {
        assert_eq!(
            AccelError::DeviceError { code: 0xA }.to_string(),
            "Device error code 0xa"
        );
        assert_eq!(
            AccelError::Timeout { duration_ms: 50 }.to_string(),
            "Operation timeout after 50ms"
        );
    }

    #[test]
    fn unresponsive_hardware_is_fatal() {
        assert!(!AccelError::HardwareUnresponsive { status: u32::MAX }.is_recoverable());
        assert!(AccelError::Busy.is_recoverable());
        assert!(AccelError::Timeout { duration_ms: 1 }.is_recoverable());
    }
}
