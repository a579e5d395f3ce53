//! Driver error types

use thiserror::Error;

use crate::device::LifecycleState;
use crate::platform::PlatformError;
use crate::registers::AccessMode;

/// Transport-level failure reported by a [`Bus`](crate::bus::Bus) implementation
#[derive(Debug, Error)]
pub enum BusFault {
    #[error("no acknowledgment from device")]
    NoAcknowledge,

    #[error("bus busy")]
    Busy,

    #[error("short transfer: {actual} of {expected} bytes")]
    ShortTransfer { expected: usize, actual: usize },

    #[error("OS error: {0}")]
    Os(#[from] nix::errno::Errno),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Register operation that was refused by the access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write(u8),
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Read => write!(f, "read"),
            Operation::Write(value) => write!(f, "write of 0x{value:02x}"),
        }
    }
}

/// Coarse error classification shared by every surface of the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Bus,
    AccessViolation,
    InvalidArgument,
    NotFound,
    ResourceExhausted,
    NotReady,
    AlreadyBound,
    Io,
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("bus error during {context}: {source}")]
    Bus {
        context: String,
        #[source]
        source: BusFault,
    },

    #[error("access violation: {operation} refused on {mode} register {register} (addr=0x{address:02x})")]
    AccessViolation {
        register: &'static str,
        address: u8,
        mode: AccessMode,
        operation: Operation,
    },

    #[error("invalid argument for {register}: {reason}")]
    InvalidArgument { register: String, reason: String },

    #[error("unknown register: {0}")]
    NotFound(String),

    #[error("unable to acquire {resource}: {source}")]
    ResourceExhausted {
        resource: &'static str,
        #[source]
        source: PlatformError,
    },

    #[error("device not ready (state {0})")]
    NotReady(LifecycleState),

    #[error("device already bound (state {0})")]
    AlreadyBound(LifecycleState),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriverError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DriverError::Bus { .. } => ErrorKind::Bus,
            DriverError::AccessViolation { .. } => ErrorKind::AccessViolation,
            DriverError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            DriverError::NotFound(_) => ErrorKind::NotFound,
            DriverError::ResourceExhausted { .. } => ErrorKind::ResourceExhausted,
            DriverError::NotReady(_) => ErrorKind::NotReady,
            DriverError::AlreadyBound(_) => ErrorKind::AlreadyBound,
            DriverError::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn bus(context: impl Into<String>, source: BusFault) -> Self {
        DriverError::Bus {
            context: context.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_violation_message() {
        let err = DriverError::AccessViolation {
            register: "proximity_high",
            address: 0x87,
            mode: AccessMode::ReadOnly,
            operation: Operation::Write(0x42),
        };
        let msg = err.to_string();
        assert!(msg.contains("proximity_high"));
        assert!(msg.contains("0x87"));
        assert!(msg.contains("0x42"));
        assert_eq!(err.kind(), ErrorKind::AccessViolation);
    }

    #[test]
    fn test_bus_error_message() {
        let err = DriverError::bus("write of 0x9d to ambient_light (addr=0x84)", BusFault::NoAcknowledge);
        let msg = err.to_string();
        assert!(msg.contains("ambient_light"));
        assert!(msg.contains("no acknowledgment"));
        assert_eq!(err.kind(), ErrorKind::Bus);
    }

    #[test]
    fn test_short_transfer_message() {
        let fault = BusFault::ShortTransfer {
            expected: 4,
            actual: 1,
        };
        assert_eq!(fault.to_string(), "short transfer: 1 of 4 bytes");
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(DriverError::NotFound("x".into()).kind(), ErrorKind::NotFound);
        assert_eq!(
            DriverError::NotReady(LifecycleState::Unbound).kind(),
            ErrorKind::NotReady
        );
        assert_eq!(
            DriverError::Io(std::io::Error::other("boom")).kind(),
            ErrorKind::Io
        );
    }
}
