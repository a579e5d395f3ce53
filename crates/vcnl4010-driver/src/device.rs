//! The bound sensor instance

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::bus::{Bus, BusTransport};
use crate::diagnostics::Diagnostics;
use crate::platform::IdentityToken;

/// Stage a device instance has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Nothing acquired yet
    Unbound,
    /// Identity and class acquired, bus transport constructed
    Bound,
    /// Node and stream channel published
    Configured,
    /// Default register values programmed (possibly partially)
    Active,
    /// Teardown in progress
    Unbinding,
    /// Torn down after having been bound
    Released,
}

impl LifecycleState {
    /// Bound or further along, and not torn down
    pub fn is_bound(&self) -> bool {
        matches!(
            self,
            LifecycleState::Bound | LifecycleState::Configured | LifecycleState::Active
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Unbound => "unbound",
            LifecycleState::Bound => "bound",
            LifecycleState::Configured => "configured",
            LifecycleState::Active => "active",
            LifecycleState::Unbinding => "unbinding",
            LifecycleState::Released => "released",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sensor bound to a bus adapter
///
/// Owned by [`DeviceLifecycle`](crate::DeviceLifecycle); the stream and
/// attribute interfaces only ever borrow it.
pub struct SensorDevice<B> {
    transport: BusTransport<B>,
    identity: IdentityToken,
    name: String,
    state: LifecycleState,
    diagnostics: Diagnostics,
    open_streams: AtomicUsize,
    next_handle: AtomicU64,
}

impl<B: Bus> SensorDevice<B> {
    pub(crate) fn new(
        transport: BusTransport<B>,
        identity: IdentityToken,
        name: String,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            transport,
            identity,
            name,
            state: LifecycleState::Bound,
            diagnostics,
            open_streams: AtomicUsize::new(0),
            next_handle: AtomicU64::new(1),
        }
    }

    pub fn transport(&self) -> &BusTransport<B> {
        &self.transport
    }

    pub fn identity(&self) -> IdentityToken {
        self.identity
    }

    /// Node name, `<family><minor>`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Number of stream handles currently open on this device
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::Acquire)
    }

    pub(crate) fn set_state(&mut self, state: LifecycleState) {
        tracing::debug!("{}: {} -> {}", self.name, self.state, state);
        self.state = state;
    }

    pub(crate) fn stream_opened(&self) -> u64 {
        self.open_streams.fetch_add(1, Ordering::AcqRel);
        self.next_handle.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn stream_closed(&self) {
        self.open_streams.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bound_states() {
        assert!(!LifecycleState::Unbound.is_bound());
        assert!(LifecycleState::Bound.is_bound());
        assert!(LifecycleState::Configured.is_bound());
        assert!(LifecycleState::Active.is_bound());
        assert!(!LifecycleState::Unbinding.is_bound());
        assert!(!LifecycleState::Released.is_bound());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(LifecycleState::Active.to_string(), "active");
        assert_eq!(LifecycleState::Released.to_string(), "released");
    }
}
