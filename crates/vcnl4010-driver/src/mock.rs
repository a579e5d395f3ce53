//! Mock implementations for testing without real hardware
//!
//! [`MockBus`] simulates the sensor's register file and raw byte stream;
//! [`MockPlatform`] wraps a [`HostRegistry`] and counts every acquisition and
//! release. Both support failure injection and share their state across
//! clones so tests can inspect what the driver did.
//!
//! # Usage
//!
//! ```no_run
//! use vcnl4010_driver::mock::{MockBus, MockPlatform, Stage};
//! use vcnl4010_driver::DeviceLifecycle;
//! use vcnl4010_config::DriverConfig;
//!
//! let bus = MockBus::new();
//! let platform = MockPlatform::new();
//! platform.fail_acquire(Stage::Class);
//!
//! let mut lifecycle = DeviceLifecycle::new(platform.clone(), DriverConfig::default());
//! assert!(lifecycle.bind(bus, 0x13).is_err());
//! assert_eq!(platform.released(Stage::Identity), 1);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use crate::bus::{Bus, Direction, Transfer};
use crate::error::BusFault;
use crate::platform::{
    ClassHandle, HostRegistry, IdentityToken, NodeHandle, NodeSpec, Platform, PlatformError,
    StreamRegistration,
};

/// One operation observed on the mock bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Raw {
        direction: Direction,
        address: u8,
        len: usize,
    },
    ReadByte {
        address: u8,
        register: u8,
    },
    WriteByte {
        address: u8,
        register: u8,
        value: u8,
    },
}

/// Shared mock bus state
#[derive(Debug, Default)]
pub struct MockBusState {
    /// Register file
    pub registers: HashMap<u8, u8>,
    /// Bytes returned by raw reads, consumed front to back
    pub stream_in: VecDeque<u8>,
    /// Bytes accepted by raw writes
    pub stream_out: Vec<u8>,
    /// Every attempted operation, including failed ones
    pub operations: Vec<BusOp>,
    /// Register addresses that always fail
    pub failing_registers: HashSet<u8>,
    /// Register addresses that fail on their next access only
    pub failing_once: HashSet<u8>,
    /// Raw transfers fail
    pub raw_fails: bool,
    /// Cap on bytes accepted per raw write
    pub raw_write_limit: Option<usize>,
}

/// Simulated sensor on a simulated bus
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<RwLock<MockBusState>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get shared state for manipulation in tests
    pub fn state(&self) -> Arc<RwLock<MockBusState>> {
        Arc::clone(&self.state)
    }

    pub fn set_register(&self, register: u8, value: u8) {
        if let Ok(mut state) = self.state.write() {
            state.registers.insert(register, value);
        }
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state
            .read()
            .map(|s| s.registers.get(&register).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Every register access fails until cleared
    pub fn fail_register(&self, register: u8) {
        if let Ok(mut state) = self.state.write() {
            state.failing_registers.insert(register);
        }
    }

    /// Next access to the register fails
    pub fn fail_register_once(&self, register: u8) {
        if let Ok(mut state) = self.state.write() {
            state.failing_once.insert(register);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.write() {
            state.failing_registers.clear();
            state.failing_once.clear();
            state.raw_fails = false;
        }
    }

    pub fn fail_raw(&self) {
        if let Ok(mut state) = self.state.write() {
            state.raw_fails = true;
        }
    }

    pub fn limit_raw_write(&self, limit: usize) {
        if let Ok(mut state) = self.state.write() {
            state.raw_write_limit = Some(limit);
        }
    }

    pub fn queue_stream(&self, bytes: &[u8]) {
        if let Ok(mut state) = self.state.write() {
            state.stream_in.extend(bytes.iter().copied());
        }
    }

    pub fn written_stream(&self) -> Vec<u8> {
        self.state
            .read()
            .map(|s| s.stream_out.clone())
            .unwrap_or_default()
    }

    pub fn operations(&self) -> Vec<BusOp> {
        self.state
            .read()
            .map(|s| s.operations.clone())
            .unwrap_or_default()
    }

    /// Register byte writes in the order they were issued
    pub fn register_writes(&self) -> Vec<(u8, u8)> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                BusOp::WriteByte {
                    register, value, ..
                } => Some((register, value)),
                _ => None,
            })
            .collect()
    }

    /// Value of the most recent write issued to `register`
    pub fn last_write(&self, register: u8) -> Option<u8> {
        self.register_writes()
            .into_iter()
            .rev()
            .find(|(r, _)| *r == register)
            .map(|(_, v)| v)
    }
}

impl MockBusState {
    fn check_register(&mut self, register: u8) -> Result<(), BusFault> {
        if self.failing_registers.contains(&register) || self.failing_once.remove(&register) {
            return Err(BusFault::NoAcknowledge);
        }
        Ok(())
    }
}

fn poisoned() -> BusFault {
    BusFault::Io(std::io::Error::other("mock bus state poisoned"))
}

impl Bus for MockBus {
    fn transfer(&self, transfer: &mut Transfer) -> Result<usize, BusFault> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.operations.push(BusOp::Raw {
            direction: transfer.direction,
            address: transfer.address,
            len: transfer.len(),
        });

        if state.raw_fails {
            return Err(BusFault::Busy);
        }

        match transfer.direction {
            Direction::Read => {
                let mut count = 0;
                for slot in transfer.payload.iter_mut() {
                    match state.stream_in.pop_front() {
                        Some(byte) => {
                            *slot = byte;
                            count += 1;
                        }
                        None => break,
                    }
                }
                tracing::debug!("[MOCK] raw read {} bytes", count);
                Ok(count)
            }
            Direction::Write => {
                let accepted = state
                    .raw_write_limit
                    .map_or(transfer.len(), |limit| limit.min(transfer.len()));
                let bytes = transfer.payload[..accepted].to_vec();
                state.stream_out.extend(bytes);
                tracing::debug!("[MOCK] raw write {} bytes", accepted);
                Ok(accepted)
            }
        }
    }

    fn read_byte_data(&self, address: u8, register: u8) -> Result<u8, BusFault> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.operations.push(BusOp::ReadByte { address, register });
        state.check_register(register)?;
        Ok(state.registers.get(&register).copied().unwrap_or(0))
    }

    fn write_byte_data(&self, address: u8, register: u8, value: u8) -> Result<(), BusFault> {
        let mut state = self.state.write().map_err(|_| poisoned())?;
        state.operations.push(BusOp::WriteByte {
            address,
            register,
            value,
        });
        state.check_register(register)?;
        state.registers.insert(register, value);
        tracing::debug!("[MOCK] register 0x{:02x} set to 0x{:02x}", register, value);
        Ok(())
    }
}

/// Platform resource kind, in acquisition order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Identity,
    Class,
    Node,
    Stream,
}

/// Acquisition or release observed on the mock platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformEvent {
    Acquired(Stage),
    Released(Stage),
}

/// Shared mock platform state
#[derive(Debug, Default)]
pub struct MockPlatformState {
    pub registry: HostRegistry,
    /// Successful acquisitions and release attempts, in order
    pub events: Vec<PlatformEvent>,
    pub fail_acquire: HashSet<Stage>,
    pub fail_release: HashSet<Stage>,
}

/// Counting, failure-injecting platform
#[derive(Debug, Clone, Default)]
pub struct MockPlatform {
    state: Arc<RwLock<MockPlatformState>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get shared state for manipulation in tests
    pub fn state(&self) -> Arc<RwLock<MockPlatformState>> {
        Arc::clone(&self.state)
    }

    /// Acquisition at `stage` fails until cleared
    pub fn fail_acquire(&self, stage: Stage) {
        if let Ok(mut state) = self.state.write() {
            state.fail_acquire.insert(stage);
        }
    }

    /// Release at `stage` reports an error (the resource is still freed)
    pub fn fail_release(&self, stage: Stage) {
        if let Ok(mut state) = self.state.write() {
            state.fail_release.insert(stage);
        }
    }

    pub fn clear_failures(&self) {
        if let Ok(mut state) = self.state.write() {
            state.fail_acquire.clear();
            state.fail_release.clear();
        }
    }

    pub fn events(&self) -> Vec<PlatformEvent> {
        self.state
            .read()
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn acquired(&self, stage: Stage) -> usize {
        self.count(PlatformEvent::Acquired(stage))
    }

    pub fn released(&self, stage: Stage) -> usize {
        self.count(PlatformEvent::Released(stage))
    }

    fn count(&self, event: PlatformEvent) -> usize {
        self.events().into_iter().filter(|e| *e == event).count()
    }

    /// Every acquired resource has been released
    pub fn is_clean(&self) -> bool {
        self.state
            .read()
            .map(|s| s.registry.is_empty())
            .unwrap_or(false)
    }

    fn acquire<T>(
        &self,
        stage: Stage,
        op: impl FnOnce(&mut HostRegistry) -> Result<T, PlatformError>,
    ) -> Result<T, PlatformError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PlatformError::Refused("mock platform state poisoned".into()))?;

        if state.fail_acquire.contains(&stage) {
            tracing::debug!("[MOCK] injected {:?} acquisition failure", stage);
            return Err(PlatformError::Refused(format!("injected {stage:?} failure")));
        }

        let value = op(&mut state.registry)?;
        state.events.push(PlatformEvent::Acquired(stage));
        Ok(value)
    }

    fn release(
        &self,
        stage: Stage,
        op: impl FnOnce(&mut HostRegistry) -> Result<(), PlatformError>,
    ) -> Result<(), PlatformError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| PlatformError::Refused("mock platform state poisoned".into()))?;

        state.events.push(PlatformEvent::Released(stage));
        op(&mut state.registry)?;

        if state.fail_release.contains(&stage) {
            return Err(PlatformError::Refused(format!("injected {stage:?} release failure")));
        }
        Ok(())
    }
}

impl Platform for MockPlatform {
    fn reserve_identity(&mut self, name: &str) -> Result<IdentityToken, PlatformError> {
        self.acquire(Stage::Identity, |r| r.reserve_identity(name))
    }

    fn release_identity(&mut self, identity: IdentityToken) -> Result<(), PlatformError> {
        self.release(Stage::Identity, |r| r.release_identity(identity))
    }

    fn create_class(&mut self, name: &str) -> Result<ClassHandle, PlatformError> {
        self.acquire(Stage::Class, |r| r.create_class(name))
    }

    fn destroy_class(&mut self, class: &ClassHandle) -> Result<(), PlatformError> {
        self.release(Stage::Class, |r| r.destroy_class(class))
    }

    fn create_node(&mut self, spec: &NodeSpec<'_>) -> Result<NodeHandle, PlatformError> {
        self.acquire(Stage::Node, |r| r.create_node(spec))
    }

    fn destroy_node(&mut self, node: &NodeHandle) -> Result<(), PlatformError> {
        self.release(Stage::Node, |r| r.destroy_node(node))
    }

    fn register_stream(&mut self, identity: IdentityToken) -> Result<StreamRegistration, PlatformError> {
        self.acquire(Stage::Stream, |r| r.register_stream(identity))
    }

    fn unregister_stream(&mut self, registration: &StreamRegistration) -> Result<(), PlatformError> {
        self.release(Stage::Stream, |r| r.unregister_stream(registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_bus_register_file() {
        let bus = MockBus::new();
        bus.write_byte_data(0x13, 0x80, 0xFF).unwrap();
        assert_eq!(bus.read_byte_data(0x13, 0x80).unwrap(), 0xFF);
        assert_eq!(bus.register(0x80), 0xFF);
        assert_eq!(bus.operations().len(), 2);
    }

    #[test]
    fn test_mock_bus_one_shot_failure() {
        let bus = MockBus::new();
        bus.fail_register_once(0x84);
        assert!(bus.write_byte_data(0x13, 0x84, 0x9D).is_err());
        assert!(bus.write_byte_data(0x13, 0x84, 0x9D).is_ok());
        assert_eq!(bus.register(0x84), 0x9D);
    }

    #[test]
    fn test_mock_bus_clear_failures() {
        let bus = MockBus::new();
        bus.fail_register(0x80);
        bus.fail_raw();
        bus.clear_failures();
        assert!(bus.read_byte_data(0x13, 0x80).is_ok());
        assert!(bus.transfer(&mut Transfer::write(0x13, &[1])).is_ok());
    }

    #[test]
    fn test_mock_platform_counts() {
        let mut platform = MockPlatform::new();
        let id = platform.reserve_identity("vcnl4010").unwrap();
        platform.release_identity(id).unwrap();

        assert_eq!(platform.acquired(Stage::Identity), 1);
        assert_eq!(platform.released(Stage::Identity), 1);
        assert!(platform.is_clean());
    }

    #[test]
    fn test_mock_platform_injected_failures() {
        let mut platform = MockPlatform::new();
        platform.fail_acquire(Stage::Class);
        assert!(platform.create_class("vcnl4010_class").is_err());
        assert_eq!(platform.acquired(Stage::Class), 0);

        platform.fail_release(Stage::Identity);
        let id = platform.reserve_identity("vcnl4010").unwrap();
        assert!(platform.release_identity(id).is_err());
        // Resource is freed even when the release reports an error
        assert!(platform.is_clean());
    }
}
