//! Raw byte-stream channel
//!
//! Opaque pass-through to the sensor: reads and writes of arbitrary length at
//! the device address with no register interpretation. Any framing is the
//! caller's business.

use crate::bus::Bus;
use crate::device::SensorDevice;
use crate::error::DriverError;

/// Open a stream handle on a bound device
pub fn open<B: Bus>(device: &SensorDevice<B>) -> Result<StreamHandle<'_, B>, DriverError> {
    let state = device.state();
    if !state.is_bound() {
        tracing::warn!("{}: stream open refused in state {}", device.name(), state);
        return Err(DriverError::NotReady(state));
    }

    let id = device.stream_opened();
    tracing::debug!("{}: stream handle {} opened", device.name(), id);
    Ok(StreamHandle { device, id })
}

/// Caller context for the stream channel
///
/// Holds the device it was opened on; dropping or closing it never affects
/// the device or other handles.
pub struct StreamHandle<'a, B: Bus> {
    device: &'a SensorDevice<B>,
    id: u64,
}

impl<'a, B: Bus> StreamHandle<'a, B> {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn device(&self) -> &'a SensorDevice<B> {
        self.device
    }

    /// Read exactly `len` bytes
    pub fn read(&self, len: usize) -> Result<Vec<u8>, DriverError> {
        if len == 0 {
            return Ok(Vec::new());
        }
        self.device.transport().raw_read(len)
    }

    /// Write `bytes`, returning how many the transport accepted
    pub fn write(&self, bytes: &[u8]) -> Result<usize, DriverError> {
        if bytes.is_empty() {
            return Ok(0);
        }
        self.device.transport().raw_write(bytes)
    }

    pub fn close(self) {}
}

impl<B: Bus> Drop for StreamHandle<'_, B> {
    fn drop(&mut self) {
        self.device.stream_closed();
        tracing::debug!("{}: stream handle {} closed", self.device.name(), self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusTransport;
    use crate::device::LifecycleState;
    use crate::diagnostics::Diagnostics;
    use crate::error::ErrorKind;
    use crate::mock::MockBus;
    use crate::platform::IdentityToken;

    fn device(bus: &MockBus) -> SensorDevice<MockBus> {
        SensorDevice::new(
            BusTransport::new(bus.clone(), 0x13),
            IdentityToken { major: 240, minor: 0 },
            "vcnl40100".into(),
            Diagnostics::new(),
        )
    }

    #[test]
    fn test_open_requires_bound_device() {
        let bus = MockBus::new();
        let mut device = device(&bus);
        device.set_state(LifecycleState::Released);

        let err = open(&device).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotReady);
        assert_eq!(device.open_streams(), 0);
    }

    #[test]
    fn test_empty_write_issues_no_transfer() {
        let bus = MockBus::new();
        let device = device(&bus);
        let handle = open(&device).unwrap();

        assert_eq!(handle.write(&[]).unwrap(), 0);
        assert!(bus.operations().is_empty());
    }

    #[test]
    fn test_empty_read_issues_no_transfer() {
        let bus = MockBus::new();
        let device = device(&bus);
        let handle = open(&device).unwrap();

        assert!(handle.read(0).unwrap().is_empty());
        assert!(bus.operations().is_empty());
    }

    #[test]
    fn test_read_write_pass_through() {
        let bus = MockBus::new();
        let device = device(&bus);
        let handle = open(&device).unwrap();

        bus.queue_stream(&[0x21, 0x00, 0x9D]);
        assert_eq!(handle.read(3).unwrap(), vec![0x21, 0x00, 0x9D]);

        assert_eq!(handle.write(&[0x80, 0x08]).unwrap(), 2);
        assert_eq!(bus.written_stream(), vec![0x80, 0x08]);
    }

    #[test]
    fn test_partial_write_never_exceeds_request() {
        let bus = MockBus::new();
        let device = device(&bus);
        let handle = open(&device).unwrap();

        bus.limit_raw_write(1);
        assert_eq!(handle.write(&[1, 2, 3]).unwrap(), 1);
    }

    #[test]
    fn test_close_only_releases_own_handle() {
        let bus = MockBus::new();
        let device = device(&bus);
        let first = open(&device).unwrap();
        let second = open(&device).unwrap();
        assert_ne!(first.id(), second.id());
        assert_eq!(device.open_streams(), 2);

        first.close();
        assert_eq!(device.open_streams(), 1);

        bus.queue_stream(&[0x42]);
        assert_eq!(second.read(1).unwrap(), vec![0x42]);
        assert_eq!(device.state(), LifecycleState::Bound);
    }
}
