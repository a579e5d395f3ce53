//! Bus transport
//!
//! [`Bus`] is the platform adapter (the only code that touches hardware);
//! [`BusTransport`] binds one adapter to the sensor's fixed address and adds
//! register semantics: access policy checks and write masks.

use crate::error::{BusFault, DriverError, Operation};
use crate::registers::RegisterDescriptor;

/// Direction of a single bus transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

/// One bus operation, created per call and never kept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub direction: Direction,
    pub address: u8,
    pub payload: Vec<u8>,
}

impl Transfer {
    /// Read of `len` bytes; the payload is the receive buffer
    pub fn read(address: u8, len: usize) -> Self {
        Self {
            direction: Direction::Read,
            address,
            payload: vec![0; len],
        }
    }

    pub fn write(address: u8, bytes: &[u8]) -> Self {
        Self {
            direction: Direction::Write,
            address,
            payload: bytes.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Platform bus adapter
///
/// Implementations are responsible for serializing access to the physical
/// bus; every call blocks until the transaction completes or fails.
pub trait Bus: Send + Sync {
    /// Perform one opaque transfer, returning the number of bytes moved
    fn transfer(&self, transfer: &mut Transfer) -> Result<usize, BusFault>;

    /// Single-byte register read (SMBus read-byte-data)
    fn read_byte_data(&self, address: u8, register: u8) -> Result<u8, BusFault>;

    /// Single-byte register write (SMBus write-byte-data)
    fn write_byte_data(&self, address: u8, register: u8, value: u8) -> Result<(), BusFault>;
}

impl<B: Bus + ?Sized> Bus for Box<B> {
    fn transfer(&self, transfer: &mut Transfer) -> Result<usize, BusFault> {
        (**self).transfer(transfer)
    }

    fn read_byte_data(&self, address: u8, register: u8) -> Result<u8, BusFault> {
        (**self).read_byte_data(address, register)
    }

    fn write_byte_data(&self, address: u8, register: u8, value: u8) -> Result<(), BusFault> {
        (**self).write_byte_data(address, register, value)
    }
}

/// Bus adapter bound to one device address
pub struct BusTransport<B> {
    bus: B,
    address: u8,
}

impl<B: Bus> BusTransport<B> {
    pub fn new(bus: B, address: u8) -> Self {
        Self { bus, address }
    }

    /// Device address every transfer targets
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Read exactly `len` bytes from the device, no register semantics
    pub fn raw_read(&self, len: usize) -> Result<Vec<u8>, DriverError> {
        let mut transfer = Transfer::read(self.address, len);
        let received = self.submit(&mut transfer)?;

        if received < len {
            let fault = BusFault::ShortTransfer {
                expected: len,
                actual: received,
            };
            tracing::error!("raw read at 0x{:02x}: {}", self.address, fault);
            return Err(DriverError::bus(
                format!("raw read of {} bytes at 0x{:02x}", len, self.address),
                fault,
            ));
        }

        Ok(transfer.payload)
    }

    /// Write `bytes` to the device, returning the count the transport accepted
    pub fn raw_write(&self, bytes: &[u8]) -> Result<usize, DriverError> {
        let mut transfer = Transfer::write(self.address, bytes);
        let sent = self.submit(&mut transfer)?;
        Ok(sent.min(bytes.len()))
    }

    fn submit(&self, transfer: &mut Transfer) -> Result<usize, DriverError> {
        let len = transfer.len();
        let direction = transfer.direction;

        match self.bus.transfer(transfer) {
            Ok(count) => {
                tracing::debug!(
                    "raw {} at 0x{:02x}: {} of {} bytes",
                    direction,
                    self.address,
                    count,
                    len
                );
                Ok(count)
            }
            Err(fault) => {
                tracing::error!("raw {} at 0x{:02x} failed: {}", direction, self.address, fault);
                Err(DriverError::bus(
                    format!("raw {} of {} bytes at 0x{:02x}", direction, len, self.address),
                    fault,
                ))
            }
        }
    }

    /// Read one register byte
    pub fn read_register(&self, register: &RegisterDescriptor) -> Result<u8, DriverError> {
        if !register.mode.can_read() {
            return Err(DriverError::AccessViolation {
                register: register.name,
                address: register.address,
                mode: register.mode,
                operation: Operation::Read,
            });
        }

        let value = self
            .bus
            .read_byte_data(self.address, register.address)
            .map_err(|fault| {
                DriverError::bus(
                    format!("read of {} (addr=0x{:02x})", register.name, register.address),
                    fault,
                )
            })?;

        tracing::debug!(
            "{} register (addr=0x{:02x}), read value: 0x{:02x}",
            register.name,
            register.address,
            value
        );
        Ok(value)
    }

    /// Write one register byte, applying the register's mask first
    pub fn write_register(&self, register: &RegisterDescriptor, value: u8) -> Result<(), DriverError> {
        if !register.mode.can_write() {
            return Err(DriverError::AccessViolation {
                register: register.name,
                address: register.address,
                mode: register.mode,
                operation: Operation::Write(value),
            });
        }

        let masked = register.apply_mask(value);
        self.bus
            .write_byte_data(self.address, register.address, masked)
            .map_err(|fault| {
                DriverError::bus(
                    format!(
                        "write of 0x{:02x} to {} (addr=0x{:02x})",
                        masked, register.name, register.address
                    ),
                    fault,
                )
            })?;

        tracing::debug!(
            "{} register (addr=0x{:02x}), written value: 0x{:02x}",
            register.name,
            register.address,
            masked
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::mock::{BusOp, MockBus};
    use crate::registers::{self, AccessMode};

    const ADDR: u8 = 0x13;

    fn transport() -> (BusTransport<MockBus>, MockBus) {
        let bus = MockBus::new();
        (BusTransport::new(bus.clone(), ADDR), bus)
    }

    #[test]
    fn test_transfer_constructors() {
        let read = Transfer::read(ADDR, 4);
        assert_eq!(read.direction, Direction::Read);
        assert_eq!(read.len(), 4);

        let write = Transfer::write(ADDR, &[]);
        assert!(write.is_empty());
    }

    #[test]
    fn test_masked_write_for_every_value() {
        let (transport, bus) = transport();
        for register in registers::all().iter().filter(|r| r.mask.is_some()) {
            for value in 0..=u8::MAX {
                transport.write_register(register, value).unwrap();
                let mask = register.mask.unwrap();
                assert_eq!(bus.last_write(register.address), Some(value & mask));
            }
        }
    }

    #[test]
    fn test_unmasked_write_is_verbatim() {
        let (transport, bus) = transport();
        transport.write_register(&registers::COMMAND, 0xA5).unwrap();
        assert_eq!(bus.register(0x80), 0xA5);
    }

    #[test]
    fn test_write_read_only_register_no_transfer() {
        let (transport, bus) = transport();
        let err = transport
            .write_register(&registers::PROXIMITY_LOW, 0x01)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessViolation);
        assert!(bus.operations().is_empty());
    }

    #[test]
    fn test_read_write_only_register_no_transfer() {
        let (transport, bus) = transport();
        let write_only = RegisterDescriptor::new("trigger", 0x90, AccessMode::WriteOnly, None);
        let err = transport.read_register(&write_only).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AccessViolation);
        assert!(bus.operations().is_empty());
    }

    #[test]
    fn test_register_access_is_single_transaction() {
        let (transport, bus) = transport();
        bus.set_register(0x87, 0x42);

        assert_eq!(transport.read_register(&registers::PROXIMITY_HIGH).unwrap(), 0x42);
        transport.write_register(&registers::COMMAND, 0x01).unwrap();

        assert_eq!(
            bus.operations(),
            vec![
                BusOp::ReadByte {
                    address: ADDR,
                    register: 0x87
                },
                BusOp::WriteByte {
                    address: ADDR,
                    register: 0x80,
                    value: 0x01
                },
            ]
        );
    }

    #[test]
    fn test_read_register_bus_error() {
        let (transport, bus) = transport();
        bus.fail_register(0x87);
        let err = transport.read_register(&registers::PROXIMITY_HIGH).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bus);
        assert!(err.to_string().contains("proximity_high"));
    }

    #[test]
    fn test_write_register_bus_error_names_value() {
        let (transport, bus) = transport();
        bus.fail_register(0x82);
        let err = transport
            .write_register(&registers::PROXIMITY_RATE, 0xFF)
            .unwrap_err();
        assert!(err.to_string().contains("0x07"));
        assert!(err.to_string().contains("0x82"));
    }

    #[test]
    fn test_raw_read_returns_exact_length() {
        let (transport, bus) = transport();
        bus.queue_stream(&[1, 2, 3, 4, 5]);
        assert_eq!(transport.raw_read(3).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            bus.operations(),
            vec![BusOp::Raw {
                direction: Direction::Read,
                address: ADDR,
                len: 3
            }]
        );
    }

    #[test]
    fn test_raw_read_short_transfer() {
        let (transport, bus) = transport();
        bus.queue_stream(&[1]);
        let err = transport.raw_read(4).unwrap_err();
        assert!(matches!(
            err,
            DriverError::Bus {
                source: BusFault::ShortTransfer {
                    expected: 4,
                    actual: 1
                },
                ..
            }
        ));
    }

    #[test]
    fn test_raw_write_reports_accepted_count() {
        let (transport, bus) = transport();
        assert_eq!(transport.raw_write(&[0x80, 0x08]).unwrap(), 2);
        assert_eq!(bus.written_stream(), vec![0x80, 0x08]);
    }

    #[test]
    fn test_raw_write_bus_error() {
        let (transport, bus) = transport();
        bus.fail_raw();
        let err = transport.raw_write(&[0x00]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Bus);
    }
}
