//! Linux i2c-dev bus backend
//!
//! Talks to the sensor through `/dev/i2c-<bus>` via `i2cdev`. Register access
//! uses the adapter's SMBus byte-data commands, each a single bus transaction
//! arbitrated by the kernel; raw transfers are plain reads and writes on the
//! character device.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use i2cdev::core::I2CDevice;
use i2cdev::linux::{LinuxI2CDevice, LinuxI2CError};
use nix::errno::Errno;

use crate::bus::{Bus, Direction, Transfer};
use crate::error::{BusFault, DriverError};

struct Inner {
    device: LinuxI2CDevice,
    /// Slave address currently selected on the descriptor
    selected: u8,
}

/// i2c-dev adapter; the inner lock serializes every transaction
pub struct LinuxI2cBus {
    path: PathBuf,
    inner: Mutex<Inner>,
}

impl LinuxI2cBus {
    /// Open adapter number `bus` with `address` selected
    pub fn open(bus: u32, address: u8) -> Result<Self, DriverError> {
        Self::open_path(Path::new(&format!("/dev/i2c-{}", bus)), address)
    }

    pub fn open_path(path: &Path, address: u8) -> Result<Self, DriverError> {
        let device = LinuxI2CDevice::new(path, u16::from(address))
            .map_err(|e| DriverError::Io(std::io::Error::from(e)))?;
        tracing::info!("Opened i2c adapter {} at 0x{:02x}", path.display(), address);

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner {
                device,
                selected: address,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn with_device<T>(
        &self,
        address: u8,
        op: impl FnOnce(&mut LinuxI2CDevice) -> Result<T, LinuxI2CError>,
    ) -> Result<T, BusFault> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| BusFault::Io(std::io::Error::other("i2c adapter lock poisoned")))?;

        if inner.selected != address {
            inner
                .device
                .set_slave_address(u16::from(address))
                .map_err(classify)?;
            inner.selected = address;
        }

        op(&mut inner.device).map_err(classify)
    }
}

impl Bus for LinuxI2cBus {
    fn transfer(&self, transfer: &mut Transfer) -> Result<usize, BusFault> {
        let address = transfer.address;
        self.with_device(address, |device| {
            match transfer.direction {
                Direction::Read => device.read(&mut transfer.payload)?,
                Direction::Write => device.write(&transfer.payload)?,
            }
            Ok(transfer.payload.len())
        })
    }

    fn read_byte_data(&self, address: u8, register: u8) -> Result<u8, BusFault> {
        self.with_device(address, |device| device.smbus_read_byte_data(register))
    }

    fn write_byte_data(&self, address: u8, register: u8, value: u8) -> Result<(), BusFault> {
        self.with_device(address, |device| device.smbus_write_byte_data(register, value))
    }
}

fn classify(err: LinuxI2CError) -> BusFault {
    classify_io(std::io::Error::from(err))
}

fn classify_io(err: std::io::Error) -> BusFault {
    match err.raw_os_error() {
        Some(code) => classify_errno(Errno::from_raw(code)),
        None => BusFault::Io(err),
    }
}

/// Map an adapter errno onto the driver's bus fault kinds
fn classify_errno(errno: Errno) -> BusFault {
    match errno {
        Errno::ENXIO | Errno::EREMOTEIO | Errno::EIO => BusFault::NoAcknowledge,
        Errno::EBUSY | Errno::EAGAIN => BusFault::Busy,
        other => BusFault::Os(other),
    }
}
