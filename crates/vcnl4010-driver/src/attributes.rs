//! Named-register attribute channel
//!
//! One entry per register. Reads come back as two lowercase hex digits and a
//! newline; writes take a single raw byte. Failures are returned to the caller
//! and also recorded in the device's diagnostics.

use crate::bus::Bus;
use crate::device::SensorDevice;
use crate::error::{DriverError, Operation};
use crate::platform::AttributeDecl;
use crate::registers::{self, AccessMode, RegisterDescriptor};

const SOURCE: &str = "attributes";

/// Attribute table entry: name, register, and what the entry may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeEntry {
    pub name: &'static str,
    pub register: &'static RegisterDescriptor,
    pub capability: AccessMode,
}

impl AttributeEntry {
    fn for_register(register: &'static RegisterDescriptor) -> Self {
        Self {
            name: register.name,
            register,
            capability: register.mode,
        }
    }

    pub fn declaration(&self) -> AttributeDecl {
        AttributeDecl {
            name: self.name,
            mode: self.capability,
        }
    }
}

/// Attribute table derived from the register map
pub fn table() -> Vec<AttributeEntry> {
    registers::all().iter().map(AttributeEntry::for_register).collect()
}

/// Declarations published on the device node
pub fn declarations() -> Vec<AttributeDecl> {
    table().iter().map(AttributeEntry::declaration).collect()
}

/// Attribute access bound to one device
pub struct AttributeInterface<'a, B: Bus> {
    device: &'a SensorDevice<B>,
    entries: Vec<AttributeEntry>,
}

impl<'a, B: Bus> AttributeInterface<'a, B> {
    pub fn new(device: &'a SensorDevice<B>) -> Self {
        Self {
            device,
            entries: table(),
        }
    }

    pub fn entries(&self) -> &[AttributeEntry] {
        &self.entries
    }

    fn entry(&self, name: &str) -> Result<&AttributeEntry, DriverError> {
        let state = self.device.state();
        if !state.is_bound() {
            return Err(DriverError::NotReady(state));
        }

        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| DriverError::NotFound(name.to_string()))
    }

    /// Read a register, formatted as `"xx\n"`
    pub fn read_attribute(&self, name: &str) -> Result<String, DriverError> {
        let entry = self.entry(name)?;

        let result = if entry.capability.can_read() {
            self.device.transport().read_register(entry.register)
        } else {
            Err(DriverError::AccessViolation {
                register: entry.register.name,
                address: entry.register.address,
                mode: entry.capability,
                operation: Operation::Read,
            })
        };

        match result {
            Ok(value) => Ok(format!("{:02x}\n", value)),
            Err(err) => {
                self.device.diagnostics().error(SOURCE, err.to_string());
                Err(err)
            }
        }
    }

    /// Write a single raw byte to a register; returns the bytes consumed
    pub fn write_attribute(&self, name: &str, input: &[u8]) -> Result<usize, DriverError> {
        let value = match input {
            [value] => *value,
            [] => {
                return Err(DriverError::InvalidArgument {
                    register: name.to_string(),
                    reason: "empty input".into(),
                });
            }
            _ => {
                return Err(DriverError::InvalidArgument {
                    register: name.to_string(),
                    reason: format!("only single-byte writes are allowed, got {} bytes", input.len()),
                });
            }
        };

        let entry = self.entry(name)?;

        let result = if entry.capability.can_write() {
            self.device.transport().write_register(entry.register, value)
        } else {
            Err(DriverError::AccessViolation {
                register: entry.register.name,
                address: entry.register.address,
                mode: entry.capability,
                operation: Operation::Write(value),
            })
        };

        match result {
            Ok(()) => Ok(1),
            Err(err) => {
                self.device.diagnostics().error(SOURCE, err.to_string());
                Err(err)
            }
        }
    }
}
