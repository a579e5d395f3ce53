//! VCNL4010 register map
//!
//! Compile-time table of the registers the driver exposes, with their access
//! policy and write mask. Masks are applied on every write and never on read.

use crate::error::DriverError;

/// Register access policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn can_read(&self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn can_write(&self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AccessMode::ReadOnly => "read-only",
            AccessMode::WriteOnly => "write-only",
            AccessMode::ReadWrite => "read-write",
        };
        f.write_str(name)
    }
}

/// Immutable description of one register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub address: u8,
    pub mode: AccessMode,
    /// Significant bits on write; everything outside is forced to zero
    pub mask: Option<u8>,
}

impl RegisterDescriptor {
    pub const fn new(name: &'static str, address: u8, mode: AccessMode, mask: Option<u8>) -> Self {
        Self {
            name,
            address,
            mode,
            mask,
        }
    }

    /// Value actually transmitted for a write of `value`
    pub fn apply_mask(&self, value: u8) -> u8 {
        match self.mask {
            Some(mask) => value & mask,
            None => value,
        }
    }
}

/// Command register: measurement enables and on-demand triggers
pub const COMMAND: RegisterDescriptor =
    RegisterDescriptor::new("command", 0x80, AccessMode::ReadWrite, None);

/// Proximity measurement rate; only bits 2:0 are significant
pub const PROXIMITY_RATE: RegisterDescriptor =
    RegisterDescriptor::new("proximity_rate", 0x82, AccessMode::ReadWrite, Some(0x07));

/// Ambient light parameters (continuous conversion, rate, averaging)
pub const AMBIENT_LIGHT: RegisterDescriptor =
    RegisterDescriptor::new("ambient_light", 0x84, AccessMode::ReadWrite, None);

pub const AMBIENT_LIGHT_HIGH: RegisterDescriptor =
    RegisterDescriptor::new("ambient_light_high", 0x85, AccessMode::ReadOnly, None);

pub const AMBIENT_LIGHT_LOW: RegisterDescriptor =
    RegisterDescriptor::new("ambient_light_low", 0x86, AccessMode::ReadOnly, None);

pub const PROXIMITY_HIGH: RegisterDescriptor =
    RegisterDescriptor::new("proximity_high", 0x87, AccessMode::ReadOnly, None);

pub const PROXIMITY_LOW: RegisterDescriptor =
    RegisterDescriptor::new("proximity_low", 0x88, AccessMode::ReadOnly, None);

static REGISTERS: [RegisterDescriptor; 7] = [
    COMMAND,
    PROXIMITY_RATE,
    AMBIENT_LIGHT,
    AMBIENT_LIGHT_HIGH,
    AMBIENT_LIGHT_LOW,
    PROXIMITY_HIGH,
    PROXIMITY_LOW,
];

/// All registers in address order
pub fn all() -> &'static [RegisterDescriptor] {
    &REGISTERS
}

/// Look up a register by its symbolic name
pub fn resolve(name: &str) -> Result<&'static RegisterDescriptor, DriverError> {
    REGISTERS
        .iter()
        .find(|r| r.name == name)
        .ok_or_else(|| DriverError::NotFound(name.to_string()))
}

/// Look up a register by its bus address
pub fn by_address(address: u8) -> Option<&'static RegisterDescriptor> {
    REGISTERS.iter().find(|r| r.address == address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::collections::HashSet;

    #[test]
    fn test_addresses_are_disjoint() {
        let addresses: HashSet<u8> = all().iter().map(|r| r.address).collect();
        assert_eq!(addresses.len(), all().len());
    }

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<&str> = all().iter().map(|r| r.name).collect();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn test_resolve_known() {
        let reg = resolve("proximity_rate").unwrap();
        assert_eq!(reg.address, 0x82);
        assert_eq!(reg.mask, Some(0x07));
        assert_eq!(reg.mode, AccessMode::ReadWrite);
    }

    #[test]
    fn test_resolve_unknown() {
        let err = resolve("unknown_name").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_by_address() {
        assert_eq!(by_address(0x87).map(|r| r.name), Some("proximity_high"));
        assert!(by_address(0x81).is_none());
    }

    #[test]
    fn test_apply_mask() {
        assert_eq!(PROXIMITY_RATE.apply_mask(0xFF), 0x07);
        assert_eq!(PROXIMITY_RATE.apply_mask(0x0A), 0x02);
        assert_eq!(COMMAND.apply_mask(0xFF), 0xFF);
    }

    #[test]
    fn test_access_modes() {
        assert!(AccessMode::ReadOnly.can_read());
        assert!(!AccessMode::ReadOnly.can_write());
        assert!(!AccessMode::WriteOnly.can_read());
        assert!(AccessMode::ReadWrite.can_write());
        assert_eq!(AccessMode::ReadOnly.to_string(), "read-only");
    }

    #[test]
    fn test_measurement_registers_read_only() {
        for name in ["ambient_light_high", "ambient_light_low", "proximity_high", "proximity_low"] {
            assert_eq!(resolve(name).unwrap().mode, AccessMode::ReadOnly);
        }
    }
}
