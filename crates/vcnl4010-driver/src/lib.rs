//! VCNL4010 proximity / ambient-light sensor driver
//!
//! Binds to one sensor on a shared byte-oriented bus, programs its default
//! configuration and exposes two access surfaces over the same device:
//!
//! - a raw byte-stream channel ([`stream`]) for arbitrary-length opaque
//!   transfers, and
//! - a named-register attribute channel ([`attributes`]) with per-register
//!   access policy and write masks.
//!
//! Teardown releases host resources in reverse acquisition order, both on a
//! failed bind and on unbind.
//!
//! # Example
//!
//! ```no_run
//! use vcnl4010_config::DriverConfig;
//! use vcnl4010_driver::{AttributeInterface, DeviceLifecycle, HostRegistry, LinuxI2cBus};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DriverConfig::load_default()?;
//!     let address = config.device.address;
//!     let bus = LinuxI2cBus::open(config.device.bus, address)?;
//!
//!     let mut lifecycle = DeviceLifecycle::new(HostRegistry::default(), config);
//!     lifecycle.bind(bus, address)?;
//!
//!     if let Some(device) = lifecycle.device() {
//!         let attrs = AttributeInterface::new(device);
//!         print!("{}", attrs.read_attribute("proximity_high")?);
//!     }
//!
//!     lifecycle.unbind();
//!     Ok(())
//! }
//! ```

pub mod attributes;
pub mod bus;
pub mod device;
pub mod diagnostics;
pub mod error;
pub mod lifecycle;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod mock;
pub mod platform;
pub mod registers;
pub mod stream;

pub use attributes::{AttributeEntry, AttributeInterface};
pub use bus::{Bus, BusTransport, Direction, Transfer};
pub use device::{LifecycleState, SensorDevice};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{BusFault, DriverError, ErrorKind};
pub use lifecycle::{DeviceLifecycle, Resource};
#[cfg(target_os = "linux")]
pub use linux::LinuxI2cBus;
pub use platform::{HostRegistry, Platform, PlatformError};
pub use registers::{AccessMode, RegisterDescriptor};
pub use stream::StreamHandle;

/// Driver Result type
pub type Result<T> = std::result::Result<T, DriverError>;
