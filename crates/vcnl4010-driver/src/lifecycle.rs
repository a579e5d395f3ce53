//! Device lifecycle
//!
//! Bind sequence:
//! 1. Reserve a device identity and create the class (`Unbound -> Bound`)
//! 2. Publish the node with its attribute set and register the stream
//!    channel (`Bound -> Configured`)
//! 3. Program default register values (`Configured -> Active`)
//!
//! Every acquired host resource is pushed on a stack. A failure in stages 1
//! or 2 pops and releases the stack before the error is returned, so a failed
//! bind leaves nothing behind. Stage 3 is best effort: a failed default write
//! is recorded as a diagnostic and the device still becomes `Active`, since a
//! later attribute write can repair it. Unbind pops the stack the same way.

use vcnl4010_config::DriverConfig;

use crate::attributes;
use crate::bus::{Bus, BusTransport};
use crate::device::{LifecycleState, SensorDevice};
use crate::diagnostics::Diagnostics;
use crate::error::DriverError;
use crate::platform::{
    ClassHandle, IdentityToken, NodeHandle, NodeSpec, Platform, PlatformError, StreamRegistration,
};
use crate::registers;

const SOURCE: &str = "lifecycle";

/// A host resource held by a bound device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Identity(IdentityToken),
    Class(ClassHandle),
    Node(NodeHandle),
    Stream(StreamRegistration),
}

impl Resource {
    fn describe(&self) -> String {
        match self {
            Resource::Identity(identity) => format!("identity {}", identity),
            Resource::Class(class) => format!("class '{}'", class.name),
            Resource::Node(node) => format!("node '{}'", node.name),
            Resource::Stream(stream) => format!("stream channel {}", stream.identity),
        }
    }
}

/// Drives one sensor instance from detection to teardown
pub struct DeviceLifecycle<B: Bus, P: Platform> {
    platform: P,
    config: DriverConfig,
    resources: Vec<Resource>,
    device: Option<SensorDevice<B>>,
    diagnostics: Diagnostics,
}

impl<B: Bus, P: Platform> DeviceLifecycle<B, P> {
    pub fn new(platform: P, config: DriverConfig) -> Self {
        Self {
            platform,
            config,
            resources: Vec::new(),
            device: None,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.device
            .as_ref()
            .map_or(LifecycleState::Unbound, SensorDevice::state)
    }

    /// The bound device, or the released one after unbind
    pub fn device(&self) -> Option<&SensorDevice<B>> {
        self.device.as_ref()
    }

    pub fn node_name(&self) -> Option<&str> {
        self.device.as_ref().map(SensorDevice::name)
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Diagnostics shared by the lifecycle and every device it creates
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Resources currently held, in acquisition order
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Whether a discovery id names this sensor family
    pub fn matches(&self, id: &str) -> bool {
        self.config.device.matches(id)
    }

    /// Bind to a matched device on `bus`
    pub fn bind(&mut self, bus: B, address: u8) -> Result<(), DriverError> {
        let state = self.state();
        if state.is_bound() {
            return Err(DriverError::AlreadyBound(state));
        }
        self.device = None;

        let family = self.config.device.name.clone();
        let fixed_address = self.config.device.address;
        if address != fixed_address {
            self.diagnostics.warn(
                SOURCE,
                format!(
                    "{}: matched at 0x{:02x}, using fixed address 0x{:02x}",
                    family, address, fixed_address
                ),
            );
        }

        // Stage 1: identity and class
        let identity = self
            .platform
            .reserve_identity(&family)
            .map_err(|e| self.fail("device identity", e))?;
        self.resources.push(Resource::Identity(identity));

        let class_name = self.config.device.class_name.clone();
        let class = match self.platform.create_class(&class_name) {
            Ok(class) => class,
            Err(e) => return Err(self.abort("device class", e)),
        };
        self.resources.push(Resource::Class(class.clone()));

        let name = format!("{}{}", family, identity.minor);
        let transport = BusTransport::new(bus, fixed_address);
        let mut device = SensorDevice::new(transport, identity, name, self.diagnostics.clone());
        tracing::info!("{}: bound with identity {}", device.name(), identity);

        // Stage 2: node and stream channel
        let spec = NodeSpec {
            class: &class,
            identity,
            name: device.name().to_string(),
            attributes: attributes::declarations(),
        };
        let node = match self.platform.create_node(&spec) {
            Ok(node) => node,
            Err(e) => return Err(self.abort("device node", e)),
        };
        self.resources.push(Resource::Node(node));

        let stream = match self.platform.register_stream(identity) {
            Ok(stream) => stream,
            Err(e) => return Err(self.abort("stream channel", e)),
        };
        self.resources.push(Resource::Stream(stream));
        device.set_state(LifecycleState::Configured);

        // Stage 3: defaults, best effort
        tracing::info!("{}: sensor initializing", device.name());
        self.program_defaults(&device);
        device.set_state(LifecycleState::Active);
        tracing::info!("{}: active", device.name());

        self.device = Some(device);
        Ok(())
    }

    fn program_defaults(&self, device: &SensorDevice<B>) {
        for default in &self.config.defaults.writes {
            let result = registers::resolve(&default.register)
                .and_then(|register| device.transport().write_register(register, default.value));

            if let Err(err) = result {
                self.diagnostics.warn(
                    SOURCE,
                    format!(
                        "{}: default write of 0x{:02x} to {} failed: {}",
                        device.name(),
                        default.value,
                        default.register,
                        err
                    ),
                );
            }
        }
    }

    /// Release everything and report the stage that failed
    fn abort(&mut self, resource: &'static str, source: PlatformError) -> DriverError {
        let err = self.fail(resource, source);
        self.release_all();
        err
    }

    fn fail(&self, resource: &'static str, source: PlatformError) -> DriverError {
        let err = DriverError::ResourceExhausted { resource, source };
        self.diagnostics.error(
            SOURCE,
            format!("{}: {}", self.config.device.name, err),
        );
        err
    }

    /// Pop and release every held resource; a failed release never stops the rest
    fn release_all(&mut self) {
        while let Some(resource) = self.resources.pop() {
            let result = match &resource {
                Resource::Stream(stream) => self.platform.unregister_stream(stream),
                Resource::Node(node) => self.platform.destroy_node(node),
                Resource::Class(class) => self.platform.destroy_class(class),
                Resource::Identity(identity) => self.platform.release_identity(*identity),
            };

            match result {
                Ok(()) => tracing::info!("Released {}", resource.describe()),
                Err(e) => self.diagnostics.error(
                    SOURCE,
                    format!("failed to release {}: {}", resource.describe(), e),
                ),
            }
        }
    }

    /// Tear the device down; calling it again is a no-op
    pub fn unbind(&mut self) {
        let Some(device) = self.device.as_mut() else {
            tracing::info!("{}: unbind with no device bound", self.config.device.name);
            return;
        };

        if !device.state().is_bound() {
            tracing::info!("{}: already unbound ({})", device.name(), device.state());
            return;
        }

        device.set_state(LifecycleState::Unbinding);
        self.release_all();

        if let Some(device) = self.device.as_mut() {
            device.set_state(LifecycleState::Released);
            tracing::info!("{}: device successfully destroyed", device.name());
        }
    }
}

impl<B: Bus, P: Platform> Drop for DeviceLifecycle<B, P> {
    fn drop(&mut self) {
        if !self.resources.is_empty() {
            self.unbind();
        }
    }
}
