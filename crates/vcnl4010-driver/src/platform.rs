//! Host identity, class and node registry
//!
//! The lifecycle acquires four kinds of host resources: a numeric device
//! identity reserved from a pool, a class/category the device is presented
//! under, the externally visible node carrying the attribute set, and the
//! stream registration for the raw byte channel. [`Platform`] is the seam;
//! [`HostRegistry`] is the in-process implementation.

use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use crate::registers::AccessMode;

#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("identity pool exhausted ({capacity} identities in use)")]
    PoolExhausted { capacity: u32 },

    #[error("{kind} '{name}' already exists")]
    AlreadyExists { kind: &'static str, name: String },

    #[error("{kind} '{name}' is not registered")]
    NotRegistered { kind: &'static str, name: String },

    #[error("request refused: {0}")]
    Refused(String),
}

/// Numeric device identity (major/minor pair)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityToken {
    pub major: u32,
    pub minor: u32,
}

impl std::fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHandle {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHandle {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRegistration {
    pub identity: IdentityToken,
}

/// One attribute published on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDecl {
    pub name: &'static str,
    pub mode: AccessMode,
}

/// Everything needed to create a node
#[derive(Debug, Clone)]
pub struct NodeSpec<'a> {
    pub class: &'a ClassHandle,
    pub identity: IdentityToken,
    pub name: String,
    pub attributes: Vec<AttributeDecl>,
}

/// Host-side resource provider used by the device lifecycle
pub trait Platform {
    fn reserve_identity(&mut self, name: &str) -> Result<IdentityToken, PlatformError>;
    fn release_identity(&mut self, identity: IdentityToken) -> Result<(), PlatformError>;

    fn create_class(&mut self, name: &str) -> Result<ClassHandle, PlatformError>;
    fn destroy_class(&mut self, class: &ClassHandle) -> Result<(), PlatformError>;

    fn create_node(&mut self, spec: &NodeSpec<'_>) -> Result<NodeHandle, PlatformError>;
    fn destroy_node(&mut self, node: &NodeHandle) -> Result<(), PlatformError>;

    fn register_stream(&mut self, identity: IdentityToken) -> Result<StreamRegistration, PlatformError>;
    fn unregister_stream(&mut self, registration: &StreamRegistration) -> Result<(), PlatformError>;
}

/// A node as recorded by the registry
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub id: u32,
    pub class_id: u32,
    pub identity: IdentityToken,
    pub attributes: Vec<AttributeDecl>,
}

/// In-process registry with a bounded identity pool
#[derive(Debug)]
pub struct HostRegistry {
    major: u32,
    capacity: u32,
    minors: BTreeSet<u32>,
    classes: HashMap<u32, String>,
    nodes: HashMap<String, NodeRecord>,
    streams: BTreeSet<IdentityToken>,
    next_id: u32,
}

/// Start of the dynamically assigned major range
pub const DEFAULT_MAJOR: u32 = 240;
pub const DEFAULT_CAPACITY: u32 = 8;

impl Default for HostRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAJOR, DEFAULT_CAPACITY)
    }
}

impl HostRegistry {
    pub fn new(major: u32, capacity: u32) -> Self {
        Self {
            major,
            capacity,
            minors: BTreeSet::new(),
            classes: HashMap::new(),
            nodes: HashMap::new(),
            streams: BTreeSet::new(),
            next_id: 1,
        }
    }

    pub fn identities_in_use(&self) -> usize {
        self.minors.len()
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.values().any(|c| c == name)
    }

    pub fn node(&self, name: &str) -> Option<&NodeRecord> {
        self.nodes.get(name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_stream_registered(&self, identity: IdentityToken) -> bool {
        self.streams.contains(&identity)
    }

    /// Nothing held at all
    pub fn is_empty(&self) -> bool {
        self.minors.is_empty()
            && self.classes.is_empty()
            && self.nodes.is_empty()
            && self.streams.is_empty()
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        id
    }
}

impl Platform for HostRegistry {
    fn reserve_identity(&mut self, name: &str) -> Result<IdentityToken, PlatformError> {
        let minor = (0..self.capacity)
            .find(|m| !self.minors.contains(m))
            .ok_or(PlatformError::PoolExhausted {
                capacity: self.capacity,
            })?;

        self.minors.insert(minor);
        let identity = IdentityToken {
            major: self.major,
            minor,
        };
        tracing::debug!("Reserved identity {} for {}", identity, name);
        Ok(identity)
    }

    fn release_identity(&mut self, identity: IdentityToken) -> Result<(), PlatformError> {
        if identity.major != self.major || !self.minors.remove(&identity.minor) {
            return Err(PlatformError::NotRegistered {
                kind: "identity",
                name: identity.to_string(),
            });
        }
        tracing::debug!("Released identity {}", identity);
        Ok(())
    }

    fn create_class(&mut self, name: &str) -> Result<ClassHandle, PlatformError> {
        if self.has_class(name) {
            return Err(PlatformError::AlreadyExists {
                kind: "class",
                name: name.to_string(),
            });
        }

        let id = self.allocate_id();
        self.classes.insert(id, name.to_string());
        Ok(ClassHandle {
            id,
            name: name.to_string(),
        })
    }

    fn destroy_class(&mut self, class: &ClassHandle) -> Result<(), PlatformError> {
        if self.nodes.values().any(|n| n.class_id == class.id) {
            return Err(PlatformError::Refused(format!(
                "class '{}' still has nodes",
                class.name
            )));
        }

        self.classes
            .remove(&class.id)
            .map(|_| ())
            .ok_or_else(|| PlatformError::NotRegistered {
                kind: "class",
                name: class.name.clone(),
            })
    }

    fn create_node(&mut self, spec: &NodeSpec<'_>) -> Result<NodeHandle, PlatformError> {
        if !self.classes.contains_key(&spec.class.id) {
            return Err(PlatformError::NotRegistered {
                kind: "class",
                name: spec.class.name.clone(),
            });
        }
        if self.nodes.contains_key(&spec.name) {
            return Err(PlatformError::AlreadyExists {
                kind: "node",
                name: spec.name.clone(),
            });
        }

        let id = self.allocate_id();
        self.nodes.insert(
            spec.name.clone(),
            NodeRecord {
                id,
                class_id: spec.class.id,
                identity: spec.identity,
                attributes: spec.attributes.clone(),
            },
        );
        Ok(NodeHandle {
            id,
            name: spec.name.clone(),
        })
    }

    fn destroy_node(&mut self, node: &NodeHandle) -> Result<(), PlatformError> {
        match self.nodes.get(&node.name) {
            Some(record) if record.id == node.id => {
                self.nodes.remove(&node.name);
                Ok(())
            }
            _ => Err(PlatformError::NotRegistered {
                kind: "node",
                name: node.name.clone(),
            }),
        }
    }

    fn register_stream(&mut self, identity: IdentityToken) -> Result<StreamRegistration, PlatformError> {
        if !self.minors.contains(&identity.minor) {
            return Err(PlatformError::NotRegistered {
                kind: "identity",
                name: identity.to_string(),
            });
        }
        if !self.streams.insert(identity) {
            return Err(PlatformError::AlreadyExists {
                kind: "stream",
                name: identity.to_string(),
            });
        }
        Ok(StreamRegistration { identity })
    }

    fn unregister_stream(&mut self, registration: &StreamRegistration) -> Result<(), PlatformError> {
        if self.streams.remove(&registration.identity) {
            Ok(())
        } else {
            Err(PlatformError::NotRegistered {
                kind: "stream",
                name: registration.identity.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_pool_exhaustion() {
        let mut registry = HostRegistry::new(240, 2);
        let a = registry.reserve_identity("vcnl4010").unwrap();
        let b = registry.reserve_identity("vcnl4010").unwrap();
        assert_eq!((a.minor, b.minor), (0, 1));

        let err = registry.reserve_identity("vcnl4010").unwrap_err();
        assert!(matches!(err, PlatformError::PoolExhausted { capacity: 2 }));

        registry.release_identity(a).unwrap();
        assert_eq!(registry.reserve_identity("vcnl4010").unwrap().minor, 0);
    }

    #[test]
    fn test_double_release_identity() {
        let mut registry = HostRegistry::default();
        let id = registry.reserve_identity("vcnl4010").unwrap();
        registry.release_identity(id).unwrap();
        assert!(registry.release_identity(id).is_err());
    }

    #[test]
    fn test_duplicate_class() {
        let mut registry = HostRegistry::default();
        registry.create_class("vcnl4010_class").unwrap();
        let err = registry.create_class("vcnl4010_class").unwrap_err();
        assert!(matches!(err, PlatformError::AlreadyExists { kind: "class", .. }));
    }

    #[test]
    fn test_node_lifecycle() {
        let mut registry = HostRegistry::default();
        let identity = registry.reserve_identity("vcnl4010").unwrap();
        let class = registry.create_class("vcnl4010_class").unwrap();

        let spec = NodeSpec {
            class: &class,
            identity,
            name: "vcnl40100".into(),
            attributes: vec![AttributeDecl {
                name: "command",
                mode: AccessMode::ReadWrite,
            }],
        };
        let node = registry.create_node(&spec).unwrap();
        assert_eq!(registry.node("vcnl40100").unwrap().attributes.len(), 1);
        assert!(registry.create_node(&spec).is_err());

        // Class with live nodes cannot go away
        assert!(registry.destroy_class(&class).is_err());

        registry.destroy_node(&node).unwrap();
        registry.destroy_class(&class).unwrap();
        registry.release_identity(identity).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_stream_requires_identity() {
        let mut registry = HostRegistry::default();
        let stray = IdentityToken { major: 240, minor: 5 };
        assert!(registry.register_stream(stray).is_err());

        let identity = registry.reserve_identity("vcnl4010").unwrap();
        let registration = registry.register_stream(identity).unwrap();
        assert!(registry.is_stream_registered(identity));
        registry.unregister_stream(&registration).unwrap();
        assert!(registry.unregister_stream(&registration).is_err());
    }
}
