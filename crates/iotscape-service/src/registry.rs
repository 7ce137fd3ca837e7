//! The device registry: which service answers for which device.

use std::collections::HashMap;
use std::fmt;

/// Opaque reference to a service owned by the engine.
///
/// The registry stores handles, never services, so it does not decide how
/// long a service lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceHandle(usize);

impl ServiceHandle {
    /// Creates a handle from a raw slot index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the underlying slot index.
    pub fn into_inner(self) -> usize {
        self.0
    }
}

impl fmt::Display for ServiceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "svc-{}", self.0)
    }
}

/// Routing key `"<service name>:<device id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceKey(String);

impl DeviceKey {
    /// Builds the key for a service name and device ID.
    pub fn new(service: &str, device: &str) -> Self {
        Self(format!("{service}:{device}"))
    }

    /// The key as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maps device keys to the services that answer for them.
///
/// Owned by the engine and passed by reference to a service when it
/// derives its ID. Single-threaded like the rest of the engine.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: HashMap<DeviceKey, ServiceHandle>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Points `key` at `handle`, returning whatever it pointed at before.
    pub fn insert(&mut self, key: DeviceKey, handle: ServiceHandle) -> Option<ServiceHandle> {
        tracing::debug!(%key, %handle, "device registered");
        self.devices.insert(key, handle)
    }

    /// Removes `key`, returning the handle it pointed at.
    pub fn remove(&mut self, key: &DeviceKey) -> Option<ServiceHandle> {
        let removed = self.devices.remove(key);
        if removed.is_some() {
            tracing::debug!(%key, "device unregistered");
        }
        removed
    }

    /// Looks up the service answering for `key`.
    pub fn get(&self, key: &DeviceKey) -> Option<ServiceHandle> {
        self.devices.get(key).copied()
    }

    /// Looks up the service for a call's `service` and `device` fields.
    pub fn resolve(&self, service: &str, device: &str) -> Option<ServiceHandle> {
        self.get(&DeviceKey::new(service, device))
    }

    /// Registered handles, sorted so ticking order is stable.
    pub fn handles(&self) -> Vec<ServiceHandle> {
        let mut handles: Vec<_> = self.devices.values().copied().collect();
        handles.sort();
        handles
    }

    /// Removes every key pointing at `handle`.
    pub fn remove_handle(&mut self, handle: ServiceHandle) {
        self.devices.retain(|key, h| {
            let keep = *h != handle;
            if !keep {
                tracing::debug!(%key, %handle, "device unregistered");
            }
            keep
        });
    }

    /// Number of registered devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether no device is registered.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_key_format() {
        assert_eq!(DeviceKey::new("Light", "AABBCC").as_str(), "Light:AABBCC");
        assert_eq!(DeviceKey::new("Light", "AABBCC").to_string(), "Light:AABBCC");
    }

    #[test]
    fn test_service_handle_display() {
        assert_eq!(ServiceHandle::new(3).to_string(), "svc-3");
        assert_eq!(ServiceHandle::new(3).into_inner(), 3);
    }

    #[test]
    fn test_resolve_finds_registered_device() {
        let mut registry = DeviceRegistry::new();
        registry.insert(DeviceKey::new("Light", "AABBCC"), ServiceHandle::new(0));
        assert_eq!(registry.resolve("Light", "AABBCC"), Some(ServiceHandle::new(0)));
        assert_eq!(registry.resolve("Light", "ZZZZZZ"), None);
        assert_eq!(registry.resolve("Fan", "AABBCC"), None);
    }

    #[test]
    fn test_insert_returns_previous_handle() {
        let mut registry = DeviceRegistry::new();
        let key = DeviceKey::new("Light", "AABBCC");
        assert_eq!(registry.insert(key.clone(), ServiceHandle::new(0)), None);
        assert_eq!(
            registry.insert(key, ServiceHandle::new(1)),
            Some(ServiceHandle::new(0))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_remove_handle_drops_its_keys() {
        let mut registry = DeviceRegistry::new();
        registry.insert(DeviceKey::new("Light", "A"), ServiceHandle::new(0));
        registry.insert(DeviceKey::new("Fan", "A"), ServiceHandle::new(1));
        registry.remove_handle(ServiceHandle::new(0));
        assert_eq!(registry.handles(), vec![ServiceHandle::new(1)]);
        assert!(registry.remove(&DeviceKey::new("Fan", "A")).is_some());
        assert!(registry.is_empty());
    }
}
