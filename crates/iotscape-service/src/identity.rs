//! Hardware identity and device ID derivation.

use crate::ServiceError;

/// Source of a stable, unique byte string for this device (usually the
/// MAC address of the network interface).
///
/// Must return the same bytes on every call.
pub trait HardwareIdentity {
    /// The raw identity bytes.
    fn identity_bytes(&self) -> Vec<u8>;
}

/// A [`HardwareIdentity`] with fixed bytes, for hosts where the embedding
/// application already knows its identity (and for tests).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIdentity(Vec<u8>);

impl FixedIdentity {
    /// Wraps raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Parses a hex string such as `AA:BB:CC:DD:EE:FF`, `aa-bb-cc` or
    /// `AABBCC`.
    pub fn from_hex(text: &str) -> Result<Self, ServiceError> {
        let digits: String = text
            .chars()
            .filter(|c| !matches!(c, ':' | '-'))
            .collect();
        let bytes = hex::decode(&digits)
            .map_err(|e| ServiceError::InvalidIdentity(format!("{text}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl HardwareIdentity for FixedIdentity {
    fn identity_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }
}

impl HardwareIdentity for [u8; 6] {
    fn identity_bytes(&self) -> Vec<u8> {
        self.to_vec()
    }
}

/// The device's identity rendered as uppercase hex.
///
/// Derived once per engine and shared by every service; each service's
/// device ID is this string followed by its ID suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceIdentity(String);

impl DeviceIdentity {
    /// Reads the hardware identity and renders it as uppercase hex.
    ///
    /// # Errors
    /// [`ServiceError::IdentityUnavailable`] if the source returns no bytes.
    pub fn derive(source: &impl HardwareIdentity) -> Result<Self, ServiceError> {
        let bytes = source.identity_bytes();
        if bytes.is_empty() {
            return Err(ServiceError::IdentityUnavailable);
        }
        Ok(Self(hex::encode_upper(bytes)))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The device ID for a service with the given suffix.
    pub fn device_id(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.0)
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
