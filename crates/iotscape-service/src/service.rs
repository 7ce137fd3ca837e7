//! A single IoTScape service: definition, handlers, identity and announce
//! timer.

use iotscape_protocol::{
    CallEnvelope, ErrorReplyEnvelope, Event, EventEnvelope, Map, ReplyEnvelope,
    ServiceDefinition, Value,
};
use iotscape_schedule::{AnnounceConfig, AnnounceScheduler, Instant};

use crate::{
    DeviceIdentity, DeviceKey, DeviceRegistry, HandlerResult, HandlerTable, ServiceError,
    ServiceHandle,
};

/// What happened to an inbound call.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The handler succeeded; send this reply.
    Reply(ReplyEnvelope),
    /// The handler failed; send this error reply.
    Failed(ErrorReplyEnvelope),
    /// No handler is registered for the function.
    UnknownFunction,
}

/// One logical capability of the device, e.g. a light or a sensor.
///
/// A service starts without a device ID. The ID is derived the first time
/// the service is announced (or [`create_id`](Self::create_id) is called)
/// and never changes afterwards.
#[derive(Debug)]
pub struct Service {
    definition: ServiceDefinition,
    id_suffix: String,
    device_id: Option<String>,
    handlers: HandlerTable,
    scheduler: AnnounceScheduler,
}

impl Service {
    /// Parses `definition` into a service with no ID suffix.
    ///
    /// # Errors
    /// [`ServiceError::Definition`] if the definition is not a single-service
    /// JSON object.
    pub fn new(definition: &str) -> Result<Self, ServiceError> {
        Self::with_suffix(definition, "")
    }

    /// Parses `definition` into a service whose device ID ends in
    /// `id_suffix`. Use distinct suffixes to run several services of the
    /// same kind on one device.
    pub fn with_suffix(
        definition: &str,
        id_suffix: impl Into<String>,
    ) -> Result<Self, ServiceError> {
        let definition = ServiceDefinition::parse(definition)?;
        let id_suffix = id_suffix.into();
        tracing::debug!(service = definition.name(), suffix = %id_suffix, "service created");
        Ok(Self {
            definition,
            id_suffix,
            device_id: None,
            handlers: HandlerTable::new(),
            scheduler: AnnounceScheduler::default(),
        })
    }

    /// The service name.
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// The suffix appended to the hardware identity.
    pub fn id_suffix(&self) -> &str {
        &self.id_suffix
    }

    /// The device ID, once derived.
    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    /// The routing key, once the device ID is derived.
    pub fn key(&self) -> Option<DeviceKey> {
        self.device_id
            .as_deref()
            .map(|id| DeviceKey::new(self.name(), id))
    }

    /// The definition, with the device ID embedded once derived.
    pub fn definition(&self) -> &ServiceDefinition {
        &self.definition
    }

    /// Registers `handler` for `method`, replacing any previous handler.
    pub fn add_handler<F>(&mut self, method: &str, handler: F) -> &mut Self
    where
        F: FnMut(&[Value]) -> HandlerResult + Send + 'static,
    {
        let declared = self.definition.methods().next().is_none()
            || self.definition.declares_method(method)
            || method == HandlerTable::HEARTBEAT;
        if !declared {
            tracing::warn!(
                service = self.name(),
                method,
                "handler registered for a method the definition does not declare"
            );
        }
        self.handlers.insert(method, handler);
        self
    }

    /// The handler table.
    pub fn handlers(&self) -> &HandlerTable {
        &self.handlers
    }

    /// Derives the device ID and registers this service under it.
    ///
    /// Returns `Ok(false)` without touching the registry or the definition
    /// when the ID is unchanged. Otherwise embeds the new ID in the
    /// definition, drops the old registry key if there was one, and
    /// registers the new key for `handle`.
    ///
    /// # Errors
    /// [`ServiceError::DuplicateDevice`] if another service already
    /// answers for the new key. Nothing is changed in that case.
    pub fn create_id(
        &mut self,
        identity: &DeviceIdentity,
        registry: &mut DeviceRegistry,
        handle: ServiceHandle,
    ) -> Result<bool, ServiceError> {
        let id = identity.device_id(&self.id_suffix);
        if self.device_id.as_deref() == Some(id.as_str()) {
            return Ok(false);
        }

        let key = DeviceKey::new(self.name(), &id);
        if registry.get(&key).is_some_and(|owner| owner != handle) {
            return Err(ServiceError::DuplicateDevice(key));
        }

        self.definition.embed_id(&id)?;
        if let Some(old) = self.key() {
            registry.remove(&old);
        }
        self.device_id = Some(id);
        registry.insert(key, handle);

        tracing::info!(
            service = self.name(),
            device = self.device_id.as_deref().unwrap_or_default(),
            "device ID assigned"
        );
        Ok(true)
    }

    /// Runs the handler for an inbound call and builds the reply.
    pub fn handle_call(&mut self, call: &CallEnvelope) -> CallOutcome {
        let id = self.device_id.clone().unwrap_or_default();
        match self.handlers.call(&call.function, &call.params) {
            None => CallOutcome::UnknownFunction,
            Some(Ok(response)) => CallOutcome::Reply(ReplyEnvelope {
                id,
                request: call.id.clone(),
                service: call.service.clone(),
                response,
            }),
            Some(Err(e)) => {
                tracing::debug!(
                    service = self.name(),
                    function = %call.function,
                    error = %e,
                    "handler failed"
                );
                CallOutcome::Failed(ErrorReplyEnvelope {
                    id,
                    request: call.id.clone(),
                    service: call.service.clone(),
                    error: e.message().to_string(),
                })
            }
        }
    }

    /// Builds an event envelope.
    ///
    /// # Errors
    /// [`ServiceError::NotAnnounced`] if the service has no device ID yet.
    pub fn event(
        &self,
        kind: &str,
        args: Map<String, Value>,
    ) -> Result<EventEnvelope, ServiceError> {
        let id = self
            .device_id
            .clone()
            .ok_or_else(|| ServiceError::NotAnnounced(self.name().to_string()))?;
        if !self.definition.declares_event(kind) {
            tracing::warn!(service = self.name(), event = kind, "sending undeclared event");
        }
        Ok(EventEnvelope {
            id,
            service: self.name().to_string(),
            event: Event {
                kind: kind.to_string(),
                args,
            },
        })
    }

    /// Whether the service should re-announce at `now`.
    pub fn is_announce_due(&self, now: Instant) -> bool {
        self.scheduler.is_due(now)
    }

    /// Records an announce sent at `now`.
    pub fn record_announce(&mut self, now: Instant) {
        self.scheduler.record_announce(now);
    }

    /// The announce scheduler.
    pub fn scheduler(&self) -> &AnnounceScheduler {
        &self.scheduler
    }

    /// Changes the re-announce interval, keeping announce history.
    pub fn set_announce_config(&mut self, config: AnnounceConfig) {
        self.scheduler.reconfigure(config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedIdentity;
    use serde_json::json;

    const LIGHT: &str = r#"{"Light": {"version": "1", "id": "",
        "methods": {"turnOn": {}},
        "events": {"changed": {}}}}"#;

    fn identity() -> DeviceIdentity {
        DeviceIdentity::derive(&FixedIdentity::new(vec![0xaa_u8, 0xbb, 0xcc])).unwrap()
    }

    fn call(function: &str) -> CallEnvelope {
        CallEnvelope {
            service: "Light".into(),
            device: "AABBCC".into(),
            id: "req1".into(),
            function: function.into(),
            params: vec![],
        }
    }

    #[test]
    fn test_new_service_has_no_id() {
        let svc = Service::new(LIGHT).unwrap();
        assert_eq!(svc.name(), "Light");
        assert_eq!(svc.device_id(), None);
        assert_eq!(svc.key(), None);
        assert!(svc.handlers().contains("heartbeat"));
    }

    #[test]
    fn test_malformed_definition_fails_construction() {
        let err = Service::new("{not json").unwrap_err();
        assert!(matches!(err, ServiceError::Definition(_)));
    }

    #[test]
    fn test_create_id_embeds_and_registers() {
        let mut svc = Service::with_suffix(LIGHT, "-1").unwrap();
        let mut registry = DeviceRegistry::new();
        let handle = ServiceHandle::new(0);

        assert!(svc.create_id(&identity(), &mut registry, handle).unwrap());

        assert_eq!(svc.device_id(), Some("AABBCC-1"));
        assert_eq!(registry.resolve("Light", "AABBCC-1"), Some(handle));
        let doc: Value = serde_json::from_str(svc.definition().as_str()).unwrap();
        assert_eq!(doc["Light"]["id"], "AABBCC-1");
    }

    #[test]
    fn test_create_id_twice_changes_nothing() {
        let mut svc = Service::new(LIGHT).unwrap();
        let mut registry = DeviceRegistry::new();
        let handle = ServiceHandle::new(4);

        svc.create_id(&identity(), &mut registry, handle).unwrap();
        let text = svc.definition().as_str().to_string();

        assert!(!svc.create_id(&identity(), &mut registry, handle).unwrap());
        assert_eq!(svc.definition().as_str(), text);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("Light", "AABBCC"), Some(handle));
    }

    #[test]
    fn test_create_id_rejects_key_owned_by_another_service() {
        let mut first = Service::new(LIGHT).unwrap();
        let mut second = Service::new(LIGHT).unwrap();
        let mut registry = DeviceRegistry::new();

        first
            .create_id(&identity(), &mut registry, ServiceHandle::new(0))
            .unwrap();
        let err = second
            .create_id(&identity(), &mut registry, ServiceHandle::new(1))
            .unwrap_err();

        assert!(matches!(err, ServiceError::DuplicateDevice(_)));
        assert_eq!(second.device_id(), None);
        assert_eq!(registry.resolve("Light", "AABBCC"), Some(ServiceHandle::new(0)));
    }

    #[test]
    fn test_heartbeat_replies_true() {
        let mut svc = Service::new(LIGHT).unwrap();
        let mut registry = DeviceRegistry::new();
        svc.create_id(&identity(), &mut registry, ServiceHandle::new(0))
            .unwrap();

        let outcome = svc.handle_call(&call("heartbeat"));
        assert_eq!(
            outcome,
            CallOutcome::Reply(ReplyEnvelope {
                id: "AABBCC".into(),
                request: "req1".into(),
                service: "Light".into(),
                response: json!([true]),
            })
        );
    }

    #[test]
    fn test_unknown_function_outcome() {
        let mut svc = Service::new(LIGHT).unwrap();
        assert_eq!(svc.handle_call(&call("doesNotExist")), CallOutcome::UnknownFunction);
    }

    #[test]
    fn test_failing_handler_yields_error_reply() {
        let mut svc = Service::new(LIGHT).unwrap();
        svc.add_handler("turnOn", |_| Err("bulb missing".into()));

        let CallOutcome::Failed(reply) = svc.handle_call(&call("turnOn")) else {
            panic!("expected error reply");
        };
        assert_eq!(reply.error, "bulb missing");
        assert_eq!(reply.request, "req1");
    }

    #[test]
    fn test_event_requires_device_id() {
        let svc = Service::new(LIGHT).unwrap();
        let err = svc.event("changed", Map::new()).unwrap_err();
        assert!(matches!(err, ServiceError::NotAnnounced(_)));
    }

    #[test]
    fn test_event_carries_device_id() {
        let mut svc = Service::new(LIGHT).unwrap();
        let mut registry = DeviceRegistry::new();
        svc.create_id(&identity(), &mut registry, ServiceHandle::new(0))
            .unwrap();

        let event = svc.event("changed", Map::new()).unwrap();
        assert_eq!(event.id, "AABBCC");
        assert_eq!(event.service, "Light");
        assert_eq!(event.event.kind, "changed");
    }

    #[test]
    fn test_announce_bookkeeping() {
        let mut svc = Service::new(LIGHT).unwrap();
        let now = Instant::now();
        assert!(svc.is_announce_due(now));
        svc.record_announce(now);
        assert!(!svc.is_announce_due(now));
        assert_eq!(svc.scheduler().announce_count(), 1);
    }
}
