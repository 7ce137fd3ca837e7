//! The engine: owns the transport, the services and the device registry.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use iotscape_protocol::{Codec, JsonCodec, Map, Value};
use iotscape_schedule::{AnnounceConfig, Instant};
use iotscape_service::{
    DeviceIdentity, DeviceRegistry, HardwareIdentity, Service, ServiceHandle,
};
use iotscape_transport::{DatagramTransport, UdpConfig, UdpTransport};
use tokio::time::MissedTickBehavior;

use crate::{EngineConfig, IotScapeError, PumpReport, UnknownCallPolicy};

/// Builder for an engine talking UDP to an IoTScape server.
///
/// # Example
///
/// ```rust,ignore
/// let engine = IotScape::builder()
///     .server("10.0.0.2:1975".parse()?)
///     .bind("0.0.0.0:8888".parse()?)
///     .announce_interval(Duration::from_secs(30))
///     .build(&FixedIdentity::from_hex("AA:BB:CC:DD:EE:FF")?)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct IotScapeBuilder {
    udp: UdpConfig,
    engine: EngineConfig,
}

impl IotScapeBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server every datagram is sent to.
    pub fn server(mut self, addr: SocketAddr) -> Self {
        self.udp.server_addr = addr;
        self
    }

    /// Sets the local address to receive calls on.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.udp.local_addr = addr;
        self
    }

    /// Sets the receive buffer size.
    pub fn max_datagram_size(mut self, size: usize) -> Self {
        self.udp.max_datagram_size = size;
        self
    }

    /// Sets the re-announce interval for every service.
    pub fn announce_interval(mut self, interval: Duration) -> Self {
        self.engine.announce = AnnounceConfig::with_interval(interval);
        self
    }

    /// Sets how unroutable calls are handled.
    pub fn unknown_call_policy(mut self, policy: UnknownCallPolicy) -> Self {
        self.engine.unknown_call = policy;
        self
    }

    /// Binds the UDP socket, derives the device identity and builds the
    /// engine.
    pub fn build(
        self,
        identity: &impl HardwareIdentity,
    ) -> Result<IotScape<UdpTransport, JsonCodec>, IotScapeError> {
        let transport = UdpTransport::bind(self.udp)?;
        IotScape::new(transport, JsonCodec, identity, self.engine)
    }
}

/// The IoTScape device engine.
///
/// Single-threaded and cooperative: nothing inside blocks or spawns, and
/// the embedding application decides how often [`pump_once`](Self::pump_once)
/// runs.
pub struct IotScape<T: DatagramTransport, C: Codec> {
    pub(crate) transport: T,
    pub(crate) codec: C,
    pub(crate) identity: DeviceIdentity,
    pub(crate) services: Vec<Option<Service>>,
    pub(crate) registry: DeviceRegistry,
    pub(crate) config: EngineConfig,
}

impl IotScape<UdpTransport, JsonCodec> {
    /// Creates a builder for a UDP engine.
    pub fn builder() -> IotScapeBuilder {
        IotScapeBuilder::new()
    }
}

impl<T: DatagramTransport, C: Codec> IotScape<T, C> {
    /// Creates an engine over any transport and codec.
    ///
    /// The hardware identity is read once, here.
    ///
    /// # Errors
    /// [`IotScapeError::Service`] if the identity source returns nothing.
    pub fn new(
        transport: T,
        codec: C,
        identity: &impl HardwareIdentity,
        config: EngineConfig,
    ) -> Result<Self, IotScapeError> {
        let identity = DeviceIdentity::derive(identity)?;
        tracing::info!(%identity, policy = ?config.unknown_call, "IoTScape engine ready");
        Ok(Self {
            transport,
            codec,
            identity,
            services: Vec::new(),
            registry: DeviceRegistry::new(),
            config,
        })
    }

    /// The hex hardware identity shared by every service.
    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The device registry.
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Takes ownership of a service and returns its handle.
    ///
    /// The service is not reachable by the server until it has an ID;
    /// call [`announce`](Self::announce) (or [`create_id`](Self::create_id))
    /// next.
    pub fn add_service(&mut self, mut service: Service) -> ServiceHandle {
        service.set_announce_config(self.config.announce.clone());
        let handle = ServiceHandle::new(self.services.len());
        tracing::debug!(%handle, service = service.name(), "service added");
        self.services.push(Some(service));
        handle
    }

    /// Returns the service behind `handle`.
    pub fn service(&self, handle: ServiceHandle) -> Option<&Service> {
        self.services.get(handle.into_inner()).and_then(Option::as_ref)
    }

    /// Returns the service behind `handle`, mutably (e.g. to add handlers).
    pub fn service_mut(&mut self, handle: ServiceHandle) -> Option<&mut Service> {
        self.services
            .get_mut(handle.into_inner())
            .and_then(Option::as_mut)
    }

    /// Removes a service and its registry entry, handing it back.
    pub fn remove_service(&mut self, handle: ServiceHandle) -> Option<Service> {
        let service = self.services.get_mut(handle.into_inner())?.take()?;
        self.registry.remove_handle(handle);
        tracing::debug!(%handle, service = service.name(), "service removed");
        Some(service)
    }

    /// Derives the service's device ID and registers it without announcing.
    ///
    /// Returns `false` if the ID was already assigned.
    pub fn create_id(&mut self, handle: ServiceHandle) -> Result<bool, IotScapeError> {
        let service = self
            .services
            .get_mut(handle.into_inner())
            .and_then(Option::as_mut)
            .ok_or(IotScapeError::UnknownService(handle))?;
        Ok(service.create_id(&self.identity, &mut self.registry, handle)?)
    }

    /// Sends the service's definition to the server, deriving its ID first
    /// if needed.
    pub fn announce(&mut self, handle: ServiceHandle) -> Result<(), IotScapeError> {
        self.announce_at(handle, Instant::now())
    }

    /// Announces every service owned by the engine. Returns how many
    /// announces went out.
    ///
    /// A service that fails to announce (a duplicate device, a send error)
    /// is logged and skipped; the rest still go out.
    pub fn announce_all(&mut self) -> usize {
        let handles: Vec<_> = (0..self.services.len())
            .map(ServiceHandle::new)
            .filter(|h| self.service(*h).is_some())
            .collect();
        let now = Instant::now();
        let mut sent = 0;
        for handle in handles {
            match self.announce_at(handle, now) {
                Ok(()) => sent += 1,
                Err(e) => tracing::warn!(%handle, error = %e, "announce failed"),
            }
        }
        sent
    }

    /// Sends an event from the service behind `handle`.
    ///
    /// # Errors
    /// Fails if the service has not been announced yet, or if encoding or
    /// sending fails.
    pub fn send_event(
        &mut self,
        handle: ServiceHandle,
        kind: &str,
        args: Map<String, Value>,
    ) -> Result<(), IotScapeError> {
        let envelope = self
            .service(handle)
            .ok_or(IotScapeError::UnknownService(handle))?
            .event(kind, args)?;
        self.send_envelope(&envelope)?;
        tracing::debug!(service = %envelope.service, event = kind, "event sent");
        Ok(())
    }

    /// Runs one dispatch step: handle at most one inbound datagram, then
    /// tick every registered service's announce timer once.
    pub fn pump_once(&mut self) -> PumpReport {
        let inbound = self.receive_one();

        let now = Instant::now();
        let mut announces = 0;
        for handle in self.registry.handles() {
            let due = self
                .service(handle)
                .is_some_and(|s| s.is_announce_due(now));
            if !due {
                continue;
            }
            match self.announce_at(handle, now) {
                Ok(()) => announces += 1,
                Err(e) => tracing::warn!(%handle, error = %e, "periodic announce failed"),
            }
        }

        PumpReport { inbound, announces }
    }

    /// Calls [`pump_once`](Self::pump_once) every `period` until `shutdown`
    /// resolves.
    pub async fn run_until<F>(&mut self, period: Duration, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        tracing::info!(period_ms = period.as_millis() as u64, "IoTScape engine running");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    self.pump_once();
                }
            }
        }
        tracing::info!("IoTScape engine stopped");
    }

    fn announce_at(&mut self, handle: ServiceHandle, now: Instant) -> Result<(), IotScapeError> {
        let service = self
            .services
            .get_mut(handle.into_inner())
            .and_then(Option::as_mut)
            .ok_or(IotScapeError::UnknownService(handle))?;
        service.create_id(&self.identity, &mut self.registry, handle)?;

        // Recorded before sending: a failed send waits for the next interval.
        service.record_announce(now);
        self.transport
            .send(service.definition().as_str().as_bytes())?;

        tracing::info!(
            service = service.name(),
            device = service.device_id().unwrap_or_default(),
            "sent service announce"
        );
        Ok(())
    }
}
