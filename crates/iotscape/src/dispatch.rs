//! Inbound routing: datagram → call → service → reply.

use iotscape_protocol::{CallEnvelope, Codec, ErrorReplyEnvelope};
use iotscape_service::CallOutcome;
use iotscape_transport::DatagramTransport;
use serde::Serialize;

use crate::{IotScape, IotScapeError, UnknownCallPolicy};

/// Why an inbound datagram produced no reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Polling the transport failed.
    ReceiveFailed,
    /// The datagram was not a call envelope.
    Undecodable,
    /// No registered service answers for `service:device`.
    UnknownDevice,
    /// The service has no handler for the function.
    UnknownFunction,
    /// The reply could not be encoded or sent.
    SendFailed,
}

/// What happened to the datagram handled in one pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A reply went out.
    Replied,
    /// An error reply went out.
    ErrorReplied,
    /// Nothing went out.
    Dropped(DropReason),
}

/// Summary of one [`IotScape::pump_once`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// `None` if no datagram was waiting.
    pub inbound: Option<InboundOutcome>,
    /// Announces sent by the scheduler tick.
    pub announces: usize,
}

impl<T: DatagramTransport, C: Codec> IotScape<T, C> {
    pub(crate) fn receive_one(&mut self) -> Option<InboundOutcome> {
        match self.transport.poll_recv() {
            Ok(Some(datagram)) => Some(self.route(&datagram)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "receive failed");
                Some(InboundOutcome::Dropped(DropReason::ReceiveFailed))
            }
        }
    }

    pub(crate) fn route(&mut self, datagram: &[u8]) -> InboundOutcome {
        let call: CallEnvelope = match self.codec.decode(datagram) {
            Ok(call) => call,
            Err(e) => {
                tracing::debug!(len = datagram.len(), error = %e, "dropping undecodable datagram");
                return InboundOutcome::Dropped(DropReason::Undecodable);
            }
        };

        let Some(handle) = self.registry.resolve(&call.service, &call.device) else {
            tracing::debug!(
                service = %call.service,
                device = %call.device,
                "call for unknown device"
            );
            let device = call.device.clone();
            return self.reject(&call, device, "unknown device", DropReason::UnknownDevice);
        };
        let Some(service) = self.service_mut(handle) else {
            return InboundOutcome::Dropped(DropReason::UnknownDevice);
        };

        tracing::trace!(%handle, function = %call.function, request = %call.id, "dispatching call");
        match service.handle_call(&call) {
            CallOutcome::Reply(reply) => self.deliver(&reply, InboundOutcome::Replied),
            CallOutcome::Failed(reply) => self.deliver(&reply, InboundOutcome::ErrorReplied),
            CallOutcome::UnknownFunction => {
                tracing::debug!(
                    service = %call.service,
                    function = %call.function,
                    "call for unknown function"
                );
                let device = service.device_id().unwrap_or_default().to_string();
                self.reject(&call, device, "unknown function", DropReason::UnknownFunction)
            }
        }
    }

    pub(crate) fn send_envelope<E: Serialize>(&mut self, envelope: &E) -> Result<(), IotScapeError> {
        let bytes = self.codec.encode(envelope)?;
        self.transport.send(&bytes)?;
        Ok(())
    }

    fn reject(
        &mut self,
        call: &CallEnvelope,
        device: String,
        what: &str,
        reason: DropReason,
    ) -> InboundOutcome {
        match self.config.unknown_call {
            UnknownCallPolicy::Drop => InboundOutcome::Dropped(reason),
            UnknownCallPolicy::ErrorReply => {
                let reply = ErrorReplyEnvelope {
                    id: device,
                    request: call.id.clone(),
                    service: call.service.clone(),
                    error: format!("{what}: {}", call.function),
                };
                self.deliver(&reply, InboundOutcome::ErrorReplied)
            }
        }
    }

    fn deliver<E: Serialize>(&mut self, envelope: &E, sent: InboundOutcome) -> InboundOutcome {
        match self.send_envelope(envelope) {
            Ok(()) => sent,
            Err(e) => {
                tracing::warn!(error = %e, "failed to send reply");
                InboundOutcome::Dropped(DropReason::SendFailed)
            }
        }
    }
}
