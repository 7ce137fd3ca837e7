//! Engine configuration.

use iotscape_schedule::AnnounceConfig;

/// What to do with a call the engine can't route: the device is not
/// registered here, or the service has no handler for the function.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownCallPolicy {
    /// Drop the call without answering. The server is expected to know
    /// what the device offers from its announces.
    #[default]
    Drop,
    /// Answer with an error reply naming the problem.
    ErrorReply,
}

/// Transport-independent engine settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineConfig {
    /// Re-announce timing applied to every service the engine adopts.
    pub announce: AnnounceConfig,
    /// Handling of unroutable calls.
    pub unknown_call: UnknownCallPolicy,
}
