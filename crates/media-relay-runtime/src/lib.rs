#![deny(missing_docs)]
//! Media Relay runtime.
//!
//! Transport-agnostic request lifecycle: classify, fetch, apply the delivery
//! policy, reply, and always clean up.

/// Temp-file removal after delivery.
pub mod cleanup;
/// Per-request state machine.
pub mod coordinator;
/// Inbound chat message model.
pub mod message;
/// User-facing reply texts.
pub mod texts;
/// Chat transport abstraction.
pub mod transport;

pub use cleanup::{cleanup_request_files, cleanup_temp_file, CleanupStatus};
pub use coordinator::{
    CoordinatorConfig, FailureReason, MediaKind, RequestCoordinator, RequestOutcome,
    RequestState,
};
pub use message::InboundMessage;
pub use transport::{MessageRef, RelayTransport, TextFormat};
