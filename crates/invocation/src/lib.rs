//! Cancellable remote action invocation.
//!
//! Turns one call through a [`remoting::RemotingManager`] into an effect that
//! settles exactly once, with either a [`remoting::CallOutcome`] or a
//! cancellation. Two surfaces are offered:
//!
//! - [`invoke`]: callback style. Returns a [`CancellationHandle`]
//!   synchronously; the completion callback runs on whatever thread the
//!   transport responds from.
//! - [`call`]: future style. Returns a [`PendingCall`] to `.await`.
//!
//! ## Settlement rules
//!
//! | Situation | Completion |
//! |-----------|------------|
//! | Capability absent | `Outcome(TransportError(UNAVAILABLE_MESSAGE))`, before `invoke` returns |
//! | Transport responds | `Outcome(classified response)` |
//! | `invoke_action` fails synchronously | `Outcome(TransportError(fault message))` |
//! | `invoke_action` panics | `Outcome(TransportError(panic message))` |
//! | Transport drops the handler unanswered | `Outcome(TransportError(..))` |
//! | `cancel()` while pending | `Cancelled`; transport handle cancelled once |
//! | `cancel()` after settlement | nothing; returns `AlreadySettled` |
//!
//! When a response and a cancellation race, whichever claims the call first
//! wins and the other is a no-op. A response arriving after a successful
//! cancel is discarded.
//!
//! ## Architectural Layer
//!
//! **Orchestration.** Sequences calls into the transport port; holds no
//! transport details of its own.

mod effect;
mod pending;

pub use effect::{invoke, CancelStatus, CancellationHandle, Completion};
pub use pending::{call, PendingCall};
