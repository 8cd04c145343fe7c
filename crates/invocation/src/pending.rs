//! Future-based surface over [`crate::invoke`].
//!
//! The completion sink of the callback surface becomes the sender half of a
//! oneshot channel; [`PendingCall`] polls the receiver. Cancellation stays an
//! explicit, separately cloneable [`CancellationHandle`], so a task awaiting
//! the call and a task cancelling it need not be the same.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use remoting::{CallOutcome, CallRequest, CapabilityHandle};
use tokio::sync::oneshot;

use crate::{invoke, CancelStatus, CancellationHandle, Completion};

/// A remote action in flight.
///
/// Resolves to exactly one [`Completion`]. Dropping a `PendingCall` does not
/// cancel the call; use [`PendingCall::cancel`] or a
/// [`CancellationHandle`] for that.
#[derive(Debug)]
#[must_use = "a PendingCall does nothing useful unless awaited or cancelled"]
pub struct PendingCall {
    receiver: oneshot::Receiver<Completion>,
    cancellation: CancellationHandle,
}

impl PendingCall {
    /// A handle that cancels this call from anywhere.
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Cancels this call. Shorthand for `cancellation_handle().cancel()`.
    pub fn cancel(&self) -> CancelStatus {
        self.cancellation.cancel()
    }
}

impl Future for PendingCall {
    type Output = Completion;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        Pin::new(&mut this.receiver).poll(cx).map(|received| {
            // The sink is consumed on every settlement path, so a closed
            // channel means the call state itself was torn down unanswered.
            received.unwrap_or_else(|_| Completion::Outcome(CallOutcome::abandoned()))
        })
    }
}

/// Starts a remote action and returns it as a future.
pub fn call(capability: &CapabilityHandle, request: CallRequest) -> PendingCall {
    let (sender, receiver) = oneshot::channel();
    let cancellation = invoke(capability, request, move |completion| {
        // The receiver may already be gone; the caller stopped listening.
        let _ = sender.send(completion);
    });

    PendingCall {
        receiver,
        cancellation,
    }
}
