//! The invocation effect: dispatch, settlement, and cancellation.
//!
//! Every call owns one [`SharedCall`]. Its completion sink can be taken
//! exactly once, and whoever takes it settles the call: the transport's
//! response, a synchronous transport fault, an abandoned handler, or
//! [`CancellationHandle::cancel`]. Whoever loses that race does nothing, so
//! exactly one [`Completion`] is ever delivered.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use remoting::{
    CallOutcome, CallRequest, CapabilityHandle, Delivery, InvocationId, RequestHandle,
    ResponseHandler, TransportFault,
};
use serde::Serialize;
use tracing::{debug, info_span, warn, Span};

// ---------------------------------------------------------------------------
// Completion
// ---------------------------------------------------------------------------

/// How an invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "completion", rename_all = "snake_case")]
pub enum Completion {
    /// The call resolved with an outcome.
    Outcome(CallOutcome),
    /// The call was cancelled before it resolved.
    Cancelled,
}

impl Completion {
    /// Returns the outcome, or `None` if the call was cancelled.
    pub fn outcome(&self) -> Option<&CallOutcome> {
        match self {
            Self::Outcome(outcome) => Some(outcome),
            Self::Cancelled => None,
        }
    }

    pub fn into_outcome(self) -> Option<CallOutcome> {
        match self {
            Self::Outcome(outcome) => Some(outcome),
            Self::Cancelled => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Result of [`CancellationHandle::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelStatus {
    /// The call was pending; the transport was asked to abort and
    /// [`Completion::Cancelled`] was delivered.
    Cancelled,
    /// The call had already settled (or been cancelled); nothing happened.
    AlreadySettled,
}

// ---------------------------------------------------------------------------
// Shared call state
// ---------------------------------------------------------------------------

type CompletionSink = Box<dyn FnOnce(Completion) + Send>;

struct CallState {
    sink: Option<CompletionSink>,
    request: Option<Box<dyn RequestHandle>>,
    dispatched: bool,
    abandoned_during_dispatch: bool,
}

struct SharedCall {
    state: Mutex<CallState>,
    span: Span,
}

impl SharedCall {
    fn new(sink: CompletionSink, span: Span) -> Self {
        Self {
            state: Mutex::new(CallState {
                sink: Some(sink),
                request: None,
                dispatched: false,
                abandoned_during_dispatch: false,
            }),
            span,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CallState> {
        // The state stays consistent across a panicking sink because the sink
        // is always taken out before it runs.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delivers `completion` if nothing else has. Returns `false` if the call
    /// was already settled.
    fn settle(&self, completion: Completion) -> bool {
        let sink = {
            let mut state = self.lock();
            state.request = None;
            state.sink.take()
        };
        match sink {
            Some(sink) => {
                sink(completion);
                true
            }
            None => false,
        }
    }

    fn on_delivery(&self, delivery: Delivery) {
        let _entered = self.span.enter();
        match delivery {
            Delivery::Responded(outcome) => {
                let label = outcome.label();
                if self.settle(Completion::Outcome(outcome)) {
                    debug!(outcome = label, "remote action settled");
                } else {
                    debug!(outcome = label, "late response discarded");
                }
            }
            Delivery::Abandoned => {
                {
                    let mut state = self.lock();
                    if !state.dispatched {
                        // A synchronous fault may still be on its way back
                        // from invoke_action and takes precedence.
                        state.abandoned_during_dispatch = true;
                        return;
                    }
                }
                if self.settle(Completion::Outcome(CallOutcome::abandoned())) {
                    warn!("transport dropped the response handler without responding");
                }
            }
        }
    }

    /// Records the end of `invoke_action` and settles anything it left
    /// pending.
    fn finish_dispatch(&self, dispatched: Result<Box<dyn RequestHandle>, TransportFault>) {
        let abandoned = {
            let mut state = self.lock();
            state.dispatched = true;
            match dispatched {
                Ok(request) => {
                    if state.sink.is_some() {
                        state.request = Some(request);
                    }
                    std::mem::take(&mut state.abandoned_during_dispatch)
                }
                Err(fault) => {
                    drop(state);
                    warn!(error = %fault, "transport failed to start remote action");
                    self.settle(Completion::Outcome(CallOutcome::transport_error(fault.message)));
                    return;
                }
            }
        };

        if abandoned && self.settle(Completion::Outcome(CallOutcome::abandoned())) {
            warn!("transport dropped the response handler without responding");
        }
    }
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cancels one running invocation.
///
/// Cloneable and safe to call from any thread, any number of times, at any
/// point in the call's life. Only the first call made while the invocation
/// is still pending has an effect.
#[derive(Clone)]
pub struct CancellationHandle {
    id: InvocationId,
    shared: Arc<SharedCall>,
}

impl CancellationHandle {
    /// The identifier of the invocation this handle cancels.
    pub fn invocation_id(&self) -> InvocationId {
        self.id
    }

    /// Returns `true` once the invocation has settled or been cancelled.
    pub fn is_settled(&self) -> bool {
        self.shared.lock().sink.is_none()
    }

    /// Cancels the invocation if it is still pending.
    ///
    /// Forwards to the transport's [`RequestHandle::cancel`], then delivers
    /// [`Completion::Cancelled`] to the caller. A response arriving later is
    /// discarded.
    pub fn cancel(&self) -> CancelStatus {
        let _entered = self.shared.span.enter();
        let (sink, request) = {
            let mut state = self.shared.lock();
            match state.sink.take() {
                Some(sink) => (sink, state.request.take()),
                None => {
                    debug!("cancel ignored; invocation already settled");
                    return CancelStatus::AlreadySettled;
                }
            }
        };

        if let Some(mut request) = request {
            request.cancel();
        }
        debug!("remote action cancelled");
        sink(Completion::Cancelled);
        CancelStatus::Cancelled
    }
}

impl std::fmt::Debug for CancellationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationHandle")
            .field("invocation_id", &self.id)
            .field("settled", &self.is_settled())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// A transport that panics inside `invoke_action` is treated as one that
/// failed synchronously; the panic does not escape.
fn fault_from_panic(payload: &(dyn Any + Send)) -> TransportFault {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "remoting transport panicked".to_owned());
    TransportFault::new(message)
}

/// Starts a remote action and reports its completion to `on_complete`.
///
/// `on_complete` is called exactly once, with either the classified outcome
/// or [`Completion::Cancelled`]. When `capability` is absent it is called
/// before this function returns, with the "could not find" transport error,
/// and no transport is contacted. A transport may also respond synchronously
/// from inside `invoke_action`, in which case the same applies.
pub fn invoke<F>(
    capability: &CapabilityHandle,
    request: CallRequest,
    on_complete: F,
) -> CancellationHandle
where
    F: FnOnce(Completion) + Send + 'static,
{
    let id = InvocationId::new_random();
    let span = info_span!("remote_action", invocation_id = %id, method = %request.method());
    let shared = Arc::new(SharedCall::new(Box::new(on_complete), span.clone()));
    let handle = CancellationHandle {
        id,
        shared: Arc::clone(&shared),
    };
    let _entered = span.enter();

    let Some(manager) = capability.manager() else {
        debug!("remoting capability absent; transport not contacted");
        shared.lock().dispatched = true;
        shared.settle(Completion::Outcome(CallOutcome::unavailable()));
        return handle;
    };

    debug!(
        parameters = request.parameters().len(),
        escape = request.configuration().escape(),
        buffer = request.configuration().buffer(),
        timeout_ms = request.configuration().timeout().as_millis() as u64,
        "dispatching remote action"
    );

    let responder = Arc::clone(&shared);
    let handler = ResponseHandler::new(move |delivery| responder.on_delivery(delivery));
    let dispatched = panic::catch_unwind(AssertUnwindSafe(|| {
        manager.invoke_action(
            request.method(),
            request.parameters(),
            handler,
            request.configuration(),
        )
    }))
    .unwrap_or_else(|payload| Err(fault_from_panic(payload.as_ref())));
    shared.finish_dispatch(dispatched);

    handle
}
