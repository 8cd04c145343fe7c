//! Port traits implemented by remoting transports.
//!
//! A transport exposes one entry point, [`RemotingManager::invoke_action`].
//! It receives a single-use [`ResponseHandler`], answers through it exactly
//! once (usually later, on its own schedule), and hands back a
//! [`RequestHandle`] that can abort the pending call.
//!
//! ## Architectural Layer
//!
//! **Port definitions.** Adapter crates implement these traits; the
//! invocation effect consumes them.

use serde_json::Value;

use crate::{
    CallConfiguration, CallOutcome, CallParameters, MethodName, ResponseEvent, TransportFault,
};

// ---------------------------------------------------------------------------
// Transport entry point
// ---------------------------------------------------------------------------

/// The remoting manager object of a host environment.
pub trait RemotingManager: Send + Sync {
    /// Starts a remote action.
    ///
    /// The transport must eventually call [`ResponseHandler::respond`] once,
    /// unless the returned handle is cancelled first. Dropping the handler
    /// without responding is tolerated and reported as a transport error.
    ///
    /// # Errors
    ///
    /// Returns [`TransportFault`] if the call could not be started at all.
    fn invoke_action(
        &self,
        method: &MethodName,
        parameters: &CallParameters,
        handler: ResponseHandler,
        configuration: &CallConfiguration,
    ) -> Result<Box<dyn RequestHandle>, TransportFault>;
}

/// Transport-native handle for one in-flight call.
pub trait RequestHandle: Send {
    /// Asks the transport to abort the call.
    ///
    /// After this returns the transport should not invoke the call's
    /// response handler, although callers do not rely on that.
    fn cancel(&mut self);
}

// ---------------------------------------------------------------------------
// Response handler
// ---------------------------------------------------------------------------

/// What a [`ResponseHandler`] reports to whoever created it.
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    /// The transport responded; the response has been classified.
    Responded(CallOutcome),
    /// The transport dropped the handler without responding.
    Abandoned,
}

type DeliverFn = Box<dyn FnOnce(Delivery) + Send>;

/// Single-use callback a transport invokes with its response.
///
/// This is the decoding boundary: the raw `(result, event)` pair is turned
/// into a [`CallOutcome`] here and nowhere else.
pub struct ResponseHandler {
    deliver: Option<DeliverFn>,
}

impl ResponseHandler {
    /// Wraps `deliver`, which will be called exactly once.
    pub fn new(deliver: impl FnOnce(Delivery) + Send + 'static) -> Self {
        Self {
            deliver: Some(Box::new(deliver)),
        }
    }

    /// Reports the transport's response.
    pub fn respond(mut self, result: Value, event: ResponseEvent) {
        if let Some(deliver) = self.deliver.take() {
            deliver(Delivery::Responded(CallOutcome::classify(result, &event)));
        }
    }
}

impl Drop for ResponseHandler {
    fn drop(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            tracing::debug!("response handler dropped without a response");
            deliver(Delivery::Abandoned);
        }
    }
}

impl std::fmt::Debug for ResponseHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandler")
            .field("pending", &self.deliver.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;

    use super::*;

    fn recording_handler() -> (ResponseHandler, Arc<Mutex<Vec<Delivery>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler = ResponseHandler::new(move |delivery| sink.lock().unwrap().push(delivery));
        (handler, seen)
    }

    #[test]
    fn respond_classifies_and_delivers_once() {
        let (handler, seen) = recording_handler();
        handler.respond(json!({"ok": true}), ResponseEvent::success());

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![Delivery::Responded(CallOutcome::Success {
                result: json!({"ok": true})
            })]
        );
    }

    #[test]
    fn dropping_unanswered_handler_reports_abandonment() {
        let (handler, seen) = recording_handler();
        drop(handler);
        assert_eq!(*seen.lock().unwrap(), vec![Delivery::Abandoned]);
    }
}
