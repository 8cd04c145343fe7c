//! [`LoopbackManager`]: a [`RemotingManager`] that answers from a [`Script`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use remoting::{
    CallConfiguration, CallParameters, MethodName, RemotingManager, RequestHandle, ResponseEvent,
    ResponseHandler, TransportFault,
};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::escape::escape_value;
use crate::Script;

#[derive(Debug, Default)]
struct Counters {
    invocations: AtomicUsize,
    cancellations: AtomicUsize,
}

/// In-process remoting transport.
///
/// Replies with no delay are delivered inline, before `invoke_action`
/// returns. Delayed replies are delivered from a task on the current tokio
/// runtime, and cancelling the request aborts that task.
#[derive(Debug, Clone)]
pub struct LoopbackManager {
    script: Arc<Script>,
    fault: Option<String>,
    counters: Arc<Counters>,
}

impl LoopbackManager {
    pub fn new(script: Script) -> Self {
        Self {
            script: Arc::new(script),
            fault: None,
            counters: Arc::default(),
        }
    }

    /// A manager whose `invoke_action` always fails synchronously.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fault: Some(message.into()),
            ..Self::new(Script::default())
        }
    }

    /// Number of `invoke_action` calls received, including failed ones.
    pub fn invocation_count(&self) -> usize {
        self.counters.invocations.load(Ordering::SeqCst)
    }

    /// Number of times a request handle issued by this manager was cancelled.
    pub fn cancellation_count(&self) -> usize {
        self.counters.cancellations.load(Ordering::SeqCst)
    }

    fn unregistered(method: &MethodName) -> (Value, ResponseEvent, Duration) {
        (
            Value::Null,
            ResponseEvent::failure("rpc", format!("No remote action registered for '{method}'")),
            Duration::ZERO,
        )
    }
}

impl RemotingManager for LoopbackManager {
    fn invoke_action(
        &self,
        method: &MethodName,
        parameters: &CallParameters,
        handler: ResponseHandler,
        configuration: &CallConfiguration,
    ) -> Result<Box<dyn RequestHandle>, TransportFault> {
        self.counters.invocations.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fault {
            return Err(TransportFault::new(message.clone()));
        }
        if configuration.buffer() {
            debug!(%method, "buffering requested; loopback sends immediately");
        }

        let (result, event, delay) = match self.script.reply_for(method) {
            Some(reply) => (
                reply.result_for(method, parameters),
                reply.event.clone(),
                reply.delay(),
            ),
            None => Self::unregistered(method),
        };
        let result = if event.status && configuration.escape() {
            escape_value(result)
        } else {
            result
        };

        let request = LoopbackRequest {
            task: None,
            counters: Arc::clone(&self.counters),
        };

        if delay.is_zero() {
            debug!(%method, "loopback responding inline");
            handler.respond(result, event);
            return Ok(Box::new(request));
        }

        let runtime = Handle::try_current().map_err(|_| {
            TransportFault::new("loopback transport needs a tokio runtime for delayed replies")
        })?;

        let timeout = configuration.timeout();
        let method_name = method.to_string();
        let task = runtime.spawn(async move {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                info!(
                    method = %method_name,
                    timeout_ms = timeout.as_millis() as u64,
                    "loopback request timed out"
                );
                handler.respond(
                    Value::Null,
                    ResponseEvent::failure(
                        "rpc",
                        format!(
                            "Remoting request exceeded timeout of {} ms",
                            timeout.as_millis()
                        ),
                    ),
                );
            } else {
                tokio::time::sleep(delay).await;
                debug!(method = %method_name, "loopback responding after delay");
                handler.respond(result, event);
            }
        });

        Ok(Box::new(LoopbackRequest {
            task: Some(task),
            ..request
        }))
    }
}

/// Handle for one loopback request.
struct LoopbackRequest {
    task: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
}

impl RequestHandle for LoopbackRequest {
    fn cancel(&mut self) {
        self.counters.cancellations.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
