//! Value types exchanged with a remoting transport.
//!
//! A [`CallRequest`] is built once by the caller and never mutated. The
//! transport answers with a raw `(result, ResponseEvent)` pair, which is
//! decoded exactly once into a [`CallOutcome`] by [`CallOutcome::classify`].
//! Nothing downstream of that point looks at `status` or `type` again.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{MethodName, RemotingError};

/// Diagnostic carried by the outcome of a call made without a remoting
/// capability in the host environment.
pub const UNAVAILABLE_MESSAGE: &str = "Could not find Visualforce Remote Object";

/// Diagnostic carried by the outcome of a call whose transport discarded the
/// response handler without ever invoking it.
pub const ABANDONED_MESSAGE: &str = "remoting transport dropped the response handler";

// ---------------------------------------------------------------------------
// Parameters
// ---------------------------------------------------------------------------

/// Arguments passed to a remote action.
///
/// Serialises untagged: positional parameters as a JSON array, keyed
/// parameters as a JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallParameters {
    /// Ordered arguments.
    Positional(Vec<Value>),
    /// Named arguments.
    Keyed(Map<String, Value>),
}

impl CallParameters {
    /// No arguments.
    pub fn none() -> Self {
        Self::Positional(Vec::new())
    }

    /// Converts an arbitrary JSON value into call parameters.
    ///
    /// Arrays become positional, objects become keyed, `null` becomes an empty
    /// positional list, and any other scalar becomes a single positional
    /// argument.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Positional(items),
            Value::Object(map) => Self::Keyed(map),
            Value::Null => Self::none(),
            scalar => Self::Positional(vec![scalar]),
        }
    }

    /// Returns the parameters as a JSON value (array or object).
    pub fn to_value(&self) -> Value {
        match self {
            Self::Positional(items) => Value::Array(items.clone()),
            Self::Keyed(map) => Value::Object(map.clone()),
        }
    }

    /// Number of arguments (positional items or keyed entries).
    pub fn len(&self) -> usize {
        match self {
            Self::Positional(items) => items.len(),
            Self::Keyed(map) => map.len(),
        }
    }

    /// Returns `true` if there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CallParameters {
    fn default() -> Self {
        Self::none()
    }
}

impl From<Value> for CallParameters {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

// ---------------------------------------------------------------------------
// Call configuration
// ---------------------------------------------------------------------------

/// Per-call options understood by the remoting transport.
///
/// The core never acts on these; they are handed to the transport verbatim.
/// Defaults match the host platform: results are HTML-escaped, calls may be
/// buffered, and the transport gives up after 30 seconds.
///
/// On the wire this is `{"escape": bool, "buffer": bool, "timeout": ms}`;
/// every field is optional when deserialising.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCallConfiguration", into = "RawCallConfiguration")]
pub struct CallConfiguration {
    escape: bool,
    buffer: bool,
    timeout: Duration,
}

impl CallConfiguration {
    /// Default transport timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

    /// Largest timeout the host transport accepts.
    pub const MAX_TIMEOUT: Duration = Duration::from_millis(120_000);

    /// Whether string results are HTML-escaped by the transport.
    pub fn escape(&self) -> bool {
        self.escape
    }

    /// Whether the transport may queue this call and send it in a batch.
    pub fn buffer(&self) -> bool {
        self.buffer
    }

    /// How long the transport waits for a response.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns a copy with `escape` set.
    #[must_use]
    pub fn with_escape(mut self, escape: bool) -> Self {
        self.escape = escape;
        self
    }

    /// Returns a copy with `buffer` set.
    #[must_use]
    pub fn with_buffer(mut self, buffer: bool) -> Self {
        self.buffer = buffer;
        self
    }

    /// Returns a copy with `timeout` set.
    ///
    /// # Errors
    ///
    /// [`RemotingError::InvalidConfiguration`] if `timeout` is shorter than
    /// one millisecond or longer than [`Self::MAX_TIMEOUT`].
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, RemotingError> {
        if timeout < Duration::from_millis(1) || timeout > Self::MAX_TIMEOUT {
            return Err(RemotingError::InvalidConfiguration {
                message: format!(
                    "timeout must be between 1 and {} ms, got {} ms",
                    Self::MAX_TIMEOUT.as_millis(),
                    timeout.as_millis()
                ),
            });
        }
        self.timeout = timeout;
        Ok(self)
    }
}

impl Default for CallConfiguration {
    fn default() -> Self {
        Self {
            escape: true,
            buffer: true,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct RawCallConfiguration {
    escape: bool,
    buffer: bool,
    timeout: u64,
}

impl Default for RawCallConfiguration {
    fn default() -> Self {
        CallConfiguration::default().into()
    }
}

impl TryFrom<RawCallConfiguration> for CallConfiguration {
    type Error = RemotingError;

    fn try_from(raw: RawCallConfiguration) -> Result<Self, Self::Error> {
        CallConfiguration::default()
            .with_escape(raw.escape)
            .with_buffer(raw.buffer)
            .with_timeout(Duration::from_millis(raw.timeout))
    }
}

impl From<CallConfiguration> for RawCallConfiguration {
    fn from(config: CallConfiguration) -> Self {
        Self {
            escape: config.escape,
            buffer: config.buffer,
            timeout: u64::try_from(config.timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// One remote action invocation: what to call, with what, and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRequest {
    method: MethodName,
    #[serde(default)]
    parameters: CallParameters,
    #[serde(default)]
    configuration: CallConfiguration,
}

impl CallRequest {
    /// Creates a request with the default [`CallConfiguration`].
    pub fn new(method: MethodName, parameters: impl Into<CallParameters>) -> Self {
        Self {
            method,
            parameters: parameters.into(),
            configuration: CallConfiguration::default(),
        }
    }

    /// Creates a request from an unvalidated method name.
    ///
    /// # Errors
    ///
    /// Propagates [`MethodName::parse`] failures.
    pub fn parse(
        method: impl Into<String>,
        parameters: impl Into<CallParameters>,
    ) -> Result<Self, RemotingError> {
        Ok(Self::new(MethodName::parse(method)?, parameters))
    }

    /// Returns the request with `configuration` in place of the current one.
    #[must_use]
    pub fn with_configuration(mut self, configuration: CallConfiguration) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn method(&self) -> &MethodName {
        &self.method
    }

    pub fn parameters(&self) -> &CallParameters {
        &self.parameters
    }

    pub fn configuration(&self) -> &CallConfiguration {
        &self.configuration
    }
}

// ---------------------------------------------------------------------------
// Transport events
// ---------------------------------------------------------------------------

/// The `type` tag of a transport event, decoded from its raw string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    /// `"rpc"`: an ordinary remoting round trip.
    Rpc,
    /// `"exception"`: the remote controller raised an exception.
    Exception,
    /// Any other tag, kept verbatim. Empty when the transport sent none.
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rpc => "rpc",
            Self::Exception => "exception",
            Self::Other(tag) => tag,
        }
    }
}

impl Default for EventKind {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "rpc" => Self::Rpc,
            "exception" => Self::Exception,
            _ => Self::Other(tag),
        }
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_owned())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(tag) => tag,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The event a transport passes to a response handler alongside the result.
///
/// Field names on the wire are `status`, `type`, `message`, and `where`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// `true` if the remote call completed normally.
    pub status: bool,

    #[serde(rename = "type", default)]
    pub kind: EventKind,

    #[serde(default)]
    pub message: String,

    /// Where an exception originated (e.g. a stack frame). Often empty.
    #[serde(rename = "where", default)]
    pub location: String,
}

impl ResponseEvent {
    /// A successful `rpc` event.
    pub fn success() -> Self {
        Self {
            status: true,
            kind: EventKind::Rpc,
            message: String::new(),
            location: String::new(),
        }
    }

    /// A controller exception raised at `location`.
    pub fn exception(message: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            status: false,
            kind: EventKind::Exception,
            message: message.into(),
            location: location.into(),
        }
    }

    /// A failed event of an arbitrary kind.
    pub fn failure(kind: impl Into<EventKind>, message: impl Into<String>) -> Self {
        Self {
            status: false,
            kind: kind.into(),
            message: message.into(),
            location: String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// The normalised result of one remote action invocation.
///
/// Every invocation produces exactly one of these. All three variants are
/// ordinary data; none is a fault of the invocation itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CallOutcome {
    /// The remote action ran and the transport reported success.
    Success {
        /// The value returned by the remote action.
        result: Value,
    },

    /// The remote controller raised an exception.
    ApplicationException {
        message: String,
        /// Where the exception originated; may be empty.
        location: String,
    },

    /// Any other failure, including a missing remoting capability.
    TransportError { message: String },
}

impl CallOutcome {
    /// Classifies a raw transport response.
    ///
    /// The rule is ordered: a `true` status wins regardless of the event
    /// kind; otherwise an `exception` kind is an application exception; all
    /// remaining cases are transport errors.
    pub fn classify(result: Value, event: &ResponseEvent) -> Self {
        if event.status {
            Self::Success { result }
        } else if event.kind == EventKind::Exception {
            Self::ApplicationException {
                message: event.message.clone(),
                location: event.location.clone(),
            }
        } else {
            Self::TransportError {
                message: event.message.clone(),
            }
        }
    }

    /// The outcome of calling without a remoting capability.
    pub fn unavailable() -> Self {
        Self::transport_error(UNAVAILABLE_MESSAGE)
    }

    /// The outcome of a call whose response handler was dropped unused.
    pub fn abandoned() -> Self {
        Self::transport_error(ABANDONED_MESSAGE)
    }

    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the success value, if any.
    pub fn success(&self) -> Option<&Value> {
        match self {
            Self::Success { result } => Some(result),
            _ => None,
        }
    }

    /// Returns the diagnostic message of a failed outcome.
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::ApplicationException { message, .. } | Self::TransportError { message } => {
                Some(message)
            }
        }
    }

    /// Short label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::ApplicationException { .. } => "application_exception",
            Self::TransportError { .. } => "transport_error",
        }
    }
}
