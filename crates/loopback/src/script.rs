//! Scripted replies, loadable from JSON.
//!
//! ```json
//! {
//!   "replies": {
//!     "MyController.myControllerFunctionName": {
//!       "echo": true,
//!       "event": { "status": true, "type": "rpc" }
//!     }
//!   },
//!   "fallback": {
//!     "event": { "status": false, "type": "exception",
//!                "message": "Apex Controller Wrong", "where": "No Apex Controller" },
//!     "delay_ms": 500
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use remoting::{CallParameters, MethodName, ResponseEvent};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Errors loading a [`Script`].
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse fixture: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------

/// One canned transport response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedReply {
    /// Returned verbatim as the result, unless `echo` is set.
    #[serde(default)]
    pub result: Value,

    /// When set, the result is `{"controller": <method>, "result": <parameters>}`.
    #[serde(default)]
    pub echo: bool,

    pub event: ResponseEvent,

    /// How long the transport waits before responding. Zero responds inline,
    /// from inside `invoke_action`.
    #[serde(default)]
    pub delay_ms: u64,
}

impl ScriptedReply {
    /// A successful reply that echoes the call back to the caller.
    pub fn echo() -> Self {
        Self {
            result: Value::Null,
            echo: true,
            event: ResponseEvent::success(),
            delay_ms: 0,
        }
    }

    /// A reply carrying `event` and a fixed `result`.
    pub fn fixed(result: Value, event: ResponseEvent) -> Self {
        Self {
            result,
            echo: false,
            event,
            delay_ms: 0,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// The result value to hand to the response handler for this call.
    pub fn result_for(&self, method: &MethodName, parameters: &CallParameters) -> Value {
        if self.echo {
            json!({ "controller": method.as_str(), "result": parameters.to_value() })
        } else {
            self.result.clone()
        }
    }
}

// ---------------------------------------------------------------------------

/// Replies keyed by fully-qualified method name, plus an optional fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    #[serde(default)]
    pub replies: HashMap<String, ScriptedReply>,

    /// Used for methods without their own entry.
    #[serde(default)]
    pub fallback: Option<ScriptedReply>,
}

impl Script {
    #[must_use]
    pub fn with_reply(mut self, method: impl Into<String>, reply: ScriptedReply) -> Self {
        self.replies.insert(method.into(), reply);
        self
    }

    #[must_use]
    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Applies `delay` to every reply, including the fallback.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        for reply in self.replies.values_mut().chain(self.fallback.as_mut()) {
            reply.delay_ms = delay_ms;
        }
        self
    }

    /// Finds the reply for `method`.
    pub fn reply_for(&self, method: &MethodName) -> Option<&ScriptedReply> {
        self.replies
            .get(method.as_str())
            .or(self.fallback.as_ref())
    }

    pub fn from_json_str(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, FixtureError> {
        let text = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }
}

/// The canonical test double: `MyController.myControllerFunctionName` echoes
/// its parameters successfully, every other method raises a controller
/// exception.
pub fn echo_fixture() -> Script {
    Script::default()
        .with_reply("MyController.myControllerFunctionName", ScriptedReply::echo())
        .with_fallback(ScriptedReply::fixed(
            Value::Null,
            ResponseEvent::exception("Apex Controller Wrong", "No Apex Controller"),
        ))
}
