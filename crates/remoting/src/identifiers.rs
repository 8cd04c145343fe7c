//! Newtype identifiers.
//!
//! A remote action is addressed by a [`MethodName`], and each run of the
//! invocation effect is tagged with an [`InvocationId`] so that all tracing
//! output for one call can be correlated.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::RemotingError;

// ---------------------------------------------------------------------------
// Method names
// ---------------------------------------------------------------------------

/// Fully-qualified name of a remote action, e.g. `"MyController.myMethod"` or
/// `"ns.MyController.myMethod"` for a namespaced controller.
///
/// The name must consist of at least two non-empty segments separated by
/// `.`, with no whitespace. The remote controller decides whether the method
/// actually exists; this type only rejects names no controller could resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MethodName(String);

impl MethodName {
    /// Parses a fully-qualified method name.
    ///
    /// # Errors
    ///
    /// - [`RemotingError::MissingMethodName`] if `value` is empty or blank.
    /// - [`RemotingError::InvalidMethodName`] if it is not of the form
    ///   `Segment(.Segment)+`.
    pub fn parse(value: impl Into<String>) -> Result<Self, RemotingError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(RemotingError::MissingMethodName);
        }

        let mut segments = 0usize;
        for segment in v.split('.') {
            if segment.is_empty() || segment.chars().any(char::is_whitespace) {
                return Err(RemotingError::InvalidMethodName { name: v });
            }
            segments += 1;
        }
        if segments < 2 {
            return Err(RemotingError::InvalidMethodName { name: v });
        }

        Ok(Self(v))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the controller part (everything before the last `.`).
    pub fn controller(&self) -> &str {
        self.0.rsplit_once('.').map_or("", |(controller, _)| controller)
    }

    /// Returns the method part (everything after the last `.`).
    pub fn method(&self) -> &str {
        self.0.rsplit_once('.').map_or("", |(_, method)| method)
    }
}

impl TryFrom<String> for MethodName {
    type Error = RemotingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl std::str::FromStr for MethodName {
    type Err = RemotingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<MethodName> for String {
    fn from(name: MethodName) -> Self {
        name.0
    }
}

impl std::fmt::Display for MethodName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Invocation identifiers
// ---------------------------------------------------------------------------

/// Identifies one run of the invocation effect.
///
/// Generated fresh for every call; recorded on the call's tracing span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvocationId(Uuid);

impl InvocationId {
    /// Generates a new random invocation identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_name_accepts_controller_and_method() {
        let name = MethodName::parse("MyController.myControllerFunctionName").unwrap();
        assert_eq!(name.as_str(), "MyController.myControllerFunctionName");
        assert_eq!(name.controller(), "MyController");
        assert_eq!(name.method(), "myControllerFunctionName");
    }

    #[test]
    fn method_name_accepts_namespaced_controller() {
        let name = MethodName::parse("acme.Orders.submit").unwrap();
        assert_eq!(name.controller(), "acme.Orders");
        assert_eq!(name.method(), "submit");
    }

    #[test]
    fn method_name_rejects_empty_as_missing() {
        assert!(matches!(
            MethodName::parse(""),
            Err(RemotingError::MissingMethodName)
        ));
        assert!(matches!(
            MethodName::parse("   "),
            Err(RemotingError::MissingMethodName)
        ));
    }

    #[test]
    fn method_name_rejects_malformed_names() {
        for bad in ["myMethod", "Controller.", ".method", "A..b", "My Controller.m"] {
            assert!(
                matches!(
                    MethodName::parse(bad),
                    Err(RemotingError::InvalidMethodName { .. })
                ),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn method_name_deserialises_with_validation() {
        let ok: MethodName = serde_json::from_str("\"Unknown.method\"").unwrap();
        assert_eq!(ok.as_str(), "Unknown.method");
        assert!(serde_json::from_str::<MethodName>("\"nodot\"").is_err());
    }

    #[test]
    fn invocation_ids_are_unique() {
        assert_ne!(InvocationId::new_random(), InvocationId::new_random());
    }
}
