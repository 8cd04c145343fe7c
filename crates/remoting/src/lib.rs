//! Remote action domain.
//!
//! This crate contains the request, response, and outcome types of a remote
//! action call, the port traits a remoting transport implements, and the
//! probe that detects whether a host environment offers remoting at all.
//! Transports implement the traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a transport must do; adapter crates define *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | `MethodName`, `InvocationId` |
//! | [`types`] | `CallRequest`, `CallConfiguration`, `ResponseEvent`, `CallOutcome` |
//! | [`ports`] | `RemotingManager`, `RequestHandle`, `ResponseHandler` |
//! | [`host`] | `HostEnvironment`, `CapabilityHandle`, [`probe`] |
//! | [`errors`] | `RemotingError`, `TransportFault` |

pub mod errors;
pub mod host;
pub mod identifiers;
pub mod ports;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{RemotingError, TransportFault};
pub use host::{probe, CapabilityHandle, HostEnvironment, RemotingNamespace, RemotingRoot};
pub use identifiers::{InvocationId, MethodName};
pub use ports::{Delivery, RemotingManager, RequestHandle, ResponseHandler};
pub use types::{
    CallConfiguration, CallOutcome, CallParameters, CallRequest, EventKind, ResponseEvent,
    ABANDONED_MESSAGE, UNAVAILABLE_MESSAGE,
};
