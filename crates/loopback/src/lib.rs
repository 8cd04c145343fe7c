//! In-process remoting transport adapter.
//!
//! Implements the [`remoting::RemotingManager`] trait without any network:
//! each method name maps to a [`ScriptedReply`] describing the result, the
//! transport event, and how long to wait before responding. Used as the
//! transport behind the `remote-action` CLI and by the integration tests.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Reply scheduling, timeout emulation, and result
//! escaping live here. The [`remoting`] crate sees only
//! [`remoting::RemotingManager`].

mod escape;
mod manager;
mod script;

pub use manager::LoopbackManager;
pub use script::{echo_fixture, FixtureError, Script, ScriptedReply};
