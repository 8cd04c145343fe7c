//! Host environment and the capability probe.
//!
//! A host exposes remoting as a chain of three optional links: a remoting
//! root, a remoting namespace beneath it, and a manager object beneath that.
//! Any link may be missing, e.g. when running outside the managed host.
//! [`probe`] reports whether the whole chain is present.

use std::sync::Arc;

use crate::RemotingManager;

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The ambient environment handed to [`probe`].
#[derive(Clone, Default)]
pub struct HostEnvironment {
    remoting_root: Option<RemotingRoot>,
}

impl HostEnvironment {
    /// An environment with no remoting root at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A fully wired environment exposing `manager`.
    pub fn with_manager(manager: Arc<dyn RemotingManager>) -> Self {
        let namespace = RemotingNamespace::default().with_manager(manager);
        Self::empty().with_root(RemotingRoot::default().with_namespace(namespace))
    }

    #[must_use]
    pub fn with_root(mut self, root: RemotingRoot) -> Self {
        self.remoting_root = Some(root);
        self
    }

    pub fn remoting_root(&self) -> Option<&RemotingRoot> {
        self.remoting_root.as_ref()
    }
}

/// First link of the chain.
#[derive(Clone, Default)]
pub struct RemotingRoot {
    remoting: Option<RemotingNamespace>,
}

impl RemotingRoot {
    #[must_use]
    pub fn with_namespace(mut self, namespace: RemotingNamespace) -> Self {
        self.remoting = Some(namespace);
        self
    }

    pub fn remoting(&self) -> Option<&RemotingNamespace> {
        self.remoting.as_ref()
    }
}

/// Second link of the chain.
#[derive(Clone, Default)]
pub struct RemotingNamespace {
    manager: Option<Arc<dyn RemotingManager>>,
}

impl RemotingNamespace {
    #[must_use]
    pub fn with_manager(mut self, manager: Arc<dyn RemotingManager>) -> Self {
        self.manager = Some(manager);
        self
    }

    pub fn manager(&self) -> Option<&Arc<dyn RemotingManager>> {
        self.manager.as_ref()
    }
}

impl std::fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("remoting_root", &self.remoting_root)
            .finish()
    }
}

impl std::fmt::Debug for RemotingRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotingRoot")
            .field("remoting", &self.remoting)
            .finish()
    }
}

impl std::fmt::Debug for RemotingNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotingNamespace")
            .field("manager", &self.manager.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Probe
// ---------------------------------------------------------------------------

/// Evidence that a remoting transport is available, or that it is not.
///
/// A detection result, not a resource: it holds no lease and needs no
/// release.
#[derive(Clone)]
pub enum CapabilityHandle {
    Present(Arc<dyn RemotingManager>),
    Absent,
}

impl CapabilityHandle {
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    pub fn manager(&self) -> Option<&Arc<dyn RemotingManager>> {
        match self {
            Self::Present(manager) => Some(manager),
            Self::Absent => None,
        }
    }
}

impl std::fmt::Debug for CapabilityHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present(_) => f.write_str("CapabilityHandle::Present"),
            Self::Absent => f.write_str("CapabilityHandle::Absent"),
        }
    }
}

/// Looks for a remoting manager in `env`.
///
/// Never fails: a missing link anywhere in the chain yields
/// [`CapabilityHandle::Absent`].
pub fn probe(env: &HostEnvironment) -> CapabilityHandle {
    let Some(root) = env.remoting_root() else {
        tracing::debug!(missing = "root", "remoting capability absent");
        return CapabilityHandle::Absent;
    };
    let Some(namespace) = root.remoting() else {
        tracing::debug!(missing = "remoting", "remoting capability absent");
        return CapabilityHandle::Absent;
    };
    let Some(manager) = namespace.manager() else {
        tracing::debug!(missing = "manager", "remoting capability absent");
        return CapabilityHandle::Absent;
    };

    CapabilityHandle::Present(Arc::clone(manager))
}
