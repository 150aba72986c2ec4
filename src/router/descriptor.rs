//! Backend descriptor.

use std::fmt;
use std::sync::Arc;

use crate::store::{Role, Store, StoreError, StoreResult};

/// One store behind the router: its role, implementation, and whether it
/// has usable connection settings. Immutable after construction.
#[derive(Clone)]
pub struct BackendDescriptor {
    role: Role,
    store: Arc<dyn Store>,
    configured: bool,
}

impl BackendDescriptor {
    /// Primary descriptor. `configured` is false when no connection
    /// settings were found; such a primary is never contacted.
    pub fn primary(store: Arc<dyn Store>, configured: bool) -> Self {
        Self {
            role: Role::Primary,
            store,
            configured,
        }
    }

    /// Fallback descriptor. The fallback is always configured.
    pub fn fallback(store: Arc<dyn Store>) -> Self {
        Self {
            role: Role::Fallback,
            store,
            configured: true,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Error out for a backend that must not be contacted.
    pub fn ensure_configured(&self) -> StoreResult<()> {
        if self.configured {
            Ok(())
        } else {
            Err(StoreError::NotConfigured(self.role))
        }
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("role", &self.role)
            .field("configured", &self.configured)
            .finish()
    }
}
