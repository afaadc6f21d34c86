use std::sync::Arc;

use crate::config::{ClinicConfig, ClinicConfigSnapshot};
use crate::errors::ClinicResult;
use crate::storage::ClientStorage;
use crate::tenant::{Tenant, TenantDirectory, TenantGate, TenantOptions, TenantResolver, TenantState};

struct ClinicAppInner {
    config: ClinicConfigSnapshot,
    storage: ClientStorage,
    tenant: TenantGate,
}

/// ClinicApp is the application context constructed once at startup.
///
/// Holds:
/// - a frozen config snapshot
/// - the client storage (both areas)
/// - the tenant gate
///
/// Cloning is cheap; every clone shares the same state.
pub struct ClinicApp {
    inner: Arc<ClinicAppInner>,
}

impl Clone for ClinicApp {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ClinicApp {
    pub fn new(
        config: &ClinicConfig,
        storage: ClientStorage,
        directory: Arc<dyn TenantDirectory>,
    ) -> Self {
        let config = config.snapshot();
        let resolver = TenantResolver::new(
            directory,
            storage.clone(),
            TenantOptions::from_config(&config),
        );
        Self {
            inner: Arc::new(ClinicAppInner {
                config,
                storage,
                tenant: TenantGate::new(resolver),
            }),
        }
    }

    pub fn config(&self) -> &ClinicConfigSnapshot {
        &self.inner.config
    }

    pub fn storage(&self) -> &ClientStorage {
        &self.inner.storage
    }

    /// Resolve the tenant for this page load (runs once).
    pub async fn resolve_tenant(&self, hostname: &str) -> &TenantState {
        self.inner.tenant.resolve(hostname).await
    }

    /// Resolved tenant, if resolution already ran and succeeded.
    pub fn tenant(&self) -> Option<&Tenant> {
        self.inner.tenant.state().and_then(TenantState::tenant)
    }

    pub fn persisted_tenant(&self) -> ClinicResult<Option<Tenant>> {
        self.inner.tenant.resolver().persisted()
    }
}
