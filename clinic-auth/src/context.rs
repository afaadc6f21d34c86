// Session context: the stores and guard wired together for one page load.

use std::sync::Arc;

use clinic_core::{ClinicApp, ClinicResult, Tenant};
use tracing::info;

use crate::backend::AuthBackend;
use crate::guard::{GuardDecision, RouteGuard, RouteRequirement};
use crate::navigation::{visible_entries, NavEntry};
use crate::options::AuthOptions;
use crate::permissions::PermissionStore;
use crate::store::{AuthStore, Rehydration};

pub struct ClinicSession {
    app: ClinicApp,
    tenant: Tenant,
    auth: Arc<AuthStore>,
    permissions: Arc<PermissionStore>,
    guard: RouteGuard,
}

impl ClinicSession {
    /// Resolve the tenant, then mount and rehydrate the session.
    ///
    /// Fails with `TenantNotFound` when the tenant is rejected; nothing
    /// is mounted in that case.
    pub async fn boot(
        app: ClinicApp,
        backend: Arc<dyn AuthBackend>,
        hostname: &str,
    ) -> ClinicResult<(Self, Rehydration)> {
        let tenant = app.resolve_tenant(hostname).await.clone().into_result()?;

        let options = AuthOptions::from_config(app.config());
        let session = Self::mount(app, tenant, backend, options);
        let outcome = session.auth.rehydrate().await;
        info!(tenant_id = %session.tenant.id, ?outcome, "session mounted");
        Ok((session, outcome))
    }

    /// Wire the stores without rehydrating.
    pub fn mount(
        app: ClinicApp,
        tenant: Tenant,
        backend: Arc<dyn AuthBackend>,
        options: AuthOptions,
    ) -> Self {
        let permissions = Arc::new(PermissionStore::for_startup(app.storage()));
        let auth = Arc::new(AuthStore::new(
            backend,
            app.storage().clone(),
            Arc::clone(&permissions),
            options,
        ));
        let guard = RouteGuard::new(Arc::clone(&auth), Arc::clone(&permissions));
        Self {
            app,
            tenant,
            auth,
            permissions,
            guard,
        }
    }

    pub fn app(&self) -> &ClinicApp {
        &self.app
    }

    pub fn tenant(&self) -> &Tenant {
        &self.tenant
    }

    pub fn auth(&self) -> &Arc<AuthStore> {
        &self.auth
    }

    pub fn permissions(&self) -> &Arc<PermissionStore> {
        &self.permissions
    }

    pub fn guard(&self, location: &str, requirement: RouteRequirement) -> GuardDecision {
        self.guard.check(location, requirement)
    }

    pub fn navigation(&self, entries: &[NavEntry]) -> Vec<NavEntry> {
        visible_entries(entries, &self.permissions)
    }
}
