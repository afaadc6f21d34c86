// Route guard.

use std::sync::Arc;

use tracing::debug;

use crate::capability::Capability;
use crate::permissions::PermissionStore;
use crate::session::Redirect;
use crate::store::AuthStore;

/// What a protected route needs beyond an authenticated session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RouteRequirement {
    pub require_admin: bool,
    pub capability: Option<Capability>,
}

impl RouteRequirement {
    pub fn authenticated() -> Self {
        Self::default()
    }

    pub fn admin() -> Self {
        Self {
            require_admin: true,
            capability: None,
        }
    }

    pub fn capability(capability: Capability) -> Self {
        Self {
            require_admin: false,
            capability: Some(capability),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Rehydration still running; show a placeholder.
    Loading,
    Render,
    Redirect(Redirect),
}

pub struct RouteGuard {
    auth: Arc<AuthStore>,
    permissions: Arc<PermissionStore>,
}

impl RouteGuard {
    pub fn new(auth: Arc<AuthStore>, permissions: Arc<PermissionStore>) -> Self {
        Self { auth, permissions }
    }

    /// Decide whether the view at `location` may render.
    pub fn check(&self, location: &str, requirement: RouteRequirement) -> GuardDecision {
        if self.auth.is_loading() {
            return GuardDecision::Loading;
        }

        let routes = &self.auth.options().routes;

        if !self.auth.is_authenticated() {
            debug!(location, "unauthenticated, redirecting to login");
            return GuardDecision::Redirect(
                Redirect::to(routes.admin_login.as_str()).with_from(location),
            );
        }

        if requirement.require_admin && !self.auth.is_admin() {
            debug!(location, "admin route denied");
            return GuardDecision::Redirect(Redirect::to(routes.root.as_str()));
        }

        if let Some(capability) = requirement.capability {
            if !self.permissions.is_allowed(capability) {
                debug!(location, %capability, "capability missing");
                return GuardDecision::Redirect(Redirect::to(routes.root.as_str()));
            }
        }

        GuardDecision::Render
    }
}
