// Session options and configuration.

use clinic_core::config::{ROUTES_ADMIN_LOGIN, ROUTES_LOGIN, ROUTES_ROOT};
use clinic_core::{ClinicConfigSnapshot, StorageKind};

use crate::session::UserKind;

/// Redirect targets used by logout and the route guard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteOptions {
    /// Login route for regular users
    pub login: String,
    /// Login route for administrators; also the guard's default target
    pub admin_login: String,
    /// Application root
    pub root: String,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            login: "/login".to_string(),
            admin_login: "/admin/login".to_string(),
            root: "/".to_string(),
        }
    }
}

impl RouteOptions {
    pub fn login_for(&self, kind: UserKind) -> &str {
        match kind {
            UserKind::Admin => &self.admin_login,
            UserKind::User => &self.login,
        }
    }

    /// Validate route configuration
    pub fn validate(&self) -> Result<(), String> {
        for (name, route) in [
            ("login", &self.login),
            ("admin_login", &self.admin_login),
            ("root", &self.root),
        ] {
            if !route.starts_with('/') {
                return Err(format!("Route '{}' must be an absolute path, got '{}'", name, route));
            }
        }
        Ok(())
    }
}

/// Main session configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOptions {
    pub routes: RouteOptions,
    /// Storage area written on login
    pub login_storage: StorageKind,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            routes: RouteOptions::default(),
            login_storage: StorageKind::LongTerm,
        }
    }
}

impl AuthOptions {
    pub fn validate(&self) -> Result<(), String> {
        self.routes
            .validate()
            .map_err(|e| format!("Route validation failed: {}", e))
    }

    /// Read `routes.*` keys; missing keys keep their defaults.
    pub fn from_config(config: &ClinicConfigSnapshot) -> Self {
        let defaults = RouteOptions::default();
        Self {
            routes: RouteOptions {
                login: config.get_string(ROUTES_LOGIN).unwrap_or(defaults.login),
                admin_login: config
                    .get_string(ROUTES_ADMIN_LOGIN)
                    .unwrap_or(defaults.admin_login),
                root: config.get_string(ROUTES_ROOT).unwrap_or(defaults.root),
            },
            login_storage: StorageKind::LongTerm,
        }
    }

    pub fn builder() -> AuthOptionsBuilder {
        AuthOptionsBuilder::new()
    }
}

/// Builder pattern for AuthOptions
#[derive(Clone, Debug, Default)]
pub struct AuthOptionsBuilder {
    routes: Option<RouteOptions>,
    login_storage: Option<StorageKind>,
}

impl AuthOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(mut self, routes: RouteOptions) -> Self {
        self.routes = Some(routes);
        self
    }

    pub fn login_storage(mut self, kind: StorageKind) -> Self {
        self.login_storage = Some(kind);
        self
    }

    pub fn build(self) -> AuthOptions {
        AuthOptions {
            routes: self.routes.unwrap_or_default(),
            login_storage: self.login_storage.unwrap_or(StorageKind::LongTerm),
        }
    }

    /// Build and validate the AuthOptions configuration
    pub fn build_validated(self) -> Result<AuthOptions, String> {
        let options = self.build();
        options.validate()?;
        Ok(options)
    }
}
