//! # Configuration
//!
//! A minimal string key/value store. Shells layer values however they
//! like: defaults first, then `load_env`, then explicit `set` calls.
//!
//! ```rust
//! use clinic_core::ClinicConfig;
//! let mut config = ClinicConfig::with_defaults();
//!
//! config.set("api.base_url", "https://api.clinic.test");
//!
//! assert_eq!(config.get("api.base_url"), Some("https://api.clinic.test"));
//! assert_eq!(config.get("routes.login"), Some("/login"));
//! ```
//!
//! ## Environment overrides
//! `CLINIC__API__BASE_URL=https://api.clinic.test` becomes `api.base_url`
//! after `config.load_env("CLINIC__")`.

use std::collections::HashMap;

pub const API_BASE_URL: &str = "api.base_url";
pub const TENANT_LOCAL_HOSTS: &str = "tenant.local_hosts";
pub const TENANT_PLACEHOLDER_DOMAIN: &str = "tenant.placeholder_domain";
pub const ROUTES_LOGIN: &str = "routes.login";
pub const ROUTES_ADMIN_LOGIN: &str = "routes.admin_login";
pub const ROUTES_ROOT: &str = "routes.root";

#[derive(Debug, Default, Clone)]
pub struct ClinicConfig {
    values: HashMap<String, String>,
}

impl ClinicConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Config store pre-filled with the values a development shell expects.
    pub fn with_defaults() -> Self {
        let mut config = Self::new();
        config.set(API_BASE_URL, "http://localhost:8080/api");
        config.set(TENANT_LOCAL_HOSTS, "localhost,127.0.0.1");
        config.set(TENANT_PLACEHOLDER_DOMAIN, "localhost");
        config.set(ROUTES_LOGIN, "/login");
        config.set(ROUTES_ADMIN_LOGIN, "/admin/login");
        config.set(ROUTES_ROOT, "/");
        config
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Overlay variables starting with `prefix`: `PREFIX__A__B` → `a.b`.
    pub fn load_env(&mut self, prefix: &str) {
        self.load_vars(prefix, std::env::vars());
    }

    pub(crate) fn load_vars<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }

    pub fn snapshot(&self) -> ClinicConfigSnapshot {
        ClinicConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClinicConfigSnapshot {
    map: HashMap<String, String>,
}

impl ClinicConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.parse::<bool>().ok())
    }

    /// Comma separated list, trimmed, empty items dropped.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
    }
}
