//! Tenant model and hostname based tenant resolution.
//!
//! Every clinic is served from its own subdomain (`acme.clinic.app`).
//! Before anything else renders, the left-most label of the hostname is
//! checked against the backend. Local development hosts skip the check.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::config::{ClinicConfigSnapshot, TENANT_LOCAL_HOSTS, TENANT_PLACEHOLDER_DOMAIN};
use crate::errors::{ClinicError, ClinicResult};
use crate::storage::{ClientStorage, StorageKey, StorageKind};

/// Tenant identifier as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A clinic instance. Immutable for the session once resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(alias = "_id")]
    pub id: TenantId,
    pub domain: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

impl Tenant {
    /// Fixed tenant used on local development hosts.
    pub fn placeholder(domain: impl Into<String>) -> Self {
        Self {
            id: TenantId("local".to_string()),
            domain: domain.into(),
            name: "Local Development".to_string(),
            email: None,
            phone: None,
            address: None,
            logo: None,
        }
    }
}

/// Backend answer to a tenant lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TenantLookup {
    pub status: bool,
    #[serde(default)]
    pub data: Option<Tenant>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Port to the backend's tenant lookup endpoint.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn lookup_tenant(&self, subdomain: &str) -> ClinicResult<TenantLookup>;
}

/// Outcome of resolution. `NotFound` is terminal for the page load.
#[derive(Debug, Clone, PartialEq)]
pub enum TenantState {
    Resolved(Tenant),
    NotFound { reason: String },
}

impl TenantState {
    pub fn tenant(&self) -> Option<&Tenant> {
        match self {
            TenantState::Resolved(t) => Some(t),
            TenantState::NotFound { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, TenantState::Resolved(_))
    }

    /// The state as an error, for callers that propagate with `?`.
    pub fn into_result(self) -> ClinicResult<Tenant> {
        match self {
            TenantState::Resolved(t) => Ok(t),
            TenantState::NotFound { reason } => Err(ClinicError::tenant_not_found(reason).into_anyhow()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantOptions {
    pub local_hosts: Vec<String>,
    pub placeholder_domain: String,
}

impl Default for TenantOptions {
    fn default() -> Self {
        Self {
            local_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            placeholder_domain: "localhost".to_string(),
        }
    }
}

impl TenantOptions {
    pub fn from_config(config: &ClinicConfigSnapshot) -> Self {
        let defaults = Self::default();
        Self {
            local_hosts: config
                .get_list(TENANT_LOCAL_HOSTS)
                .unwrap_or(defaults.local_hosts),
            placeholder_domain: config
                .get_string(TENANT_PLACEHOLDER_DOMAIN)
                .unwrap_or(defaults.placeholder_domain),
        }
    }

    /// IPv6 hosts match with or without brackets.
    pub fn is_local(&self, hostname: &str) -> bool {
        let host = unbracket(strip_port(hostname.trim()));
        self.local_hosts
            .iter()
            .any(|h| unbracket(h.trim()).eq_ignore_ascii_case(host))
    }
}

/// Drop a trailing `:port`. Bare IPv6 literals are returned unchanged.
fn strip_port(hostname: &str) -> &str {
    if let Some(rest) = hostname.strip_prefix('[') {
        return match rest.find(']') {
            Some(end) => &hostname[..end + 2],
            None => hostname,
        };
    }
    match hostname.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            host
        }
        _ => hostname,
    }
}

fn unbracket(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// Left-most label of a dotted hostname. `None` when there is no dot
/// or the label is empty.
pub fn extract_subdomain(hostname: &str) -> Option<&str> {
    let host = strip_port(hostname.trim());
    let (label, rest) = host.split_once('.')?;
    if label.is_empty() || rest.is_empty() {
        return None;
    }
    Some(label)
}

pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    storage: ClientStorage,
    options: TenantOptions,
}

impl TenantResolver {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        storage: ClientStorage,
        options: TenantOptions,
    ) -> Self {
        Self {
            directory,
            storage,
            options,
        }
    }

    pub fn options(&self) -> &TenantOptions {
        &self.options
    }

    /// Resolve the tenant for `hostname`. Never errors: every failure
    /// becomes `TenantState::NotFound`.
    #[instrument(skip(self))]
    pub async fn resolve(&self, hostname: &str) -> TenantState {
        if self.options.is_local(hostname) {
            info!("local development host, using placeholder tenant");
            return TenantState::Resolved(Tenant::placeholder(&self.options.placeholder_domain));
        }

        let Some(subdomain) = extract_subdomain(hostname) else {
            warn!("hostname has no subdomain");
            return TenantState::NotFound {
                reason: format!("no subdomain in hostname `{hostname}`"),
            };
        };

        let lookup = match self.directory.lookup_tenant(subdomain).await {
            Ok(lookup) => lookup,
            Err(e) => {
                warn!(subdomain, error = %e, "tenant lookup failed");
                return TenantState::NotFound {
                    reason: e.to_string(),
                };
            }
        };

        match lookup {
            TenantLookup {
                status: true,
                data: Some(tenant),
                ..
            } => {
                if let Err(e) = self.persist(subdomain, &tenant) {
                    warn!(subdomain, error = %e, "could not persist tenant");
                }
                info!(subdomain, tenant_id = %tenant.id, "tenant resolved");
                TenantState::Resolved(tenant)
            }
            TenantLookup { message, .. } => {
                let reason = message.unwrap_or_else(|| format!("tenant `{subdomain}` not found"));
                warn!(subdomain, %reason, "tenant rejected");
                TenantState::NotFound { reason }
            }
        }
    }

    fn persist(&self, subdomain: &str, tenant: &Tenant) -> ClinicResult<()> {
        self.storage
            .write_json(StorageKind::LongTerm, StorageKey::TenantData, tenant)?;
        self.storage
            .write(StorageKind::LongTerm, StorageKey::TenantDomain, subdomain)
    }

    /// Tenant stored by a previous successful lookup.
    pub fn persisted(&self) -> ClinicResult<Option<Tenant>> {
        self.storage.read_json(StorageKey::TenantData)
    }
}

/// Runs resolution at most once per page load.
pub struct TenantGate {
    resolver: TenantResolver,
    state: OnceCell<TenantState>,
}

impl TenantGate {
    pub fn new(resolver: TenantResolver) -> Self {
        Self {
            resolver,
            state: OnceCell::new(),
        }
    }

    /// First call resolves; later calls return the same state.
    pub async fn resolve(&self, hostname: &str) -> &TenantState {
        self.state
            .get_or_init(|| self.resolver.resolve(hostname))
            .await
    }

    /// `None` while resolution has not completed.
    pub fn state(&self) -> Option<&TenantState> {
        self.state.get()
    }

    pub fn resolver(&self) -> &TenantResolver {
        &self.resolver
    }
}
