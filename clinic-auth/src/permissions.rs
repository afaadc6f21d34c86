// Permission store.

use clinic_core::{ClientStorage, StorageKey};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::capability::{default_permissions, Capability, Permission};

/// Flat list of (capability, allowed) pairs consulted by navigation and
/// route guards. Replaced wholesale on login, emptied on logout.
#[derive(Debug, Default)]
pub struct PermissionStore {
    entries: RwLock<Vec<Permission>>,
}

impl PermissionStore {
    pub fn new(entries: Vec<Permission>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Initial state before any network response: every capability,
    /// defaulted to the persisted `isAdmin` flag.
    ///
    /// NOTE: a stale admin flag shows admin navigation until rehydration
    /// or login replaces the list. Kept as-is until the intended
    /// behaviour is confirmed.
    pub fn for_startup(storage: &ClientStorage) -> Self {
        let is_admin = match storage.read(StorageKey::IsAdmin) {
            Ok(v) => v.as_deref() == Some("true"),
            Err(e) => {
                warn!(error = %e, "could not read persisted admin flag");
                false
            }
        };
        debug!(is_admin, "initial permissions synthesized");
        Self::new(default_permissions(is_admin))
    }

    pub fn set_permissions(&self, list: Vec<Permission>) {
        *self.entries.write() = list;
    }

    /// Update one entry. Unknown capabilities are a no-op; returns
    /// whether an entry changed.
    pub fn update_permission(&self, name: Capability, value: bool) -> bool {
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|p| p.name == name) {
            Some(entry) => {
                entry.accessibility = value;
                true
            }
            None => false,
        }
    }

    pub fn clear_permissions(&self) {
        self.entries.write().clear();
    }

    pub fn permissions(&self) -> Vec<Permission> {
        self.entries.read().clone()
    }

    pub fn is_allowed(&self, name: Capability) -> bool {
        self.entries
            .read()
            .iter()
            .any(|p| p.name == name && p.accessibility)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}
