// Navigation gating.

use crate::capability::Capability;
use crate::permissions::PermissionStore;

/// One entry of the sidebar tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavEntry {
    pub label: String,
    pub path: String,
    pub capability: Option<Capability>,
    pub children: Vec<NavEntry>,
}

impl NavEntry {
    pub fn link(label: &str, path: &str, capability: Capability) -> Self {
        Self {
            label: label.to_string(),
            path: path.to_string(),
            capability: Some(capability),
            children: Vec::new(),
        }
    }

    pub fn group(label: &str, path: &str, children: Vec<NavEntry>) -> Self {
        Self {
            label: label.to_string(),
            path: path.to_string(),
            capability: None,
            children,
        }
    }
}

/// Entries the current permissions allow. A group survives only when at
/// least one of its children does.
pub fn visible_entries(entries: &[NavEntry], permissions: &PermissionStore) -> Vec<NavEntry> {
    entries
        .iter()
        .filter_map(|entry| {
            if let Some(cap) = entry.capability {
                if !permissions.is_allowed(cap) {
                    return None;
                }
            }
            if entry.children.is_empty() {
                return Some(entry.clone());
            }
            let children = visible_entries(&entry.children, permissions);
            if children.is_empty() {
                return None;
            }
            Some(NavEntry {
                children,
                ..entry.clone()
            })
        })
        .collect()
}

/// Default clinic sidebar.
pub fn clinic_navigation() -> Vec<NavEntry> {
    use Capability::*;
    vec![
        NavEntry::link("Dashboard", "/", Dashboard),
        NavEntry::link("Patients", "/patients", Patients),
        NavEntry::group(
            "Prescriptions",
            "/prescriptions",
            vec![
                NavEntry::link("General", "/prescriptions/general", GeneralPrescription),
                NavEntry::link("Spine", "/prescriptions/spine", SpinePrescription),
                NavEntry::link("Piles", "/prescriptions/piles", PilesPrescription),
            ],
        ),
        NavEntry::group(
            "Pharmacy",
            "/pharmacy",
            vec![
                NavEntry::link("Medicines", "/pharmacy/medicines", Medicines),
                NavEntry::link("Stock", "/pharmacy/stock", Stock),
                NavEntry::link("Purchases", "/pharmacy/purchases", Purchases),
                NavEntry::link("Sales", "/pharmacy/sales", Sales),
                NavEntry::link("Suppliers", "/pharmacy/suppliers", Suppliers),
            ],
        ),
        NavEntry::link("Therapy", "/therapy", Therapy),
        NavEntry::link("Reports", "/reports", Reports),
        NavEntry::group(
            "Administration",
            "/admin",
            vec![
                NavEntry::link("Users", "/admin/users", Users),
                NavEntry::link("Roles", "/admin/roles", Roles),
                NavEntry::link("Settings", "/admin/settings", Settings),
            ],
        ),
    ]
}
