// Capabilities and permission entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Every feature the front-end can gate. This is the only list; the
/// default and admin permission sets are both derived from `ALL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Capability {
    Dashboard,
    Patients,
    GeneralPrescription,
    SpinePrescription,
    PilesPrescription,
    Medicines,
    Stock,
    Purchases,
    Sales,
    Suppliers,
    Therapy,
    Reports,
    Users,
    Roles,
    Settings,
}

impl Capability {
    pub const ALL: [Capability; 15] = [
        Capability::Dashboard,
        Capability::Patients,
        Capability::GeneralPrescription,
        Capability::SpinePrescription,
        Capability::PilesPrescription,
        Capability::Medicines,
        Capability::Stock,
        Capability::Purchases,
        Capability::Sales,
        Capability::Suppliers,
        Capability::Therapy,
        Capability::Reports,
        Capability::Users,
        Capability::Roles,
        Capability::Settings,
    ];

    /// Wire name, as sent by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Dashboard => "dashboard",
            Capability::Patients => "patients",
            Capability::GeneralPrescription => "generalPrescription",
            Capability::SpinePrescription => "spinePrescription",
            Capability::PilesPrescription => "pilesPrescription",
            Capability::Medicines => "medicines",
            Capability::Stock => "stock",
            Capability::Purchases => "purchases",
            Capability::Sales => "sales",
            Capability::Suppliers => "suppliers",
            Capability::Therapy => "therapy",
            Capability::Reports => "reports",
            Capability::Users => "users",
            Capability::Roles => "roles",
            Capability::Settings => "settings",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownCapability(pub String);

impl fmt::Display for UnknownCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown capability `{}`", self.0)
    }
}

impl std::error::Error for UnknownCapability {}

impl FromStr for Capability {
    type Err = UnknownCapability;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCapability(s.to_string()))
    }
}

/// Whether the session may use one capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub name: Capability,
    pub accessibility: bool,
}

impl Permission {
    pub fn new(name: Capability, accessibility: bool) -> Self {
        Self {
            name,
            accessibility,
        }
    }
}

/// Permission entry as the backend sends it; the name is not yet checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPermission {
    pub name: String,
    #[serde(default)]
    pub accessibility: bool,
}

/// Keep known entries in backend order; unknown names are dropped.
pub fn parse_permissions(raw: Vec<RawPermission>) -> Vec<Permission> {
    raw.into_iter()
        .filter_map(|p| match p.name.parse::<Capability>() {
            Ok(name) => Some(Permission::new(name, p.accessibility)),
            Err(e) => {
                warn!(error = %e, "ignoring permission from backend");
                None
            }
        })
        .collect()
}

/// Every capability set to `accessibility`.
pub fn default_permissions(accessibility: bool) -> Vec<Permission> {
    Capability::ALL
        .iter()
        .map(|c| Permission::new(*c, accessibility))
        .collect()
}

/// Full access, synthesized for admin sessions.
pub fn admin_permissions() -> Vec<Permission> {
    default_permissions(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_name_matches_wire_name() {
        for cap in Capability::ALL {
            let json = serde_json::to_value(cap).unwrap();
            assert_eq!(json, serde_json::Value::String(cap.as_str().to_string()));
            assert_eq!(cap.as_str().parse::<Capability>().unwrap(), cap);
        }
    }

    #[test]
    fn parse_drops_unknown_names_and_keeps_order() {
        let raw = vec![
            RawPermission { name: "sales".into(), accessibility: true },
            RawPermission { name: "teleportation".into(), accessibility: true },
            RawPermission { name: "patients".into(), accessibility: false },
        ];

        assert_eq!(
            parse_permissions(raw),
            vec![
                Permission::new(Capability::Sales, true),
                Permission::new(Capability::Patients, false),
            ]
        );
    }

    #[test]
    fn admin_set_covers_every_capability() {
        let perms = admin_permissions();
        assert_eq!(perms.len(), Capability::ALL.len());
        assert!(perms.iter().all(|p| p.accessibility));
    }
}
