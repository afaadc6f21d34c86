//! clinic-core: tenant resolution, client storage and shared errors for
//! the clinic front-end.

pub mod app;
pub mod config;
pub mod errors;
pub mod storage;
pub mod tenant;

pub use app::ClinicApp;
pub use config::{ClinicConfig, ClinicConfigSnapshot};
pub use errors::{ClinicError, ClinicResult, ErrorKind};
pub use storage::{
    ClientStorage, FileStorage, MemoryStorage, StorageArea, StorageError, StorageKey, StorageKind,
};
pub use tenant::{
    extract_subdomain, Tenant, TenantDirectory, TenantGate, TenantId, TenantLookup, TenantOptions,
    TenantResolver, TenantState,
};
