#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clinic_auth::{
    AdminLoginData, AdminLoginResponse, AdminRef, AuthBackend, AuthOptions, AuthStore, Credentials,
    LoginUser, PermissionStore, RawPermission, RoleRef, UserLoginData, UserLoginResponse,
    UserRecord, UserRecordResponse, UserRoleRecord,
};
use clinic_core::{ClientStorage, ClinicError, ClinicResult};
use parking_lot::Mutex;
use serde_json::json;

pub const PASSWORD: &str = "correct horse";

/// Backend double: one user, one admin, counters for every call.
pub struct FakeBackend {
    pub permissions: Mutex<Option<Vec<RawPermission>>>,
    pub fail_get_user: Mutex<bool>,
    pub token: Mutex<Option<String>>,
    pub get_user_calls: AtomicUsize,
    pub get_user_delay: Mutex<Option<Duration>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self {
            permissions: Mutex::new(Some(vec![
                raw("patients", true),
                raw("sales", false),
                raw("therapy", true),
            ])),
            fail_get_user: Mutex::new(false),
            token: Mutex::new(None),
            get_user_calls: AtomicUsize::new(0),
            get_user_delay: Mutex::new(None),
        }
    }
}

impl FakeBackend {
    pub fn current_token(&self) -> Option<String> {
        self.token.lock().clone()
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }
}

pub fn raw(name: &str, accessibility: bool) -> RawPermission {
    RawPermission {
        name: name.to_string(),
        accessibility,
    }
}

#[async_trait::async_trait]
impl AuthBackend for FakeBackend {
    async fn login_user(&self, credentials: &Credentials) -> ClinicResult<UserLoginResponse> {
        if credentials.email != "nurse@acme.test" || credentials.password != PASSWORD {
            return Err(ClinicError::not_authenticated("Invalid login").into_anyhow());
        }
        Ok(UserLoginResponse {
            data: UserLoginData {
                access_token: Some("user-token".to_string()),
                user: LoginUser {
                    id: "user-1".to_string(),
                    user_type: Some("user".to_string()),
                    user_role: Some(RoleRef::Id("role-nurse".to_string())),
                },
            },
        })
    }

    async fn login_admin(&self, credentials: &Credentials) -> ClinicResult<AdminLoginResponse> {
        if credentials.email != "owner@acme.test" || credentials.password != PASSWORD {
            return Err(ClinicError::not_authenticated("Invalid login").into_anyhow());
        }
        Ok(AdminLoginResponse {
            data: AdminLoginData {
                access_token: Some("admin-token".to_string()),
                admin: Some(AdminRef {
                    id: "admin-1".to_string(),
                }),
            },
        })
    }

    async fn get_user(&self, _id: &str) -> ClinicResult<UserRecordResponse> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.get_user_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if *self.fail_get_user.lock() {
            return Err(ClinicError::unavailable("backend down").into_anyhow());
        }
        Ok(UserRecordResponse {
            data: UserRecord {
                user_role: Some(UserRoleRecord {
                    department: Some(json!({"_id": "dep-1", "name": "Physiotherapy"})),
                    permissions: self.permissions.lock().clone(),
                }),
            },
        })
    }

    fn set_token(&self, token: Option<&str>) {
        *self.token.lock() = token.map(str::to_string);
    }
}

pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub storage: ClientStorage,
    pub permissions: Arc<PermissionStore>,
    pub auth: Arc<AuthStore>,
}

pub fn harness_with(backend: Arc<FakeBackend>, storage: ClientStorage) -> Harness {
    let permissions = Arc::new(PermissionStore::for_startup(&storage));
    let auth = Arc::new(AuthStore::new(
        backend.clone(),
        storage.clone(),
        Arc::clone(&permissions),
        AuthOptions::default(),
    ));
    Harness {
        backend,
        storage,
        permissions,
        auth,
    }
}

pub fn harness() -> Harness {
    harness_with(Arc::new(FakeBackend::default()), ClientStorage::in_memory())
}
