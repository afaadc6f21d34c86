mod support;

use std::sync::Arc;
use std::time::Duration;

use clinic_auth::{
    default_permissions, Capability, Permission, Redirect, Rehydration, SessionEvent, UserKind,
};
use clinic_core::{ClientStorage, ClinicError, ErrorKind, StorageKey, StorageKind};
use support::{harness, harness_with, raw, FakeBackend, PASSWORD};

fn persisted_anywhere(storage: &ClientStorage, key: StorageKey) -> bool {
    [StorageKind::ShortTerm, StorageKind::LongTerm]
        .iter()
        .any(|kind| storage.area(*kind).get(key.as_str()).unwrap().is_some())
}

#[tokio::test]
async fn admin_login_grants_every_capability() {
    let h = harness();

    let user = h.auth.login_as_admin("owner@acme.test", PASSWORD).await.unwrap();

    assert_eq!(user.kind, UserKind::Admin);
    assert!(h.auth.is_admin());
    assert!(h.auth.is_authenticated());
    assert_eq!(h.permissions.permissions(), default_permissions(true));
    assert_eq!(h.backend.get_user_calls(), 0);
    assert_eq!(h.backend.current_token().as_deref(), Some("admin-token"));
    assert_eq!(
        h.storage.read(StorageKey::IsAdmin).unwrap().as_deref(),
        Some("true")
    );
}

#[tokio::test]
async fn user_login_uses_backend_permissions_exactly() {
    let h = harness();

    let user = h.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();

    assert_eq!(user.id.as_deref(), Some("user-1"));
    assert_eq!(user.role, "role-nurse");
    assert!(!h.auth.is_admin());
    assert_eq!(
        h.permissions.permissions(),
        vec![
            Permission::new(Capability::Patients, true),
            Permission::new(Capability::Sales, false),
            Permission::new(Capability::Therapy, true),
        ]
    );
    assert_eq!(h.auth.department().unwrap()["name"], "Physiotherapy");
    assert_eq!(h.auth.token().as_deref(), Some("user-token"));
    assert_eq!(h.backend.current_token().as_deref(), Some("user-token"));

    for key in StorageKey::SESSION {
        assert!(
            h.storage.area(StorageKind::LongTerm).get(key.as_str()).unwrap().is_some(),
            "{} not persisted",
            key.as_str()
        );
    }
}

#[tokio::test]
async fn missing_permission_list_means_no_access() {
    let backend = Arc::new(FakeBackend::default());
    *backend.permissions.lock() = None;
    let h = harness_with(backend, ClientStorage::in_memory());

    h.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();

    assert!(h.permissions.is_empty());
}

#[tokio::test]
async fn bad_credentials_leave_state_untouched() {
    let h = harness();

    let err = h
        .auth
        .login_as_user("nurse@acme.test", "wrong")
        .await
        .unwrap_err();

    assert_eq!(ClinicError::kind_of(&err), ErrorKind::NotAuthenticated);
    assert!(!h.auth.is_authenticated());
    assert!(h.backend.current_token().is_none());
    for key in StorageKey::SESSION {
        assert!(!persisted_anywhere(&h.storage, key));
    }
}

#[tokio::test]
async fn failed_user_fetch_establishes_no_session() {
    let backend = Arc::new(FakeBackend::default());
    *backend.fail_get_user.lock() = true;
    let h = harness_with(backend, ClientStorage::in_memory());

    assert!(h.auth.login_as_user("nurse@acme.test", PASSWORD).await.is_err());

    assert!(!h.auth.is_authenticated());
    assert!(h.backend.current_token().is_none());
    assert!(!persisted_anywhere(&h.storage, StorageKey::Token));
}

#[tokio::test]
async fn logout_clears_everything_and_redirects_by_kind() {
    let h = harness();
    h.storage
        .write(StorageKind::ShortTerm, StorageKey::Token, "stale")
        .unwrap();
    h.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();

    let redirect = h.auth.logout();

    assert_eq!(redirect, Redirect::to("/login"));
    assert!(!h.auth.is_authenticated());
    assert!(h.permissions.is_empty());
    assert!(h.backend.current_token().is_none());
    for key in StorageKey::SESSION {
        assert!(!persisted_anywhere(&h.storage, key), "{} survived", key.as_str());
    }

    h.auth.login_as_admin("owner@acme.test", PASSWORD).await.unwrap();
    assert_eq!(h.auth.logout(), Redirect::to("/admin/login"));
}

#[tokio::test]
async fn logout_keeps_tenant_keys() {
    let h = harness();
    h.storage
        .write(StorageKind::LongTerm, StorageKey::TenantDomain, "acme")
        .unwrap();
    h.auth.login_as_admin("owner@acme.test", PASSWORD).await.unwrap();

    h.auth.logout();

    assert!(persisted_anywhere(&h.storage, StorageKey::TenantDomain));
}

#[tokio::test]
async fn session_events_follow_transitions() {
    let h = harness();
    let mut events = h.auth.subscribe();

    h.auth.login_as_admin("owner@acme.test", PASSWORD).await.unwrap();
    h.auth.logout();

    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedIn(UserKind::Admin));
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut(UserKind::Admin));
}

#[tokio::test]
async fn rehydration_restores_a_persisted_session() {
    let storage = ClientStorage::in_memory();
    let first = harness_with(Arc::new(FakeBackend::default()), storage.clone());
    first.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();

    let reloaded = harness_with(Arc::new(FakeBackend::default()), storage);
    assert!(reloaded.auth.is_loading());

    let outcome = reloaded.auth.rehydrate().await;

    assert_eq!(outcome, Rehydration::Restored);
    assert!(!reloaded.auth.is_loading());
    assert!(reloaded.auth.is_authenticated());
    assert_eq!(reloaded.auth.user().unwrap().role, "role-nurse");
    assert_eq!(reloaded.backend.current_token().as_deref(), Some("user-token"));
    assert_eq!(reloaded.backend.get_user_calls(), 1);
    assert!(reloaded.permissions.is_allowed(Capability::Therapy));
}

#[tokio::test]
async fn rehydration_prefers_long_term_storage() {
    let storage = ClientStorage::in_memory();
    storage
        .write(
            StorageKind::ShortTerm,
            StorageKey::User,
            r#"{"id":"old","type":"user","role":"r-old"}"#,
        )
        .unwrap();
    storage
        .write(StorageKind::ShortTerm, StorageKey::Token, "old-token")
        .unwrap();
    storage
        .write(
            StorageKind::LongTerm,
            StorageKey::User,
            r#"{"id":"admin-9","type":"admin","role":"admin"}"#,
        )
        .unwrap();
    storage
        .write(StorageKind::LongTerm, StorageKey::Token, "new-token")
        .unwrap();
    let h = harness_with(Arc::new(FakeBackend::default()), storage);

    assert_eq!(h.auth.rehydrate().await, Rehydration::Restored);

    assert_eq!(h.auth.token().as_deref(), Some("new-token"));
    assert!(h.auth.is_admin());
    assert_eq!(h.permissions.permissions(), default_permissions(true));
    assert_eq!(h.backend.get_user_calls(), 0);
}

#[tokio::test]
async fn corrupt_user_json_clears_every_key() {
    let storage = ClientStorage::in_memory();
    for kind in [StorageKind::ShortTerm, StorageKind::LongTerm] {
        storage.write(kind, StorageKey::User, "{oops").unwrap();
        storage.write(kind, StorageKey::Token, "tok").unwrap();
        storage.write(kind, StorageKey::IsAdmin, "false").unwrap();
        storage.write(kind, StorageKey::Department, "\"dep\"").unwrap();
        storage.write(kind, StorageKey::Permissions, "[]").unwrap();
    }
    let h = harness_with(Arc::new(FakeBackend::default()), storage);
    let mut events = h.auth.subscribe();

    assert_eq!(h.auth.rehydrate().await, Rehydration::Cleared);

    assert!(!h.auth.is_authenticated());
    assert!(!h.auth.is_loading());
    for key in StorageKey::SESSION {
        assert!(!persisted_anywhere(&h.storage, key), "{} survived", key.as_str());
    }
    assert_eq!(events.recv().await.unwrap(), SessionEvent::Cleared);
}

#[tokio::test]
async fn token_without_user_is_cleared() {
    let storage = ClientStorage::in_memory();
    storage
        .write(StorageKind::LongTerm, StorageKey::Token, "orphan")
        .unwrap();
    let h = harness_with(Arc::new(FakeBackend::default()), storage);

    assert_eq!(h.auth.rehydrate().await, Rehydration::Cleared);
    assert!(!persisted_anywhere(&h.storage, StorageKey::Token));
}

#[tokio::test]
async fn empty_storage_rehydrates_to_nothing() {
    let h = harness();
    assert_eq!(h.auth.rehydrate().await, Rehydration::Empty);
    assert!(!h.auth.is_authenticated());
    assert!(!h.auth.is_loading());
}

#[tokio::test]
async fn refresh_failure_keeps_persisted_permissions() {
    let storage = ClientStorage::in_memory();
    let first = harness_with(Arc::new(FakeBackend::default()), storage.clone());
    first.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();

    let backend = Arc::new(FakeBackend::default());
    *backend.fail_get_user.lock() = true;
    let reloaded = harness_with(backend, storage);

    assert_eq!(reloaded.auth.rehydrate().await, Rehydration::Restored);

    assert!(reloaded.auth.is_authenticated());
    assert_eq!(reloaded.permissions.permissions(), first.permissions.permissions());
}

#[tokio::test]
async fn refresh_replaces_permissions_and_persists_them() {
    let h = harness();
    h.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();
    *h.backend.permissions.lock() = Some(vec![raw("reports", true)]);

    h.auth.refresh_permissions().await.unwrap();

    assert_eq!(
        h.permissions.permissions(),
        vec![Permission::new(Capability::Reports, true)]
    );
    let stored = h.storage.read(StorageKey::Permissions).unwrap().unwrap();
    assert!(stored.contains("reports"));
}

#[tokio::test]
async fn refresh_without_session_is_not_authenticated() {
    let h = harness();
    let err = h.auth.refresh_permissions().await.unwrap_err();
    assert_eq!(ClinicError::kind_of(&err), ErrorKind::NotAuthenticated);
}

#[tokio::test]
async fn logout_during_rehydration_is_not_reported_as_restored() {
    let storage = ClientStorage::in_memory();
    let first = harness_with(Arc::new(FakeBackend::default()), storage.clone());
    first.auth.login_as_user("nurse@acme.test", PASSWORD).await.unwrap();

    let backend = Arc::new(FakeBackend::default());
    *backend.get_user_delay.lock() = Some(Duration::from_millis(100));
    let reloaded = harness_with(backend, storage);
    let mut events = reloaded.auth.subscribe();

    let (outcome, _) = tokio::join!(reloaded.auth.rehydrate(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        reloaded.auth.logout()
    });

    assert_eq!(outcome, Rehydration::Empty);
    assert!(!reloaded.auth.is_authenticated());
    assert!(!reloaded.auth.is_loading());
    assert!(reloaded.permissions.is_empty());
    assert!(reloaded.backend.current_token().is_none());
    assert_eq!(events.recv().await.unwrap(), SessionEvent::LoggedOut(UserKind::User));
    assert!(events.try_recv().is_err());
}
