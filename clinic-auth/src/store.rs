// Auth/session store.

use std::sync::Arc;

use clinic_core::{bail_clinic, ClientStorage, ClinicError, ClinicResult, StorageKey, StorageKind};
use parking_lot::RwLock;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use crate::backend::{AdminLoginData, AuthBackend, UserLoginData};
use crate::capability::{admin_permissions, parse_permissions, Permission, RawPermission};
use crate::options::AuthOptions;
use crate::permissions::PermissionStore;
use crate::session::{Credentials, Redirect, Session, SessionUser, UserKind};

/// Published after every session transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(UserKind),
    LoggedOut(UserKind),
    Restored(UserKind),
    Cleared,
}

/// Outcome of reading the persisted session on mount.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rehydration {
    Restored,
    Empty,
    /// Persisted data was unusable and every session key was removed.
    Cleared,
}

#[derive(Debug, Default)]
struct AuthState {
    session: Option<Session>,
    is_admin: bool,
    department: Option<Value>,
    loading: bool,
}

/// Everything a login produced, held back until it is committed.
struct PendingLogin {
    session: Session,
    department: Option<Value>,
    permissions: Vec<Permission>,
}

struct PersistedSession {
    session: Session,
    department: Option<Value>,
    permissions: Option<Vec<Permission>>,
}

pub struct AuthStore {
    backend: Arc<dyn AuthBackend>,
    storage: ClientStorage,
    permissions: Arc<PermissionStore>,
    options: AuthOptions,
    state: RwLock<AuthState>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthStore {
    /// The store starts in the loading state until `rehydrate` completes.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        storage: ClientStorage,
        permissions: Arc<PermissionStore>,
        options: AuthOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            backend,
            storage,
            permissions,
            options,
            state: RwLock::new(AuthState {
                loading: true,
                ..AuthState::default()
            }),
            events,
        }
    }

    pub fn options(&self) -> &AuthOptions {
        &self.options
    }

    pub fn permission_store(&self) -> &Arc<PermissionStore> {
        &self.permissions
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn session(&self) -> Option<Session> {
        self.state.read().session.clone()
    }

    pub fn user(&self) -> Option<SessionUser> {
        self.state.read().session.as_ref().map(|s| s.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.read().session.as_ref().map(|s| s.token.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().session.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.state.read().is_admin
    }

    pub fn is_loading(&self) -> bool {
        self.state.read().loading
    }

    pub fn department(&self) -> Option<Value> {
        self.state.read().department.clone()
    }

    #[instrument(skip(self, password), fields(kind = "user"))]
    pub async fn login_as_user(&self, email: &str, password: &str) -> ClinicResult<SessionUser> {
        let credentials = Credentials::new(email, password);
        let pending = self.authenticate_user(&credentials).await;
        self.finish_login(pending)
    }

    #[instrument(skip(self, password), fields(kind = "admin"))]
    pub async fn login_as_admin(&self, email: &str, password: &str) -> ClinicResult<SessionUser> {
        let credentials = Credentials::new(email, password);
        let pending = self.authenticate_admin(&credentials).await;
        self.finish_login(pending)
    }

    async fn authenticate_user(&self, credentials: &Credentials) -> ClinicResult<PendingLogin> {
        let UserLoginData { access_token, user } = self.backend.login_user(credentials).await?.data;

        let role = user
            .user_role
            .as_ref()
            .map(|r| r.id().to_string())
            .unwrap_or_default();
        let session = Session::new(
            SessionUser::user(user.id.clone(), role),
            access_token.unwrap_or_default(),
        )
        .ok_or_else(|| {
            ClinicError::not_authenticated("Login response is missing the access token or role")
                .into_anyhow()
        })?;
        debug!(user_type = ?user.user_type, "credentials accepted");

        self.backend.set_token(Some(&session.token));
        let role_record = self
            .backend
            .get_user(&user.id)
            .await?
            .data
            .user_role
            .unwrap_or_default();

        Ok(PendingLogin {
            session,
            department: role_record.department,
            permissions: role_record
                .permissions
                .map(parse_permissions)
                .unwrap_or_default(),
        })
    }

    async fn authenticate_admin(&self, credentials: &Credentials) -> ClinicResult<PendingLogin> {
        let AdminLoginData {
            access_token,
            admin,
        } = self.backend.login_admin(credentials).await?.data;

        let session = Session::new(
            SessionUser::admin(admin.map(|a| a.id)),
            access_token.unwrap_or_default(),
        )
        .ok_or_else(|| {
            ClinicError::not_authenticated("Login response is missing the access token")
                .into_anyhow()
        })?;

        self.backend.set_token(Some(&session.token));
        Ok(PendingLogin {
            session,
            department: None,
            permissions: admin_permissions(),
        })
    }

    fn finish_login(&self, pending: ClinicResult<PendingLogin>) -> ClinicResult<SessionUser> {
        match pending.and_then(|p| self.commit(p)) {
            Ok(user) => {
                info!(user_id = ?user.id, kind = ?user.kind, "login succeeded");
                let _ = self.events.send(SessionEvent::LoggedIn(user.kind));
                Ok(user)
            }
            Err(e) => {
                // The API client goes back to whatever session was active before.
                let previous = self.token();
                self.backend.set_token(previous.as_deref());
                warn!(error = %e, "login failed");
                Err(e)
            }
        }
    }

    fn commit(&self, pending: PendingLogin) -> ClinicResult<SessionUser> {
        let area = self.options.login_storage;
        if let Err(e) = self.persist(area, &pending) {
            warn!(error = %e, "could not persist session, clearing");
            self.reset();
            return Err(e);
        }

        let user = pending.session.user.clone();
        {
            let mut state = self.state.write();
            state.is_admin = user.is_admin();
            state.department = pending.department;
            state.session = Some(pending.session);
            state.loading = false;
        }
        self.permissions.set_permissions(pending.permissions);
        Ok(user)
    }

    fn persist(&self, area: StorageKind, pending: &PendingLogin) -> ClinicResult<()> {
        let session = &pending.session;
        self.storage.write_json(area, StorageKey::User, &session.user)?;
        self.storage.write(area, StorageKey::Token, &session.token)?;
        self.storage.write(
            area,
            StorageKey::IsAdmin,
            if session.user.is_admin() { "true" } else { "false" },
        )?;
        self.persist_role_data(area, pending.department.as_ref(), &pending.permissions)
    }

    fn persist_role_data(
        &self,
        area: StorageKind,
        department: Option<&Value>,
        permissions: &[Permission],
    ) -> ClinicResult<()> {
        match department {
            Some(d) => self.storage.write_json(area, StorageKey::Department, d)?,
            None => self.storage.remove_everywhere(&[StorageKey::Department])?,
        }
        self.storage.write_json(area, StorageKey::Permissions, &permissions)
    }

    /// End the session and return the login route matching its kind.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Redirect {
        let kind = {
            let state = self.state.read();
            match &state.session {
                Some(s) => s.kind(),
                None if state.is_admin => UserKind::Admin,
                None => UserKind::User,
            }
        };

        self.reset();
        info!(?kind, "logged out");
        let _ = self.events.send(SessionEvent::LoggedOut(kind));
        Redirect::to(self.options.routes.login_for(kind))
    }

    /// Drop in-memory state, persisted session keys, permissions and the API token.
    fn reset(&self) {
        *self.state.write() = AuthState::default();
        if let Err(e) = self.storage.remove_everywhere(&StorageKey::SESSION) {
            warn!(error = %e, "could not clear persisted session");
        }
        self.permissions.clear_permissions();
        self.backend.set_token(None);
    }

    /// Restore a persisted session. Runs once on mount.
    #[instrument(skip(self))]
    pub async fn rehydrate(&self) -> Rehydration {
        let (outcome, event) = match self.read_persisted() {
            Ok(Some(persisted)) => {
                let restored = persisted.session.clone();
                self.restore(persisted);

                if !restored.user.is_admin() {
                    // Keep whatever was persisted when the refresh fails.
                    if let Err(e) = self.refresh_permissions().await {
                        warn!(error = %e, "permission refresh failed, keeping persisted permissions");
                    }
                }

                // A logout or login during the refresh supersedes this restore.
                if self.token().as_deref() == Some(restored.token.as_str()) {
                    let kind = restored.kind();
                    info!(?kind, "session restored");
                    (Rehydration::Restored, Some(SessionEvent::Restored(kind)))
                } else {
                    debug!("session changed while rehydrating, discarding restore");
                    (Rehydration::Empty, None)
                }
            }
            Ok(None) => {
                debug!("no persisted session");
                (Rehydration::Empty, None)
            }
            Err(e) => {
                warn!(error = %e, "persisted session is unusable, clearing");
                self.reset();
                (Rehydration::Cleared, Some(SessionEvent::Cleared))
            }
        };

        self.state.write().loading = false;
        if let Some(event) = event {
            let _ = self.events.send(event);
        }
        outcome
    }

    fn read_persisted(&self) -> ClinicResult<Option<PersistedSession>> {
        let user = self.storage.read(StorageKey::User)?;
        let token = self.storage.read(StorageKey::Token)?;

        let (user, token) = match (user, token) {
            (None, None) => return Ok(None),
            (Some(user), Some(token)) => (user, token),
            _ => {
                bail_clinic!(corrupt_state, "persisted session has only one of user and token");
            }
        };

        let user: SessionUser = serde_json::from_str(&user).map_err(|e| {
            ClinicError::corrupt_state("stored `user` is not valid JSON")
                .with_source(e.into())
                .into_anyhow()
        })?;
        let session = Session::new(user, token).ok_or_else(|| {
            ClinicError::corrupt_state("persisted session has no token or role").into_anyhow()
        })?;

        let department = self.storage.read_json::<Value>(StorageKey::Department)?;
        let permissions = self
            .storage
            .read_json::<Vec<RawPermission>>(StorageKey::Permissions)?
            .map(parse_permissions);

        Ok(Some(PersistedSession {
            session,
            department,
            permissions,
        }))
    }

    fn restore(&self, persisted: PersistedSession) {
        let is_admin = persisted.session.user.is_admin();
        self.backend.set_token(Some(&persisted.session.token));

        match persisted.permissions {
            Some(list) => self.permissions.set_permissions(list),
            None if is_admin => self.permissions.set_permissions(admin_permissions()),
            None => {}
        }

        let mut state = self.state.write();
        state.is_admin = is_admin;
        state.department = persisted.department;
        state.session = Some(persisted.session);
    }

    /// Re-fetch the role's department and permissions for the current user.
    #[instrument(skip(self))]
    pub async fn refresh_permissions(&self) -> ClinicResult<()> {
        let Some(session) = self.session() else {
            bail_clinic!(not_authenticated, "No active session");
        };
        if session.user.is_admin() {
            self.permissions.set_permissions(admin_permissions());
            return Ok(());
        }
        let Some(user_id) = session.user.id.clone() else {
            bail_clinic!(not_authenticated, "Session has no user id");
        };

        let role = self
            .backend
            .get_user(&user_id)
            .await?
            .data
            .user_role
            .unwrap_or_default();

        if self.token().as_deref() != Some(session.token.as_str()) {
            debug!("session changed during permission refresh, discarding response");
            return Ok(());
        }

        let permissions = role.permissions.map(parse_permissions).unwrap_or_default();
        self.persist_role_data(
            self.options.login_storage,
            role.department.as_ref(),
            &permissions,
        )?;
        self.state.write().department = role.department;
        self.permissions.set_permissions(permissions);
        debug!("permissions refreshed");
        Ok(())
    }
}
