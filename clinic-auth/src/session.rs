// Session model.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserKind {
    User,
    Admin,
}

impl Default for UserKind {
    fn default() -> Self {
        Self::User
    }
}

pub const ADMIN_ROLE: &str = "admin";

/// Minimal user record kept in memory and persisted under `user`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: UserKind,
    pub role: String,
}

impl SessionUser {
    pub fn user(id: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            kind: UserKind::User,
            role: role.into(),
        }
    }

    pub fn admin(id: Option<String>) -> Self {
        Self {
            id,
            kind: UserKind::Admin,
            role: ADMIN_ROLE.to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.kind == UserKind::Admin
    }
}

/// An authenticated identity. Token and role are both non-empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user: SessionUser,
    pub token: String,
}

impl Session {
    /// `None` unless both the token and the role reference are present.
    pub fn new(user: SessionUser, token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() || user.role.trim().is_empty() {
            return None;
        }
        Some(Self { user, token })
    }

    pub fn kind(&self) -> UserKind {
        self.user.kind
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where a logout or guard sends the user next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Originally requested location, so navigation can resume after login.
    pub from: Option<String>,
}

impl Redirect {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            to: path.into(),
            from: None,
        }
    }

    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }
}
