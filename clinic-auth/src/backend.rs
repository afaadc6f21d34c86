// Backend port used by the session store, plus the response shapes it consumes.

use async_trait::async_trait;
use clinic_core::ClinicResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::capability::RawPermission;
use crate::session::Credentials;

/// `userRole` is either a bare id or an embedded role document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleRef {
    Id(String),
    Object {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl RoleRef {
    pub fn id(&self) -> &str {
        match self {
            RoleRef::Id(id) => id,
            RoleRef::Object { id } => id,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userType", default)]
    pub user_type: Option<String>,
    #[serde(rename = "userRole", default)]
    pub user_role: Option<RoleRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginData {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
    pub user: LoginUser,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLoginResponse {
    pub data: UserLoginData,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRef {
    #[serde(rename = "_id")]
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLoginData {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub admin: Option<AdminRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub data: AdminLoginData,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRoleRecord {
    #[serde(default)]
    pub department: Option<Value>,
    #[serde(default)]
    pub permissions: Option<Vec<RawPermission>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "userRole", default)]
    pub user_role: Option<UserRoleRecord>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRecordResponse {
    pub data: UserRecord,
}

/// The REST calls the session layer depends on. The implementation also
/// owns the shared API client token.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn login_user(&self, credentials: &Credentials) -> ClinicResult<UserLoginResponse>;

    async fn login_admin(&self, credentials: &Credentials) -> ClinicResult<AdminLoginResponse>;

    async fn get_user(&self, id: &str) -> ClinicResult<UserRecordResponse>;

    /// Install (or drop) the bearer token used by subsequent requests.
    fn set_token(&self, token: Option<&str>);
}
