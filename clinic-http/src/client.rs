use async_trait::async_trait;
use clinic_auth::{
    AdminLoginResponse, AuthBackend, Credentials, UserLoginResponse, UserRecordResponse,
};
use clinic_core::config::API_BASE_URL;
use clinic_core::{
    ClinicConfigSnapshot, ClinicError, ClinicResult, ErrorKind, TenantDirectory, TenantLookup,
};
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

const TENANT_BY_DOMAIN: [&str; 2] = ["tenants", "domain"];
const USER_LOGIN: [&str; 2] = ["users", "login"];
const ADMIN_LOGIN: [&str; 2] = ["admins", "login"];
const USERS: &str = "users";

/// Shared API client. After login every request carries the bearer token.
///
/// No timeout is configured: a hung request keeps the caller waiting.
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl RestClient {
    pub fn new(base_url: impl Into<String>) -> ClinicResult<Self> {
        let base_url = base_url.into();
        let parsed = Url::parse(base_url.trim_end_matches('/'))
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"));
        let Some(parsed) = parsed else {
            return Err(ClinicError::bad_request(format!(
                "API base URL must be an HTTP/HTTPS URL, got `{base_url}`"
            ))
            .into_anyhow());
        };
        let http = reqwest::Client::builder().build()?;
        Ok(Self {
            http,
            base_url: parsed,
            token: RwLock::new(None),
        })
    }

    pub fn from_config(config: &ClinicConfigSnapshot) -> ClinicResult<Self> {
        let base_url = config.get_string(API_BASE_URL).ok_or_else(|| {
            ClinicError::bad_request(format!("Missing `{API_BASE_URL}` configuration")).into_anyhow()
        })?;
        Self::new(base_url)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Base URL with `segments` appended; each segment is percent-encoded.
    fn url(&self, segments: &[&str]) -> ClinicResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ClinicError::bad_request(format!("API base URL `{}` cannot take a path", self.base_url))
                    .into_anyhow()
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ClinicResult<RequestBuilder> {
        let req = self.http.request(method, self.url(segments)?);
        Ok(match self.token.read().as_deref() {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }

    /// GET a `/`-separated path relative to the base URL.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ClinicResult<T> {
        self.get_segments(&split_path(path)).await
    }

    /// POST a JSON body to a `/`-separated path relative to the base URL.
    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClinicResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.post_segments(&split_path(path), body).await
    }

    async fn get_segments<T: DeserializeOwned>(&self, segments: &[&str]) -> ClinicResult<T> {
        self.send(self.request(Method::GET, segments)?).await
    }

    async fn post_segments<B, T>(&self, segments: &[&str], body: &B) -> ClinicResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(self.request(Method::POST, segments)?.json(body)).await
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> ClinicResult<T> {
        let res = req.send().await.map_err(|e| {
            ClinicError::unavailable("Backend is unreachable")
                .with_source(e.into())
                .into_anyhow()
        })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.json::<Value>().await.unwrap_or(Value::Null);
            let message = body
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| status.to_string());
            debug!(status = status.as_u16(), %message, "backend returned an error");
            return Err(ClinicError::new(ErrorKind::from_status(status.as_u16()), message)
                .with_data(body)
                .into_anyhow());
        }

        res.json::<T>().await.map_err(|e| {
            warn!(error = %e, "malformed backend response");
            ClinicError::bad_gateway("Malformed backend response")
                .with_source(e.into())
                .into_anyhow()
        })
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

#[async_trait]
impl TenantDirectory for RestClient {
    #[instrument(skip(self))]
    async fn lookup_tenant(&self, subdomain: &str) -> ClinicResult<TenantLookup> {
        let [tenants, domain] = TENANT_BY_DOMAIN;
        self.get_segments(&[tenants, domain, subdomain]).await
    }
}

#[async_trait]
impl AuthBackend for RestClient {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login_user(&self, credentials: &Credentials) -> ClinicResult<UserLoginResponse> {
        self.post_segments(&USER_LOGIN, credentials).await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login_admin(&self, credentials: &Credentials) -> ClinicResult<AdminLoginResponse> {
        self.post_segments(&ADMIN_LOGIN, credentials).await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, id: &str) -> ClinicResult<UserRecordResponse> {
        self.get_segments(&[USERS, id]).await
    }

    fn set_token(&self, token: Option<&str>) {
        *self.token.write() = token.map(str::to_string);
    }
}
