use std::future::Future;

use reqwest::multipart::{Form, Part};
pub use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::models::Role;

// --- Backend trait ---

/// Anything that can answer the REST surface. `ApiClient` talks HTTP; tests
/// swap in a recording double.
pub trait Backend {
    /// Issue one call and return the parsed JSON body. HTTP failures come
    /// back classified, never as panics.
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<Value, ApiError>>;

    /// Multipart upload of a single file under `field`.
    fn upload(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> impl Future<Output = Result<Value, ApiError>>;

    fn get(&self, path: &str) -> impl Future<Output = Result<Value, ApiError>> {
        self.request(Method::GET, path, None)
    }

    fn post(&self, path: &str, body: &Value) -> impl Future<Output = Result<Value, ApiError>> {
        self.request(Method::POST, path, Some(body))
    }

    fn put(&self, path: &str, body: &Value) -> impl Future<Output = Result<Value, ApiError>> {
        self.request(Method::PUT, path, Some(body))
    }

    fn delete(&self, path: &str) -> impl Future<Output = Result<Value, ApiError>> {
        self.request(Method::DELETE, path, None)
    }
}

/// A call described as data, so a form can build it from its values and
/// hand it off without knowing the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::POST, path: path.into(), body: Some(body) }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self { method: Method::PUT, path: path.into(), body: Some(body) }
    }

    pub async fn send<B: Backend>(&self, backend: &B) -> Result<Value, ApiError> {
        backend
            .request(self.method.clone(), &self.path, self.body.as_ref())
            .await
    }
}

// --- HTTP client ---

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    prefix: String,
    client: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bolsa/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            base_url: config.base_url(),
            prefix: config.api_prefix.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }

    /// Static files are served outside the API prefix.
    pub fn static_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Uploaded image for a user of `role`, or the role's default image.
    pub fn user_image_url(&self, role: Role, image: Option<&str>) -> String {
        match image.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => self.static_url(&format!(
                "/static/images/{}/{}",
                role.asset_folder(),
                name
            )),
            None => self.static_url(&format!("/static/images/default/{}", role.default_image())),
        }
    }

    async fn read_response(&self, response: reqwest::Response) -> Result<Value, ApiError> {
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), bytes = text.len(), "response received");

        if !status.is_success() {
            let err = ApiError::from_status(status.as_u16(), &text);
            warn!(status = status.as_u16(), error = %err, "request failed");
            return Err(err);
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ApiError::malformed(e.to_string()))
    }
}

impl Backend for ApiClient {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%method, %url, "sending request");

        let mut builder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!(%url, error = %e, "no response from backend");
            ApiError::from(e)
        })?;
        self.read_response(response).await
    }

    async fn upload(
        &self,
        path: &str,
        field: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let url = self.url(path);
        debug!(%url, field, file_name, size = bytes.len(), "uploading file");

        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let part = match mime_for(file_name) {
            Some(mime) => part.mime_str(mime)?,
            None => part,
        };
        let form = Form::new().part(field.to_string(), part);

        let response = self.client.post(&url).multipart(form).send().await?;
        self.read_response(response).await
    }
}

fn mime_for(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_lowercase();
    match ext.as_str() {
        "pdf" => Some("application/pdf"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

// --- Endpoints ---

/// Paths relative to the API prefix.
pub mod endpoints {
    pub const LOGIN: &str = "/login";
    pub const VERIFY_2FA: &str = "/verify-2fa";
    pub const REGISTER: &str = "/register";
    pub const JOBS: &str = "/vacantes";
    pub const APPLICATIONS: &str = "/postulaciones";
    pub const ADMIN_STATS: &str = "/admin/estadisticas";
    pub const ADMIN_JOBS: &str = "/admin/vacantes";
    pub const ADMIN_USERS: &str = "/admin/usuarios";
    pub const ADMIN_CANDIDATES: &str = "/admin/candidatos";
    pub const ADMIN_COMPANIES: &str = "/admin/empresas";

    pub fn user(user_id: i64) -> String {
        format!("/usuarios/{}", user_id)
    }

    pub fn company_jobs(company_id: i64) -> String {
        format!("/empresa/{}/vacantes", company_id)
    }

    pub fn company_job(company_id: i64, job_id: i64) -> String {
        format!("/empresa/{}/vacantes/{}", company_id, job_id)
    }

    pub fn admin_job(job_id: i64) -> String {
        format!("{}/{}", ADMIN_JOBS, job_id)
    }

    pub fn application(application_id: i64) -> String {
        format!("{}/{}", APPLICATIONS, application_id)
    }

    pub fn admin_application(application_id: i64) -> String {
        format!("/admin/postulaciones/{}", application_id)
    }

    pub fn company_applications(company_id: i64) -> String {
        format!("/empresa/{}/postulaciones", company_id)
    }

    pub fn candidate_applications(candidate_id: i64) -> String {
        format!("/candidato/{}/postulaciones", candidate_id)
    }

    pub fn candidate_profile(user_id: i64) -> String {
        format!("/candidato/profile/{}", user_id)
    }

    pub fn company_profile(user_id: i64) -> String {
        format!("/empresa/profile/{}", user_id)
    }

    pub fn upload_cv(user_id: i64) -> String {
        format!("/candidato/upload-cv/{}", user_id)
    }

    pub fn upload_image(user_id: i64) -> String {
        format!("/usuario/upload-image/{}", user_id)
    }

    pub fn admin_user(user_id: i64) -> String {
        format!("{}/{}", ADMIN_USERS, user_id)
    }

    pub fn admin_company(company_id: i64) -> String {
        format!("{}/{}", ADMIN_COMPANIES, company_id)
    }

    pub fn admin_candidate(candidate_id: i64) -> String {
        format!("{}/{}", ADMIN_CANDIDATES, candidate_id)
    }

    /// Appends the soft-delete toggle to a listing path.
    pub fn with_deleted(path: &str, include_deleted: bool) -> String {
        if include_deleted {
            let sep = if path.contains('?') { '&' } else { '?' };
            format!("{}{}incluir_eliminadas=true", path, sep)
        } else {
            path.to_string()
        }
    }
}
