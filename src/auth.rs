//! Sign-in, second factor and registration.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::info;

use crate::api::{endpoints, ApiRequest, Backend};
use crate::error::{ApiError, FormError, StoreError};
use crate::form::{FieldSpec, FormController, Schema, Values};
use crate::models::{Role, Session, User};
use crate::router::Router;
use crate::session::SessionStore;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\S+@\S+\.\S+").unwrap());
static CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[0-9]{6}$").unwrap());

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(Session),
    /// Password accepted; a code was sent and must be checked with
    /// `verify_2fa` using this challenge.
    TwoFactor { challenge: String },
}

fn email_field() -> FieldSpec {
    FieldSpec::new("correo")
        .required("Email is required")
        .pattern(&EMAIL_REGEX, "Email is not valid")
}

fn password_field() -> FieldSpec {
    FieldSpec::new("contrasena")
        .required("Password is required")
        .min_chars(6, "Password must be at least 6 characters")
}

pub fn login_schema() -> Schema {
    Schema::new().field(email_field()).field(password_field())
}

fn passwords_match(values: &Values) -> bool {
    values.get("contrasena") == values.get("confirmarContrasena")
}

fn company_named_when_company(values: &Values) -> bool {
    let is_company = values
        .get("tipoUsuario")
        .and_then(|t| Role::parse(t))
        .is_some_and(|role| role == Role::Company);
    !is_company || values.get("empresa").is_some_and(|c| !c.trim().is_empty())
}

pub fn register_schema() -> Schema {
    Schema::new()
        .field(FieldSpec::new("nombre").required("First name is required"))
        .field(FieldSpec::new("apellido").required("Last name is required"))
        .field(email_field())
        .field(password_field())
        .field(FieldSpec::new("confirmarContrasena"))
        .field(FieldSpec::new("telefono").required("Phone is required"))
        .field(FieldSpec::new("tipoUsuario").initial(Role::Candidate.as_str()))
        .field(FieldSpec::new("empresa"))
        .field(
            FieldSpec::new("aceptaTerminos").required("You must accept the terms and conditions"),
        )
        .cross("confirmarContrasena", "Passwords do not match", passwords_match)
        .cross(
            "empresa",
            "Company name is required for company accounts",
            company_named_when_company,
        )
}

/// Read a login or verification reply.
pub fn parse_auth_response(body: Value) -> Result<LoginOutcome, ApiError> {
    let needs_code = ["requires_2fa", "requires2FA", "requiere2fa"]
        .iter()
        .any(|key| body.get(*key).and_then(Value::as_bool).unwrap_or(false));

    if needs_code {
        let challenge = ["temp_token", "challenge", "userId"]
            .iter()
            .find_map(|key| match body.get(*key)? {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| ApiError::malformed("two-factor reply without a challenge"))?;
        return Ok(LoginOutcome::TwoFactor { challenge });
    }

    let user = body
        .get("user")
        .or_else(|| body.get("usuario"))
        .cloned()
        .ok_or_else(|| ApiError::malformed("login reply without a user"))?;
    let user: User = serde_json::from_value(user).map_err(|e| ApiError::malformed(e.to_string()))?;
    Ok(LoginOutcome::Authenticated(user.to_session()))
}

pub async fn login<B: Backend>(
    backend: &B,
    form: &mut FormController,
) -> Result<LoginOutcome, FormError> {
    let body = form
        .submit(
            backend,
            |v| {
                ApiRequest::post(
                    endpoints::LOGIN,
                    json!({
                        "correo": v.get("correo").map(|s| s.trim()).unwrap_or(""),
                        "contrasena": v.get("contrasena").map(String::as_str).unwrap_or(""),
                    }),
                )
            },
            "Signed in",
        )
        .await?;
    Ok(parse_auth_response(body)?)
}

pub async fn verify_2fa<B: Backend>(
    backend: &B,
    challenge: &str,
    code: &str,
) -> Result<Session, ApiError> {
    let code = code.trim();
    if !CODE_REGEX.is_match(code) {
        return Err(ApiError::precondition("The verification code has 6 digits."));
    }
    let body = backend
        .post(endpoints::VERIFY_2FA, &json!({"challenge": challenge, "codigo": code}))
        .await?;
    match parse_auth_response(body)? {
        LoginOutcome::Authenticated(session) => Ok(session),
        LoginOutcome::TwoFactor { .. } => {
            Err(ApiError::malformed("verification asked for another code"))
        }
    }
}

pub fn register_payload(values: &Values) -> Value {
    let text = |key: &str| values.get(key).map(|s| s.trim()).unwrap_or("").to_string();
    let role = Role::parse(&text("tipoUsuario")).unwrap_or(Role::Candidate);

    let mut body = json!({
        "nombre": text("nombre"),
        "apellido": text("apellido"),
        "correo": text("correo"),
        "contrasena": values.get("contrasena").cloned().unwrap_or_default(),
        "telefono": text("telefono"),
        "rol": role.backend_name(),
    });
    if role == Role::Company {
        body["nombreEmpresa"] = Value::from(text("empresa"));
    }
    body
}

/// Create the account; returns the new user id when the backend reports it.
pub async fn register<B: Backend>(
    backend: &B,
    form: &mut FormController,
) -> Result<Option<i64>, FormError> {
    let body = form
        .submit(
            backend,
            |v| ApiRequest::post(endpoints::REGISTER, register_payload(v)),
            "Account created. You can sign in now.",
        )
        .await?;
    Ok(["id", "userId"].iter().find_map(|key| body.get(*key)?.as_i64()))
}

/// Persist the session and go home.
pub fn sign_in(
    sessions: &mut SessionStore,
    router: &mut Router,
    session: Session,
) -> Result<(), StoreError> {
    info!(user_id = session.user_id, role = session.role.as_str(), "signed in");
    sessions.set_session(session)?;
    router.on_login();
    Ok(())
}

pub fn sign_out(sessions: &mut SessionStore, router: &mut Router) -> Result<(), StoreError> {
    sessions.clear_session()?;
    router.on_logout();
    info!("signed out");
    Ok(())
}
