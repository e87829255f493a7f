//! Back-office listings, aggregates and deletes.

use serde_json::Value;

use crate::api::{endpoints, Backend};
use crate::confirm::{delete_confirmed, Confirmation};
use crate::error::ApiError;
use crate::filter::{contains_ci, FilterSet, Rule};
use crate::models::{AdminStats, Role, User};

fn user_search(user: &User, value: &str) -> bool {
    contains_ci(&user.display_name(), value)
        || user.email.as_deref().is_some_and(|e| contains_ci(e, value))
        || user.username.as_deref().is_some_and(|u| contains_ci(u, value))
}

/// Accepts any role spelling `Role::parse` knows.
fn user_role(user: &User, value: &str) -> bool {
    Role::parse(value) == Some(user.role)
}

fn user_status(user: &User) -> Option<&str> {
    user.status.as_deref()
}

pub fn user_filters() -> FilterSet<User> {
    FilterSet::new()
        .with("search", Rule::Custom(user_search))
        .with("role", Rule::Custom(user_role))
        .with("status", Rule::Equals(user_status))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub candidates: usize,
    pub companies: usize,
    pub admins: usize,
    pub active: usize,
}

impl UserCounts {
    pub fn from_users<'a>(users: impl IntoIterator<Item = &'a User>) -> Self {
        users.into_iter().fold(Self::default(), |mut counts, user| {
            match user.role {
                Role::Candidate => counts.candidates += 1,
                Role::Company => counts.companies += 1,
                Role::Admin => counts.admins += 1,
            }
            if user
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("activo"))
            {
                counts.active += 1;
            }
            counts
        })
    }
}

pub async fn fetch_stats<B: Backend>(backend: &B) -> Result<AdminStats, ApiError> {
    let body = backend.get(endpoints::ADMIN_STATS).await?;
    serde_json::from_value(body).map_err(|e| ApiError::malformed(e.to_string()))
}

/// Anything the back office can delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminTarget {
    User,
    Candidate,
    Company,
    Job,
    Application,
}

impl AdminTarget {
    pub fn parse(s: &str) -> Option<AdminTarget> {
        match s.trim().to_lowercase().as_str() {
            "user" | "usuario" => Some(AdminTarget::User),
            "candidate" | "candidato" => Some(AdminTarget::Candidate),
            "company" | "empresa" => Some(AdminTarget::Company),
            "job" | "vacante" => Some(AdminTarget::Job),
            "application" | "postulacion" => Some(AdminTarget::Application),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AdminTarget::User => "user",
            AdminTarget::Candidate => "candidate",
            AdminTarget::Company => "company",
            AdminTarget::Job => "vacancy",
            AdminTarget::Application => "application",
        }
    }

    pub fn path(&self, id: i64) -> String {
        match self {
            AdminTarget::User => endpoints::admin_user(id),
            AdminTarget::Candidate => endpoints::admin_candidate(id),
            AdminTarget::Company => endpoints::admin_company(id),
            AdminTarget::Job => endpoints::admin_job(id),
            AdminTarget::Application => endpoints::admin_application(id),
        }
    }

    /// Listing path, if the target has one of its own.
    pub fn list_path(&self) -> Option<&'static str> {
        match self {
            AdminTarget::User => Some(endpoints::ADMIN_USERS),
            AdminTarget::Candidate => Some(endpoints::ADMIN_CANDIDATES),
            AdminTarget::Company => Some(endpoints::ADMIN_COMPANIES),
            AdminTarget::Job => Some(endpoints::ADMIN_JOBS),
            AdminTarget::Application => None,
        }
    }
}

pub async fn delete<B: Backend>(
    backend: &B,
    target: AdminTarget,
    id: i64,
    confirmation: Confirmation,
) -> Result<Value, ApiError> {
    delete_confirmed(backend, &target.path(id), confirmation).await
}
