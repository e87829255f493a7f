//! Applying to vacancies and moving applications through their statuses.

use futures::future::join_all;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::api::{endpoints, Backend};
use crate::confirm::{delete_confirmed, Confirmation};
use crate::error::{ApiError, BulkError};
use crate::filter::{Field, FilterSet, Rule};
use crate::list::EntityList;
use crate::models::{Application, ApplicationStatus, CandidateProfile, Role, Session};

/// Matches any spelling `ApplicationStatus::parse` accepts.
fn status(app: &Application, value: &str) -> bool {
    ApplicationStatus::parse(value) == Some(app.status)
}

fn job_title(app: &Application) -> Option<&str> {
    app.job_title()
}

fn company_name(app: &Application) -> Option<&str> {
    app.company_name()
}

fn job_location(app: &Application) -> Option<&str> {
    app.job_location()
}

/// What a company sees for its vacancies.
pub fn company_filters() -> FilterSet<Application> {
    FilterSet::new().with("status", Rule::Custom(status))
}

/// What a candidate sees for their own applications.
pub fn candidate_filters() -> FilterSet<Application> {
    FilterSet::new()
        .with("status", Rule::Custom(status))
        .with(
            "search",
            Rule::Search(vec![job_title as Field<Application>, company_name, job_location]),
        )
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplicationStats {
    pub total: usize,
    pub pending: usize,
    pub in_review: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl ApplicationStats {
    pub fn from_items(items: &[Application]) -> Self {
        items.iter().fold(Self::default(), |mut stats, app| {
            stats.total += 1;
            match app.status {
                ApplicationStatus::Pending => stats.pending += 1,
                ApplicationStatus::InReview => stats.in_review += 1,
                ApplicationStatus::Accepted => stats.accepted += 1,
                ApplicationStatus::Rejected => stats.rejected += 1,
            }
            stats
        })
    }

    pub fn count(&self, status: ApplicationStatus) -> usize {
        match status {
            ApplicationStatus::Pending => self.pending,
            ApplicationStatus::InReview => self.in_review,
            ApplicationStatus::Accepted => self.accepted,
            ApplicationStatus::Rejected => self.rejected,
        }
    }
}

/// Apply the signed-in candidate to `job_id`.
///
/// Checked before the application is sent: a session exists, it belongs to
/// a candidate, and the candidate profile has every field an application
/// needs. Failing any of these yields `PreconditionFailed` and no POST.
pub async fn apply_to_job<B: Backend>(
    backend: &B,
    session: Option<&Session>,
    job_id: i64,
) -> Result<Value, ApiError> {
    let Some(session) = session else {
        return Err(ApiError::precondition("You must sign in to apply."));
    };
    if session.role != Role::Candidate {
        return Err(ApiError::precondition("Only candidates can apply to vacancies."));
    }

    let body = backend.get(&endpoints::candidate_profile(session.user_id)).await?;
    let profile: CandidateProfile =
        serde_json::from_value(body).map_err(|e| ApiError::malformed(e.to_string()))?;

    let missing = profile.missing_for_application();
    if !missing.is_empty() {
        return Err(ApiError::precondition(format!(
            "Complete your profile before applying. Missing: {}.",
            missing.join(", ")
        )));
    }

    info!(user_id = session.user_id, job_id, "applying to vacancy");
    backend
        .post(
            endpoints::APPLICATIONS,
            &json!({"candidatoId": session.user_id, "vacanteId": job_id}),
        )
        .await
}

pub async fn update_status<B: Backend>(
    backend: &B,
    application_id: i64,
    status: ApplicationStatus,
) -> Result<Value, ApiError> {
    backend
        .put(
            &endpoints::application(application_id),
            &json!({"estado": status.label()}),
        )
        .await
}

/// Move every id in `ids` to `status` with one concurrent request each and
/// wait for all of them. Succeeded rows are patched in `list`; failures are
/// aggregated and nothing is rolled back. Returns the number updated.
pub async fn bulk_update_status<B: Backend>(
    backend: &B,
    list: &mut EntityList<Application>,
    ids: &[i64],
    status: ApplicationStatus,
) -> Result<usize, BulkError> {
    let results = join_all(ids.iter().map(|&id| async move {
        (id, update_status(backend, id, status).await)
    }))
    .await;

    let mut succeeded = Vec::new();
    let mut failures = Vec::new();
    for (id, result) in results {
        match result {
            Ok(_) => succeeded.push(id),
            Err(e) => failures.push((id, e)),
        }
    }

    list.update_where(|app| succeeded.contains(&app.id), |app| app.status = status);

    if failures.is_empty() {
        info!(count = succeeded.len(), status = status.label(), "bulk status update");
        Ok(succeeded.len())
    } else {
        let err = BulkError {
            succeeded: succeeded.len(),
            failures,
        };
        warn!(error = %err, "bulk status update partially failed");
        Err(err)
    }
}

pub async fn delete_application<B: Backend>(
    backend: &B,
    application_id: i64,
    confirmation: Confirmation,
) -> Result<Value, ApiError> {
    delete_confirmed(backend, &endpoints::admin_application(application_id), confirmation).await
}
