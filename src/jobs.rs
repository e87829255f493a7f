//! Vacancy listings, the vacancy form and the saved-jobs view.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::api::{endpoints, ApiRequest, Backend};
use crate::confirm::{delete_confirmed, Confirmation};
use crate::error::ApiError;
use crate::filter::{contains_ci, equals_ci, Field, FilterSet, Rule};
use crate::form::{
    all_values_to_json, parse_date, values_to_json, FieldSpec, RuleKind, Schema, Values,
};
use crate::models::{fold, JobPosting, JobStatus};

pub const CONTRACT_TYPES: [&str; 4] = ["Tiempo Completo", "Medio Tiempo", "Freelance", "Prácticas"];

fn title(job: &JobPosting) -> Option<&str> {
    Some(&job.title)
}

fn company(job: &JobPosting) -> Option<&str> {
    job.company_name.as_deref()
}

fn description(job: &JobPosting) -> Option<&str> {
    job.description.as_deref()
}

fn contract_type(job: &JobPosting) -> Option<&str> {
    job.contract_type.as_deref()
}

fn experience(job: &JobPosting) -> Option<&str> {
    job.experience.as_deref()
}

/// Any spelling `JobStatus::parse` knows: "pausado", "activo", "closed".
fn status(job: &JobPosting, value: &str) -> bool {
    JobStatus::parse(value) == Some(job.status)
}

/// Presencial is anything not flagged remote; a hybrid posting counts as
/// both Presencial and Híbrido.
fn modality(job: &JobPosting, value: &str) -> bool {
    match fold(value).as_str() {
        "remoto" | "remote" => job.remote,
        "presencial" | "onsite" | "on-site" => !job.remote,
        "hibrido" | "hybrid" => job.hybrid,
        _ => false,
    }
}

/// "Remoto" also matches postings flagged remote whatever their city.
fn location_or_remote(job: &JobPosting, value: &str) -> bool {
    let by_text = job
        .location
        .as_deref()
        .is_some_and(|location| contains_ci(location, value));
    let remote_query = equals_ci(value, "remoto") || equals_ci(value, "remote");
    by_text || (remote_query && job.remote)
}

/// Public listing: search, contract type, location, experience band,
/// modality.
pub fn public_filters() -> FilterSet<JobPosting> {
    FilterSet::new()
        .with(
            "search",
            Rule::Search(vec![title as Field<JobPosting>, company, description]),
        )
        .with("type", Rule::Equals(contract_type))
        .with("location", Rule::Custom(location_or_remote))
        .with("experience", Rule::Equals(experience))
        .with("modality", Rule::Custom(modality))
}

/// Back-office listing: search, status, type, location.
pub fn admin_filters() -> FilterSet<JobPosting> {
    FilterSet::new()
        .with("search", Rule::Search(vec![title as Field<JobPosting>, company]))
        .with("status", Rule::Custom(status))
        .with("type", Rule::Equals(contract_type))
        .with("location", Rule::Custom(location_or_remote))
}

/// Saved ids resolved against a loaded listing, in listing order. Ids with
/// no matching job are skipped.
pub fn saved_view<'a>(jobs: &'a [JobPosting], saved: &BTreeSet<i64>) -> Vec<&'a JobPosting> {
    jobs.iter().filter(|job| saved.contains(&job.id)).collect()
}

/// Who owns the vacancy form: one company, or the admin acting for any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobScope {
    Company(i64),
    Admin,
}

impl JobScope {
    pub fn list_path(&self) -> String {
        match self {
            JobScope::Company(id) => endpoints::company_jobs(*id),
            JobScope::Admin => endpoints::ADMIN_JOBS.to_string(),
        }
    }

    pub fn item_path(&self, job_id: i64) -> String {
        match self {
            JobScope::Company(id) => endpoints::company_job(*id, job_id),
            JobScope::Admin => endpoints::admin_job(job_id),
        }
    }
}

fn salary_range_ok(values: &Values) -> bool {
    let amount = |key: &str| values.get(key).and_then(|v| v.trim().parse::<f64>().ok());
    match (amount("salarioMin"), amount("salarioMax")) {
        (Some(min), Some(max)) => min <= max,
        _ => true,
    }
}

fn close_after_publish(values: &Values) -> bool {
    let date = |key: &str| values.get(key).and_then(|v| parse_date(v));
    match (date("fechaPublicacion"), date("fechaCierre")) {
        (Some(published), Some(closes)) => closes > published,
        _ => true,
    }
}

pub fn job_schema(scope: JobScope) -> Schema {
    let mut schema = Schema::new();

    if scope == JobScope::Admin {
        schema = schema
            .field(FieldSpec::new("empresaId").required("Select the company that owns this vacancy"))
            .relax_on_edit(
                "empresaId",
                RuleKind::Required,
                "a vacancy cannot move to another company",
            );
    }

    schema
        .field(
            FieldSpec::new("titulo")
                .required("Title is required")
                .max_chars(100, "Title cannot exceed 100 characters"),
        )
        .field(
            FieldSpec::new("descripcion")
                .required("Description is required")
                .min_chars(50, "Description must be at least 50 characters")
                .max_chars(2000, "Description cannot exceed 2000 characters"),
        )
        .field(
            FieldSpec::new("requisitos")
                .required("Requirements are required")
                .max_chars(2000, "Requirements cannot exceed 2000 characters"),
        )
        .field(
            FieldSpec::new("ubicacion")
                .required("Location is required")
                .max_chars(100, "Location cannot exceed 100 characters"),
        )
        .field(
            FieldSpec::new("tipoContrato")
                .initial(CONTRACT_TYPES[0])
                .required("Contract type is required"),
        )
        .field(FieldSpec::new("salario").number("Salary must be a number"))
        .field(FieldSpec::new("salarioMin").number("Minimum salary must be a number"))
        .field(FieldSpec::new("salarioMax").number("Maximum salary must be a number"))
        .field(FieldSpec::new("fechaPublicacion"))
        .field(FieldSpec::new("fechaCierre").not_in_past("Closing date cannot be in the past"))
        .field(FieldSpec::new("estado").initial("Abierta"))
        .cross(
            "salarioMax",
            "Maximum salary must be greater than or equal to the minimum",
            salary_range_ok,
        )
        .cross(
            "fechaCierre",
            "Closing date must be after the publication date",
            close_after_publish,
        )
}

/// Create body: numbers as numbers, dates as `YYYY-MM-DD`, blanks left out.
pub fn job_payload(values: &Values) -> Value {
    typed_job_body(values_to_json(values))
}

/// Update body: like `job_payload`, but every field is sent and a cleared
/// number or date goes out as `null`.
pub fn job_update_payload(values: &Values) -> Value {
    typed_job_body(all_values_to_json(values))
}

fn typed_job_body(body: Value) -> Value {
    let Value::Object(mut body) = body else {
        return Value::Object(Map::new());
    };

    let blank = |v: &Value| v.as_str().is_some_and(str::is_empty);
    for key in ["salario", "salarioMin", "salarioMax"] {
        match body.get(key) {
            Some(v) if blank(v) => {
                body.insert(key.to_string(), Value::Null);
            }
            Some(v) => {
                if let Some(n) = v.as_str().and_then(|s| s.parse::<f64>().ok()) {
                    body.insert(key.to_string(), Value::from(n));
                }
            }
            None => {}
        }
    }
    if let Some(id) = body.get("empresaId").and_then(Value::as_str).and_then(|s| s.parse::<i64>().ok()) {
        body.insert("empresaId".to_string(), Value::from(id));
    }
    for key in ["fechaPublicacion", "fechaCierre"] {
        match body.get(key) {
            Some(v) if blank(v) => {
                body.insert(key.to_string(), Value::Null);
            }
            Some(v) => {
                if let Some(date) = v.as_str().and_then(parse_date) {
                    body.insert(key.to_string(), Value::from(date.format("%Y-%m-%d").to_string()));
                }
            }
            None => {}
        }
    }

    Value::Object(body)
}

/// POST for a new vacancy, PUT when `editing` names an existing one.
pub fn save_request(scope: JobScope, editing: Option<i64>, values: &Values) -> ApiRequest {
    match editing {
        Some(job_id) => ApiRequest::put(scope.item_path(job_id), job_update_payload(values)),
        None => ApiRequest::post(scope.list_path(), job_payload(values)),
    }
}

pub async fn fetch_job<B: Backend>(backend: &B, job_id: i64) -> Result<JobPosting, ApiError> {
    let body = backend.get(&format!("{}/{}", endpoints::JOBS, job_id)).await?;
    serde_json::from_value(body).map_err(|e| ApiError::malformed(e.to_string()))
}

pub async fn delete_job<B: Backend>(
    backend: &B,
    scope: JobScope,
    job_id: i64,
    confirmation: Confirmation,
) -> Result<Value, ApiError> {
    delete_confirmed(backend, &scope.item_path(job_id), confirmation).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::form::FormController;
    use crate::list::{EntityList, ListOptions};
    use crate::testing::MockBackend;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const LONG_DESCRIPTION: &str =
        "Buscamos una persona con experiencia en sistemas distribuidos y Rust.";

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
    }

    fn listing() -> Value {
        json!([
            {"id": 1, "titulo": "Backend Rust", "empresa": "Ferris", "ubicacion": "Remoto", "estado": "Abierta", "tipoContrato": "Tiempo Completo"},
            {"id": 2, "titulo": "Frontend", "empresa": "Web MX", "ubicacion": "Guadalajara", "estado": "Abierta", "tipoContrato": "Medio Tiempo"},
            {"id": 3, "titulo": "QA", "empresa": "Testers", "ubicacion": "remoto (LATAM)", "estado": "Pausada"},
            {"id": 4, "titulo": "Data", "empresa": "Datos SA", "estado": "Abierta"},
            {"id": 5, "titulo": "DevOps", "empresa": "Nube", "ubicacion": "Monterrey", "estado": "Cerrada", "tipoContrato": "Freelance"}
        ])
    }

    async fn loaded(filters: FilterSet<JobPosting>) -> EntityList<JobPosting> {
        let backend = MockBackend::new();
        backend.respond(listing());
        let mut jobs = EntityList::new(filters);
        jobs.load(&backend, endpoints::JOBS, ListOptions::default()).await;
        jobs
    }

    fn ids(jobs: &EntityList<JobPosting>) -> Vec<i64> {
        jobs.view().iter().map(|j| j.id).collect()
    }

    #[tokio::test]
    async fn test_location_remoto_scenario() {
        let mut jobs = loaded(public_filters()).await;
        assert_eq!(jobs.total(), 5);

        jobs.set_filter("location", "Remoto").unwrap();
        assert_eq!(ids(&jobs), vec![1, 3]);
        assert_eq!(jobs.count(), 2);
    }

    #[tokio::test]
    async fn test_remote_flag_matches_remoto() {
        let backend = MockBackend::new();
        backend.respond(json!([
            {"id": 1, "titulo": "A", "ubicacion": "CDMX", "remoto": true, "estado": "Abierta"},
            {"id": 2, "titulo": "B", "ubicacion": "CDMX", "estado": "Abierta"}
        ]));
        let mut jobs = EntityList::new(public_filters());
        jobs.load(&backend, endpoints::JOBS, ListOptions::default()).await;

        jobs.set_filter("location", "remoto").unwrap();
        assert_eq!(ids(&jobs), vec![1]);
        jobs.set_filter("location", "cdmx").unwrap();
        assert_eq!(ids(&jobs), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_public_search_spans_title_company_description() {
        let mut jobs = loaded(public_filters()).await;
        jobs.set_filter("search", "ferris").unwrap();
        assert_eq!(ids(&jobs), vec![1]);
        jobs.set_filter("type", "tiempo completo").unwrap();
        assert_eq!(ids(&jobs), vec![1]);
        jobs.set_filter("type", "Freelance").unwrap();
        assert!(ids(&jobs).is_empty());
    }

    #[tokio::test]
    async fn test_admin_status_filter() {
        let mut jobs = loaded(admin_filters()).await;
        jobs.set_filter("status", "abierta").unwrap();
        assert_eq!(ids(&jobs), vec![1, 2, 4]);
        jobs.set_filter("status", "all").unwrap();
        assert_eq!(jobs.count(), 5);
    }

    #[tokio::test]
    async fn test_admin_status_filter_accepts_back_office_spellings() {
        let mut jobs = loaded(admin_filters()).await;
        jobs.set_filter("status", "pausado").unwrap();
        assert_eq!(ids(&jobs), vec![3]);
        jobs.set_filter("status", "activo").unwrap();
        assert_eq!(ids(&jobs), vec![1, 2, 4]);
        jobs.set_filter("status", "Closed").unwrap();
        assert_eq!(ids(&jobs), vec![5]);
        jobs.set_filter("status", "borrador").unwrap();
        assert!(ids(&jobs).is_empty());
    }

    #[tokio::test]
    async fn test_modality_and_experience_filters() {
        let backend = MockBackend::new();
        backend.respond(json!([
            {"id": 1, "titulo": "A", "estado": "Abierta", "remoto": true, "experiencia": "1-2 años"},
            {"id": 2, "titulo": "B", "estado": "Abierta", "hibrido": true, "experiencia": "3-5 años"},
            {"id": 3, "titulo": "C", "estado": "Abierta", "experiencia": "1-2 años"}
        ]));
        let mut jobs = EntityList::new(public_filters());
        jobs.load(&backend, endpoints::JOBS, ListOptions::default()).await;

        jobs.set_filter("modality", "Presencial").unwrap();
        assert_eq!(ids(&jobs), vec![2, 3]);
        jobs.set_filter("modality", "Remoto").unwrap();
        assert_eq!(ids(&jobs), vec![1]);
        jobs.set_filter("modality", "hibrido").unwrap();
        assert_eq!(ids(&jobs), vec![2]);
        jobs.set_filter("modality", "Todas").unwrap();
        assert_eq!(jobs.count(), 3);

        jobs.set_filter("experience", "1-2 AÑOS").unwrap();
        assert_eq!(ids(&jobs), vec![1, 3]);
        jobs.set_filter("modality", "presencial").unwrap();
        assert_eq!(ids(&jobs), vec![3]);
    }

    #[test]
    fn test_saved_view_skips_unknown_ids() {
        let jobs: Vec<JobPosting> = serde_json::from_value(listing()).unwrap();
        let saved = BTreeSet::from([5, 2, 99]);
        let got: Vec<i64> = saved_view(&jobs, &saved).iter().map(|j| j.id).collect();
        assert_eq!(got, vec![2, 5]);
    }

    fn filled(scope: JobScope) -> FormController {
        let mut form = FormController::new(job_schema(scope));
        form.set_field("titulo", "Backend Rust");
        form.set_field("descripcion", LONG_DESCRIPTION);
        form.set_field("requisitos", "Rust, SQL");
        form.set_field("ubicacion", "Remoto");
        form
    }

    #[test]
    fn test_job_form_rules() {
        let mut form = filled(JobScope::Company(4));
        assert!(form.validate_on(today()).is_empty());

        form.set_field("descripcion", "Corta");
        form.set_field("salario", "mucho");
        form.set_field("salarioMin", "30000");
        form.set_field("salarioMax", "20000");
        form.set_field("fechaPublicacion", "2026-02-01");
        form.set_field("fechaCierre", "2026-01-20");

        let errors = form.validate_on(today());
        assert_eq!(
            errors.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["descripcion", "fechaCierre", "salario", "salarioMax"]
        );
        assert_eq!(errors["fechaCierre"], "Closing date must be after the publication date");

        form.set_field("fechaCierre", "2026-01-10");
        assert_eq!(form.validate_on(today())["fechaCierre"], "Closing date cannot be in the past");
    }

    #[test]
    fn test_title_capped_at_100_chars() {
        let mut form = filled(JobScope::Company(4));
        form.set_field("titulo", "x".repeat(150));
        assert_eq!(form.value("titulo").len(), 100);
    }

    #[test]
    fn test_company_selector_required_on_create_only() {
        let mut form = filled(JobScope::Admin);
        assert!(form.validate_on(today()).contains_key("empresaId"));

        let job: JobPosting = serde_json::from_value(json!({
            "id": 8, "titulo": "Backend Rust", "descripcion": LONG_DESCRIPTION,
            "requisitos": "Rust", "ubicacion": "Remoto", "tipoContrato": "Freelance",
            "estado": "Pausada", "salario": 25000
        }))
        .unwrap();
        form.load_entity(&job).unwrap();
        assert_eq!(form.value("salario"), "25000.0");
        assert_eq!(form.value("estado"), "Pausada");
        assert!(form.validate_on(today()).is_empty());

        // Every other rule still applies on edit.
        form.set_field("titulo", "");
        assert!(form.validate_on(today()).contains_key("titulo"));
    }

    #[test]
    fn test_payload_types_and_paths() {
        let mut form = filled(JobScope::Admin);
        form.set_field("empresaId", "4");
        form.set_field("salario", "25000");
        form.set_field("fechaCierre", "2099-05-01T00:00:00");

        let request = save_request(JobScope::Admin, None, form.values());
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.path, "/admin/vacantes");
        let body = request.body.unwrap();
        assert_eq!(body["empresaId"], json!(4));
        assert_eq!(body["salario"], json!(25000.0));
        assert_eq!(body["fechaCierre"], json!("2099-05-01"));
        assert_eq!(body["tipoContrato"], json!("Tiempo Completo"));
        assert!(body.get("salarioMin").is_none());

        let request = save_request(JobScope::Company(4), Some(42), form.values());
        assert_eq!(request.method, Method::PUT);
        assert_eq!(request.path, "/empresa/4/vacantes/42");
        let body = request.body.unwrap();
        assert_eq!(body["salarioMin"], Value::Null);
        assert_eq!(body["fechaPublicacion"], Value::Null);
        assert_eq!(body["salario"], json!(25000.0));
    }

    #[tokio::test]
    async fn test_create_through_form_then_refresh() {
        let backend = MockBackend::new();
        backend.respond(json!({"id": 11}));
        backend.respond(json!([{"id": 11, "titulo": "Backend Rust", "estado": "Abierta"}]));

        let scope = JobScope::Company(4);
        let mut form = filled(scope);
        let mut jobs = EntityList::new(public_filters());

        form.submit(&backend, |v| save_request(scope, None, v), "Vacancy created")
            .await
            .unwrap();
        jobs.load(&backend, &scope.list_path(), ListOptions::default()).await;

        assert_eq!(jobs.total(), 1);
        let calls = backend.calls();
        assert_eq!(calls[0].path, "/empresa/4/vacantes");
        assert_eq!(calls[1].method, Method::GET);
        assert_eq!(form.value("titulo"), "");
    }

    #[tokio::test]
    async fn test_delete_job_hits_scoped_path() {
        let backend = MockBackend::new();
        let token = Confirmation::ask("Delete vacancy 42?", |_| true).unwrap();
        delete_job(&backend, JobScope::Company(4), 42, token).await.unwrap();
        assert_eq!(backend.calls()[0].path, "/empresa/4/vacantes/42");
    }
}
