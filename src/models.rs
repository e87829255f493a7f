use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

/// Lowercased, trimmed and stripped of Spanish accents, so "En Revisión"
/// and "en revision" compare equal.
pub fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            c => c,
        })
        .collect()
}

/// Backend enums arrive in whatever case and accent the writing screen
/// used; read them through the lenient `parse` instead of exact names.
macro_rules! deserialize_via_parse {
    ($ty:ty, $what:literal) => {
        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                <$ty>::parse(&raw)
                    .ok_or_else(|| de::Error::custom(format!("unknown {} '{}'", $what, raw)))
            }
        }
    };
}

deserialize_via_parse!(Role, "role");
deserialize_via_parse!(JobStatus, "job status");
deserialize_via_parse!(ApplicationStatus, "application status");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Candidate,
    Company,
    Admin,
}

impl Role {
    /// Frontend, backend and legacy spellings, any case.
    pub fn parse(s: &str) -> Option<Role> {
        match fold(s).as_str() {
            "candidate" | "candidato" | "user" => Some(Role::Candidate),
            "company" | "empresa" | "recruiter" => Some(Role::Company),
            "admin" | "administrador" | "administrator" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Candidate => "candidate",
            Role::Company => "company",
            Role::Admin => "admin",
        }
    }

    /// Role name as the backend stores it.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Role::Candidate => "CANDIDATO",
            Role::Company => "EMPRESA",
            Role::Admin => "ADMINISTRADOR",
        }
    }

    /// Folder uploaded images are served from.
    pub fn asset_folder(&self) -> &'static str {
        match self {
            Role::Candidate => "candidato",
            Role::Company => "empresa",
            Role::Admin => "administrador",
        }
    }

    pub fn default_image(&self) -> &'static str {
        match self {
            Role::Candidate => "user_default.svg",
            Role::Company => "company_default.svg",
            Role::Admin => "admin_default.svg",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: i64,
    pub display_name: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    #[serde(rename = "Abierta")]
    Open,
    #[serde(rename = "Pausada")]
    Paused,
    #[serde(rename = "Cerrada")]
    Closed,
}

impl JobStatus {
    /// Either gender, the back office's "activo", or the English name.
    pub fn parse(s: &str) -> Option<JobStatus> {
        match fold(s).as_str() {
            "abierta" | "abierto" | "activa" | "activo" | "open" | "active" => Some(JobStatus::Open),
            "pausada" | "pausado" | "paused" => Some(JobStatus::Paused),
            "cerrada" | "cerrado" | "closed" => Some(JobStatus::Closed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            JobStatus::Open => "Abierta",
            JobStatus::Paused => "Pausada",
            JobStatus::Closed => "Cerrada",
        }
    }
}

/// A vacancy as the backend serves it. Text fields the backend may omit are
/// optional so a sparse row still deserializes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: i64,
    #[serde(rename = "titulo", default)]
    pub title: String,
    #[serde(rename = "empresa", alias = "nombreEmpresa", default)]
    pub company_name: Option<String>,
    #[serde(rename = "empresaId", default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<i64>,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "requisitos", default)]
    pub requirements: Option<String>,
    #[serde(rename = "salario", default)]
    pub salary: Option<f64>,
    #[serde(rename = "ubicacion", default)]
    pub location: Option<String>,
    #[serde(rename = "tipoContrato", alias = "tipoEmpleo", default)]
    pub contract_type: Option<String>,
    #[serde(rename = "estado")]
    pub status: JobStatus,
    #[serde(rename = "fechaPublicacion", default)]
    pub published_at: Option<String>,
    #[serde(rename = "fechaCierre", default)]
    pub closes_at: Option<String>,
    #[serde(rename = "cantidadPostulaciones", default)]
    pub application_count: i64,
    #[serde(rename = "eliminada", default)]
    pub deleted: bool,
    #[serde(rename = "remoto", alias = "remote", default)]
    pub remote: bool,
    #[serde(rename = "hibrido", alias = "hybrid", default)]
    pub hybrid: bool,
    /// Experience band, e.g. "1-2 años".
    #[serde(rename = "experiencia", alias = "experience", default)]
    pub experience: Option<String>,
    #[serde(rename = "destacada", default)]
    pub featured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ApplicationStatus {
    #[serde(rename = "Pendiente")]
    Pending,
    #[serde(rename = "En revisión")]
    InReview,
    #[serde(rename = "Aceptado")]
    Accepted,
    #[serde(rename = "Rechazado")]
    Rejected,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 4] = [
        ApplicationStatus::Pending,
        ApplicationStatus::InReview,
        ApplicationStatus::Accepted,
        ApplicationStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pendiente",
            ApplicationStatus::InReview => "En revisión",
            ApplicationStatus::Accepted => "Aceptado",
            ApplicationStatus::Rejected => "Rechazado",
        }
    }

    /// Any case, with or without accents; English names too.
    pub fn parse(s: &str) -> Option<ApplicationStatus> {
        match fold(s).as_str() {
            "pendiente" | "pending" => Some(ApplicationStatus::Pending),
            "en revision" | "revision" | "in review" | "inreview" => {
                Some(ApplicationStatus::InReview)
            }
            "aceptado" | "aceptada" | "accepted" => Some(ApplicationStatus::Accepted),
            "rechazado" | "rechazada" | "rejected" => Some(ApplicationStatus::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    #[serde(rename = "titulo", default)]
    pub title: Option<String>,
    #[serde(rename = "ubicacion", default)]
    pub location: Option<String>,
    #[serde(rename = "salario", default)]
    pub salary: Option<f64>,
    #[serde(rename = "tipoEmpleo", alias = "tipoContrato", default)]
    pub contract_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    #[serde(rename = "nombreUsuario", default)]
    pub username: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "rutaImagen", default)]
    pub image: Option<String>,
}

/// A candidate's application against a vacancy (postulación).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: i64,
    #[serde(rename = "candidatoId", alias = "userId", default)]
    pub candidate_id: Option<i64>,
    #[serde(rename = "vacanteId", default)]
    pub job_id: Option<i64>,
    #[serde(rename = "estado")]
    pub status: ApplicationStatus,
    #[serde(rename = "fechaPostulacion", default)]
    pub applied_at: Option<String>,
    #[serde(rename = "vacante", default)]
    pub job: Option<JobSummary>,
    #[serde(rename = "empresa", default)]
    pub company: Option<CompanySummary>,
    #[serde(rename = "candidato", default)]
    pub candidate: Option<CandidateSummary>,
}

impl Application {
    pub fn job_title(&self) -> Option<&str> {
        self.job.as_ref()?.title.as_deref()
    }

    pub fn job_location(&self) -> Option<&str> {
        self.job.as_ref()?.location.as_deref()
    }

    pub fn company_name(&self) -> Option<&str> {
        self.company.as_ref()?.name.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "educacion", default)]
    pub education: Option<String>,
    #[serde(rename = "experiencia", default)]
    pub experience: Option<String>,
    #[serde(default)]
    pub cv: Option<String>,
    #[serde(rename = "rutaImagen", default)]
    pub avatar_path: Option<String>,
}

impl CandidateProfile {
    /// Labels of the fields an application needs but this profile lacks.
    pub fn missing_for_application(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").is_empty();
        [
            (&self.phone, "phone"),
            (&self.address, "address"),
            (&self.cv, "CV"),
            (&self.education, "education"),
            (&self.experience, "work experience"),
        ]
        .into_iter()
        .filter(|(value, _)| blank(value))
        .map(|(_, label)| label)
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanyProfile {
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
    #[serde(rename = "nombre", default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rfc: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "direccion", default)]
    pub address: Option<String>,
    #[serde(rename = "telefono", default)]
    pub phone: Option<String>,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "sitioWeb", default)]
    pub website: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(rename = "tamanoEmpresa", default)]
    pub size: Option<String>,
    #[serde(rename = "anioFundacion", default)]
    pub founded: Option<i32>,
}

/// Account row as listed in the admin back office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(rename = "nombre", default)]
    pub first_name: Option<String>,
    #[serde(rename = "apellido", default)]
    pub last_name: Option<String>,
    #[serde(rename = "nombreUsuario", default)]
    pub username: Option<String>,
    #[serde(rename = "correo", default)]
    pub email: Option<String>,
    #[serde(rename = "rol")]
    pub role: Role,
    #[serde(rename = "estado", default)]
    pub status: Option<String>,
    #[serde(rename = "rutaImagen", default)]
    pub avatar_path: Option<String>,
}

impl User {
    /// Full name, then first name, then username, then a placeholder.
    pub fn display_name(&self) -> String {
        match (&self.first_name, &self.last_name, &self.username) {
            (Some(first), Some(last), _) if !first.is_empty() && !last.is_empty() => {
                format!("{} {}", first, last)
            }
            (Some(first), _, _) if !first.is_empty() => first.clone(),
            (_, _, Some(username)) if !username.is_empty() => username.clone(),
            _ => "User".to_string(),
        }
    }

    pub fn to_session(&self) -> Session {
        Session {
            user_id: self.id,
            display_name: self.display_name(),
            role: self.role,
            avatar_path: self.avatar_path.clone().filter(|p| !p.is_empty()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    #[serde(default)]
    pub total_usuarios: i64,
    #[serde(default)]
    pub total_candidatos: i64,
    #[serde(default)]
    pub total_empresas: i64,
    #[serde(default)]
    pub total_vacantes: i64,
    #[serde(default)]
    pub total_postulaciones: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_accepts_backend_and_legacy_names() {
        let roles: Vec<Role> =
            serde_json::from_value(json!(["CANDIDATO", "recruiter", "ADMINISTRADOR", "company"]))
                .unwrap();
        assert_eq!(roles, vec![Role::Candidate, Role::Company, Role::Admin, Role::Company]);
        assert_eq!(Role::parse("User"), Some(Role::Candidate));
        assert_eq!(Role::parse("guest"), None);
    }

    #[test]
    fn test_sparse_job_row_deserializes() {
        let job: JobPosting =
            serde_json::from_value(json!({"id": 3, "titulo": "QA", "estado": "Pausado"})).unwrap();
        assert_eq!(job.status, JobStatus::Paused);
        assert_eq!(job.location, None);
        assert!(!job.deleted);
        assert!(!job.featured);

        let job: JobPosting = serde_json::from_value(json!({
            "id": 4, "titulo": "UX", "estado": "Abierta",
            "destacada": true, "hibrido": true, "experiencia": "1-2 años"
        }))
        .unwrap();
        assert!(job.featured && job.hybrid && !job.remote);
        assert_eq!(job.experience.as_deref(), Some("1-2 años"));
    }

    #[test]
    fn test_application_status_parse() {
        assert_eq!(ApplicationStatus::parse("en revisión"), Some(ApplicationStatus::InReview));
        assert_eq!(ApplicationStatus::parse("accepted"), Some(ApplicationStatus::Accepted));
        assert_eq!(ApplicationStatus::parse("archivada"), None);
    }

    #[test]
    fn test_enum_wire_values_any_case_or_accent() {
        let statuses: Vec<ApplicationStatus> =
            serde_json::from_value(json!(["En Revisión", "EN REVISION", "pendiente", "Aceptado"]))
                .unwrap();
        assert_eq!(
            statuses,
            vec![
                ApplicationStatus::InReview,
                ApplicationStatus::InReview,
                ApplicationStatus::Pending,
                ApplicationStatus::Accepted
            ]
        );
        assert_eq!(json!(ApplicationStatus::InReview), json!("En revisión"));

        let jobs: Vec<JobStatus> =
            serde_json::from_value(json!(["activo", "Pausado", "CERRADA"])).unwrap();
        assert_eq!(jobs, vec![JobStatus::Open, JobStatus::Paused, JobStatus::Closed]);

        let role: Role = serde_json::from_value(json!("Administrador")).unwrap();
        assert_eq!(role, Role::Admin);
        assert!(serde_json::from_value::<ApplicationStatus>(json!("Archivada")).is_err());
    }

    #[test]
    fn test_missing_for_application() {
        let profile = CandidateProfile {
            phone: Some("5512345678".into()),
            address: Some("   ".into()),
            cv: Some("cv_1.pdf".into()),
            education: None,
            experience: Some("Dev en ACME - 2 años".into()),
            ..Default::default()
        };
        assert_eq!(profile.missing_for_application(), vec!["address", "education"]);
    }

    #[test]
    fn test_user_display_name_priority() {
        let mut user: User = serde_json::from_value(json!({
            "id": 1, "nombre": "Ana", "apellido": "López", "nombreUsuario": "ana", "rol": "CANDIDATO"
        }))
        .unwrap();
        assert_eq!(user.display_name(), "Ana López");
        user.last_name = None;
        assert_eq!(user.display_name(), "Ana");
        user.first_name = None;
        assert_eq!(user.display_name(), "ana");
        user.username = None;
        assert_eq!(user.display_name(), "User");
    }
}
