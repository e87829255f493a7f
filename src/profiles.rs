//! Candidate and company profiles: form rules, the composed single-string
//! fields the backend stores, and file uploads.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::info;

use crate::api::{endpoints, Backend};
use crate::detail::DetailView;
use crate::error::ApiError;
use crate::form::{all_values_to_json, FieldSpec, Schema, Values};
use crate::models::{CandidateProfile, CompanyProfile};

static RFC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[A-Z&Ñ]{3,4}[0-9]{6}[A-Z0-9]{3}$").unwrap());
static POSTAL_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[0-9]{5}$").unwrap());
static PHONE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^[0-9]{10}$").unwrap());
static WEBSITE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new("^https?://.+").unwrap());
static PHONE_SEPARATORS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s\-()]").unwrap());

static CP_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CP: (\d{5})").unwrap());
static EDUCATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?) en (.+?) - (.+?) \((\d{4})\)").unwrap());
static EXPERIENCE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?) en (.+?) - (.+?)(?:\s\((.+?)\))?(?:\. (.+))?$").unwrap()
});

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

const ADDRESS_FIELDS: [&str; 5] = ["calle", "colonia", "ciudad", "estado", "codigoPostal"];
const EDUCATION_FIELDS: [&str; 4] = ["nivelEducativo", "carrera", "institucion", "anioGraduacion"];
const EXPERIENCE_FIELDS: [&str; 5] = [
    "puestoActual",
    "empresaActual",
    "aniosExperiencia",
    "periodoTrabajo",
    "descripcionExperiencia",
];

fn uppercase(value: &str) -> String {
    value.trim().to_uppercase()
}

fn strip_phone(value: &str) -> String {
    PHONE_SEPARATORS.replace_all(value, "").into_owned()
}

fn get<'a>(values: &'a Values, key: &str) -> &'a str {
    values.get(key).map(|v| v.trim()).unwrap_or("")
}

// --- Composed fields ---

/// `calle, colonia, ciudad, estado, CP: nnnnn`
pub fn compose_address(values: &Values) -> String {
    format!(
        "{}, {}, {}, {}, CP: {}",
        get(values, "calle"),
        get(values, "colonia"),
        get(values, "ciudad"),
        get(values, "estado"),
        get(values, "codigoPostal"),
    )
}

/// `nivel en carrera - institucion (anio)`
pub fn compose_education(values: &Values) -> String {
    format!(
        "{} en {} - {} ({})",
        get(values, "nivelEducativo"),
        get(values, "carrera"),
        get(values, "institucion"),
        get(values, "anioGraduacion"),
    )
}

/// `puesto en empresa - anios[ (periodo)][. descripcion]`
pub fn compose_experience(values: &Values) -> String {
    let mut out = format!(
        "{} en {} - {}",
        get(values, "puestoActual"),
        get(values, "empresaActual"),
        get(values, "aniosExperiencia"),
    );
    let period = get(values, "periodoTrabajo");
    if !period.is_empty() {
        out.push_str(&format!(" ({})", period));
    }
    let description = get(values, "descripcionExperiencia");
    if !description.is_empty() {
        out.push_str(&format!(". {}", description));
    }
    out
}

/// Inverse of `compose_address`. Unparseable input yields no parts.
pub fn split_address(address: &str) -> Vec<(&'static str, String)> {
    let parts: Vec<&str> = address.split(", ").collect();
    if parts.len() < 4 {
        return Vec::new();
    }
    let postal_code = CP_REGEX
        .captures(address)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    ADDRESS_FIELDS[..4]
        .iter()
        .zip(parts)
        .map(|(key, part)| (*key, part.to_string()))
        .chain([("codigoPostal", postal_code)])
        .collect()
}

fn split_with(regex: &Regex, keys: &[&'static str], text: &str) -> Vec<(&'static str, String)> {
    let Some(caps) = regex.captures(text) else {
        return Vec::new();
    };
    keys.iter()
        .enumerate()
        .map(|(i, key)| {
            let part = caps.get(i + 1).map(|m| m.as_str()).unwrap_or("");
            (*key, part.to_string())
        })
        .collect()
}

pub fn split_education(education: &str) -> Vec<(&'static str, String)> {
    split_with(&EDUCATION_REGEX, &EDUCATION_FIELDS, education)
}

pub fn split_experience(experience: &str) -> Vec<(&'static str, String)> {
    split_with(&EXPERIENCE_REGEX, &EXPERIENCE_FIELDS, experience)
}

// --- Candidate ---

pub fn candidate_schema(current_year: i32) -> Schema {
    let graduation = format!("Graduation year must be between 1950 and {}", current_year + 5);
    let required = |name: &'static str, label: &str| {
        FieldSpec::new(name).required(format!("The field \"{}\" is required", label))
    };

    Schema::new()
        .field(FieldSpec::new("telefono").pattern_normalized(
            &PHONE_REGEX,
            strip_phone,
            "Phone must have 10 digits",
        ))
        .field(required("calle", "Street and number"))
        .field(required("colonia", "Neighborhood"))
        .field(required("ciudad", "City"))
        .field(required("estado", "State"))
        .field(
            required("codigoPostal", "Postal code")
                .max_chars(5, "Postal code must have exactly 5 digits")
                .pattern(&POSTAL_CODE_REGEX, "Postal code must have exactly 5 digits"),
        )
        .field(required("nivelEducativo", "Education level"))
        .field(required("carrera", "Degree"))
        .field(required("institucion", "Institution"))
        .field(
            required("anioGraduacion", "Graduation year").int_range(
                1950,
                i64::from(current_year) + 5,
                graduation,
            ),
        )
        .field(required("puestoActual", "Current position"))
        .field(required("empresaActual", "Current company"))
        .field(required("aniosExperiencia", "Years of experience"))
        .field(FieldSpec::new("periodoTrabajo"))
        .field(FieldSpec::new("descripcionExperiencia"))
}

/// Form values for editing a stored candidate profile.
pub fn candidate_form_values(profile: &CandidateProfile) -> Vec<(&'static str, String)> {
    let mut values = vec![("telefono", profile.phone.clone().unwrap_or_default())];
    values.extend(split_address(profile.address.as_deref().unwrap_or("")));
    values.extend(split_education(profile.education.as_deref().unwrap_or("")));
    values.extend(split_experience(profile.experience.as_deref().unwrap_or("")));
    values
}

pub fn candidate_payload(values: &Values) -> Value {
    let mut body = Map::new();
    body.insert("telefono".into(), Value::from(strip_phone(get(values, "telefono"))));
    body.insert("direccion".into(), Value::from(compose_address(values)));
    body.insert("educacion".into(), Value::from(compose_education(values)));
    body.insert("experiencia".into(), Value::from(compose_experience(values)));
    Value::Object(body)
}

pub fn candidate_detail(user_id: i64, current_year: i32) -> DetailView<CandidateProfile> {
    DetailView::new(endpoints::candidate_profile(user_id), candidate_schema(current_year))
}

// --- Company ---

pub fn company_schema(current_year: i32) -> Schema {
    let required = |name: &'static str, label: &str| {
        FieldSpec::new(name).required(format!("The field \"{}\" is required", label))
    };

    Schema::new()
        .field(required("nombre", "Company name"))
        .field(FieldSpec::new("correo"))
        .field(
            required("telefono", "Phone").pattern_normalized(
                &PHONE_REGEX,
                strip_phone,
                "Phone must have 10 digits",
            ),
        )
        .field(
            required("rfc", "RFC")
                .max_chars(13, "RFC cannot exceed 13 characters")
                .pattern_normalized(&RFC_REGEX, uppercase, "Invalid RFC format"),
        )
        .field(required("calle", "Street and number"))
        .field(required("colonia", "Neighborhood"))
        .field(required("ciudad", "City"))
        .field(required("estado", "State"))
        .field(
            required("codigoPostal", "Postal code")
                .max_chars(5, "Postal code must have exactly 5 digits")
                .pattern(&POSTAL_CODE_REGEX, "Postal code must have exactly 5 digits"),
        )
        .field(FieldSpec::new("descripcion"))
        .field(required("sector", "Sector"))
        .field(required("tamanoEmpresa", "Company size"))
        .field(FieldSpec::new("sitioWeb").pattern(
            &WEBSITE_REGEX,
            "Website must start with http:// or https://",
        ))
        .field(FieldSpec::new("anioFundacion").int_range(
            1800,
            i64::from(current_year),
            format!("Founding year must be between 1800 and {}", current_year),
        ))
        .read_only_once_set("correo")
        .read_only_once_set("rfc")
}

pub fn company_form_values(profile: &CompanyProfile) -> Vec<(&'static str, String)> {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let mut values = vec![
        ("nombre", text(&profile.name)),
        ("correo", text(&profile.email)),
        ("telefono", text(&profile.phone)),
        ("rfc", text(&profile.rfc)),
        ("descripcion", text(&profile.description)),
        ("sector", text(&profile.sector)),
        ("tamanoEmpresa", text(&profile.size)),
        ("sitioWeb", text(&profile.website)),
        (
            "anioFundacion",
            profile.founded.map(|y| y.to_string()).unwrap_or_default(),
        ),
    ];
    values.extend(split_address(profile.address.as_deref().unwrap_or("")));
    values
}

/// Every field is sent so clearing one clears it on the backend. Address
/// composed, RFC uppercased, founding year as a number or `null`.
pub fn company_payload(values: &Values) -> Value {
    let Value::Object(mut body) = all_values_to_json(values) else {
        return Value::Object(Map::new());
    };
    for key in ADDRESS_FIELDS {
        body.remove(key);
    }
    body.insert("direccion".into(), Value::from(compose_address(values)));
    if let Some(rfc) = values.get("rfc") {
        body.insert("rfc".into(), Value::from(uppercase(rfc)));
    }
    if let Some(phone) = values.get("telefono") {
        body.insert("telefono".into(), Value::from(strip_phone(phone.trim())));
    }
    if let Some(year) = values.get("anioFundacion") {
        let year = year.trim().parse::<i64>().map(Value::from).unwrap_or(Value::Null);
        body.insert("anioFundacion".into(), year);
    }
    Value::Object(body)
}

pub fn company_detail(user_id: i64, current_year: i32) -> DetailView<CompanyProfile> {
    DetailView::new(endpoints::company_profile(user_id), company_schema(current_year))
}

// --- Uploads ---

fn extension(file_name: &str) -> String {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

pub async fn upload_cv<B: Backend>(
    backend: &B,
    user_id: i64,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<Value, ApiError> {
    if extension(file_name) != "pdf" {
        return Err(ApiError::precondition("The CV must be a PDF file."));
    }
    info!(user_id, file_name, size = bytes.len(), "uploading CV");
    backend
        .upload(&endpoints::upload_cv(user_id), "cv", file_name, bytes)
        .await
}

pub async fn upload_image<B: Backend>(
    backend: &B,
    user_id: i64,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<Value, ApiError> {
    if !IMAGE_EXTENSIONS.contains(&extension(file_name).as_str()) {
        return Err(ApiError::precondition("Only JPG, JPEG, PNG or GIF images are allowed."));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ApiError::precondition("The image is too large. Maximum 5MB."));
    }
    info!(user_id, file_name, size = bytes.len(), "uploading profile image");
    backend
        .upload(&endpoints::upload_image(user_id), "image", file_name, bytes)
        .await
}
