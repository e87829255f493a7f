use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiRequest, Backend};
use crate::error::{ApiError, FormError};
use crate::form::{FormController, Schema, Values};
use crate::list::LoadState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailMode {
    Read,
    Edit,
}

/// Read/edit toggle over one record. Reads with GET on `path`, saves with
/// PUT on the same path, then re-reads.
pub struct DetailView<T> {
    path: String,
    entity: Option<T>,
    state: LoadState,
    mode: DetailMode,
    form: FormController,
}

impl<T: DeserializeOwned + Serialize> DetailView<T> {
    pub fn new(path: impl Into<String>, schema: Schema) -> Self {
        Self {
            path: path.into(),
            entity: None,
            state: LoadState::Idle,
            mode: DetailMode::Read,
            form: FormController::new(schema),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub async fn load<B: Backend>(&mut self, backend: &B) -> Result<(), ApiError> {
        self.state = LoadState::Loading;
        let result = backend.get(&self.path).await.and_then(|body| {
            serde_json::from_value::<T>(body)
                .map_err(|e| ApiError::malformed(format!("unexpected record shape: {}", e)))
        });

        match result {
            Ok(entity) => {
                debug!(path = %self.path, "record loaded");
                self.entity = Some(entity);
                self.state = LoadState::Loaded;
                Ok(())
            }
            Err(e) => {
                warn!(path = %self.path, error = %e, "record load failed");
                self.entity = None;
                self.state = LoadState::Failed(e.clone());
                Err(e)
            }
        }
    }

    pub fn entity(&self) -> Option<&T> {
        self.entity.as_ref()
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn mode(&self) -> DetailMode {
        self.mode
    }

    pub fn form(&self) -> &FormController {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormController {
        &mut self.form
    }

    /// Seed the form from the loaded record and switch to edit mode.
    pub fn begin_edit(&mut self) -> Result<(), FormError> {
        let Some(entity) = &self.entity else {
            return Err(ApiError::precondition("Nothing loaded to edit.").into());
        };
        self.form
            .load_entity(entity)
            .map_err(|e| ApiError::malformed(e.to_string()))?;
        self.mode = DetailMode::Edit;
        Ok(())
    }

    /// Edit with values that do not map one-to-one onto the record, e.g.
    /// structured parts of a composed field.
    pub fn begin_edit_with<I, K, V>(&mut self, fields: I) -> Result<(), FormError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if self.entity.is_none() {
            return Err(ApiError::precondition("Nothing loaded to edit.").into());
        }
        self.form.load_initial(fields);
        self.mode = DetailMode::Edit;
        Ok(())
    }

    pub fn cancel_edit(&mut self) {
        self.form.reset();
        self.mode = DetailMode::Read;
    }

    /// PUT the body built from the form, then reload. A failed PUT keeps
    /// edit mode and the typed values.
    pub async fn save<B, F>(
        &mut self,
        backend: &B,
        body: F,
        success_message: &str,
    ) -> Result<(), FormError>
    where
        B: Backend,
        F: FnOnce(&Values) -> Value,
    {
        if self.mode != DetailMode::Edit {
            return Err(ApiError::precondition("Not editing.").into());
        }
        let path = self.path.clone();
        self.form
            .submit(backend, |values| ApiRequest::put(path, body(values)), success_message)
            .await?;
        self.mode = DetailMode::Read;
        self.load(backend).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::banner::BannerKind;
    use crate::form::{values_to_json, FieldSpec};
    use crate::models::CompanyProfile;
    use crate::testing::MockBackend;
    use serde_json::json;

    fn view() -> DetailView<CompanyProfile> {
        DetailView::new(
            "/empresa/profile/4",
            Schema::new()
                .field(FieldSpec::new("nombre").required("Name is required"))
                .field(FieldSpec::new("rfc"))
                .field(FieldSpec::new("telefono"))
                .read_only_once_set("rfc"),
        )
    }

    #[tokio::test]
    async fn test_edit_save_reloads() {
        let backend = MockBackend::new();
        backend.respond(json!({"userId": 4, "nombre": "ACME", "rfc": "ACM010101AB1"}));
        backend.respond(json!({"message": "ok"}));
        backend.respond(json!({"userId": 4, "nombre": "ACME SA", "rfc": "ACM010101AB1"}));

        let mut detail = view();
        detail.load(&backend).await.unwrap();
        detail.begin_edit().unwrap();
        assert_eq!(detail.mode(), DetailMode::Edit);
        assert!(detail.form().is_locked("rfc"));
        assert!(!detail.form_mut().set_field("rfc", "XXX"));
        detail.form_mut().set_field("nombre", "ACME SA");

        detail.save(&backend, values_to_json, "Profile updated").await.unwrap();

        assert_eq!(detail.mode(), DetailMode::Read);
        assert_eq!(detail.entity().and_then(|p| p.name.as_deref()), Some("ACME SA"));
        let calls = backend.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[1].method, Method::PUT);
        assert_eq!(calls[1].body.as_ref().unwrap()["nombre"], "ACME SA");
        assert_eq!(detail.form().banner().map(|b| b.kind), Some(BannerKind::Success));
    }

    #[tokio::test]
    async fn test_failed_save_stays_in_edit() {
        let backend = MockBackend::new();
        backend.respond(json!({"userId": 4, "nombre": "ACME"}));
        backend.fail(ApiError::ServerError { status: 500, message: None });

        let mut detail = view();
        detail.load(&backend).await.unwrap();
        detail.begin_edit().unwrap();
        detail.form_mut().set_field("telefono", "5512345678");

        let err = detail.save(&backend, values_to_json, "ok").await.unwrap_err();
        assert!(matches!(err, FormError::Api(ApiError::ServerError { .. })));
        assert_eq!(detail.mode(), DetailMode::Edit);
        assert_eq!(detail.form().value("telefono"), "5512345678");
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_cannot_edit_before_load() {
        let backend = MockBackend::new();
        backend.fail(ApiError::NotFound { message: None });
        let mut detail = view();
        assert!(detail.load(&backend).await.is_err());
        assert!(matches!(detail.state(), LoadState::Failed(ApiError::NotFound { .. })));
        assert!(detail.begin_edit().is_err());
    }

    #[tokio::test]
    async fn test_cancel_edit_discards_changes() {
        let backend = MockBackend::new();
        backend.respond(json!({"userId": 4, "nombre": "ACME"}));
        let mut detail = view();
        detail.load(&backend).await.unwrap();
        detail.begin_edit().unwrap();
        detail.form_mut().set_field("nombre", "Other");
        detail.cancel_edit();

        assert_eq!(detail.mode(), DetailMode::Read);
        assert_eq!(detail.entity().and_then(|p| p.name.as_deref()), Some("ACME"));
        assert!(detail.save(&backend, values_to_json, "ok").await.is_err());
        assert_eq!(backend.call_count(), 1);
    }
}
