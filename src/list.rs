use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{endpoints, Backend};
use crate::error::{ApiError, UnknownFilter};
use crate::filter::FilterSet;

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Failed(ApiError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// Ask the backend for soft-deleted rows too.
    pub include_deleted: bool,
}

/// Proof that a load was started on this list. Handing it back to
/// `finish_load` applies the result unless the list was unmounted meanwhile.
#[must_use]
#[derive(Debug)]
pub struct LoadTicket {
    _private: (),
}

/// A collection fetched once per mount or refresh, served through a filtered
/// view that never goes back to the network.
pub struct EntityList<T> {
    items: Vec<T>,
    state: LoadState,
    filters: FilterSet<T>,
    mounted: bool,
}

impl<T: DeserializeOwned> EntityList<T> {
    pub fn new(filters: FilterSet<T>) -> Self {
        Self {
            items: Vec::new(),
            state: LoadState::Idle,
            filters,
            mounted: true,
        }
    }

    pub async fn load<B: Backend>(&mut self, backend: &B, path: &str, options: ListOptions) {
        let ticket = self.begin_load();
        let result = Self::fetch(backend, path, options).await;
        self.finish_load(ticket, result);
    }

    pub async fn fetch<B: Backend>(
        backend: &B,
        path: &str,
        options: ListOptions,
    ) -> Result<Value, ApiError> {
        backend
            .get(&endpoints::with_deleted(path, options.include_deleted))
            .await
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.state = LoadState::Loading;
        LoadTicket { _private: () }
    }

    /// Apply a fetched body. Returns false when the list was unmounted and
    /// the result was dropped.
    pub fn finish_load(&mut self, _ticket: LoadTicket, result: Result<Value, ApiError>) -> bool {
        if !self.mounted {
            debug!("list unmounted, dropping load result");
            return false;
        }

        match result.and_then(parse_items) {
            Ok(items) => {
                debug!(count = items.len(), "list loaded");
                self.items = items;
                self.state = LoadState::Loaded;
            }
            Err(e) => {
                warn!(error = %e, "list load failed");
                self.items.clear();
                self.state = LoadState::Failed(e);
            }
        }
        true
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn error(&self) -> Option<&ApiError> {
        match &self.state {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn total(&self) -> usize {
        self.items.len()
    }

    /// The filtered view. Pure: recomputed from the loaded items each call.
    pub fn view(&self) -> Vec<&T> {
        self.filters.apply(&self.items)
    }

    pub fn count(&self) -> usize {
        self.items.iter().filter(|item| self.filters.matches(item)).count()
    }

    pub fn filters(&self) -> &FilterSet<T> {
        &self.filters
    }

    pub fn set_filter(&mut self, key: &str, value: impl Into<String>) -> Result<(), UnknownFilter> {
        self.filters.set(key, value)
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
    }

    /// Local update after a successful write, ahead of the next refresh.
    pub fn update_where(&mut self, pred: impl Fn(&T) -> bool, update: impl Fn(&mut T)) -> usize {
        let mut touched = 0;
        for item in self.items.iter_mut().filter(|item| pred(item)) {
            update(item);
            touched += 1;
        }
        touched
    }

    pub fn remove_where(&mut self, pred: impl Fn(&T) -> bool) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !pred(item));
        before - self.items.len()
    }

    pub fn unmount(&mut self) {
        self.mounted = false;
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }
}

fn parse_items<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, ApiError> {
    match body {
        Value::Array(_) => serde_json::from_value(body)
            .map_err(|e| ApiError::malformed(format!("unexpected row shape: {}", e))),
        other => Err(ApiError::malformed(format!(
            "expected a JSON array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{Field, Rule};
    use crate::testing::MockBackend;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Row {
        id: i64,
        name: Option<String>,
    }

    fn name(r: &Row) -> Option<&str> {
        r.name.as_deref()
    }

    fn list() -> EntityList<Row> {
        EntityList::new(FilterSet::new().with("search", Rule::Search(vec![name as Field<Row>])))
    }

    #[tokio::test]
    async fn test_load_then_filter_without_refetch() {
        let backend = MockBackend::new();
        backend.respond(json!([{"id": 1, "name": "Ana"}, {"id": 2, "name": "Beto"}, {"id": 3}]));

        let mut rows = list();
        rows.load(&backend, "/admin/usuarios", ListOptions::default()).await;
        assert_eq!(rows.state(), &LoadState::Loaded);
        assert_eq!(rows.total(), 3);

        rows.set_filter("search", "an").unwrap();
        assert_eq!(rows.count(), 1);
        assert_eq!(rows.view()[0].id, 1);

        rows.clear_filters();
        assert_eq!(rows.count(), 3);
        assert_eq!(backend.call_count(), 1);
    }

    #[tokio::test]
    async fn test_include_deleted_adds_query_flag() {
        let backend = MockBackend::new();
        backend.respond(json!([]));
        let mut rows = list();
        rows.load(&backend, "/admin/vacantes", ListOptions { include_deleted: true }).await;
        assert_eq!(backend.calls()[0].path, "/admin/vacantes?incluir_eliminadas=true");
    }

    #[tokio::test]
    async fn test_non_array_body_is_malformed_and_empty() {
        let backend = MockBackend::new();
        backend.respond(json!([{"id": 9, "name": "old"}]));
        backend.respond(json!({"error": "not a list"}));

        let mut rows = list();
        rows.load(&backend, "/vacantes", ListOptions::default()).await;
        assert_eq!(rows.total(), 1);

        rows.load(&backend, "/vacantes", ListOptions::default()).await;
        assert!(matches!(rows.error(), Some(ApiError::MalformedResponse { .. })));
        assert!(rows.items().is_empty());
        assert_eq!(rows.count(), 0);
        assert!(rows.view().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_empty_items() {
        let backend = MockBackend::new();
        backend.fail(ApiError::ServerError { status: 500, message: None });

        let mut rows = list();
        rows.set_filter("search", "x").unwrap();
        rows.load(&backend, "/vacantes", ListOptions::default()).await;
        assert!(matches!(rows.state(), LoadState::Failed(ApiError::ServerError { .. })));
        assert_eq!(rows.count(), 0);
    }

    #[test]
    fn test_result_after_unmount_is_dropped() {
        let mut rows = list();
        let ticket = rows.begin_load();
        assert!(rows.is_loading());
        rows.unmount();
        assert!(!rows.finish_load(ticket, Ok(json!([{"id": 1}]))));
        assert!(rows.items().is_empty());
    }

    #[test]
    fn test_last_finished_load_wins() {
        let mut rows = list();
        let first = rows.begin_load();
        let second = rows.begin_load();
        rows.finish_load(second, Ok(json!([{"id": 2}])));
        rows.finish_load(first, Ok(json!([{"id": 1}, {"id": 3}])));
        assert_eq!(rows.items().iter().map(|r| r.id).collect::<Vec<_>>(), vec![1, 3]);
    }

    #[test]
    fn test_local_update_and_remove() {
        let mut rows = list();
        let ticket = rows.begin_load();
        rows.finish_load(ticket, Ok(json!([{"id": 1, "name": "a"}, {"id": 2, "name": "b"}])));

        assert_eq!(rows.update_where(|r| r.id == 2, |r| r.name = Some("z".into())), 1);
        assert_eq!(rows.items()[1].name.as_deref(), Some("z"));
        assert_eq!(rows.remove_where(|r| r.id == 1), 1);
        assert_eq!(rows.total(), 1);
    }
}
