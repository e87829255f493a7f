use serde_json::Value;
use tracing::info;

use crate::api::Backend;
use crate::error::ApiError;

/// Proof that the user explicitly confirmed a destructive action. Only
/// `ask` can produce one.
#[derive(Debug)]
pub struct Confirmation {
    action: String,
}

impl Confirmation {
    /// Put `action` to the user through `answer`; `None` when declined.
    pub fn ask(action: impl Into<String>, answer: impl FnOnce(&str) -> bool) -> Option<Self> {
        let action = action.into();
        if answer(&action) {
            Some(Self { action })
        } else {
            info!(%action, "destructive action declined");
            None
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// DELETE `path`, consuming the confirmation so it cannot be replayed.
pub async fn delete_confirmed<B: Backend>(
    backend: &B,
    path: &str,
    confirmation: Confirmation,
) -> Result<Value, ApiError> {
    info!(action = confirmation.action(), path, "deleting");
    backend.delete(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Method;
    use crate::testing::MockBackend;

    #[test]
    fn test_declined_confirmation_yields_nothing() {
        assert!(Confirmation::ask("Delete job 3?", |_| false).is_none());
        let yes = Confirmation::ask("Delete job 3?", |prompt| prompt.ends_with('?')).unwrap();
        assert_eq!(yes.action(), "Delete job 3?");
    }

    #[tokio::test]
    async fn test_delete_requires_token() {
        let backend = MockBackend::new();
        let token = Confirmation::ask("Delete user 9?", |_| true).unwrap();
        delete_confirmed(&backend, "/admin/usuarios/9", token).await.unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, Method::DELETE);
        assert_eq!(calls[0].path, "/admin/usuarios/9");
    }
}
