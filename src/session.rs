use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::StoreError;
use crate::models::Session;
use crate::store::Store;

const SESSION_KEY: &str = "session";
const SAVED_JOBS_KEY: &str = "savedJobs";
// Derived keys older builds kept next to the session.
const DERIVED_KEYS: [&str; 3] = ["userId", "userType", "user"];

/// Bump when the persisted session layout changes; older payloads are
/// treated as absent.
pub const SESSION_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct PersistedSession {
    version: u32,
    session: Session,
}

/// Who is using the client right now, plus the saved-jobs set. Every
/// mutation is written to the store before the call returns.
pub struct SessionStore {
    store: Store,
    current: Option<Session>,
}

impl SessionStore {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Restore the persisted session. Unreadable or corrupt state clears the
    /// slot and yields `None`.
    pub fn load(&mut self) -> Option<Session> {
        let raw = match self.store.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                self.current = None;
                return None;
            }
            Err(e) => {
                warn!(error = %e, "could not read persisted session");
                self.current = None;
                return None;
            }
        };

        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(persisted) if persisted.version == SESSION_FORMAT_VERSION => {
                debug!(user_id = persisted.session.user_id, "session restored");
                self.current = Some(persisted.session.clone());
                Some(persisted.session)
            }
            Ok(persisted) => {
                warn!(version = persisted.version, "discarding session with unknown format version");
                self.discard_session_slot();
                None
            }
            Err(e) => {
                warn!(error = %e, "discarding corrupt persisted session");
                self.discard_session_slot();
                None
            }
        }
    }

    fn discard_session_slot(&mut self) {
        self.current = None;
        if let Err(e) = self.store.remove(SESSION_KEY) {
            warn!(error = %e, "could not clear corrupt session slot");
        }
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn set_session(&mut self, session: Session) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&PersistedSession {
            version: SESSION_FORMAT_VERSION,
            session: session.clone(),
        })?;
        self.store.set(SESSION_KEY, &payload)?;
        debug!(user_id = session.user_id, role = session.role.as_str(), "session stored");
        self.current = Some(session);
        Ok(())
    }

    /// Forget the identity and anything derived from it. Saved jobs stay.
    pub fn clear_session(&mut self) -> Result<(), StoreError> {
        self.store.remove(SESSION_KEY)?;
        for key in DERIVED_KEYS {
            self.store.remove(key)?;
        }
        self.current = None;
        Ok(())
    }

    /// Saved job ids. A corrupt slot reads as empty and is cleared.
    pub fn saved_jobs(&self) -> BTreeSet<i64> {
        let raw = match self.store.get(SAVED_JOBS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return BTreeSet::new(),
            Err(e) => {
                warn!(error = %e, "could not read saved jobs");
                return BTreeSet::new();
            }
        };
        match serde_json::from_str::<Vec<i64>>(&raw) {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(error = %e, "discarding corrupt saved jobs list");
                if let Err(e) = self.store.remove(SAVED_JOBS_KEY) {
                    warn!(error = %e, "could not clear saved jobs slot");
                }
                BTreeSet::new()
            }
        }
    }

    pub fn is_saved(&self, job_id: i64) -> bool {
        self.saved_jobs().contains(&job_id)
    }

    /// Flip membership of `job_id`; returns the new membership.
    pub fn toggle_saved(&mut self, job_id: i64) -> Result<bool, StoreError> {
        let mut ids = self.saved_jobs();
        let saved = if ids.remove(&job_id) {
            false
        } else {
            ids.insert(job_id);
            true
        };
        self.write_saved(&ids)?;
        Ok(saved)
    }

    /// Idempotent add.
    pub fn save(&mut self, job_id: i64) -> Result<(), StoreError> {
        let mut ids = self.saved_jobs();
        if ids.insert(job_id) {
            self.write_saved(&ids)?;
        }
        Ok(())
    }

    /// Idempotent remove; unsaving a non-member is a no-op.
    pub fn unsave(&mut self, job_id: i64) -> Result<(), StoreError> {
        let mut ids = self.saved_jobs();
        if ids.remove(&job_id) {
            self.write_saved(&ids)?;
        }
        Ok(())
    }

    fn write_saved(&self, ids: &BTreeSet<i64>) -> Result<(), StoreError> {
        let list: Vec<i64> = ids.iter().copied().collect();
        self.store.set(SAVED_JOBS_KEY, &serde_json::to_string(&list)?)
    }
}
