use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::{header, HeaderMap};
use metrics_exporter_prometheus::PrometheusHandle;
use onboard::config::AdminCredentials;
use onboard::workflows::intake::{
    ApplicationId, ApplicationRecord, ApplicationRepository, ApplicationStatus, DocumentStore,
    IntakeService, NewApplication, RepositoryError, ReviewService, SessionContext,
};

/// Operational state shared with the health/readiness/metrics endpoints.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Everything the intake and admin handlers need, wired once at startup.
pub(crate) struct AppContext<R, S> {
    pub(crate) intake: IntakeService<R, S>,
    pub(crate) review: ReviewService<R>,
    pub(crate) sessions: SessionStore,
    pub(crate) credentials: AdminCredentials,
    pub(crate) upload_dir: PathBuf,
}

impl<R, S> AppContext<R, S>
where
    R: ApplicationRepository,
    S: DocumentStore,
{
    pub(crate) fn new(
        repository: Arc<R>,
        documents: Arc<S>,
        credentials: AdminCredentials,
        upload_dir: PathBuf,
    ) -> Self {
        Self {
            intake: IntakeService::new(repository.clone(), documents),
            review: ReviewService::new(repository),
            sessions: SessionStore::default(),
            credentials,
            upload_dir,
        }
    }
}

/// The single `applications` table, in memory. Ids are sequential from 1 and
/// never reused; listing preserves insertion order.
#[derive(Default)]
pub(crate) struct InMemoryApplicationRepository {
    next_id: AtomicU64,
    rows: Mutex<Vec<ApplicationRecord>>,
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn insert(&self, submission: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        let id = ApplicationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = ApplicationRecord::accepted(id, submission);
        let mut rows = self.rows.lock().expect("repository mutex poisoned");
        rows.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        let rows = self.rows.lock().expect("repository mutex poisoned");
        Ok(rows.clone())
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        let rows = self.rows.lock().expect("repository mutex poisoned");
        Ok(rows.iter().find(|record| record.id == id).cloned())
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        let mut rows = self.rows.lock().expect("repository mutex poisoned");
        match rows.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.status = status;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

pub(crate) const SESSION_COOKIE: &str = "sid";

/// Handle to one caller's session entry. `fresh` means the response must set
/// the cookie.
pub(crate) struct SessionHandle {
    pub(crate) id: String,
    pub(crate) fresh: bool,
}

/// In-memory session store keyed by the `sid` cookie. Cookie mechanics are
/// intentionally minimal; the interesting state lives in `SessionContext`.
#[derive(Default, Clone)]
pub(crate) struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionContext>>>,
}

impl SessionStore {
    /// Resolve the caller's session from request headers, creating one when
    /// absent or unknown.
    pub(crate) fn attach(&self, headers: &HeaderMap) -> SessionHandle {
        if let Some(id) = session_id_from_headers(headers) {
            let guard = self.sessions.lock().expect("session mutex poisoned");
            if guard.contains_key(&id) {
                return SessionHandle { id, fresh: false };
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(id.clone(), SessionContext::default());
        SessionHandle { id, fresh: true }
    }

    pub(crate) fn read(&self, id: &str) -> SessionContext {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn write(&self, id: &str, context: SessionContext) {
        self.sessions
            .lock()
            .expect("session mutex poisoned")
            .insert(id.to_string(), context);
    }
}

fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}
