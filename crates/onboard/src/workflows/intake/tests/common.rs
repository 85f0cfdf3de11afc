use std::collections::HashMap;
use std::io::{Cursor, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::workflows::intake::domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, FormFields, NewApplication,
};
use crate::workflows::intake::files::{DocumentSlot, DocumentStore, DocumentStoreError, DocumentUpload};
use crate::workflows::intake::repository::{ApplicationRepository, RepositoryError};
use crate::workflows::intake::service::UploadSet;

/// Insertion-ordered in-memory repository mirroring the single table.
#[derive(Default)]
pub(super) struct MemoryRepository {
    next_id: AtomicU64,
    records: Mutex<Vec<ApplicationRecord>>,
}

impl MemoryRepository {
    pub(super) fn records(&self) -> Vec<ApplicationRecord> {
        self.records.lock().expect("repository mutex poisoned").clone()
    }
}

impl ApplicationRepository for MemoryRepository {
    fn insert(&self, submission: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        let id = ApplicationId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let record = ApplicationRecord::accepted(id, submission);
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.push(record.clone());
        Ok(record)
    }

    fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Ok(self.records())
    }

    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Ok(self.records().into_iter().find(|record| record.id == id))
    }

    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.iter_mut().find(|record| record.id == id) {
            Some(record) => {
                record.status = status;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Repository that refuses every insert, for orphan-cleanup scenarios.
pub(super) struct UnavailableRepository;

impl ApplicationRepository for UnavailableRepository {
    fn insert(&self, _submission: NewApplication) -> Result<ApplicationRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("insert refused".to_string()))
    }

    fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("list refused".to_string()))
    }

    fn fetch(&self, _id: ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("fetch refused".to_string()))
    }

    fn update_status(
        &self,
        _id: ApplicationId,
        _status: ApplicationStatus,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("update refused".to_string()))
    }
}

/// Document store that keeps content in a map so tests can observe writes
/// and removals.
#[derive(Default)]
pub(super) struct MemoryDocumentStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryDocumentStore {
    pub(super) fn stored(&self) -> Vec<String> {
        let guard = self.files.lock().expect("store mutex poisoned");
        let mut keys: Vec<String> = guard.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub(super) fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .expect("store mutex poisoned")
            .get(path)
            .cloned()
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn store(&self, key: &str, content: &mut dyn Read) -> Result<String, DocumentStoreError> {
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;
        let mut guard = self.files.lock().expect("store mutex poisoned");
        let mut path = format!("mem/{key}");
        let mut counter = 1u32;
        while guard.contains_key(&path) {
            path = format!("mem/{key}-{counter}");
            counter += 1;
        }
        guard.insert(path.clone(), bytes);
        Ok(path)
    }

    fn remove(&self, path: &str) -> Result<(), DocumentStoreError> {
        self.files
            .lock()
            .expect("store mutex poisoned")
            .remove(path);
        Ok(())
    }
}

pub(super) fn valid_fields() -> FormFields {
    [
        ("business_name", "Prairie Roasters LLC"),
        ("business_type", "LLC"),
        ("industry", "Food & Beverage"),
        ("business_description", "Small-batch coffee roastery."),
        ("year_established", "2019"),
        ("employees", "1-10"),
        ("business_email", "hello@prairieroasters.example"),
        ("business_phone", "+1-515-555-0117"),
        ("business_website", "https://prairieroasters.example"),
        ("address", "412 Court Ave"),
        ("city", "Des Moines"),
        ("state", "IA"),
        ("postal_code", "50309"),
        ("country", "US"),
        ("contact_name", "Jordan Baker"),
        ("contact_email", "jordan@prairieroasters.example"),
        ("contact_phone", "+1-515-555-0118"),
        ("position", "Owner"),
        ("id_type", "passport"),
        ("id_number", "X1234567"),
        ("tin", "12-3456789"),
        ("vat", "US-VAT-001"),
        ("publicly_traded", "no"),
        ("international", "yes"),
        ("terms", "on"),
        ("privacy", "on"),
    ]
    .into_iter()
    .collect()
}

pub(super) fn upload(filename: &str, bytes: &[u8]) -> DocumentUpload<Cursor<Vec<u8>>> {
    DocumentUpload {
        filename: filename.to_string(),
        content: Cursor::new(bytes.to_vec()),
    }
}

/// Both required slots populated with small valid documents.
pub(super) fn required_uploads() -> UploadSet<Cursor<Vec<u8>>> {
    let mut uploads = UploadSet::default();
    uploads.insert(DocumentSlot::Registration, upload("registration.pdf", b"%PDF-1.4"));
    uploads.insert(DocumentSlot::RepresentativeId, upload("passport.jpg", b"\xff\xd8\xff"));
    uploads
}

pub(super) fn memory_services() -> (
    Arc<MemoryRepository>,
    Arc<MemoryDocumentStore>,
    crate::workflows::intake::service::IntakeService<MemoryRepository, MemoryDocumentStore>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let store = Arc::new(MemoryDocumentStore::default());
    let service = crate::workflows::intake::service::IntakeService::new(
        repository.clone(),
        store.clone(),
    );
    (repository, store, service)
}
