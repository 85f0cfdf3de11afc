use std::io::{Read, Seek};
use std::sync::Arc;

use chrono::Utc;
use tracing::warn;

use super::domain::{
    ApplicationRecord, BusinessProfile, ComplianceProfile, ContactPerson, DocumentSet, FormFields,
    NewApplication, PostalAddress,
};
use super::files::{
    check_upload, DocumentSlot, DocumentStore, DocumentStoreError, DocumentUpload, SlotError,
};
use super::repository::{ApplicationRepository, RepositoryError};
use super::validate::{validate_fields, FieldErrors};

/// Up to four uploads keyed by document slot.
#[derive(Debug)]
pub struct UploadSet<R> {
    registration: Option<DocumentUpload<R>>,
    representative_id: Option<DocumentUpload<R>>,
    tax: Option<DocumentUpload<R>>,
    proof_of_address: Option<DocumentUpload<R>>,
}

impl<R> Default for UploadSet<R> {
    fn default() -> Self {
        Self {
            registration: None,
            representative_id: None,
            tax: None,
            proof_of_address: None,
        }
    }
}

impl<R> UploadSet<R> {
    pub fn insert(&mut self, slot: DocumentSlot, upload: DocumentUpload<R>) {
        *self.slot_mut(slot) = Some(upload);
    }

    fn slot_mut(&mut self, slot: DocumentSlot) -> &mut Option<DocumentUpload<R>> {
        match slot {
            DocumentSlot::Registration => &mut self.registration,
            DocumentSlot::RepresentativeId => &mut self.representative_id,
            DocumentSlot::Tax => &mut self.tax,
            DocumentSlot::ProofOfAddress => &mut self.proof_of_address,
        }
    }

    fn get_mut(&mut self, slot: DocumentSlot) -> Option<&mut DocumentUpload<R>> {
        self.slot_mut(slot).as_mut()
    }

    fn take(&mut self, slot: DocumentSlot) -> Option<DocumentUpload<R>> {
        self.slot_mut(slot).take()
    }
}

/// Why a submission did not produce a record.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    /// Field or file validation failed; the map carries every violated rule
    /// so the caller can surface per-field detail.
    #[error("submission failed validation")]
    Invalid(FieldErrors),
    #[error(transparent)]
    Documents(#[from] DocumentStoreError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("upload stream fault: {0}")]
    Stream(std::io::Error),
}

/// Orchestrates a submission: validation, then file persistence, then record
/// insertion. No partial writes: files are saved only after every check
/// passed, and orphaned files are removed if the insert itself fails.
pub struct IntakeService<R, S> {
    repository: Arc<R>,
    documents: Arc<S>,
}

impl<R, S> IntakeService<R, S>
where
    R: ApplicationRepository,
    S: DocumentStore,
{
    pub fn new(repository: Arc<R>, documents: Arc<S>) -> Self {
        Self {
            repository,
            documents,
        }
    }

    pub fn submit<U: Read + Seek>(
        &self,
        fields: &FormFields,
        mut uploads: UploadSet<U>,
    ) -> Result<ApplicationRecord, SubmissionError> {
        let mut errors = validate_fields(fields);

        let mut accepted: Vec<(DocumentSlot, String)> = Vec::new();
        for slot in DocumentSlot::ALL {
            match check_upload(slot, uploads.get_mut(slot)) {
                Ok(Some(key)) => accepted.push((slot, key)),
                Ok(None) => {}
                Err(SlotError::Rejected(rejection)) => {
                    errors.insert(slot.field_name().to_string(), rejection.to_string());
                }
                Err(SlotError::Stream(err)) => return Err(SubmissionError::Stream(err)),
            }
        }

        if !errors.is_empty() {
            return Err(SubmissionError::Invalid(errors));
        }

        // Files first, row second. The reverse order could commit a row that
        // references documents that were never written.
        let mut documents = DocumentSet::default();
        let mut written: Vec<String> = Vec::new();
        for (slot, key) in accepted {
            let Some(mut upload) = uploads.take(slot) else {
                continue;
            };
            let path = match self.documents.store(&key, &mut upload.content) {
                Ok(path) => path,
                Err(err) => {
                    self.discard(&written);
                    return Err(err.into());
                }
            };
            written.push(path.clone());
            match slot {
                DocumentSlot::Registration => documents.registration = Some(path),
                DocumentSlot::RepresentativeId => documents.representative_id = Some(path),
                DocumentSlot::Tax => documents.tax = Some(path),
                DocumentSlot::ProofOfAddress => documents.proof_of_address = Some(path),
            }
        }

        let submission = assemble(fields, documents);
        match self.repository.insert(submission) {
            Ok(record) => Ok(record),
            Err(err) => {
                self.discard(&written);
                Err(err.into())
            }
        }
    }

    fn discard(&self, written: &[String]) {
        for path in written {
            if let Err(err) = self.documents.remove(path) {
                warn!(%path, %err, "failed to remove orphaned upload");
            }
        }
    }
}

/// Map validated fields plus stored document paths into the record to
/// persist. Derived booleans are true iff the submitted value is the literal
/// lowercase `"yes"`.
fn assemble(fields: &FormFields, documents: DocumentSet) -> NewApplication {
    NewApplication {
        business: BusinessProfile {
            name: fields.text("business_name"),
            business_type: fields.text("business_type"),
            industry: fields.text("industry"),
            description: fields.optional("business_description"),
            year_established: fields.optional("year_established"),
            employees: fields.optional("employees"),
            email: fields.text("business_email"),
            phone: fields.text("business_phone"),
            website: fields.optional("business_website"),
        },
        address: PostalAddress {
            address: fields.text("address"),
            city: fields.text("city"),
            state: fields.text("state"),
            postal_code: fields.text("postal_code"),
            country: fields.text("country"),
        },
        contact: ContactPerson {
            name: fields.text("contact_name"),
            email: fields.text("contact_email"),
            phone: fields.text("contact_phone"),
            position: fields.text("position"),
        },
        compliance: ComplianceProfile {
            id_type: fields.text("id_type"),
            id_number: fields.text("id_number"),
            tin: fields.text("tin"),
            vat: fields.optional("vat"),
            publicly_traded: fields.flag_is_yes("publicly_traded"),
            international: fields.flag_is_yes("international"),
        },
        documents,
        submitted_at: Utc::now(),
    }
}
