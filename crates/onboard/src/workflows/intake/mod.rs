//! Business onboarding intake: submission validation, document handling,
//! persistence, and the admin review workflow.
//!
//! The pipeline is deliberately strict about ordering: a record is inserted
//! only after every validator passed and all required documents were durably
//! written, so a stored row never references a missing file.

pub mod domain;
pub mod files;
pub mod repository;
pub mod review;
pub mod service;
pub mod session;
pub mod validate;

#[cfg(test)]
mod tests;

pub use domain::{
    ApplicationId, ApplicationRecord, ApplicationStatus, BusinessProfile, ComplianceProfile,
    ContactPerson, DocumentSet, FormFields, NewApplication, PostalAddress,
};
pub use files::{
    check_upload, sanitize_filename, DocumentSlot, DocumentStore, DocumentStoreError,
    DocumentUpload, FileRejection, FsDocumentStore, SlotError, ALLOWED_EXTENSIONS, MAX_FILE_BYTES,
};
pub use repository::{ApplicationRepository, ApplicationSummary, RepositoryError};
pub use review::{ReviewAction, ReviewError, ReviewService};
pub use service::{IntakeService, SubmissionError, UploadSet};
pub use session::{login, logout, require_admin, AccessError, SessionContext};
pub use validate::{validate_fields, FieldErrors, REQUIRED_FIELDS};
