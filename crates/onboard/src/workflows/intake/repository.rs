use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStatus, NewApplication};

/// Storage abstraction over the single `applications` table so the workflow
/// modules can be exercised in isolation. All operations are atomic
/// single-row effects.
pub trait ApplicationRepository: Send + Sync {
    /// Persist an accepted submission. Assigns the next sequential id and
    /// forces the initial status to `Pending`.
    fn insert(&self, submission: NewApplication) -> Result<ApplicationRecord, RepositoryError>;

    /// Every record, in insertion order.
    fn list(&self) -> Result<Vec<ApplicationRecord>, RepositoryError>;

    fn fetch(&self, id: ApplicationId) -> Result<Option<ApplicationRecord>, RepositoryError>;

    /// Set the status of one record. Callers pass only `Approved` or
    /// `Rejected`; the review workflow's action enum enforces that contract.
    fn update_status(
        &self,
        id: ApplicationId,
        status: ApplicationStatus,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures. No automatic retry anywhere:
/// faults propagate to the caller as-is.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("application not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Condensed row for the admin listing and CSV export.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub id: u64,
    pub business_name: String,
    pub business_type: String,
    pub industry: String,
    pub business_email: String,
    pub contact_name: String,
    pub contact_email: String,
    pub country: String,
    pub submitted_at: DateTime<Utc>,
    pub status: &'static str,
}

impl ApplicationSummary {
    pub fn from_record(record: &ApplicationRecord) -> Self {
        Self {
            id: record.id.0,
            business_name: record.business.name.clone(),
            business_type: record.business.business_type.clone(),
            industry: record.business.industry.clone(),
            business_email: record.business.email.clone(),
            contact_name: record.contact.name.clone(),
            contact_email: record.contact.email.clone(),
            country: record.address.country.clone(),
            submitted_at: record.submitted_at,
            status: record.status.label(),
        }
    }
}
