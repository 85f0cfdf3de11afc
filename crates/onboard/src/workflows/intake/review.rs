use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, ApplicationRecord, ApplicationStatus};
use super::repository::{ApplicationRepository, ApplicationSummary, RepositoryError};

/// The only two actions the review console may take. Parsing is the contract
/// gate: anything else never reaches the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    pub const fn resulting_status(self) -> ApplicationStatus {
        match self {
            Self::Approve => ApplicationStatus::Approved,
            Self::Reject => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("invalid request")]
    InvalidAction,
    #[error("application not found")]
    NotFound,
    #[error(transparent)]
    Repository(RepositoryError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
}

/// Admin-side workflow: listing, detail, status transitions, CSV export.
pub struct ReviewService<R> {
    repository: Arc<R>,
}

impl<R: ApplicationRepository> ReviewService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Every record for display. No pagination or filtering at this scale.
    pub fn list_all(&self) -> Result<Vec<ApplicationRecord>, RepositoryError> {
        self.repository.list()
    }

    pub fn detail(&self, id: ApplicationId) -> Result<ApplicationRecord, ReviewError> {
        match self.repository.fetch(id) {
            Ok(Some(record)) => Ok(record),
            Ok(None) => Err(ReviewError::NotFound),
            Err(err) => Err(ReviewError::Repository(err)),
        }
    }

    /// Apply an approve/reject action. Repeating an action is idempotent;
    /// unknown ids and unknown actions are reported, not fatal.
    pub fn review(&self, id: ApplicationId, raw_action: &str) -> Result<ApplicationStatus, ReviewError> {
        let action = ReviewAction::parse(raw_action).ok_or(ReviewError::InvalidAction)?;
        let status = action.resulting_status();
        match self.repository.update_status(id, status) {
            Ok(()) => Ok(status),
            Err(RepositoryError::NotFound) => Err(ReviewError::NotFound),
            Err(err) => Err(ReviewError::Repository(err)),
        }
    }

    /// Flat CSV of every application for offline review.
    pub fn export_csv(&self) -> Result<String, ReviewError> {
        let records = self
            .list_all()
            .map_err(ReviewError::Repository)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for record in &records {
            writer.serialize(ApplicationSummary::from_record(record))?;
        }
        writer.flush().map_err(csv::Error::from)?;

        let bytes = writer
            .into_inner()
            .map_err(|err| ReviewError::Export(csv::Error::from(err.into_error())))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
