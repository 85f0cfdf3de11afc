use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned sequentially by the repository. Stable, never reused,
/// never mutated after insert.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ApplicationId(pub u64);

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw form fields exactly as submitted, keyed by field name.
///
/// Validators treat an empty string the same as an absent field, mirroring
/// how HTML forms post unfilled inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormFields(BTreeMap<String, String>);

impl FormFields {
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), value.into());
    }

    /// The raw submitted value, if the field was posted at all.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// The submitted value when present and non-empty.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.raw(name).filter(|value| !value.is_empty())
    }

    /// Owned copy of a field validated upstream as present; empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.value(name).unwrap_or_default().to_string()
    }

    /// Optional free-text field mapped to `None` when absent or empty.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.value(name).map(str::to_string)
    }

    /// True iff the submitted value is the literal lowercase `"yes"`.
    pub fn flag_is_yes(&self, name: &str) -> bool {
        self.raw(name) == Some("yes")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = Self::default();
        for (name, value) in iter {
            fields.insert(name, value);
        }
        fields
    }
}

/// Company details captured on the public form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    pub business_type: String,
    pub industry: String,
    pub description: Option<String>,
    pub year_established: Option<String>,
    pub employees: Option<String>,
    pub email: String,
    pub phone: String,
    pub website: Option<String>,
}

/// Registered postal address; every component is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

/// Primary contact person for the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactPerson {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
}

/// Identity and tax compliance attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceProfile {
    pub id_type: String,
    pub id_number: String,
    pub tin: String,
    pub vat: Option<String>,
    pub publicly_traded: bool,
    pub international: bool,
}

/// Stored paths for the four document slots. Registration and representative
/// ID are required by validation; the record mirrors the table schema where
/// every column is nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSet {
    pub registration: Option<String>,
    pub tax: Option<String>,
    pub representative_id: Option<String>,
    pub proof_of_address: Option<String>,
}

/// Lifecycle state of an application. Mutated only by the review workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

/// A fully validated submission ready for insertion; everything but the
/// repository-assigned id and the initial status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewApplication {
    pub business: BusinessProfile,
    pub address: PostalAddress,
    pub contact: ContactPerson,
    pub compliance: ComplianceProfile,
    pub documents: DocumentSet,
    pub submitted_at: DateTime<Utc>,
}

/// One intake record as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub id: ApplicationId,
    pub business: BusinessProfile,
    pub address: PostalAddress,
    pub contact: ContactPerson,
    pub compliance: ComplianceProfile,
    pub documents: DocumentSet,
    pub submitted_at: DateTime<Utc>,
    pub status: ApplicationStatus,
}

impl ApplicationRecord {
    /// Build the stored record for a freshly accepted submission. Status is
    /// forced to `Pending` regardless of anything the client posted.
    pub fn accepted(id: ApplicationId, submission: NewApplication) -> Self {
        Self {
            id,
            business: submission.business,
            address: submission.address,
            contact: submission.contact,
            compliance: submission.compliance,
            documents: submission.documents,
            submitted_at: submission.submitted_at,
            status: ApplicationStatus::Pending,
        }
    }
}
