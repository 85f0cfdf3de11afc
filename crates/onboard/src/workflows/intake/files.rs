use std::fs;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extensions accepted for uploaded documents, matched case-insensitively
/// against the substring after the last `.` in the filename.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// Upload size ceiling. A file of exactly this many bytes is accepted.
pub const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

/// The four document slots on the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentSlot {
    Registration,
    RepresentativeId,
    Tax,
    ProofOfAddress,
}

impl DocumentSlot {
    pub const ALL: [Self; 4] = [
        Self::Registration,
        Self::RepresentativeId,
        Self::Tax,
        Self::ProofOfAddress,
    ];

    /// The multipart field name this slot is posted under.
    pub const fn field_name(self) -> &'static str {
        match self {
            Self::Registration => "reg_doc",
            Self::RepresentativeId => "rep_id_doc",
            Self::Tax => "tax_doc",
            Self::ProofOfAddress => "proof_address",
        }
    }

    /// Registration and representative ID must be uploaded; the rest may be
    /// absent, but still face extension and size checks when present.
    pub const fn is_required(self) -> bool {
        matches!(self, Self::Registration | Self::RepresentativeId)
    }

    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|slot| slot.field_name() == name)
    }
}

/// An uploaded file: the client-supplied name plus a re-readable content
/// stream.
#[derive(Debug)]
pub struct DocumentUpload<R> {
    pub filename: String,
    pub content: R,
}

/// Why an upload was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FileRejection {
    #[error("This file is required.")]
    MissingRequired,
    #[error("Only PDF/JPG/PNG allowed.")]
    BadExtension,
    #[error("File too large (>2MB).")]
    TooLarge,
}

/// Outcome of checking one slot: a rejection to report against the field, or
/// a stream fault that aborts the whole submission.
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error(transparent)]
    Rejected(#[from] FileRejection),
    #[error("upload stream fault: {0}")]
    Stream(#[from] io::Error),
}

/// Lowercased extension after the last dot, or `None` for dotless names.
fn extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Measure a stream by seeking to its end, then rewind. The rewind is
/// mandatory: the same stream is consumed again by the save step.
fn measure<R: Seek>(content: &mut R) -> io::Result<u64> {
    let len = content.seek(SeekFrom::End(0))?;
    content.rewind()?;
    Ok(len)
}

/// Validate one slot. `Ok(Some(key))` carries the sanitized storage key for
/// an accepted upload; `Ok(None)` means an optional slot was left empty.
pub fn check_upload<R: Read + Seek>(
    slot: DocumentSlot,
    upload: Option<&mut DocumentUpload<R>>,
) -> Result<Option<String>, SlotError> {
    let Some(upload) = upload else {
        if slot.is_required() {
            return Err(FileRejection::MissingRequired.into());
        }
        return Ok(None);
    };

    match extension(&upload.filename) {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext.as_str()) => {}
        _ => return Err(FileRejection::BadExtension.into()),
    }

    if measure(&mut upload.content)? > MAX_FILE_BYTES {
        return Err(FileRejection::TooLarge.into());
    }

    Ok(Some(sanitize_filename(&upload.filename)))
}

/// Strip path components and unsafe characters so the result is usable as a
/// storage key. Empty results fall back to `"file"`.
pub fn sanitize_filename(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "file".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Durable storage for accepted uploads.
pub trait DocumentStore: Send + Sync {
    /// Write the content under (a derivative of) `key`, returning the stored
    /// path. Implementations must not overwrite an existing document with the
    /// same key.
    fn store(&self, key: &str, content: &mut dyn Read) -> Result<String, DocumentStoreError>;

    /// Remove a previously stored document, for cleanup after a failed
    /// insert.
    fn remove(&self, path: &str) -> Result<(), DocumentStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DocumentStoreError {
    #[error("document storage fault: {0}")]
    Io(#[from] io::Error),
}

/// Filesystem-backed document store rooted at the configured upload
/// directory. Colliding keys get a numeric suffix before the extension
/// instead of overwriting.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    /// Open the store, creating the upload directory if needed.
    pub fn create(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unique_path(&self, key: &str) -> PathBuf {
        let candidate = self.root.join(key);
        if !candidate.exists() {
            return candidate;
        }

        let (stem, ext) = match key.rsplit_once('.') {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (key, None),
        };

        let mut counter = 1u32;
        loop {
            let name = match ext {
                Some(ext) => format!("{stem}-{counter}.{ext}"),
                None => format!("{stem}-{counter}"),
            };
            let candidate = self.root.join(name);
            if !candidate.exists() {
                return candidate;
            }
            counter += 1;
        }
    }
}

impl DocumentStore for FsDocumentStore {
    fn store(&self, key: &str, content: &mut dyn Read) -> Result<String, DocumentStoreError> {
        let path = self.unique_path(key);
        let mut file = fs::File::create(&path)?;
        io::copy(content, &mut file)?;
        Ok(path.display().to_string())
    }

    fn remove(&self, path: &str) -> Result<(), DocumentStoreError> {
        fs::remove_file(path)?;
        Ok(())
    }
}
