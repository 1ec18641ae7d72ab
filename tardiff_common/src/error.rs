use thiserror::Error;

#[derive(Error, Debug)]
pub enum TarDiffError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot open archive {path}: {reason}")]
    ArchiveOpen { path: String, reason: String },

    #[error("Invalid archive structure in {archive}: {reason}")]
    InvalidArchiveStructure { archive: String, reason: String },

    #[error("Member not found: {root}/{path}")]
    MemberNotFound { root: String, path: String },
}

pub type Result<T> = std::result::Result<T, TarDiffError>;

impl TarDiffError {
    pub fn archive_open(path: impl Into<String>, reason: impl ToString) -> Self {
        TarDiffError::ArchiveOpen {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_structure(archive: impl Into<String>, reason: impl Into<String>) -> Self {
        TarDiffError::InvalidArchiveStructure {
            archive: archive.into(),
            reason: reason.into(),
        }
    }
}
