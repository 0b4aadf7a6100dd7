use mongodb::{
    bson,
    error::{ErrorKind, WriteFailure},
};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database driver error: {0}")]
    Driver(#[from] mongodb::error::Error),

    #[error("invalid object id: {0}")]
    InvalidId(#[from] bson::oid::Error),

    #[error("failed to serialize document: {0}")]
    Serialize(#[from] bson::ser::Error),

    #[error("failed to deserialize document: {0}")]
    Deserialize(#[from] bson::de::Error),

    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Raised by `MemoryStore`. The driver reports the same failure as a
    /// [`StoreError::Driver`] write error, see [`StoreError::is_duplicate_key`].
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl StoreError {
    /// True when a write was rejected for reusing a unique key, whichever
    /// backend reported it.
    pub fn is_duplicate_key(&self) -> bool {
        match self {
            Self::DuplicateKey(_) => true,
            Self::Driver(e) => match e.kind.as_ref() {
                ErrorKind::Write(WriteFailure::WriteError(w)) => w.code == DUPLICATE_KEY_CODE,
                ErrorKind::BulkWrite(failure) => failure
                    .write_errors
                    .iter()
                    .flatten()
                    .any(|w| w.code == DUPLICATE_KEY_CODE),
                _ => false,
            },
            _ => false,
        }
    }
}
