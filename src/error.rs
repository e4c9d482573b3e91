use crate::models::FileId;
use thiserror::Error;

/// Why a file's S3 key could not be resolved.
///
/// Clone so that every waiter on a shared resolution sees the same failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("{0} is not a valid value for the s3.keyname option")]
    InvalidKeyNaming(String),

    #[error("Failed to retrieve key name for {id}")]
    KeyNameUnavailable { id: FileId },

    #[error("No file is tracked under id {id}")]
    UnknownFile { id: FileId },

    #[error("Resolved an empty key name for {id}")]
    EmptyKey { id: FileId },

    #[error("Uploader was reset while resolving key name for {id}")]
    Reset { id: FileId },
}

pub type Result<T> = std::result::Result<T, KeyError>;
