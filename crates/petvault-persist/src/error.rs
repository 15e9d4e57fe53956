use petvault_core::{codec::CodecError, storage::StorageError, validate::ValidationRejected};
use petvault_storage::{
    cipher::{AuthFailure, CipherError},
    payload::FormatError,
    sealer::SealError,
    secret::SecretError,
};
use thiserror::Error;

/// Coarse classification used in diagnostics and load outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Storage,
    Format,
    Auth,
    Validation,
    Codec,
    Secret,
    Cipher,
    NotReady,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Auth(#[from] AuthFailure),
    #[error(transparent)]
    Validation(#[from] ValidationRejected),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("secret unavailable: {0}")]
    Secret(#[from] SecretError),
    #[error(transparent)]
    Cipher(#[from] CipherError),
    #[error("saved state has not been loaded yet")]
    NotReady,
}

impl PersistError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PersistError::Storage(_) => ErrorKind::Storage,
            PersistError::Format(_) => ErrorKind::Format,
            PersistError::Auth(_) => ErrorKind::Auth,
            PersistError::Validation(_) => ErrorKind::Validation,
            PersistError::Codec(_) => ErrorKind::Codec,
            PersistError::Secret(_) => ErrorKind::Secret,
            PersistError::Cipher(_) => ErrorKind::Cipher,
            PersistError::NotReady => ErrorKind::NotReady,
        }
    }
}

impl From<SealError> for PersistError {
    fn from(err: SealError) -> Self {
        match err {
            SealError::Format(e) => PersistError::Format(e),
            SealError::Auth(e) => PersistError::Auth(e),
            SealError::Cipher(e) => PersistError::Cipher(e),
        }
    }
}
