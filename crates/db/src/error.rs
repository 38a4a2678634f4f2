//! Error types for administrative store calls

use mongodb::error::{ErrorKind, WriteFailure};
use thiserror::Error;

/// Server code returned by `createUser` when the principal already exists.
pub const CODE_USER_EXISTS: i32 = 51003;
/// Server code returned by `create` when the namespace already exists.
pub const CODE_NAMESPACE_EXISTS: i32 = 48;
/// Server code for a unique index violation.
pub const CODE_DUPLICATE_KEY: i32 = 11000;
/// Server code for a write rejected by a collection validator.
pub const CODE_DOCUMENT_VALIDATION: i32 = 121;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Failures surfaced by a [`Store`](crate::Store).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("principal '{user}' already exists on database '{database}'")]
    DuplicatePrincipal { user: String, database: String },

    #[error("collection '{0}' already exists")]
    DuplicateCollection(String),

    #[error("duplicate key in '{collection}': {message}")]
    DuplicateKey { collection: String, message: String },

    #[error("document failed validation for '{collection}': {message}")]
    SchemaValidation { collection: String, message: String },

    #[error("command failed ({code}): {message}")]
    Command { code: i32, message: String },

    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),
}

impl StoreError {
    /// Map a failed `createUser` for `user` on `database` to a variant.
    pub(crate) fn from_principal_code(
        user: &str,
        database: &str,
        code: i32,
        message: String,
    ) -> Self {
        match code {
            CODE_USER_EXISTS => Self::DuplicatePrincipal {
                user: user.to_string(),
                database: database.to_string(),
            },
            code => Self::Command { code, message },
        }
    }

    /// Map a failed `create` for collection `name` to a variant.
    pub(crate) fn from_collection_code(name: &str, code: i32, message: String) -> Self {
        match code {
            CODE_NAMESPACE_EXISTS => Self::DuplicateCollection(name.to_string()),
            code => Self::Command { code, message },
        }
    }

    /// Map a server error code from a write on `collection` to a variant.
    pub(crate) fn from_write_code(collection: &str, code: i32, message: String) -> Self {
        match code {
            CODE_DUPLICATE_KEY => Self::DuplicateKey {
                collection: collection.to_string(),
                message,
            },
            CODE_DOCUMENT_VALIDATION => Self::SchemaValidation {
                collection: collection.to_string(),
                message,
            },
            code => Self::Command { code, message },
        }
    }

    pub fn is_duplicate_principal(&self) -> bool {
        matches!(self, Self::DuplicatePrincipal { .. })
    }

    pub fn is_duplicate_collection(&self) -> bool {
        matches!(self, Self::DuplicateCollection(_))
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Self::DuplicateKey { .. })
    }

    pub fn is_schema_validation(&self) -> bool {
        matches!(self, Self::SchemaValidation { .. })
    }
}

/// Server code carried by a driver error, if it came from the server.
pub(crate) fn server_code(err: &mongodb::error::Error) -> Option<i32> {
    match err.kind.as_ref() {
        ErrorKind::Command(command) => Some(command.code),
        ErrorKind::Write(WriteFailure::WriteError(write)) => Some(write.code),
        _ => None,
    }
}
