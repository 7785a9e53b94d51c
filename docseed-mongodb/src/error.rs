//! Classification of MongoDB driver errors.

use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

use docseed_core::error::DocumentStoreError;

const NAMESPACE_EXISTS: i32 = 48;
const INDEX_OPTIONS_CONFLICT: i32 = 85;
const INDEX_KEY_SPECS_CONFLICT: i32 = 86;
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;
const DUPLICATE_KEY: i32 = 11000;

/// Maps a driver error raised while working on `collection` to a store error.
pub(crate) fn classify(collection: &str, err: MongoError) -> DocumentStoreError {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write)) => by_code(collection, write.code, &write.message),
        ErrorKind::Command(command) => by_code(collection, command.code, &command.message),
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. } => DocumentStoreError::StoreUnavailable(err.to_string()),
        _ => DocumentStoreError::Backend(err.to_string()),
    }
}

fn by_code(collection: &str, code: i32, message: &str) -> DocumentStoreError {
    match code {
        DUPLICATE_KEY => DocumentStoreError::DuplicateKey {
            collection: collection.to_string(),
            key: message.to_string(),
        },
        DOCUMENT_VALIDATION_FAILURE => DocumentStoreError::ValidationFailed {
            collection: collection.to_string(),
            reason: message.to_string(),
        },
        NAMESPACE_EXISTS | INDEX_OPTIONS_CONFLICT | INDEX_KEY_SPECS_CONFLICT => DocumentStoreError::SchemaConflict {
            collection: collection.to_string(),
            reason: message.to_string(),
        },
        _ => DocumentStoreError::Backend(format!("{message} (code {code})")),
    }
}
