//! Error types and result types for document store operations.
//!
//! Every fallible operation in the workspace returns [`DocumentStoreResult<T>`].
//! Backends classify their native failures into the variants below so that the
//! schema manager and its callers can react to them uniformly.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The store could not be reached (connection refused, timeout, network failure).
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
    /// A collection or index already exists with a different definition.
    #[error("Schema conflict on collection {collection}: {reason}")]
    SchemaConflict { collection: String, reason: String },
    /// A schema definition is malformed and cannot be applied.
    #[error("Invalid schema for collection {collection}: {reason}")]
    InvalidSchema { collection: String, reason: String },
    /// A write would violate a unique index.
    #[error("Duplicate key {key} in collection {collection}")]
    DuplicateKey { collection: String, key: String },
    /// A single-result query matched nothing.
    #[error("No document matches the query in collection {0}")]
    NotFound(String),
    /// An aggregation was requested without any stage.
    #[error("Aggregation pipeline on collection {0} has no stages")]
    EmptyPipeline(String),
    /// A document was rejected by the collection validator.
    #[error("Document failed validation in collection {collection}: {reason}")]
    ValidationFailed { collection: String, reason: String },
    /// An update operator cannot be applied to the targeted value.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    /// An ordered multi-document write stopped part way through.
    ///
    /// Documents written before the failure are left in place.
    #[error("Bulk write on collection {collection} stopped after {applied} of {attempted} documents: {source}")]
    BulkWrite {
        collection: String,
        applied: usize,
        attempted: usize,
        #[source]
        source: Box<DocumentStoreError>,
    },
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred in the underlying storage backend.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Returns the error that caused a bulk write to stop, or `self` for any other error.
    pub fn root(&self) -> &DocumentStoreError {
        match self {
            DocumentStoreError::BulkWrite { source, .. } => source.root(),
            other => other,
        }
    }

    /// Wraps `source` as the cause of an ordered write that stopped after `applied` documents.
    pub fn bulk(
        collection: &str,
        applied: usize,
        attempted: usize,
        source: DocumentStoreError,
    ) -> Self {
        DocumentStoreError::BulkWrite {
            collection: collection.to_string(),
            applied,
            attempted,
            source: Box::new(source),
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
