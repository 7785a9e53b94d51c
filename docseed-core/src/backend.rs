//! Storage backend abstraction for the document store.
//!
//! The [`StoreBackend`] trait is the seam between the schema manager and a
//! concrete document store. Backends own query execution, update application,
//! validation and unique index enforcement; the manager only orchestrates.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Write semantics
//!
//! Multi-document writes are ordered and non-atomic. A backend processes
//! documents in order, stops at the first failure, leaves earlier writes in
//! place and reports the failure as
//! [`DocumentStoreError::BulkWrite`](crate::error::DocumentStoreError::BulkWrite).

use async_trait::async_trait;
use bson::Document as BsonDocument;
use futures::stream::BoxStream;
use std::fmt::Debug;

use crate::{
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::{Expr, Query},
    schema::{CollectionInfo, IndexSpec, Validator},
    update::Update,
};

/// A lazy, finite, single-pass sequence of documents.
pub type DocumentStream = BoxStream<'static, DocumentStoreResult<BsonDocument>>;

/// Outcome of a multi-document write.
///
/// For inserts `attempted` is the batch size; for updates it is the number of
/// documents matched by the filter. `applied` counts documents actually written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub attempted: usize,
    pub applied: usize,
}

/// Abstract interface for document storage backends.
///
/// All implementations must be thread-safe. Operations are async and are
/// expected to block only on the underlying store.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Checks that the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`StoreUnavailable`](crate::error::DocumentStoreError::StoreUnavailable)
    /// when the store cannot be contacted.
    async fn ping(&self) -> DocumentStoreResult<()>;

    /// Creates a collection, optionally guarded by a validator.
    ///
    /// Creating a collection that already exists with the same validator is a
    /// no-op; a different validator yields
    /// [`SchemaConflict`](crate::error::DocumentStoreError::SchemaConflict).
    async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()>;

    /// Drops (deletes) a collection and all its documents.
    ///
    /// # Warning
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Describes every collection in the store, store-internal ones included.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>>;

    /// Creates an index. Re-creating an identical index is a no-op.
    ///
    /// A unique index over existing duplicate values fails with
    /// [`DuplicateKey`](crate::error::DocumentStoreError::DuplicateKey).
    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()>;

    /// Inserts documents in order. The collection is created on first use.
    ///
    /// Documents without an `_id` are assigned one.
    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<WriteSummary>;

    /// Applies `update` to every document matching `filter` (all documents when `None`).
    async fn update_documents(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: &Update,
    ) -> DocumentStoreResult<WriteSummary>;

    /// Queries documents. A missing collection yields an empty stream.
    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Runs an aggregation pipeline. A missing collection yields an empty stream.
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream>;

    /// Cleanly shuts down the backend, releasing all resources.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn ping(&self) -> DocumentStoreResult<()>;
    async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>>;
    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()>;
    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<WriteSummary>;
    async fn update_documents(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: &Update,
    ) -> DocumentStoreResult<WriteSummary>;
    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<DocumentStream>;
    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn ping(&self) -> DocumentStoreResult<()> {
        StoreBackend::ping(self).await
    }

    async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name, validator).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
        StoreBackend::list_collections(self).await
    }

    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        StoreBackend::add_index(self, collection, index).await
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<WriteSummary> {
        StoreBackend::insert_documents(self, collection, documents).await
    }

    async fn update_documents(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: &Update,
    ) -> DocumentStoreResult<WriteSummary> {
        StoreBackend::update_documents(self, collection, filter, update).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<DocumentStream> {
        StoreBackend::query_documents(self, collection, query).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream> {
        StoreBackend::aggregate(self, collection, pipeline).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }
}

/// Lets a boxed backend chosen at runtime drive a [`DocumentStore`](crate::store::DocumentStore).
#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn ping(&self) -> DocumentStoreResult<()> {
        DynStoreBackend::ping(&**self).await
    }

    async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()> {
        DynStoreBackend::create_collection(&**self, name, validator).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_collection(&**self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
        DynStoreBackend::list_collections(&**self).await
    }

    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        DynStoreBackend::add_index(&**self, collection, index).await
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<WriteSummary> {
        DynStoreBackend::insert_documents(&**self, collection, documents).await
    }

    async fn update_documents(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: &Update,
    ) -> DocumentStoreResult<WriteSummary> {
        DynStoreBackend::update_documents(&**self, collection, filter, update).await
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<DocumentStream> {
        DynStoreBackend::query_documents(&**self, collection, query).await
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream> {
        DynStoreBackend::aggregate(&**self, collection, pipeline).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
