//! Collection handles for document store operations.
//!
//! - [`Collection`] - Untyped collection working on raw BSON documents
//! - [`TypedCollection`] - Type-safe view of a collection for one [`Document`] type
//!
//! # Example
//!
//! ```ignore
//! use docseed::prelude::*;
//!
//! # async fn example(store: &DocumentStore<impl StoreBackend>) -> DocumentStoreResult<()> {
//! let publishers = store.collection("Editeurs");
//! publishers.update_many(None, Update::increment("editeur_id", -5)).await?;
//! let first = publishers.find_one(None).await?;
//! # Ok(()) }
//! ```

use bson::Document as BsonDocument;
use futures::{StreamExt, TryStreamExt, stream::BoxStream};
use std::marker::PhantomData;

use crate::{
    backend::{DocumentStream, StoreBackend, WriteSummary},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::{Pipeline, Stage},
    query::{Expr, Query},
    update::Update,
};

/// An untyped collection with a reference to a storage backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts a single document.
    ///
    /// # Errors
    ///
    /// Returns the store's error as is, e.g.
    /// [`DuplicateKey`](DocumentStoreError::DuplicateKey) or
    /// [`ValidationFailed`](DocumentStoreError::ValidationFailed).
    pub async fn insert_one(&self, document: BsonDocument) -> DocumentStoreResult<()> {
        match self
            .backend
            .insert_documents(&self.name, vec![document])
            .await
        {
            Ok(_) => Ok(()),
            Err(DocumentStoreError::BulkWrite { source, .. }) => Err(*source),
            Err(err) => Err(err),
        }
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns [`BulkWrite`](DocumentStoreError::BulkWrite) carrying the number
    /// of documents written before the failure.
    pub async fn insert_many(&self, documents: Vec<BsonDocument>) -> DocumentStoreResult<WriteSummary> {
        self.backend
            .insert_documents(&self.name, documents)
            .await
    }

    /// Applies `update` to every document matching `filter` (all documents when `None`).
    pub async fn update_many(
        &self,
        filter: Option<Expr>,
        update: Update,
    ) -> DocumentStoreResult<WriteSummary> {
        update.check()?;

        self.backend
            .update_documents(&self.name, filter, &update)
            .await
    }

    /// Returns a lazy stream over the documents matching `filter`.
    pub async fn find(&self, filter: Option<Expr>) -> DocumentStoreResult<DocumentStream> {
        self.query(Query::filtered(filter)).await
    }

    /// Returns a lazy stream over the documents selected by `query`.
    pub async fn query(&self, query: Query) -> DocumentStoreResult<DocumentStream> {
        self.backend
            .query_documents(&self.name, query)
            .await
    }

    /// Collects the documents selected by `query`.
    pub async fn query_all(&self, query: Query) -> DocumentStoreResult<Vec<BsonDocument>> {
        self.query(query)
            .await?
            .try_collect()
            .await
    }

    /// Returns the first document matching `filter` in natural order.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](DocumentStoreError::NotFound) when nothing matches.
    pub async fn find_one(&self, filter: Option<Expr>) -> DocumentStoreResult<BsonDocument> {
        let query = Query {
            filter,
            limit: Some(1),
            ..Query::default()
        };

        self.query(query)
            .await?
            .try_next()
            .await?
            .ok_or_else(|| DocumentStoreError::NotFound(self.name.clone()))
    }

    /// Runs an aggregation pipeline over the collection.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPipeline`](DocumentStoreError::EmptyPipeline) when the
    /// pipeline has no stage, and
    /// [`InvalidOperation`](DocumentStoreError::InvalidOperation) for a zero limit.
    pub async fn aggregate(&self, pipeline: &Pipeline) -> DocumentStoreResult<DocumentStream> {
        if pipeline.is_empty() {
            return Err(DocumentStoreError::EmptyPipeline(self.name.clone()));
        }

        if pipeline.stages().contains(&Stage::Limit(0)) {
            return Err(DocumentStoreError::InvalidOperation(
                "limit stage must be positive".to_string(),
            ));
        }

        self.backend
            .aggregate(&self.name, pipeline)
            .await
    }
}

/// A collection viewed through one typed [`Document`].
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    inner: Collection<'a, B>,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(backend: &'a B) -> Self {
        Self {
            inner: Collection::new(D::collection_name().to_string(), backend),
            _marker: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Inserts a single document.
    pub async fn insert_one(&self, document: &D) -> DocumentStoreResult<()> {
        self.inner
            .insert_one(document.to_document()?)
            .await
    }

    /// Inserts documents in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns a serialization error before anything is written if any
    /// document fails to serialize.
    pub async fn insert_many(&self, documents: &[D]) -> DocumentStoreResult<WriteSummary> {
        self.inner
            .insert_many(
                documents
                    .iter()
                    .map(DocumentExt::to_document)
                    .collect::<DocumentStoreResult<Vec<_>>>()?,
            )
            .await
    }

    /// Returns a lazy stream of typed documents matching `filter`.
    pub async fn find(
        &self,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<BoxStream<'static, DocumentStoreResult<D>>> {
        Ok(self
            .inner
            .find(filter)
            .await?
            .map(|document| document.and_then(D::from_document))
            .boxed())
    }

    /// Collects the typed documents selected by `query`.
    pub async fn query_all(&self, query: Query) -> DocumentStoreResult<Vec<D>> {
        self.inner
            .query_all(query)
            .await?
            .into_iter()
            .map(D::from_document)
            .collect()
    }

    /// Returns the first typed document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](DocumentStoreError::NotFound) when nothing matches.
    pub async fn find_one(&self, filter: Option<Expr>) -> DocumentStoreResult<D> {
        D::from_document(self.inner.find_one(filter).await?)
    }
}
