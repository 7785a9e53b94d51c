//! Schema and seed management.
//!
//! [`SchemaManager`] brings a store to a known state and runs the bulk
//! operations used on seeded data. Its lifecycle per collection is
//! `Absent --define_schema--> Defined --reset--> Absent`.
//!
//! ```ignore
//! use docseed::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let manager = SchemaManager::new(&store);
//!
//! manager
//!     .initialize(
//!         &[CollectionSchema::new("Editeurs")
//!             .any_of([("editeur_id", FieldType::Number)])
//!             .unique_index("editeur_id")],
//!         vec![SeedBatch::new("Editeurs", vec![doc! { "editeur_id": 0_i64 }])],
//!     )
//!     .await?;
//! ```

use bson::Document as BsonDocument;
use tracing::{debug, info, warn};

use crate::{
    backend::{DocumentStream, StoreBackend, WriteSummary},
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    pipeline::Pipeline,
    query::Expr,
    schema::{CollectionInfo, CollectionSchema, is_system_collection},
    store::DocumentStore,
    update::Update,
};

/// Documents destined for one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedBatch {
    pub collection: String,
    pub documents: Vec<BsonDocument>,
}

impl SeedBatch {
    pub fn new(collection: impl Into<String>, documents: Vec<BsonDocument>) -> Self {
        Self { collection: collection.into(), documents }
    }

    /// Serializes typed documents into a batch for their own collection.
    pub fn typed<D: Document>(documents: &[D]) -> DocumentStoreResult<Self> {
        Ok(Self::new(
            D::collection_name(),
            documents
                .iter()
                .map(DocumentExt::to_document)
                .collect::<DocumentStoreResult<Vec<_>>>()?,
        ))
    }
}

/// What [`SchemaManager::initialize`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitReport {
    pub dropped: Vec<String>,
    pub defined: Vec<String>,
    pub seeded: Vec<(String, WriteSummary)>,
}

/// Defines schemas, resets and seeds collections, and runs bulk operations
/// against an explicitly supplied store.
#[derive(Debug)]
pub struct SchemaManager<'a, B: StoreBackend> {
    store: &'a DocumentStore<B>,
}

impl<'a, B: StoreBackend> SchemaManager<'a, B> {
    pub fn new(store: &'a DocumentStore<B>) -> Self {
        Self { store }
    }

    /// Drops every user collection, leaving `system.*` collections alone.
    ///
    /// Returns the dropped names. Resetting an empty store is a no-op.
    ///
    /// # Warning
    ///
    /// All documents in the dropped collections are lost.
    pub async fn reset(&self) -> DocumentStoreResult<Vec<String>> {
        let mut dropped = Vec::new();

        for info in self.store.list_collections().await? {
            if is_system_collection(&info.name) {
                debug!(collection = %info.name, "skipping system collection");
                continue;
            }

            self.store.drop_collection(&info.name).await?;
            dropped.push(info.name);
        }

        info!(count = dropped.len(), "reset store");

        Ok(dropped)
    }

    /// Creates the collection with its validator, then its indexes.
    ///
    /// # Errors
    ///
    /// - [`InvalidSchema`](crate::error::DocumentStoreError::InvalidSchema) for a malformed definition
    /// - [`SchemaConflict`](crate::error::DocumentStoreError::SchemaConflict) if the collection
    ///   or one of its indexes exists with another definition
    /// - [`StoreUnavailable`](crate::error::DocumentStoreError::StoreUnavailable) if the store
    ///   cannot be reached
    pub async fn define_schema(&self, schema: &CollectionSchema) -> DocumentStoreResult<()> {
        schema.check()?;

        self.store
            .create_collection(&schema.name, schema.validator.as_ref())
            .await?;

        for index in &schema.indexes {
            self.store.add_index(&schema.name, index).await?;
        }

        info!(
            collection = %schema.name,
            constraints = schema.validator.as_ref().map(|v| v.constraints().len()).unwrap_or(0),
            indexes = schema.indexes.len(),
            "defined schema"
        );

        Ok(())
    }

    /// Inserts documents in order.
    ///
    /// # Errors
    ///
    /// Stops at the first rejected document and returns
    /// [`BulkWrite`](crate::error::DocumentStoreError::BulkWrite); documents
    /// inserted before it stay in the collection.
    pub async fn seed(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<WriteSummary> {
        let summary = self
            .store
            .collection(collection)
            .insert_many(documents)
            .await
            .inspect_err(|err| warn!(collection, error = %err, "seed stopped"))?;

        info!(collection, inserted = summary.applied, "seeded collection");

        Ok(summary)
    }

    /// Applies `update` to every document matching `filter` (all documents when `None`).
    pub async fn bulk_transform(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: Update,
    ) -> DocumentStoreResult<WriteSummary> {
        debug!(collection, ?update, "bulk transform");

        let summary = self
            .store
            .collection(collection)
            .update_many(filter, update)
            .await?;

        info!(collection, matched = summary.attempted, modified = summary.applied, "transformed collection");

        Ok(summary)
    }

    /// Returns a lazy stream over the documents matching `filter`.
    pub async fn query(
        &self,
        collection: &str,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<DocumentStream> {
        self.store
            .collection(collection)
            .find(filter)
            .await
    }

    /// Returns the first document matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::error::DocumentStoreError::NotFound) when nothing matches.
    pub async fn find_one(
        &self,
        collection: &str,
        filter: Option<Expr>,
    ) -> DocumentStoreResult<BsonDocument> {
        self.store
            .collection(collection)
            .find_one(filter)
            .await
    }

    /// Runs an aggregation pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`EmptyPipeline`](crate::error::DocumentStoreError::EmptyPipeline) for a pipeline without stages.
    pub async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream> {
        debug!(collection, stages = pipeline.stages().len(), "aggregate");

        self.store
            .collection(collection)
            .aggregate(pipeline)
            .await
    }

    /// Describes every user collection, sorted by name.
    pub async fn metadata(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
        let mut infos = self
            .store
            .list_collections()
            .await?
            .into_iter()
            .filter(|info| !is_system_collection(&info.name))
            .collect::<Vec<_>>();

        infos.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(infos)
    }

    /// Resets the store, defines every schema, then seeds every batch, in that order.
    pub async fn initialize(
        &self,
        schemas: &[CollectionSchema],
        seeds: Vec<SeedBatch>,
    ) -> DocumentStoreResult<InitReport> {
        let mut report = InitReport {
            dropped: self.reset().await?,
            ..InitReport::default()
        };

        for schema in schemas {
            self.define_schema(schema).await?;
            report.defined.push(schema.name.clone());
        }

        for batch in seeds {
            let summary = self.seed(&batch.collection, batch.documents).await?;
            report.seeded.push((batch.collection, summary));
        }

        Ok(report)
    }
}
