//! In-memory storage implementation for document stores.
//!
//! Documents live in insertion order inside per-collection vectors behind an
//! async-safe read-write lock. Validators and unique indexes are enforced on
//! every write, the way a MongoDB server would.

use std::{collections::BTreeMap, sync::Arc};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use mea::rwlock::RwLock;
use bson::{Bson, Document as BsonDocument, doc, oid::ObjectId};
use tracing::debug;

use docseed_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder, WriteSummary},
    document::{ID_FIELD, lookup},
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Query},
    schema::{CollectionInfo, CollectionKind, IndexSpec, Validator},
    update::Update,
};

use crate::{
    evaluator::{Comparable, DocumentEvaluator, sort_documents},
    pipeline,
};

type StoreMap = BTreeMap<String, MemoryCollection>;

#[derive(Debug, Default)]
struct MemoryCollection {
    validator: Option<Validator>,
    indexes: Vec<IndexSpec>,
    documents: Vec<BsonDocument>,
}

impl MemoryCollection {
    /// Fields whose values must be unique across the collection.
    fn unique_fields(&self) -> impl Iterator<Item = &str> {
        std::iter::once(ID_FIELD).chain(
            self.indexes
                .iter()
                .filter(|index| index.unique)
                .map(|index| index.field.as_str()),
        )
    }

    /// Checks `document` against the validator and unique indexes, ignoring
    /// the stored document at `replacing`.
    fn admit(
        &self,
        collection: &str,
        document: &BsonDocument,
        replacing: Option<usize>,
    ) -> DocumentStoreResult<()> {
        if let Some(validator) = &self.validator {
            if !validator.matches(document) {
                return Err(DocumentStoreError::ValidationFailed {
                    collection: collection.to_string(),
                    reason: format!("document does not satisfy {}", validator.to_document()),
                });
            }
        }

        for field in self.unique_fields() {
            let value = unique_key(document, field);

            let taken = self
                .documents
                .iter()
                .enumerate()
                .filter(|(position, _)| Some(*position) != replacing)
                .any(|(_, existing)| Comparable::from(&unique_key(existing, field)) == Comparable::from(&value));

            if taken {
                return Err(DocumentStoreError::DuplicateKey {
                    collection: collection.to_string(),
                    key: format!("{{ {field}: {value} }}"),
                });
            }
        }

        Ok(())
    }
}

/// Indexed value of `field`; a missing field indexes as null.
fn unique_key(document: &BsonDocument, field: &str) -> Bson {
    lookup(document, field)
        .cloned()
        .unwrap_or(Bson::Null)
}

/// Puts an `_id` first in the document, generating one when absent.
fn with_id(mut document: BsonDocument) -> BsonDocument {
    let id = document
        .remove(ID_FIELD)
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));
    let mut stored = doc! { ID_FIELD: id };

    stored.extend(document);
    stored
}


/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing
/// it to be safely shared across async tasks. Multiple clones of the same instance
/// share the same underlying data.
///
/// Queries and unique checks scan the whole collection.
///
/// # Example
///
/// ```ignore
/// use docseed_memory::InMemoryStore;
/// use docseed::prelude::*;
///
/// let store = DocumentStore::new(InMemoryStore::new());
/// store.collection("Editeurs").insert_one(doc! { "editeur_id": 0_i64 }).await?;
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self {
            store: Arc::new(RwLock::new(StoreMap::new())),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore`.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }
}


#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        Ok(())
    }

    async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if let Some(existing) = store.get(name) {
            if existing.validator.as_ref() == validator {
                return Ok(());
            }

            return Err(DocumentStoreError::SchemaConflict {
                collection: name.to_string(),
                reason: "collection already exists with different options".to_string(),
            });
        }

        store.insert(
            name.to_string(),
            MemoryCollection {
                validator: validator.cloned(),
                ..MemoryCollection::default()
            },
        );

        debug!(collection = name, "created collection");

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        if self.store.write().await.remove(name).is_some() {
            debug!(collection = name, "dropped collection");
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
        Ok(
            self.store
                .read()
                .await
                .iter()
                .map(|(name, collection)| CollectionInfo {
                    name: name.clone(),
                    kind: CollectionKind::Collection,
                    options: match &collection.validator {
                        Some(validator) => doc! { "validator": validator.to_document() },
                        None => BsonDocument::new(),
                    },
                })
                .collect()
        )
    }

    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;
        let target = store
            .entry(collection.to_string())
            .or_default();

        if let Some(existing) = target.indexes.iter().find(|existing| existing.field == index.field) {
            if existing == index {
                return Ok(());
            }

            return Err(DocumentStoreError::SchemaConflict {
                collection: collection.to_string(),
                reason: format!("index {} already exists with different options", index.name()),
            });
        }

        if index.unique {
            for (position, document) in target.documents.iter().enumerate() {
                let value = unique_key(document, &index.field);

                if target.documents[..position]
                    .iter()
                    .any(|earlier| Comparable::from(&unique_key(earlier, &index.field)) == Comparable::from(&value))
                {
                    return Err(DocumentStoreError::DuplicateKey {
                        collection: collection.to_string(),
                        key: format!("{{ {}: {value} }}", index.field),
                    });
                }
            }
        }

        target.indexes.push(index.clone());

        debug!(collection, index = %index.name(), unique = index.unique, "created index");

        Ok(())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<BsonDocument>,
    ) -> DocumentStoreResult<WriteSummary> {
        let mut store = self.store.write().await;
        let target = store
            .entry(collection.to_string())
            .or_default();

        let attempted = documents.len();

        for (applied, document) in documents.into_iter().enumerate() {
            let document = with_id(document);

            if let Err(err) = target.admit(collection, &document, None) {
                return Err(DocumentStoreError::bulk(collection, applied, attempted, err));
            }

            target.documents.push(document);
        }

        Ok(WriteSummary { attempted, applied: attempted })
    }

    async fn update_documents(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: &Update,
    ) -> DocumentStoreResult<WriteSummary> {
        update.check()?;

        let mut store = self.store.write().await;
        let Some(target) = store.get_mut(collection) else {
            return Ok(WriteSummary::default());
        };

        let mut matched = Vec::new();

        for (position, document) in target.documents.iter().enumerate() {
            if DocumentEvaluator::matches(document, filter.as_ref())? {
                matched.push(position);
            }
        }

        let mut summary = WriteSummary { attempted: matched.len(), applied: 0 };

        for position in matched {
            let mut candidate = target.documents[position].clone();

            let outcome = update
                .apply(&mut candidate)
                .and_then(|changed| {
                    if changed {
                        target.admit(collection, &candidate, Some(position))?;
                    }

                    Ok(changed)
                });

            match outcome {
                Ok(true) => {
                    target.documents[position] = candidate;
                    summary.applied += 1;
                },
                Ok(false) => {},
                Err(err) => {
                    return Err(DocumentStoreError::bulk(collection, summary.applied, summary.attempted, err));
                },
            }
        }

        Ok(summary)
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<DocumentStream> {
        let store = self.store.read().await;
        let Some(source) = store.get(collection) else {
            return Ok(stream::empty().boxed());
        };

        let mut documents = match &query.filter {
            Some(filter) => DocumentEvaluator::filter_documents(&source.documents, filter)?,
            None => source.documents.clone(),
        };

        if let Some(sort) = &query.sort {
            sort_documents(&mut documents, sort);
        }

        let documents = documents
            .into_iter()
            .skip(query.offset.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .map(Ok)
            .collect::<Vec<_>>();

        Ok(stream::iter(documents).boxed())
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream> {
        let documents = self
            .store
            .read()
            .await
            .get(collection)
            .map(|source| source.documents.clone())
            .unwrap_or_default();

        let results = pipeline::run(documents, pipeline)?
            .into_iter()
            .map(Ok)
            .collect::<Vec<_>>();

        Ok(stream::iter(results).boxed())
    }
}


/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docseed_memory::InMemoryStore;
/// use docseed::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().build().await?;
/// ```
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds and returns a new [`InMemoryStore`] instance.
    ///
    /// This always succeeds and returns a freshly initialized store.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}
