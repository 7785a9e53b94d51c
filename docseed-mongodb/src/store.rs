use std::time::Duration;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use bson::{Document, Bson, doc};
use mongodb::{
    Client, Collection as MongoCollection, Database, IndexModel,
    options::{ClientOptions, FindOptions, IndexOptions},
    results::CollectionType,
};
use tracing::debug;

use docseed_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder, WriteSummary},
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    pipeline::Pipeline,
    query::{Expr, Query},
    schema::{CollectionInfo, CollectionKind, IndexSpec, Validator},
    update::Update,
};

use crate::{
    error::classify,
    pipeline,
    query::{MongoQueryTranslator, sort_document, update_document},
};

/// Default bound on connection and server selection.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);


#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(uri: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(uri, database)
    }

    fn database(&self) -> Database {
        self.client.database(&self.database)
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.database().collection(collection_name)
    }

    /// Validator currently installed on `name`, or `None` when the collection
    /// is absent. A collection without a validator yields `Some(None)`.
    async fn installed_validator(&self, name: &str) -> DocumentStoreResult<Option<Option<Document>>> {
        let spec = self
            .database()
            .list_collections()
            .filter(doc! { "name": name })
            .await
            .map_err(|e| classify(name, e))?
            .try_next()
            .await
            .map_err(|e| classify(name, e))?;

        Ok(spec.map(|spec| spec.options.validator))
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn ping(&self) -> DocumentStoreResult<()> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| match classify(&self.database, e) {
                DocumentStoreError::Backend(message) => DocumentStoreError::StoreUnavailable(message),
                other => other,
            })?;

        Ok(())
    }

    async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()> {
        let wanted = validator.map(Validator::to_document);

        if let Some(installed) = self.installed_validator(name).await? {
            if installed == wanted {
                debug!(collection = name, "collection already defined");
                return Ok(());
            }

            return Err(DocumentStoreError::SchemaConflict {
                collection: name.to_string(),
                reason: "collection already exists with different options".to_string(),
            });
        }

        let database = self.database();
        let create = database.create_collection(name);

        let created = match wanted {
            Some(validator) => create.validator(validator).await,
            None => create.await,
        };

        created.map_err(|e| classify(name, e))?;

        debug!(collection = name, "created collection");

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(|e| classify(name, e))?;

        debug!(collection = name, "dropped collection");

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
        let specs = self
            .database()
            .list_collections()
            .await
            .map_err(|e| classify(&self.database, e))?
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| classify(&self.database, e))?;

        Ok(
            specs
                .into_iter()
                .map(|spec| CollectionInfo {
                    kind: match spec.collection_type {
                        CollectionType::Collection => CollectionKind::Collection,
                        CollectionType::View => CollectionKind::View,
                        CollectionType::Timeseries => CollectionKind::Timeseries,
                        #[allow(unreachable_patterns)]
                        other => CollectionKind::Other(format!("{other:?}")),
                    },
                    options: match spec.options.validator {
                        Some(validator) => doc! { "validator": validator },
                        None => Document::new(),
                    },
                    name: spec.name,
                })
                .collect()
        )
    }

    async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        self.get_collection(collection)
            .create_index(
                IndexModel::builder()
                .keys(doc! { index.field.clone(): 1 })
                .options(
                    IndexOptions::builder()
                    .unique(index.unique)
                    .build()
                )
                .build()
            )
            .await
            .map_err(|e| classify(collection, e))?;

        debug!(collection, index = %index.name(), unique = index.unique, "created index");

        Ok(())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> DocumentStoreResult<WriteSummary> {
        let target = self.get_collection(collection);
        let attempted = documents.len();

        for (applied, document) in documents.into_iter().enumerate() {
            target
                .insert_one(document)
                .await
                .map_err(|e| DocumentStoreError::bulk(collection, applied, attempted, classify(collection, e)))?;
        }

        Ok(WriteSummary { attempted, applied: attempted })
    }

    async fn update_documents(
        &self,
        collection: &str,
        filter: Option<Expr>,
        update: &Update,
    ) -> DocumentStoreResult<WriteSummary> {
        let target = self.get_collection(collection);
        let mut options = FindOptions::default();
        options.projection = Some(doc! { ID_FIELD: 1 });

        let ids = target
            .find(MongoQueryTranslator::filter(filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(|e| classify(collection, e))?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(|e| classify(collection, e))?
            .into_iter()
            .filter_map(|mut document| document.remove(ID_FIELD))
            .collect::<Vec<Bson>>();

        let update = update_document(update);
        let mut summary = WriteSummary { attempted: ids.len(), applied: 0 };

        for id in ids {
            let result = target
                .update_one(doc! { ID_FIELD: id }, update.clone())
                .await
                .map_err(|e| DocumentStoreError::bulk(
                    collection,
                    summary.applied,
                    summary.attempted,
                    classify(collection, e),
                ))?;

            if result.modified_count > 0 {
                summary.applied += 1;
            }
        }

        Ok(summary)
    }

    async fn query_documents(
        &self,
        collection: &str,
        query: Query,
    ) -> DocumentStoreResult<DocumentStream> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }
        if let Some(sort) = &query.sort {
            options.sort = Some(sort_document(sort));
        }

        let name = collection.to_string();

        Ok(
            self.get_collection(collection)
                .find(MongoQueryTranslator::filter(query.filter.as_ref())?)
                .with_options(options)
                .await
                .map_err(|e| classify(collection, e))?
                .map_err(move |e| classify(&name, e))
                .boxed()
        )
    }

    async fn aggregate(
        &self,
        collection: &str,
        pipeline: &Pipeline,
    ) -> DocumentStoreResult<DocumentStream> {
        let stages = pipeline::translate(pipeline)?;
        let name = collection.to_string();

        Ok(
            self.get_collection(collection)
                .aggregate(stages)
                .await
                .map_err(|e| classify(collection, e))?
                .map_err(move |e| classify(&name, e))
                .boxed()
        )
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

pub struct MongoDbStoreBuilder {
    uri: String,
    database: String,
    timeout: Duration,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(uri: &str, database: &str) -> Self {
        Self {
            uri: uri.to_string(),
            database: database.to_string(),
            timeout: DEFAULT_TIMEOUT,
            app_name: None,
        }
    }

    /// Bounds connection establishment and server selection.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.uri)
            .await
            .map_err(|e| DocumentStoreError::StoreUnavailable(e.to_string()))?;

        options.connect_timeout = Some(self.timeout);
        options.server_selection_timeout = Some(self.timeout);
        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }

        debug!(database = %self.database, timeout_ms = self.timeout.as_millis() as u64, "connecting to MongoDB");

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::StoreUnavailable(e.to_string()))?,
            self.database,
        ))
    }
}
