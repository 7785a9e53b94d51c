//! The demonstration run over the seeded library.
//!
//! [`run`] initializes the store, shifts publisher ids by -5, renames `nom` to
//! `name`, then collects the query, aggregation and metadata results that the
//! binary prints.

use bson::{Bson, Document as BsonDocument};
use futures::TryStreamExt;
use tracing::info;

use docseed_core::{
    backend::StoreBackend,
    document::Document,
    error::DocumentStoreResult,
    manager::SchemaManager,
    pipeline::Pipeline,
    query::{Filter, SortDirection},
    store::DocumentStore,
    update::Update,
};

use crate::library::{self, Book, Publisher};

/// A titled group of result documents.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub documents: Vec<BsonDocument>,
}

impl Section {
    fn new(title: &str, documents: Vec<BsonDocument>) -> Self {
        Self { title: title.to_string(), documents }
    }

    /// Title line followed by the documents as pretty relaxed extended JSON.
    pub fn render(&self) -> DocumentStoreResult<String> {
        let documents = self
            .documents
            .iter()
            .map(|document| Bson::Document(document.clone()).into_relaxed_extjson())
            .collect::<Vec<_>>();

        Ok(format!(
            "{} :\n{}",
            self.title,
            serde_json::to_string_pretty(&documents)?
        ))
    }
}

/// Resets and seeds the library, applies the demonstration transforms and
/// returns the result sections in display order.
pub async fn run<B: StoreBackend>(store: &DocumentStore<B>) -> DocumentStoreResult<Vec<Section>> {
    let manager = SchemaManager::new(store);
    let publishers = Publisher::collection_name();

    let report = manager.initialize(&library::schemas(), library::seeds()?).await?;
    info!(dropped = report.dropped.len(), defined = report.defined.len(), "library initialized");

    manager
        .bulk_transform(publishers, None, Update::increment("editeur_id", -5_i64))
        .await?;
    manager
        .bulk_transform(publishers, None, Update::rename("nom", "name"))
        .await?;

    let all_publishers: Vec<BsonDocument> = manager
        .query(publishers, None)
        .await?
        .try_collect()
        .await?;

    let one_book = manager.find_one(Book::collection_name(), None).await?;

    let sum_of_ids: Vec<BsonDocument> = manager
        .aggregate(
            publishers,
            &Pipeline::new()
                .filter(Filter::lt("editeur_id", -3))
                .group_sum("FirstAgregate", "sumId", "editeur_id"),
        )
        .await?
        .try_collect()
        .await?;

    let top_two: Vec<BsonDocument> = manager
        .aggregate(
            publishers,
            &Pipeline::new()
                .sort("editeur_id", SortDirection::Desc)
                .limit(2),
        )
        .await?
        .try_collect()
        .await?;

    let metadata: Vec<BsonDocument> = manager
        .metadata()
        .await?
        .iter()
        .map(|info| info.to_document())
        .collect();

    Ok(vec![
        Section::new("Collection Editeurs", all_publishers),
        Section::new("Un seul Livre", vec![one_book]),
        Section::new("1st Aggregate on Editeurs", sum_of_ids),
        Section::new("2nd Aggregate on Editeurs", top_two),
        Section::new("Meta-Data", metadata),
    ])
}
