//! Main docseed crate: a schema and seed manager for document stores.
//!
//! This crate is the primary entry point. It re-exports the core types from the
//! sub-crates, gives access to the storage backends, and carries the library
//! domain (publishers and books) used by the `docseed` binary.
//!
//! # Features
//!
//! - **Schema definition** - Disjunctive or conjunctive type validators plus unique indexes
//! - **Idempotent initialization** - Reset, define and seed in one explicit call
//! - **Bulk transforms** - Increment, rename, set and unset over filtered documents
//! - **Queries and aggregation** - Filters, sorted and paged queries, match/group/sort/limit pipelines
//! - **Multiple backends** - In-memory and MongoDB storage behind one async trait
//!
//! # Quick Start
//!
//! ```ignore
//! use docseed::{prelude::*, memory::InMemoryStore, library};
//! use futures::TryStreamExt;
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let manager = SchemaManager::new(&store);
//!
//!     manager.initialize(&library::schemas(), library::seeds()?).await?;
//!     manager
//!         .bulk_transform("Editeurs", None, Update::increment("editeur_id", -5_i64))
//!         .await?;
//!
//!     let top_two: Vec<_> = manager
//!         .aggregate(
//!             "Editeurs",
//!             &Pipeline::new().sort("editeur_id", SortDirection::Desc).limit(2),
//!         )
//!         .await?
//!         .try_collect()
//!         .await?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A `DocumentStore` can be converted into a [`DynDocumentStore`](store::DynDocumentStore)
//! with `into_dyn`, which lets the backend be chosen at runtime (see [`config::Config::open_store`]).
//!
//! # Backends
//!
//! - [`memory`] - Fast in-memory storage for development and testing
//! - [`mongodb`] - Persistent MongoDB backend (requires `mongodb` feature)

pub mod cli;
pub mod config;
pub mod demo;
pub mod library;
pub mod logging;
pub mod prelude;

pub use docseed_core::{backend, collection, document, error, manager, pipeline, query, schema, store, update};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docseed_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docseed_mongodb::{MongoDbStore, MongoDbStoreBuilder, store::DEFAULT_TIMEOUT};
}
