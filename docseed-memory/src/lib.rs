//! In-memory document storage backend for docseed.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Server-like writes** - Validators, unique indexes and ordered bulk writes
//! - **Full query support** - Filtering, sorting and pagination
//! - **Aggregation** - Match, group-sum, sort, skip and limit stages
//!
//! # Quick Start
//!
//! ```ignore
//! use docseed::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let manager = SchemaManager::new(&store);
//!
//!     manager.seed("Editeurs", vec![doc! { "editeur_id": 0_i64 }]).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docseed_memory;

mod evaluator;
mod pipeline;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
