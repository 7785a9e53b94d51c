//! MongoDB backend implementation for docseed.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters, updates and aggregation pipelines are translated to their MongoDB
//! form and executed by the server, which also enforces collection validators
//! and unique indexes.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docseed = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! A connection string and a database name are given to the builder. Connection
//! establishment and server selection are bounded by a timeout
//! ([`DEFAULT_TIMEOUT`](store::DEFAULT_TIMEOUT) unless configured).
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use docseed::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = MongoDbStore::builder("mongodb://localhost:27017", "bibliotheque")
//!         .timeout(Duration::from_secs(2))
//!         .build()
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docseed_mongodb;

mod error;
mod pipeline;
mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
