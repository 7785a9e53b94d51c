//! Core of the docseed project: a schema and seed manager for document stores.
//!
//! This crate provides:
//!
//! - **Document traits** ([`document`]) - Typed documents and BSON conversions
//! - **Store backend abstraction** ([`backend`]) - The trait every store implements
//! - **Query and filtering API** ([`query`]) - Filter expressions, sorting and limits
//! - **Update operators** ([`update`]) - Increment, rename, set and unset
//! - **Schemas** ([`schema`]) - Type validators, index specifications and collection metadata
//! - **Aggregation** ([`pipeline`]) - Match, group-sum, sort, skip and limit stages
//! - **Collections interface** ([`collection`]) - Handles on a single collection
//! - **Document store** ([`store`]) - The explicit store handle
//! - **Schema manager** ([`manager`]) - Reset, define, seed, transform and inspect
//! - **Error handling** ([`error`]) - Error and result types

#[allow(unused_extern_crates)]
extern crate self as docseed_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod manager;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod store;
pub mod update;
