//! Convenient re-exports of commonly used types from docseed.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docseed::prelude::*;
//! ```

pub use bson::{Bson, doc};

pub use docseed_core::{
    backend::{DocumentStream, StoreBackend, StoreBackendBuilder, WriteSummary},
    collection::{Collection, TypedCollection},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    manager::{InitReport, SchemaManager, SeedBatch},
    pipeline::{GroupKey, Pipeline, Stage},
    query::{Expr, FieldOp, Filter, Query, QueryBuilder, QueryVisitor, Sort, SortDirection},
    schema::{CollectionInfo, CollectionKind, CollectionSchema, FieldType, IndexSpec, Validator},
    store::{DocumentStore, DynDocumentStore},
    update::Update,
};
