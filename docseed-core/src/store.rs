//! Main document store interface.
//!
//! A [`DocumentStore`] owns one backend handle. It is opened by the caller,
//! passed to every operation that needs it, and closed with
//! [`DocumentStore::shutdown`].
//!
//! # Example
//!
//! ```ignore
//! use docseed::{prelude::*, memory::InMemoryStore};
//!
//! let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//! let publishers = store.collection("Editeurs");
//! store.shutdown().await?;
//! ```

use crate::{
    backend::StoreBackend,
    collection::{Collection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
    schema::{CollectionInfo, IndexSpec, Validator},
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

/// A document store whose backend is chosen at runtime.
pub type DynDocumentStore = DocumentStore<Box<dyn crate::backend::DynStoreBackend>>;

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(&self.backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Checks that the backend is reachable.
    pub async fn ping(&self) -> DocumentStoreResult<()> {
        self.backend.ping().await
    }

    /// Creates a collection, optionally guarded by a validator.
    ///
    /// # Errors
    ///
    /// Returns a schema conflict if the collection exists with another validator.
    pub async fn create_collection(
        &self,
        name: &str,
        validator: Option<&Validator>,
    ) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name, validator)
            .await
    }

    /// Drops (deletes) a collection with the given name.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Describes every collection in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
        self.backend.list_collections().await
    }

    /// Adds an index to a collection.
    pub async fn add_index(&self, collection: &str, index: &IndexSpec) -> DocumentStoreResult<()> {
        self.backend
            .add_index(collection, index)
            .await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: StoreBackend + 'static> DocumentStore<B> {
    /// Erases the backend type.
    pub fn into_dyn(self) -> DynDocumentStore {
        DocumentStore::new(Box::new(self.backend) as Box<dyn crate::backend::DynStoreBackend>)
    }
}
