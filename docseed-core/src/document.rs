//! Core traits for typed documents and helpers for raw BSON documents.
//!
//! Stored documents are plain [`bson::Document`]s. Types implementing [`Document`]
//! get a typed view over one collection through [`DocumentExt`].

use bson::{
    Bson, Document as BsonDocument, de::deserialize_from_document, ser::serialize_to_document,
};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::DocumentStoreResult;

/// Name of the identifier field assigned by the store to every stored document.
pub const ID_FIELD: &str = "_id";

/// Core trait that all typed documents stored in a document store must implement.
///
/// # Example
///
/// ```ignore
/// use docseed::document::Document;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct Publisher {
///     #[serde(rename = "editeur_id")]
///     pub id: i64,
///     #[serde(rename = "nom")]
///     pub name: String,
/// }
///
/// impl Document for Publisher {
///     fn collection_name() -> &'static str { "Editeurs" }
///     fn key_field() -> &'static str { "editeur_id" }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + Clone + 'static {
    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;

    /// Returns the stored name of the field holding the document's unique key.
    fn key_field() -> &'static str;
}

/// Extension trait providing BSON conversions for documents.
///
/// This trait is automatically implemented for all types that implement [`Document`].
pub trait DocumentExt: Document {
    /// Converts this document to a BSON document for storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_document(&self) -> DocumentStoreResult<BsonDocument>;

    /// Creates a typed document from a stored BSON document.
    ///
    /// Fields unknown to the type (such as `_id`) are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails or the structure is invalid.
    fn from_document(document: BsonDocument) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_document(&self) -> DocumentStoreResult<BsonDocument> {
        Ok(serialize_to_document(self)?)
    }

    fn from_document(document: BsonDocument) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_document(document)?)
    }
}

/// Resolves a dotted field path (`"address.city"`) inside a document.
///
/// Returns `None` when any segment is missing or traverses a non-document value.
pub fn lookup<'a>(document: &'a BsonDocument, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = document.get(segments.next()?)?;

    for segment in segments {
        current = current.as_document()?.get(segment)?;
    }

    Some(current)
}

/// Resolves the embedded document holding the last segment of a dotted path,
/// returned alongside that segment.
///
/// Returns `None` when an intermediate segment is missing or not a document.
pub fn parent_mut<'a, 'p>(document: &'a mut BsonDocument, path: &'p str) -> Option<(&'a mut BsonDocument, &'p str)> {
    let Some((parents, leaf)) = path.rsplit_once('.') else {
        return Some((document, path));
    };

    let mut current = document;

    for segment in parents.split('.') {
        current = current.get_mut(segment)?.as_document_mut()?;
    }

    Some((current, leaf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn lookup_resolves_nested_paths() {
        let document = doc! { "nom": "Gallimard", "siege": { "ville": "Paris" } };

        assert_eq!(lookup(&document, "nom"), Some(&Bson::String("Gallimard".into())));
        assert_eq!(lookup(&document, "siege.ville"), Some(&Bson::String("Paris".into())));
        assert_eq!(lookup(&document, "siege.pays"), None);
        assert_eq!(lookup(&document, "nom.ville"), None);
    }

    #[test]
    fn parent_mut_stops_at_the_last_segment() {
        let mut document = doc! { "nom": "Gallimard", "siege": { "ville": "Paris" } };

        let (siege, leaf) = parent_mut(&mut document, "siege.ville").unwrap();
        assert_eq!(leaf, "ville");
        siege.insert("pays", "France");

        assert_eq!(document.get_document("siege").unwrap(), &doc! { "ville": "Paris", "pays": "France" });
        assert_eq!(parent_mut(&mut document, "nom").map(|(_, leaf)| leaf), Some("nom"));
        assert!(parent_mut(&mut document, "nom.ville").is_none());
        assert!(parent_mut(&mut document, "adresse.ville").is_none());
    }
}
