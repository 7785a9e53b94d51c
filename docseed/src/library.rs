//! The library domain: publishers and books, their schemas and seed data.

use serde::{Deserialize, Serialize};

use docseed_core::{
    document::Document,
    error::DocumentStoreResult,
    manager::SeedBatch,
    schema::{CollectionSchema, FieldType},
};

/// A publisher, stored in `Editeurs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publisher {
    #[serde(rename = "editeur_id")]
    pub id: i64,
    /// Also read from `name`, the field's name after the demonstration rename.
    #[serde(rename = "nom", alias = "name")]
    pub name: String,
    #[serde(rename = "adresse")]
    pub address: String,
}

impl Document for Publisher {
    fn collection_name() -> &'static str {
        "Editeurs"
    }

    fn key_field() -> &'static str {
        "editeur_id"
    }
}

/// A book, stored in `Livres`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    #[serde(rename = "livre_id")]
    pub id: i64,
    #[serde(rename = "titre")]
    pub title: String,
    #[serde(rename = "auteur_id")]
    pub author_id: i64,
    /// ISO date, `YYYY-MM-DD`.
    #[serde(rename = "date_publication")]
    pub publication_date: String,
    pub isbn: i64,
    #[serde(rename = "categorie_id")]
    pub category_id: i64,
    #[serde(rename = "editeur_id")]
    pub publisher_id: i64,
}

impl Document for Book {
    fn collection_name() -> &'static str {
        "Livres"
    }

    fn key_field() -> &'static str {
        "livre_id"
    }
}

pub fn publisher_schema() -> CollectionSchema {
    CollectionSchema::new(Publisher::collection_name())
        .any_of([
            ("editeur_id", FieldType::Number),
            ("nom", FieldType::String),
            ("adresse", FieldType::String),
        ])
        .unique_index(Publisher::key_field())
}

pub fn book_schema() -> CollectionSchema {
    CollectionSchema::new(Book::collection_name())
        .any_of([
            ("livre_id", FieldType::Number),
            ("auteur_id", FieldType::Number),
            ("date_publication", FieldType::String),
            ("isbn", FieldType::Number),
            ("categorie_id", FieldType::Number),
        ])
        .unique_index(Book::key_field())
}

pub fn schemas() -> Vec<CollectionSchema> {
    vec![publisher_schema(), book_schema()]
}

pub fn publishers() -> Vec<Publisher> {
    vec![
        Publisher {
            id: 0,
            name: "Éditions Gallimard".to_string(),
            address: "35 rue Sébastien Bottin, 75007 Paris, France".to_string(),
        },
        Publisher {
            id: 1,
            name: "Penguin Random House".to_string(),
            address: "80 Strand, London WC2R 0RL, Royaume-Uni".to_string(),
        },
        Publisher {
            id: 2,
            name: "De Agostini Editore".to_string(),
            address: "Via Giovanni da Verrazano 15, 28100 Novara, Italie".to_string(),
        },
    ]
}

pub fn books() -> Vec<Book> {
    vec![Book {
        id: 0,
        title: "Voyage au centre de la Terre".to_string(),
        author_id: 0,
        publication_date: "1864-11-25".to_string(),
        isbn: 9782070331537,
        category_id: 12,
        publisher_id: 0,
    }]
}

/// Seed batches, books first.
pub fn seeds() -> DocumentStoreResult<Vec<SeedBatch>> {
    Ok(vec![SeedBatch::typed(&books())?, SeedBatch::typed(&publishers())?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docseed_core::document::DocumentExt;

    #[test]
    fn models_use_the_stored_field_names() {
        assert_eq!(
            publishers()[1].to_document().unwrap(),
            doc! {
                "editeur_id": 1_i64,
                "nom": "Penguin Random House",
                "adresse": "80 Strand, London WC2R 0RL, Royaume-Uni",
            }
        );
        assert_eq!(books()[0].to_document().unwrap().get_i64("isbn").unwrap(), 9782070331537);
    }

    #[test]
    fn renamed_publishers_still_deserialize() {
        let stored = doc! {
            "_id": bson::oid::ObjectId::new(),
            "editeur_id": -5_i64,
            "adresse": "Paris",
            "name": "Éditions Gallimard",
        };

        assert_eq!(Publisher::from_document(stored).unwrap().name, "Éditions Gallimard");
    }

    #[test]
    fn schemas_are_well_formed() {
        for schema in schemas() {
            schema.check().unwrap();
        }
        assert_eq!(book_schema().validator.unwrap().constraints().len(), 5);
    }
}
