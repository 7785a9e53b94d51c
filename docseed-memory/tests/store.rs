use bson::{Bson, doc};
use futures::TryStreamExt;

use docseed_core::{
    backend::{StoreBackend, WriteSummary},
    error::DocumentStoreError,
    query::{Filter, Query, SortDirection},
    schema::{FieldType, IndexSpec, Validator},
    update::Update,
};
use docseed_memory::InMemoryStore;

fn publisher_validator() -> Validator {
    Validator::any_of([
        ("editeur_id", FieldType::Number),
        ("nom", FieldType::String),
        ("adresse", FieldType::String),
    ])
}

async fn publishers() -> InMemoryStore {
    let store = InMemoryStore::new();

    store.create_collection("Editeurs", Some(&publisher_validator())).await.unwrap();
    store.add_index("Editeurs", &IndexSpec::unique("editeur_id")).await.unwrap();
    store
        .insert_documents(
            "Editeurs",
            vec![
                doc! { "editeur_id": 0_i64, "nom": "Éditions Gallimard" },
                doc! { "editeur_id": 1_i64, "nom": "Penguin Random House" },
                doc! { "editeur_id": 2_i64, "nom": "De Agostini Editore" },
            ],
        )
        .await
        .unwrap();

    store
}

async fn all(store: &InMemoryStore, query: Query) -> Vec<bson::Document> {
    store
        .query_documents("Editeurs", query)
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap()
}

#[tokio::test]
async fn inserts_assign_ids_and_keep_insertion_order() {
    let store = publishers().await;
    let documents = all(&store, Query::new()).await;

    assert_eq!(documents.len(), 3);
    assert!(documents.iter().all(|document| matches!(document.get("_id"), Some(Bson::ObjectId(_)))));
    assert_eq!(documents[0].keys().next().map(String::as_str), Some("_id"));
    assert_eq!(
        documents
            .iter()
            .map(|document| document.get_i64("editeur_id").unwrap())
            .collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
}

#[tokio::test]
async fn duplicate_key_stops_an_ordered_insert() {
    let store = publishers().await;

    let err = store
        .insert_documents(
            "Editeurs",
            vec![
                doc! { "editeur_id": 3_i64, "nom": "Hachette" },
                doc! { "editeur_id": 1_i64, "nom": "Doublon" },
                doc! { "editeur_id": 4_i64, "nom": "Jamais" },
            ],
        )
        .await
        .unwrap_err();

    match &err {
        DocumentStoreError::BulkWrite { applied, attempted, .. } => {
            assert_eq!((*applied, *attempted), (1, 3));
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root(), DocumentStoreError::DuplicateKey { .. }));
    assert_eq!(all(&store, Query::new()).await.len(), 4);
}

#[tokio::test]
async fn validator_rejects_documents_matching_no_constraint() {
    let store = publishers().await;

    let err = store
        .insert_documents("Editeurs", vec![doc! { "editeur_id": "7", "nom": 7 }])
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DocumentStoreError::ValidationFailed { .. }));

    // One satisfied constraint is enough.
    store
        .insert_documents("Editeurs", vec![doc! { "editeur_id": "8", "adresse": "Paris" }])
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_unique_fields_collide_as_null() {
    let store = publishers().await;

    store
        .insert_documents("Editeurs", vec![doc! { "nom": "Sans identifiant" }])
        .await
        .unwrap();

    let err = store
        .insert_documents("Editeurs", vec![doc! { "nom": "Autre sans identifiant" }])
        .await
        .unwrap_err();

    assert!(matches!(err.root(), DocumentStoreError::DuplicateKey { .. }));
}

#[tokio::test]
async fn redefining_a_collection_is_idempotent_only_when_identical() {
    let store = publishers().await;

    store.create_collection("Editeurs", Some(&publisher_validator())).await.unwrap();
    store.add_index("Editeurs", &IndexSpec::unique("editeur_id")).await.unwrap();

    assert!(matches!(
        store.create_collection("Editeurs", None).await,
        Err(DocumentStoreError::SchemaConflict { .. })
    ));
    assert!(matches!(
        store.add_index("Editeurs", &IndexSpec::new("editeur_id", false)).await,
        Err(DocumentStoreError::SchemaConflict { .. })
    ));
}

#[tokio::test]
async fn unique_index_over_existing_duplicates_fails() {
    let store = publishers().await;

    store
        .insert_documents("Editeurs", vec![doc! { "editeur_id": 9_i64, "nom": "Penguin Random House" }])
        .await
        .unwrap();

    assert!(matches!(
        store.add_index("Editeurs", &IndexSpec::unique("nom")).await,
        Err(DocumentStoreError::DuplicateKey { .. })
    ));
}

#[tokio::test]
async fn increment_then_rename_rewrites_every_document() {
    let store = publishers().await;

    let summary = store
        .update_documents("Editeurs", None, &Update::increment("editeur_id", -5_i64))
        .await
        .unwrap();
    assert_eq!(summary, WriteSummary { attempted: 3, applied: 3 });

    store
        .update_documents("Editeurs", None, &Update::rename("nom", "name"))
        .await
        .unwrap();

    let documents = all(&store, Query::new()).await;

    assert_eq!(
        documents
            .iter()
            .map(|document| document.get_i64("editeur_id").unwrap())
            .collect::<Vec<_>>(),
        vec![-5, -4, -3]
    );
    assert!(documents.iter().all(|document| document.contains_key("name") && !document.contains_key("nom")));
}

#[tokio::test]
async fn update_that_collides_stops_part_way() {
    let store = publishers().await;

    // 0 -> 1 collides with the untouched publisher 1.
    let err = store
        .update_documents("Editeurs", None, &Update::increment("editeur_id", 1_i64))
        .await
        .unwrap_err();

    match &err {
        DocumentStoreError::BulkWrite { applied, attempted, .. } => {
            assert_eq!((*applied, *attempted), (0, 3));
        },
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(err.root(), DocumentStoreError::DuplicateKey { .. }));
}

#[tokio::test]
async fn filtered_sorted_and_paged_queries() {
    let store = publishers().await;

    let query = Query::builder()
        .filter(Filter::gte("editeur_id", 1))
        .sort("editeur_id", SortDirection::Desc)
        .limit(1)
        .build();

    let documents = all(&store, query).await;

    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].get_i64("editeur_id").unwrap(), 2);
}

#[tokio::test]
async fn missing_collections_read_as_empty() {
    let store = InMemoryStore::new();

    let documents: Vec<bson::Document> = store
        .query_documents("Absente", Query::new())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert!(documents.is_empty());
    assert_eq!(
        store.update_documents("Absente", None, &Update::unset("x")).await.unwrap(),
        WriteSummary::default()
    );
    store.drop_collection("Absente").await.unwrap();
}

#[tokio::test]
async fn listing_reports_declared_validators() {
    let store = publishers().await;
    store.insert_documents("Livres", vec![doc! { "livre_id": 0_i64 }]).await.unwrap();

    let infos = store.list_collections().await.unwrap();

    assert_eq!(infos.iter().map(|info| info.name.as_str()).collect::<Vec<_>>(), vec!["Editeurs", "Livres"]);
    assert_eq!(infos[0].options, doc! { "validator": publisher_validator().to_document() });
    assert!(infos[1].options.is_empty());
}

#[tokio::test]
async fn large_integer_keys_stay_distinct() {
    let store = InMemoryStore::new();
    store.add_index("Livres", &IndexSpec::unique("isbn")).await.unwrap();

    let summary = store
        .insert_documents(
            "Livres",
            vec![
                doc! { "isbn": 9_007_199_254_740_992_i64 },
                doc! { "isbn": 9_007_199_254_740_993_i64 },
                doc! { "isbn": Bson::Decimal128(bson::Decimal128::from_bytes([1; 16])) },
                doc! { "titre": "Sans isbn" },
            ],
        )
        .await
        .unwrap();
    assert_eq!(summary, WriteSummary { attempted: 4, applied: 4 });

    let err = store
        .insert_documents("Livres", vec![doc! { "isbn": 9_007_199_254_740_993.0 }])
        .await
        .unwrap_err();
    assert!(matches!(err.root(), DocumentStoreError::DuplicateKey { .. }));
}

#[tokio::test]
async fn identifier_cannot_be_renamed() {
    let store = publishers().await;

    let err = store
        .update_documents("Editeurs", None, &Update::rename("_id", "old_id"))
        .await
        .unwrap_err();

    assert!(matches!(err, DocumentStoreError::InvalidOperation(_)));
    assert!(all(&store, Query::new()).await.iter().all(|document| document.contains_key("_id")));
}

#[tokio::test]
async fn updates_follow_dotted_paths() {
    let store = InMemoryStore::new();
    store
        .insert_documents("Editeurs", vec![doc! { "nom": "Gallimard", "siege": { "etages": 1 } }])
        .await
        .unwrap();

    store
        .update_documents("Editeurs", None, &Update::increment("siege.etages", 1))
        .await
        .unwrap();

    let stored = all(&store, Query::new()).await.remove(0);
    assert_eq!(stored.get_document("siege").unwrap(), &doc! { "etages": 2 });
    assert!(!stored.contains_key("siege.etages"));
}

#[tokio::test]
async fn sort_keeps_insertion_order_for_ties() {
    let store = InMemoryStore::new();
    store
        .insert_documents(
            "Livres",
            vec![
                doc! { "n": 0, "categorie_id": 2 },
                doc! { "n": 1, "categorie_id": 1 },
                doc! { "n": 2, "categorie_id": 2 },
                doc! { "n": 3, "categorie_id": 2 },
            ],
        )
        .await
        .unwrap();

    let sorted: Vec<bson::Document> = store
        .query_documents("Livres", Query::builder().sort("categorie_id", SortDirection::Desc).build())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();

    assert_eq!(
        sorted.iter().map(|document| document.get_i32("n").unwrap()).collect::<Vec<_>>(),
        vec![0, 2, 3, 1]
    );
}
