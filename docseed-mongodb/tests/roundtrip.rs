//! Ignored tests run against a live server. Set `DOCSEED_TEST_URI` and use
//! `cargo test -p docseed-mongodb -- --ignored`.

use std::time::Duration;
use bson::doc;
use futures::TryStreamExt;

use docseed_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::DocumentStoreError,
    pipeline::Pipeline,
    query::{Filter, Query},
    schema::{FieldType, IndexSpec, Validator},
    update::Update,
};
use docseed_mongodb::MongoDbStore;

async fn connect(database: &str) -> MongoDbStore {
    let uri = std::env::var("DOCSEED_TEST_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string());

    MongoDbStore::builder(&uri, database)
        .timeout(Duration::from_secs(2))
        .build()
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "needs a running MongoDB server"]
async fn define_seed_transform_and_aggregate() {
    let store = connect("docseed_roundtrip").await;
    store.ping().await.unwrap();
    store.drop_collection("Editeurs").await.unwrap();

    let validator = Validator::any_of([("editeur_id", FieldType::Number), ("nom", FieldType::String)]);
    store.create_collection("Editeurs", Some(&validator)).await.unwrap();
    store.create_collection("Editeurs", Some(&validator)).await.unwrap();
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

    let err = store
        .insert_documents("Editeurs", vec![doc! { "editeur_id": 1_i64, "nom": "Doublon" }])
        .await
        .unwrap_err();
    assert!(matches!(err.root(), DocumentStoreError::DuplicateKey { .. }));

    let summary = store
        .update_documents("Editeurs", None, &Update::increment("editeur_id", -5_i64))
        .await
        .unwrap();
    assert_eq!(summary.applied, 3);

    let sums: Vec<bson::Document> = store
        .aggregate(
            "Editeurs",
            &Pipeline::new()
                .filter(Filter::lt("editeur_id", -3))
                .group_sum("FirstAgregate", "sumId", "editeur_id"),
        )
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(sums, vec![doc! { "_id": "FirstAgregate", "sumId": -9_i64 }]);

    let all: Vec<bson::Document> = store
        .query_documents("Editeurs", Query::new())
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(all.len(), 3);

    let infos = store.list_collections().await.unwrap();
    let publishers = infos.iter().find(|info| info.name == "Editeurs").unwrap();
    assert_eq!(publishers.options, doc! { "validator": validator.to_document() });

    store.drop_collection("Editeurs").await.unwrap();
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn unreachable_server_is_reported_as_unavailable() {
    let store = MongoDbStore::builder("mongodb://127.0.0.1:1", "docseed_unreachable")
        .timeout(Duration::from_millis(200))
        .build()
        .await
        .unwrap();

    assert!(matches!(store.ping().await, Err(DocumentStoreError::StoreUnavailable(_))));
}
