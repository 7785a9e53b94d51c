//! Command execution for the `docseed` binary.

use tracing::{debug, warn};

use crate::{
    bson::Bson,
    config::Command,
    demo, library,
    manager::SchemaManager,
    store::DynDocumentStore,
};

/// Pings the store, runs `command` and shuts the store down on every path.
///
/// When both the command and the shutdown fail, the command's error is returned.
pub async fn run(store: DynDocumentStore, command: Command) -> anyhow::Result<()> {
    let outcome = ping_and_execute(&store, command).await;
    let closed = store.shutdown().await;

    match (outcome, closed) {
        (Err(err), Err(closing)) => {
            warn!("shutdown failed: {closing}");
            Err(err)
        },
        (outcome, closed) => {
            outcome?;
            Ok(closed?)
        },
    }
}

async fn ping_and_execute(store: &DynDocumentStore, command: Command) -> anyhow::Result<()> {
    store.ping().await?;
    debug!(?command, "store reachable");

    execute(store, command).await
}

async fn execute(store: &DynDocumentStore, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run => {
            for (position, section) in demo::run(store).await?.iter().enumerate() {
                if position > 0 {
                    println!();
                }
                println!("{}", section.render()?);
            }
        },
        Command::Init => {
            let report = SchemaManager::new(store)
                .initialize(&library::schemas(), library::seeds()?)
                .await?;

            for (collection, summary) in &report.seeded {
                println!("{collection}: {} document(s) inserted", summary.applied);
            }
        },
        Command::Metadata => {
            for info in SchemaManager::new(store).metadata().await? {
                println!("{}", Bson::Document(info.to_document()).into_relaxed_extjson());
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    };
    use async_trait::async_trait;
    use bson::Document as BsonDocument;

    use docseed_core::{
        backend::{DocumentStream, StoreBackend, WriteSummary},
        error::{DocumentStoreError, DocumentStoreResult},
        pipeline::Pipeline,
        query::{Expr, Query},
        schema::{CollectionInfo, IndexSpec, Validator},
        store::DocumentStore,
        update::Update,
    };

    use super::*;

    /// A store that never answers, recording whether it was shut down.
    #[derive(Debug)]
    struct Unreachable {
        closed: Arc<AtomicBool>,
        shutdown_fails: bool,
    }

    fn offline<T>() -> DocumentStoreResult<T> {
        Err(DocumentStoreError::StoreUnavailable("connection refused".to_string()))
    }

    #[async_trait]
    impl StoreBackend for Unreachable {
        async fn ping(&self) -> DocumentStoreResult<()> {
            offline()
        }

        async fn create_collection(&self, _: &str, _: Option<&Validator>) -> DocumentStoreResult<()> {
            offline()
        }

        async fn drop_collection(&self, _: &str) -> DocumentStoreResult<()> {
            offline()
        }

        async fn list_collections(&self) -> DocumentStoreResult<Vec<CollectionInfo>> {
            offline()
        }

        async fn add_index(&self, _: &str, _: &IndexSpec) -> DocumentStoreResult<()> {
            offline()
        }

        async fn insert_documents(&self, _: &str, _: Vec<BsonDocument>) -> DocumentStoreResult<WriteSummary> {
            offline()
        }

        async fn update_documents(&self, _: &str, _: Option<Expr>, _: &Update) -> DocumentStoreResult<WriteSummary> {
            offline()
        }

        async fn query_documents(&self, _: &str, _: Query) -> DocumentStoreResult<DocumentStream> {
            offline()
        }

        async fn aggregate(&self, _: &str, _: &Pipeline) -> DocumentStoreResult<DocumentStream> {
            offline()
        }

        async fn shutdown(self) -> DocumentStoreResult<()> {
            self.closed.store(true, Ordering::SeqCst);

            if self.shutdown_fails {
                return Err(DocumentStoreError::Backend("session already ended".to_string()));
            }

            Ok(())
        }
    }

    fn unreachable_store(shutdown_fails: bool) -> (DynDocumentStore, Arc<AtomicBool>) {
        let closed = Arc::new(AtomicBool::new(false));
        let store = DocumentStore::new(Unreachable { closed: closed.clone(), shutdown_fails }).into_dyn();

        (store, closed)
    }

    #[tokio::test]
    async fn failed_ping_still_shuts_down() {
        let (store, closed) = unreachable_store(false);

        let err = run(store, Command::Run).await.unwrap_err();

        assert!(closed.load(Ordering::SeqCst));
        assert!(matches!(
            err.downcast_ref::<DocumentStoreError>(),
            Some(DocumentStoreError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn command_error_outranks_shutdown_error() {
        let (store, closed) = unreachable_store(true);

        let err = run(store, Command::Metadata).await.unwrap_err();

        assert!(closed.load(Ordering::SeqCst));
        assert!(matches!(
            err.downcast_ref::<DocumentStoreError>(),
            Some(DocumentStoreError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn init_against_memory_succeeds() {
        let store = DocumentStore::new(crate::memory::InMemoryStore::new()).into_dyn();

        run(store, Command::Init).await.unwrap();
    }
}
