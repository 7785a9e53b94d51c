//! Command line and environment configuration for the `docseed` binary.

use std::time::Duration;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use docseed_core::{
    backend::StoreBackendBuilder,
    error::DocumentStoreResult,
    store::{DocumentStore, DynDocumentStore},
};
use docseed_memory::InMemoryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// A MongoDB server reached through `--uri`
    Mongodb,
    /// A transient in-process store
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Reset, define and seed, then print the demonstration results
    #[default]
    Run,
    /// Reset, define and seed only
    Init,
    /// Print the metadata of every collection
    Metadata,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "docseed", version, about = "Schema and seed manager for the library document store", long_about = None)]
pub struct Config {
    /// Store backend
    #[arg(long, env = "DOCSEED_BACKEND", value_enum, default_value_t = BackendKind::Mongodb)]
    pub backend: BackendKind,

    /// MongoDB connection string
    #[arg(long, env = "DOCSEED_URI", default_value = "mongodb://localhost:27017")]
    pub uri: String,

    /// Database holding the library collections
    #[arg(long, env = "DOCSEED_DATABASE", default_value = "bibliotheque")]
    pub database: String,

    /// Connection and server selection timeout, in milliseconds
    #[arg(long = "timeout-ms", env = "DOCSEED_TIMEOUT_MS", default_value_t = 5000)]
    pub timeout_ms: u64,

    /// Log filter, in `tracing_subscriber::EnvFilter` syntax
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Opens the configured backend. The store is not contacted yet.
    pub async fn open_store(&self) -> DocumentStoreResult<DynDocumentStore> {
        debug!(backend = ?self.backend, database = %self.database, "opening store");

        match self.backend {
            BackendKind::Memory => Ok(
                DocumentStore::new(InMemoryStore::builder().build().await?).into_dyn()
            ),
            BackendKind::Mongodb => self.open_mongodb().await,
        }
    }

    #[cfg(feature = "mongodb")]
    async fn open_mongodb(&self) -> DocumentStoreResult<DynDocumentStore> {
        let backend = docseed_mongodb::MongoDbStore::builder(&self.uri, &self.database)
            .timeout(self.timeout())
            .app_name("docseed")
            .build()
            .await?;

        Ok(DocumentStore::new(backend).into_dyn())
    }

    #[cfg(not(feature = "mongodb"))]
    async fn open_mongodb(&self) -> DocumentStoreResult<DynDocumentStore> {
        Err(docseed_core::error::DocumentStoreError::StoreUnavailable(
            "docseed was built without the mongodb feature".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_the_local_library() {
        let config = Config::try_parse_from(["docseed"]).unwrap();

        assert_eq!(config.backend, BackendKind::Mongodb);
        assert_eq!(config.uri, "mongodb://localhost:27017");
        assert_eq!(config.database, "bibliotheque");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.command.unwrap_or_default(), Command::Run);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "docseed", "--backend", "memory", "--database", "essai", "--timeout-ms", "250", "metadata",
        ])
        .unwrap();

        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.database, "essai");
        assert_eq!(config.timeout(), Duration::from_millis(250));
        assert_eq!(config.command, Some(Command::Metadata));
    }

    #[test]
    fn unknown_backends_are_rejected() {
        assert!(Config::try_parse_from(["docseed", "--backend", "postgres"]).is_err());
    }
}
