pub mod memory;
pub mod postgres;
pub mod upstash;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::KvBackendKind;
use crate::error::KvError;

pub use memory::MemoryKv;
pub use postgres::PostgresKv;
pub use upstash::UpstashKv;

/// A remote store that only speaks string keys and string values.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError>;
}

/// Open the backend selected by `KV_BACKEND`.
pub async fn connect(kind: &KvBackendKind) -> anyhow::Result<Arc<dyn KvBackend>> {
    let backend: Arc<dyn KvBackend> = match kind {
        KvBackendKind::Upstash { url, token } => {
            tracing::info!(url = %url, "using Upstash REST KV backend");
            Arc::new(UpstashKv::new(url, token))
        }
        KvBackendKind::Postgres { database_url } => {
            let db = PostgresKv::connect(database_url).await?;
            db.run_migrations().await?;
            tracing::info!("Postgres KV backend connected and migrations applied.");
            Arc::new(db)
        }
        KvBackendKind::Memory => {
            tracing::warn!("using in-memory KV backend; conversations will not survive a restart");
            Arc::new(MemoryKv::new())
        }
    };
    Ok(backend)
}
