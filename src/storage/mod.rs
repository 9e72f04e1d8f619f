//! Object storage backends.
//!
//! The [`backend::ObjectStore`] trait abstracts over where uploaded files
//! end up.  [`aws::S3ObjectStore`] forwards to AWS S3 (or any
//! S3-compatible endpoint); [`memory::MemoryObjectStore`] keeps objects in
//! process for local runs and tests.

pub mod aws;
pub mod backend;
pub mod memory;

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;
use backend::ObjectStore;

/// Build the backend named by `config.backend`.
pub async fn from_config(config: &StorageConfig) -> anyhow::Result<Arc<dyn ObjectStore>> {
    match config.backend.as_str() {
        "aws" => {
            let endpoint_url =
                (!config.endpoint_url.is_empty()).then(|| config.endpoint_url.clone());
            let store = aws::S3ObjectStore::new(
                config.region.clone(),
                endpoint_url,
                config.use_path_style,
                config.access_key_id.clone(),
                config.secret_access_key.clone(),
            )
            .await?;
            info!(
                region = %config.region,
                bucket = %config.bucket,
                "S3 storage backend initialized"
            );
            Ok(Arc::new(store))
        }
        "memory" => {
            info!(bucket = %config.bucket, "In-memory storage backend initialized");
            Ok(Arc::new(memory::MemoryObjectStore::new()))
        }
        other => anyhow::bail!("unknown storage backend '{other}'"),
    }
}
