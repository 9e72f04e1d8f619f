//! In-memory object store.
//!
//! Objects live in a `tokio::sync::RwLock<HashMap<...>>` keyed by
//! `(bucket, key)`.  Nothing survives a restart.  Used by the `memory`
//! backend for local runs and by the test-suite as a stand-in for S3.

use bytes::Bytes;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::backend::ObjectStore;

/// In-memory storage backend.
#[derive(Default)]
pub struct MemoryObjectStore {
    /// `(bucket, key)` -> object bytes.
    objects: tokio::sync::RwLock<HashMap<(String, String), Bytes>>,
    /// Number of `put_object` calls served, including overwrites.
    puts: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a stored object.
    pub async fn get(&self, bucket: &str, key: &str) -> Option<Bytes> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All stored `(bucket, key)` pairs, sorted.
    pub async fn keys(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self.objects.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// How many times `put_object` has been called.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let id = (bucket.to_string(), key.to_string());
        Box::pin(async move {
            self.objects.write().await.insert(id, data);
            self.puts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryObjectStore::new();
        store
            .put_object("bucket", "readings.csv", Bytes::from_static(b"date,usage\n"))
            .await
            .unwrap();

        assert_eq!(
            store.get("bucket", "readings.csv").await,
            Some(Bytes::from_static(b"date,usage\n"))
        );
        assert_eq!(store.get("other", "readings.csv").await, None);
        assert_eq!(store.put_count(), 1);
    }

    #[tokio::test]
    async fn test_put_overwrites_existing_key() {
        let store = MemoryObjectStore::new();
        store
            .put_object("bucket", "a.csv", Bytes::from_static(b"old"))
            .await
            .unwrap();
        store
            .put_object("bucket", "a.csv", Bytes::from_static(b"new"))
            .await
            .unwrap();

        assert_eq!(
            store.get("bucket", "a.csv").await,
            Some(Bytes::from_static(b"new"))
        );
        assert_eq!(
            store.keys().await,
            vec![("bucket".to_string(), "a.csv".to_string())]
        );
        assert_eq!(store.put_count(), 2);
    }
}
