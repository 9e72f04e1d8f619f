//! Abstract object storage trait.
//!
//! The service needs exactly one capability from object storage: write a
//! named buffer into a named bucket.  Keeping the trait this narrow lets
//! tests swap in an in-memory or failing implementation.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

/// Async object storage contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Write `data` to `key` in `bucket`, replacing any existing object.
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;
}
