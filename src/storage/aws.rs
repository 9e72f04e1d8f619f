//! AWS S3 storage backend.
//!
//! Uploads go straight to the destination bucket with a single
//! `PutObject` call; there is no key prefixing and no multipart
//! chunking.  Credentials are injected as static credentials from the
//! service configuration rather than resolved through the default chain,
//! so a missing key is caught at startup instead of on the first upload.

use aws_sdk_s3::Client;
use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

use super::backend::ObjectStore;

/// Provider name reported by the static credentials.
const CREDENTIALS_PROVIDER: &str = "home-energy-config";

/// Object store that forwards uploads to AWS S3.
pub struct S3ObjectStore {
    /// AWS S3 SDK client.
    client: Client,
}

impl S3ObjectStore {
    /// Create a new S3 object store.
    ///
    /// `endpoint_url` targets an S3-compatible service (MinIO,
    /// LocalStack); `use_path_style` is usually required alongside it.
    pub async fn new(
        region: String,
        endpoint_url: Option<String>,
        use_path_style: bool,
        access_key_id: String,
        secret_access_key: String,
    ) -> anyhow::Result<Self> {
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            anyhow::bail!("AWS credentials are missing");
        }

        let creds = aws_sdk_s3::config::Credentials::new(
            access_key_id,
            secret_access_key,
            None, // session_token
            None, // expiry
            CREDENTIALS_PROVIDER,
        );

        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region))
            .credentials_provider(creds);

        if let Some(ref endpoint) = endpoint_url {
            config_loader = config_loader.endpoint_url(endpoint);
        }

        let sdk_config = config_loader.load().await;

        let s3_config_builder =
            aws_sdk_s3::config::Builder::from(&sdk_config).force_path_style(use_path_style);

        Ok(Self {
            client: Client::from_conf(s3_config_builder.build()),
        })
    }

    /// Map an AWS SDK error to an anyhow error with context.
    ///
    /// SDK errors only display "service error" at the top level; the
    /// useful detail lives in the source chain, so it is flattened here.
    fn map_sdk_error(context: &str, err: impl std::error::Error) -> anyhow::Error {
        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        anyhow::anyhow!("{context}: {message}")
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let bucket = bucket.to_string();
        let key = key.to_string();
        Box::pin(async move {
            debug!(bucket = %bucket, key = %key, size = data.len(), "S3 put_object");

            self.client
                .put_object()
                .bucket(&bucket)
                .key(&key)
                .content_type("text/csv")
                .body(aws_sdk_s3::primitives::ByteStream::from(data))
                .send()
                .await
                .map_err(|e| Self::map_sdk_error("put_object", e))?;

            Ok(())
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Wrapped(&'static str, Option<Box<Wrapped>>);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(self.0)
        }
    }

    impl std::error::Error for Wrapped {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            self.1.as_deref().map(|e| e as _)
        }
    }

    #[test]
    fn test_map_sdk_error_flattens_source_chain() {
        let err = Wrapped(
            "service error",
            Some(Box::new(Wrapped("AccessDenied: Access Denied", None))),
        );
        let mapped = S3ObjectStore::map_sdk_error("put_object", err);
        assert_eq!(
            mapped.to_string(),
            "put_object: service error: AccessDenied: Access Denied"
        );
    }

    #[test]
    fn test_map_sdk_error_without_source() {
        let mapped = S3ObjectStore::map_sdk_error("put_object", Wrapped("dispatch failure", None));
        assert_eq!(mapped.to_string(), "put_object: dispatch failure");
    }

    #[tokio::test]
    async fn test_new_rejects_missing_credentials() {
        let result = S3ObjectStore::new(
            "us-east-2".to_string(),
            None,
            false,
            String::new(),
            "secret".to_string(),
        )
        .await;
        assert!(result.is_err());
    }
}
