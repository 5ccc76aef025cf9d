//! Object-storage transport backed by the AWS S3 API.

use crate::error::{TransportError, TransportResult};
use crate::transport::{KeyStream, Transport};
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use tokio::runtime::Runtime;

/// Connection parameters for an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Custom endpoint URL for S3-compatible stores (MinIO, etc.).
    /// `None` uses the regular AWS endpoint for the region.
    pub endpoint: Option<String>,
    /// Region name. S3-compatible stores usually accept any value.
    pub region: String,
    /// Bucket holding the snapshots.
    pub bucket: String,
    /// Static access key id.
    pub access_key_id: String,
    /// Static secret access key.
    pub secret_access_key: String,
}

impl S3Config {
    /// Creates a configuration for the given bucket with static credentials.
    pub fn new(
        bucket: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_owned(),
            bucket: bucket.into(),
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Sets a custom endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}

/// Object-storage transport.
///
/// Stateless per call: every operation is an independent request signed
/// with the configured credentials. The SDK is async, so the transport
/// owns a current-thread runtime and blocks on each call, keeping the
/// [`Transport`] surface synchronous like the rest of the engine.
pub struct S3Transport {
    client: Client,
    bucket: String,
    runtime: Runtime,
}

impl S3Transport {
    /// Connects to the bucket and verifies access.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Auth`] if the store rejects the
    /// credentials, and a remote error if the bucket is unreachable.
    pub fn connect(config: S3Config) -> TransportResult<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let credentials = Credentials::new(
            config.access_key_id.clone(),
            config.secret_access_key.clone(),
            None,
            None,
            "savesync",
        );
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials);
        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = runtime.block_on(loader.load());
        // Path-style addressing: S3-compatible stores rarely support
        // virtual-hosted bucket names.
        let s3_config = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(true)
            .build();
        let client = Client::from_conf(s3_config);

        let transport = Self {
            client,
            bucket: config.bucket,
            runtime,
        };
        transport.probe_bucket()?;
        Ok(transport)
    }

    /// One cheap authenticated request so that bad credentials fail at
    /// startup instead of mid-sync.
    fn probe_bucket(&self) -> TransportResult<()> {
        let bucket = self.bucket.clone();
        self.runtime
            .block_on(async { self.client.head_bucket().bucket(&bucket).send().await })
            .map(|_| ())
            .map_err(|e| classify_error("probe", bucket, &e))
    }

    fn fetch_page(
        &self,
        prefix: &str,
        token: Option<String>,
    ) -> TransportResult<(Vec<String>, Option<String>)> {
        self.runtime.block_on(async {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);
            if let Some(token) = token {
                request = request.continuation_token(token);
            }
            let response = request
                .send()
                .await
                .map_err(|e| classify_error("list", prefix.to_owned(), &e))?;

            let keys = response
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_owned))
                .collect();
            let next = response.next_continuation_token().map(str::to_owned);
            Ok((keys, next))
        })
    }
}

impl Transport for S3Transport {
    fn upload(&self, local: &Path, key: &str) -> TransportResult<()> {
        self.runtime.block_on(async {
            let body = ByteStream::from_path(local)
                .await
                .map_err(|e| TransportError::remote("upload", key, e.to_string()))?;
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type("application/zip")
                .body(body)
                .send()
                .await
                .map_err(|e| classify_error("upload", key.to_owned(), &e))?;
            Ok(())
        })
    }

    fn download(&self, key: &str, local: &Path) -> TransportResult<()> {
        let bytes = self.runtime.block_on(async {
            let response = self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| classify_error("download", key.to_owned(), &e))?;
            response
                .body
                .collect()
                .await
                .map(|data| data.into_bytes())
                .map_err(|e| TransportError::remote("download", key, e.to_string()))
        })?;
        fs::write(local, bytes)?;
        Ok(())
    }

    fn list(&self, prefix: &str) -> KeyStream<'_> {
        Box::new(S3KeyStream {
            transport: self,
            prefix: prefix.to_owned(),
            buffered: VecDeque::new(),
            continuation: None,
            started: false,
            exhausted: false,
        })
    }

    fn rename(&self, old_key: &str, new_key: &str) -> TransportResult<()> {
        // S3 has no rename; copy then delete. If the delete fails the copy
        // is not rolled back and both keys coexist until a later cleanup.
        self.runtime.block_on(async {
            self.client
                .copy_object()
                .bucket(&self.bucket)
                .copy_source(format!("{}/{}", self.bucket, old_key))
                .key(new_key)
                .send()
                .await
                .map_err(|e| classify_error("rename", old_key.to_owned(), &e))?;
            self.client
                .delete_object()
                .bucket(&self.bucket)
                .key(old_key)
                .send()
                .await
                .map_err(|e| {
                    tracing::warn!(old_key, new_key, "copied but failed to delete source");
                    classify_error("rename", old_key.to_owned(), &e)
                })?;
            Ok(())
        })
    }
}

/// Lazily paged listing; each page is one `ListObjectsV2` request.
struct S3KeyStream<'a> {
    transport: &'a S3Transport,
    prefix: String,
    buffered: VecDeque<String>,
    continuation: Option<String>,
    started: bool,
    exhausted: bool,
}

impl Iterator for S3KeyStream<'_> {
    type Item = TransportResult<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(key) = self.buffered.pop_front() {
                return Some(Ok(key));
            }
            if self.exhausted || (self.started && self.continuation.is_none()) {
                return None;
            }

            self.started = true;
            match self
                .transport
                .fetch_page(&self.prefix, self.continuation.take())
            {
                Ok((keys, next)) => {
                    self.buffered.extend(keys);
                    self.continuation = next;
                }
                Err(err) => {
                    self.exhausted = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Maps a backend failure to [`TransportError`], pulling authentication
/// problems out so they can be treated as fatal.
///
/// Classification uses the service error code and the HTTP status, never
/// the rendered message text; keys and messages are free to contain
/// strings that merely look like error codes.
fn classify_error<E>(operation: &'static str, key: String, err: &SdkError<E>) -> TransportError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let message = DisplayErrorContext(err).to_string();
    if is_auth_failure(err) {
        TransportError::auth(message)
    } else {
        TransportError::Remote {
            operation,
            key,
            message,
        }
    }
}

fn is_auth_failure<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    if err.code().is_some_and(is_auth_code) {
        return true;
    }
    // HEAD requests carry no error body, so the probe's auth rejection
    // only shows up as the response status.
    matches!(err, SdkError::ServiceError(context)
        if matches!(context.raw().status().as_u16(), 401 | 403))
}

fn is_auth_code(code: &str) -> bool {
    matches!(
        code,
        "AccessDenied"
            | "InvalidAccessKeyId"
            | "SignatureDoesNotMatch"
            | "ExpiredToken"
            | "TokenRefreshRequired"
    )
}
