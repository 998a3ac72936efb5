//! reqwest-backed content store client.
//!
//! This module provides the concrete implementation of `ContentStore` for a store
//! exposing a REST API over named collections (`/{collection}`, `/{collection}/{id}`)
//! and a media library (`/upload`, `/upload/files`).

use std::time::Duration;

use async_trait::async_trait;
use content_migrate_shared::RecordId;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::RetryIf;
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::errors::ContentStoreError;
use crate::interfaces::ContentStore;
use crate::types::{ListQuery, MediaUpload, RecordPage, UploadedMedia};
use crate::utils;

/// Which failures a request may be retried on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryPolicy {
    /// GET, DELETE and PATCH: any transient failure.
    Idempotent,
    /// POST: only failures where the request never left the client, so a create or
    /// upload the store already committed is never sent twice.
    UnsentOnly,
}

impl RetryPolicy {
    fn allows(self, error: &ContentStoreError) -> bool {
        match self {
            Self::Idempotent => error.is_transient(),
            Self::UnsentOnly => error.is_unsent(),
        }
    }
}

/// HTTP content store client.
///
/// Every request carries the configured bearer token and is bounded by the configured
/// timeout. Idempotent requests are retried with jittered exponential backoff when they
/// fail transiently (see [`ContentStoreError::is_transient`]); creates and uploads are
/// retried only when nothing was sent (see [`ContentStoreError::is_unsent`]).
///
/// # Example
///
/// ```ignore
/// use content_migrate_repository::{ContentStore, HttpContentStore, ListQuery, StoreConfig};
///
/// let config = StoreConfig::new("http://localhost:1337/api").with_token(token);
/// let store = HttpContentStore::new(config)?;
/// let page = store.list_records("artikels", &ListQuery::populated()).await?;
/// ```
pub struct HttpContentStore {
    client: Client,
    config: StoreConfig,
}

impl HttpContentStore {
    /// Create a client for the given endpoint.
    ///
    /// # Returns
    ///
    /// * `Ok(HttpContentStore)` - A new client
    /// * `Err(ContentStoreError)` - If the underlying HTTP client cannot be built
    pub fn new(config: StoreConfig) -> Result<Self, ContentStoreError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ContentStoreError::connection(e.to_string()))?;

        info!(
            base_url = %config.base_url,
            timeout_secs = config.timeout.as_secs(),
            max_retries = config.max_retries,
            authenticated = config.token.is_some(),
            "Created HTTP content store client"
        );

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        ExponentialBackoff::from_millis(10)
            .factor(20)
            .max_delay(Duration::from_secs(5))
            .map(jitter)
            .take(self.config.max_retries)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send the request built by `build`, retrying the failures `policy` allows.
    ///
    /// `build` is called once per attempt because a `RequestBuilder` (and a multipart
    /// body in particular) cannot be replayed.
    async fn send<F>(&self, policy: RetryPolicy, build: F) -> Result<Response, ContentStoreError>
    where
        F: Fn() -> RequestBuilder,
    {
        RetryIf::start(
            self.retry_strategy(),
            || Self::execute(self.authorize(build())),
            |e: &ContentStoreError| {
                let retry = policy.allows(e);
                if retry {
                    warn!(error = %e, policy = ?policy, "Content store request failed, retrying");
                }
                retry
            },
        )
        .await
    }

    async fn execute(request: RequestBuilder) -> Result<Response, ContentStoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().to_string();
        let body = response.text().await.unwrap_or_default();
        Err(ContentStoreError::status(status.as_u16(), url, body))
    }

    async fn read_json(response: Response) -> Result<Value, ContentStoreError> {
        response
            .json::<Value>()
            .await
            .map_err(|e| ContentStoreError::malformed(e.to_string()))
    }
}

#[async_trait]
impl ContentStore for HttpContentStore {
    async fn list_records(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<RecordPage, ContentStoreError> {
        let url = self.config.url(collection);
        let pairs = query.to_query_pairs();
        debug!(url = %url, query = ?pairs, "Listing records");

        let response = self
            .send(RetryPolicy::Idempotent, || self.client.get(&url).query(&pairs))
            .await?;
        utils::parse_record_page(Self::read_json(response).await?)
    }

    async fn delete_record(
        &self,
        collection: &str,
        id: &RecordId,
    ) -> Result<(), ContentStoreError> {
        let url = self.config.url(&format!("{}/{}", collection, id));
        debug!(url = %url, "Deleting record");

        self.send(RetryPolicy::Idempotent, || self.client.delete(&url)).await?;
        Ok(())
    }

    async fn create_record(
        &self,
        collection: &str,
        data: &Value,
    ) -> Result<Value, ContentStoreError> {
        let url = self.config.url(collection);
        let body = json!({ "data": data });
        debug!(url = %url, "Creating record");

        let response = self
            .send(RetryPolicy::UnsentOnly, || self.client.post(&url).json(&body))
            .await?;
        utils::parse_single_record(Self::read_json(response).await?)
    }

    async fn update_record(
        &self,
        collection: &str,
        id: &RecordId,
        data: &Value,
    ) -> Result<(), ContentStoreError> {
        let url = self.config.url(&format!("{}/{}", collection, id));
        let body = json!({ "data": data });
        debug!(url = %url, "Updating record");

        self.send(RetryPolicy::Idempotent, || self.client.patch(&url).json(&body))
            .await?;
        Ok(())
    }

    async fn list_media(&self) -> Result<Vec<Value>, ContentStoreError> {
        let url = self.config.url("upload/files");
        debug!(url = %url, "Listing media");

        let response = self.send(RetryPolicy::Idempotent, || self.client.get(&url)).await?;
        utils::parse_media_index(Self::read_json(response).await?)
    }

    async fn upload_media(
        &self,
        upload: &MediaUpload,
    ) -> Result<UploadedMedia, ContentStoreError> {
        let url = self.config.url("upload");
        debug!(
            url = %url,
            file_name = %upload.file_name,
            size = upload.bytes.len(),
            "Uploading media"
        );

        let build_part = || {
            let part = || Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
            match upload.mime.as_deref() {
                Some(mime) => part().mime_str(mime).unwrap_or_else(|_| part()),
                None => part(),
            }
        };

        let response = self
            .send(RetryPolicy::UnsentOnly, || {
                self.client
                    .post(&url)
                    .multipart(Form::new().part("files", build_part()))
            })
            .await?;
        utils::parse_upload_response(Self::read_json(response).await?, &self.config.id_field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Requests received by a [`bad_gateway_server`], by method.
    #[derive(Default)]
    struct Received {
        total: AtomicUsize,
        posts: AtomicUsize,
    }

    /// Local server answering every request with 502 after reading it completely.
    async fn bad_gateway_server() -> (String, Arc<Received>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/api", listener.local_addr().unwrap());
        let received = Arc::new(Received::default());
        let counters = received.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                loop {
                    let n = match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => n,
                    };
                    request.extend_from_slice(&buf[..n]);

                    let text = String::from_utf8_lossy(&request).to_lowercase();
                    let Some(header_end) = text.find("\r\n\r\n") else {
                        continue;
                    };
                    let body_len = text[..header_end]
                        .lines()
                        .find_map(|line| line.strip_prefix("content-length:"))
                        .and_then(|value| value.trim().parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + body_len {
                        break;
                    }
                }

                counters.total.fetch_add(1, Ordering::SeqCst);
                if request.starts_with(b"POST") {
                    counters.posts.fetch_add(1, Ordering::SeqCst);
                }
                let _ = socket
                    .write_all(b"HTTP/1.1 502 Bad Gateway\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                    .await;
                let _ = socket.shutdown().await;
            }
        });

        (base_url, received)
    }

    #[tokio::test]
    async fn test_create_is_not_resent_after_server_error() {
        let (base_url, received) = bad_gateway_server().await;
        let store = HttpContentStore::new(StoreConfig::new(base_url).with_max_retries(3)).unwrap();

        let result = store
            .create_record("artikels", &json!({"title": "Hallo"}))
            .await;

        assert!(result.is_err());
        assert_eq!(received.posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_is_not_resent_after_server_error() {
        let (base_url, received) = bad_gateway_server().await;
        let store = HttpContentStore::new(StoreConfig::new(base_url).with_max_retries(3)).unwrap();
        let upload = MediaUpload {
            file_name: "logo.png".to_string(),
            mime: Some("image/png".to_string()),
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
        };

        assert!(store.upload_media(&upload).await.is_err());
        assert_eq!(received.posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_listing_is_retried_after_server_error() {
        let (base_url, received) = bad_gateway_server().await;
        let store = HttpContentStore::new(StoreConfig::new(base_url).with_max_retries(2)).unwrap();

        let result = store.list_records("artikels", &ListQuery::bounded(10)).await;

        assert!(matches!(
            result,
            Err(ContentStoreError::Status { status: 502, .. })
        ));
        assert_eq!(received.total.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_strategy_is_bounded() {
        let store = HttpContentStore::new(StoreConfig::new("http://localhost:1337/api").with_max_retries(4))
            .unwrap();

        let delays: Vec<Duration> = store.retry_strategy().collect();
        assert_eq!(delays.len(), 4);
        assert!(delays.iter().all(|d| *d <= Duration::from_secs(5)));
    }

    #[test]
    fn test_no_retries_when_disabled() {
        let store =
            HttpContentStore::new(StoreConfig::new("http://localhost:1337/api").with_max_retries(0))
                .unwrap();

        assert_eq!(store.retry_strategy().count(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let config = StoreConfig::new("http://127.0.0.1:9/api")
            .with_max_retries(0)
            .with_timeout(Duration::from_secs(2));
        let store = HttpContentStore::new(config).unwrap();

        let result = store.list_records("artikels", &ListQuery::populated()).await;

        assert!(matches!(
            result,
            Err(ContentStoreError::ConnectionError(_)) | Err(ContentStoreError::Timeout(_))
        ));
    }
}
