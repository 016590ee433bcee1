//! Durable storage backends for the state document.
//!
//! - `FileStorage`: one file per key in a local directory, written
//!   through a temp file and renamed into place
//! - `GcsStorage`: objects in a Google Cloud Storage bucket via the JSON API,
//!   authorized by a [`TokenSource`]
//! - `MemoryStorage`: process-local map, for tests and dry runs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feedbot_core::config::{StorageBackend, StorageConfig};
use feedbot_core::utils::expand_home;
use reqwest::{Client, StatusCode, Url};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

use crate::error::{FeedError, Result};

/// Key/value blob storage.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Human-readable location, for logs and `status`.
    fn describe(&self) -> String;

    /// Read `key`, or `None` if it does not exist.
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;
}

/// Build the backend selected by `config`.
///
/// Fails when the gcs backend is chosen without a bucket.
pub fn build_storage(config: &StorageConfig, timeout: Duration) -> Result<Arc<dyn Storage>> {
    match config.backend {
        StorageBackend::File => Ok(Arc::new(FileStorage::new(expand_home(&config.dir)))),
        StorageBackend::Gcs => {
            if config.bucket.is_empty() {
                return Err(FeedError::Persistence(
                    "gcs storage selected but no bucket configured".into(),
                ));
            }
            let client = Client::builder().timeout(timeout).build()?;
            let tokens: Arc<dyn TokenSource> = if !config.access_token.is_empty() {
                Arc::new(StaticToken::new(&config.access_token))
            } else if config.anonymous {
                Arc::new(StaticToken::none())
            } else {
                Arc::new(DefaultCredentials::new())
            };
            Ok(Arc::new(GcsStorage::new(
                client,
                &config.api_base,
                &config.bucket,
                tokens,
            )))
        }
    }
}

// ─────────────────────────────────────────────
// FileStorage
// ─────────────────────────────────────────────

/// Distinguishes temp files of overlapping writes.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Stores each key as a file under `dir`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl Storage for FileStorage {
    fn describe(&self) -> String {
        format!("file://{}", self.dir.display())
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp = path.with_extension(format!("tmp.{}.{seq}", std::process::id()));
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "wrote state file");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Credentials
// ─────────────────────────────────────────────

const GCS_SCOPE: &str = "https://www.googleapis.com/auth/devstorage.read_write";

/// Supplies the bearer token for each storage request.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Current token, or `None` to send the request unauthenticated.
    async fn token(&self) -> Result<Option<String>>;
}

/// A fixed token from configuration. Empty means no credentials.
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self((!token.is_empty()).then(|| token.to_string()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<Option<String>> {
        Ok(self.0.clone())
    }
}

/// Application Default Credentials: a service account key named by
/// `GOOGLE_APPLICATION_CREDENTIALS`, gcloud user credentials or the GCE
/// metadata server. Tokens are cached by the provider and refreshed
/// before they expire.
pub struct DefaultCredentials {
    provider: OnceCell<Arc<dyn gcp_auth::TokenProvider>>,
}

impl DefaultCredentials {
    pub fn new() -> Self {
        Self {
            provider: OnceCell::new(),
        }
    }
}

impl Default for DefaultCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenSource for DefaultCredentials {
    async fn token(&self) -> Result<Option<String>> {
        let provider = self
            .provider
            .get_or_try_init(gcp_auth::provider)
            .await
            .map_err(|e| FeedError::Persistence(format!("no google cloud credentials: {e}")))?;
        let token = provider
            .token(&[GCS_SCOPE])
            .await
            .map_err(|e| FeedError::Persistence(format!("fetching google cloud token: {e}")))?;
        Ok(Some(token.as_str().to_string()))
    }
}

// ─────────────────────────────────────────────
// GcsStorage
// ─────────────────────────────────────────────

/// Google Cloud Storage bucket accessed through the JSON API.
pub struct GcsStorage {
    client: Client,
    api_base: String,
    bucket: String,
    tokens: Arc<dyn TokenSource>,
}

impl GcsStorage {
    pub fn new(client: Client, api_base: &str, bucket: &str, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            tokens,
        }
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_base)
            .map_err(|e| FeedError::Persistence(format!("invalid storage api base: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| FeedError::Persistence("storage api base cannot hold a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach a fresh token, looked up per request so refreshed
    /// credentials are picked up.
    async fn authorize(&self, req: reqwest::RequestBuilder) -> Result<reqwest::RequestBuilder> {
        Ok(match self.tokens.token().await? {
            Some(token) => req.bearer_auth(token),
            None => req,
        })
    }
}

#[async_trait]
impl Storage for GcsStorage {
    fn describe(&self) -> String {
        format!("gs://{}", self.bucket)
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let url = self.url(&["storage", "v1", "b", &self.bucket, "o", key])?;
        let response = self
            .authorize(self.client.get(url).query(&[("alt", "media")]))
            .await?
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.bytes().await?.to_vec())),
            status => Err(FeedError::Persistence(format!(
                "reading gs://{}/{key}: HTTP {status}",
                self.bucket
            ))),
        }
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let url = self.url(&["upload", "storage", "v1", "b", &self.bucket, "o"])?;
        let response = self
            .authorize(
                self.client
                    .post(url)
                    .query(&[("uploadType", "media"), ("name", key)])
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(bytes.to_vec()),
            )
            .await?
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Persistence(format!(
                "writing gs://{}/{key}: HTTP {status}",
                self.bucket
            )));
        }
        debug!(bucket = %self.bucket, key = %key, bytes = bytes.len(), "wrote state object");
        Ok(())
    }
}

// ─────────────────────────────────────────────
// MemoryStorage
// ─────────────────────────────────────────────

/// In-process storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.objects.lock().await.get(key).cloned())
    }

    async fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.objects
            .lock()
            .await
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string, header, method, path, query_param};
    use std::sync::atomic::AtomicUsize;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(value: &str) -> Arc<dyn TokenSource> {
        Arc::new(StaticToken::new(value))
    }

    /// Hands out `tok-1`, `tok-2`, ... like a provider refreshing on expiry.
    #[derive(Default)]
    struct RotatingToken(AtomicUsize);

    #[async_trait]
    impl TokenSource for RotatingToken {
        async fn token(&self) -> Result<Option<String>> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Some(format!("tok-{n}")))
        }
    }

    struct NoCredentials;

    #[async_trait]
    impl TokenSource for NoCredentials {
        async fn token(&self) -> Result<Option<String>> {
            Err(FeedError::Persistence("no google cloud credentials".into()))
        }
    }

    #[tokio::test]
    async fn test_file_storage_roundtrip() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("nested"));

        assert!(storage.read("state.json").await.unwrap().is_none());
        storage.write("state.json", b"{\"a\":1}").await.unwrap();
        assert_eq!(
            storage.read("state.json").await.unwrap().as_deref(),
            Some(&b"{\"a\":1}"[..])
        );
        // No temp file left behind
        let names: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec!["state.json"]);
    }

    #[tokio::test]
    async fn test_file_storage_concurrent_writes() {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path()));
        let writes: Vec<_> = (0..8)
            .map(|i| {
                let storage = storage.clone();
                tokio::spawn(async move { storage.write("k", format!("v{i}").as_bytes()).await })
            })
            .collect();
        for w in writes {
            w.await.unwrap().unwrap();
        }
        let last = storage.read("k").await.unwrap().unwrap();
        assert!(last.starts_with(b"v"));
    }

    #[tokio::test]
    async fn test_file_storage_overwrite() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        storage.write("k", b"one").await.unwrap();
        storage.write("k", b"two").await.unwrap();
        assert_eq!(storage.read("k").await.unwrap().unwrap(), b"two");
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::new();
        assert!(storage.read("k").await.unwrap().is_none());
        storage.write("k", b"v").await.unwrap();
        assert_eq!(storage.read("k").await.unwrap().unwrap(), b"v");
        assert_eq!(storage.describe(), "memory");
    }

    #[test]
    fn test_build_storage() {
        let mut config = StorageConfig::default();
        config.dir = "/tmp/feedbot-test".into();
        let storage = build_storage(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(storage.describe(), "file:///tmp/feedbot-test");

        config.backend = StorageBackend::Gcs;
        assert!(build_storage(&config, Duration::from_secs(5)).is_err());

        config.bucket = "bots".into();
        let storage = build_storage(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(storage.describe(), "gs://bots");
    }

    #[tokio::test]
    async fn test_gcs_read() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/storage/v1/b/bots/o/rsssubsbot.json"))
            .and(query_param("alt", "media"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .mount(&server)
            .await;

        let storage = GcsStorage::new(Client::new(), &server.uri(), "bots", token("tok"));
        let bytes = storage.read("rsssubsbot.json").await.unwrap().unwrap();
        assert_eq!(bytes, b"{}");
    }

    #[tokio::test]
    async fn test_gcs_read_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let storage = GcsStorage::new(Client::new(), &server.uri(), "bots", token(""));
        assert!(storage.read("rsssubsbot.json").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gcs_read_forbidden_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let storage = GcsStorage::new(Client::new(), &server.uri(), "bots", token(""));
        let err = storage.read("rsssubsbot.json").await.unwrap_err();
        assert!(matches!(err, FeedError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_gcs_write() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/storage/v1/b/bots/o"))
            .and(query_param("uploadType", "media"))
            .and(query_param("name", "rsssubsbot.json"))
            .and(body_string("{\"feeds\":{}}"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let storage = GcsStorage::new(Client::new(), &format!("{}/", server.uri()), "bots", token("tok"));
        storage
            .write("rsssubsbot.json", b"{\"feeds\":{}}")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_gcs_write_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let storage = GcsStorage::new(Client::new(), &server.uri(), "bots", token("tok"));
        assert!(storage.write("k", b"x").await.is_err());
    }

    #[tokio::test]
    async fn test_gcs_token_looked_up_per_request() {
        let server = MockServer::start().await;
        for tok in ["Bearer tok-1", "Bearer tok-2"] {
            Mock::given(method("GET"))
                .and(header("authorization", tok))
                .respond_with(ResponseTemplate::new(200).set_body_string(tok))
                .expect(1)
                .mount(&server)
                .await;
        }

        let storage = GcsStorage::new(
            Client::new(),
            &server.uri(),
            "bots",
            Arc::new(RotatingToken::default()),
        );
        assert_eq!(storage.read("k").await.unwrap().unwrap(), b"Bearer tok-1");
        assert_eq!(storage.read("k").await.unwrap().unwrap(), b"Bearer tok-2");
    }

    #[tokio::test]
    async fn test_gcs_credential_failure_is_persistence_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let storage = GcsStorage::new(Client::new(), &server.uri(), "bots", Arc::new(NoCredentials));
        assert!(matches!(
            storage.write("k", b"x").await,
            Err(FeedError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_static_token() {
        assert_eq!(StaticToken::new("abc").token().await.unwrap().as_deref(), Some("abc"));
        assert!(StaticToken::new("").token().await.unwrap().is_none());
        assert!(StaticToken::none().token().await.unwrap().is_none());
    }
}
