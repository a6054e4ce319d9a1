//! Image persistence queue.
//!
//! Expiring CDN images (signed URLs) referenced by bookmark previews are
//! downloaded and re-uploaded to durable storage by a bounded background
//! worker, decoupled from the synchronous extraction path. Failures are
//! logged and the item is dropped; persistence is best-effort.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use indexmap::IndexSet;
use tracing::{debug, info, warn};
use url::Url;

use crate::client;
use crate::config::UnfurlConfig;
use crate::error::PersistError;

/// One pending persistence request.
///
/// `retry_count` is carried for forward compatibility but is never
/// incremented or consulted: a failed item is dropped after its single
/// attempt.
#[derive(Debug, Clone)]
pub struct QueueItem {
    /// The entity to update once the image is durable
    pub subject_id: String,
    pub image_url: String,
    pub retry_count: u32,
}

/// Abstraction over the durable storage backend.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Request a one-time upload target.
    async fn create_upload_url(&self) -> Result<String, PersistError>;

    /// Upload image bytes to the target; returns the durable URL.
    async fn upload(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String, PersistError>;

    /// Point the subject's record at the durable URL.
    async fn attach_image(&self, subject_id: &str, storage_url: &str) -> Result<(), PersistError>;
}

/// Durable storage backend speaking the storage service's HTTP API.
pub struct HttpDurableStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpDurableStore {
    pub fn new(client: reqwest::Client, base_url: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url,
            api_key,
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl DurableStore for HttpDurableStore {
    async fn create_upload_url(&self) -> Result<String, PersistError> {
        let response = self
            .authorize(self.client.post(format!("{}/upload-url", self.base_url)))
            .send()
            .await
            .map_err(|e| PersistError::Store(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PersistError::Store(format!(
                "upload-url request returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PersistError::Store(e.to_string()))?;
        body.get("uploadUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| PersistError::Store("missing uploadUrl in response".to_string()))
    }

    async fn upload(
        &self,
        upload_url: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String, PersistError> {
        let mut builder = self.client.post(upload_url).body(bytes);
        if let Some(ct) = content_type {
            builder = builder.header(reqwest::header::CONTENT_TYPE, ct);
        }
        let response = builder
            .send()
            .await
            .map_err(|e| PersistError::Store(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PersistError::Store(format!(
                "upload returned {}",
                response.status()
            )));
        }
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| PersistError::Store(e.to_string()))?;
        body.get("storageUrl")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| PersistError::Store("missing storageUrl in response".to_string()))
    }

    async fn attach_image(&self, subject_id: &str, storage_url: &str) -> Result<(), PersistError> {
        let response = self
            .authorize(
                self.client
                    .post(format!("{}/subjects/{}/image", self.base_url, subject_id))
                    .json(&serde_json::json!({ "storageUrl": storage_url })),
            )
            .send()
            .await
            .map_err(|e| PersistError::Store(e.to_string()))?;
        if !response.status().is_success() {
            return Err(PersistError::Store(format!(
                "attach returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

/// Whether an image URL needs proactive re-hosting.
///
/// URLs already in durable storage never do. Otherwise a known expiry
/// query parameter or a hostname on the expiring-CDN list marks the URL
/// as transient. Hostname matching is intentionally loose (exact, suffix,
/// or TLD-stripped substring) to catch CDN subdomain variants.
pub fn needs_persistence(image_url: &str, config: &UnfurlConfig) -> bool {
    let Ok(parsed) = Url::parse(image_url) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    if host.contains(&config.durable_host_marker) {
        return false;
    }

    let has_expiry_param = parsed
        .query_pairs()
        .any(|(key, _)| config.expiry_params.iter().any(|p| key.eq_ignore_ascii_case(p)));
    if has_expiry_param {
        return true;
    }

    config.expiring_domains.iter().any(|domain| {
        let domain = domain.to_ascii_lowercase();
        if host == domain || host.ends_with(&format!(".{domain}")) {
            return true;
        }
        // TLD-stripped substring: "tiktokcdn.com" also matches
        // "p16-sign-va.tiktokcdn-us.com" style variants.
        match domain.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => host.contains(stem),
            _ => false,
        }
    })
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct QueueStatus {
    pub queued: usize,
    pub active: usize,
    pub processed: usize,
}

struct Inner {
    queue: VecDeque<QueueItem>,
    active: usize,
    processed: IndexSet<String>,
}

/// Bounded background worker for image persistence.
///
/// State lives behind one mutex; the pop-next-item step and the active
/// counter update happen under a single acquisition, so the concurrency
/// ceiling holds under arbitrary interleaving. The drain is
/// completion-driven: each finished item decrements the counter and
/// drains again, with no dedicated scheduler task.
pub struct ImageQueue {
    inner: Mutex<Inner>,
    store: Arc<dyn DurableStore>,
    client: reqwest::Client,
    config: UnfurlConfig,
}

impl ImageQueue {
    pub fn new(client: reqwest::Client, config: UnfurlConfig, store: Arc<dyn DurableStore>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                active: 0,
                processed: IndexSet::new(),
            }),
            store,
            client,
            config,
        }
    }

    /// Enqueue an image for persistence. Non-blocking; returns whether
    /// the item was accepted.
    ///
    /// No-op when the subject was already processed or is already queued,
    /// or when the URL does not need persistence.
    pub fn enqueue(self: Arc<Self>, subject_id: &str, image_url: &str) -> bool {
        if !needs_persistence(image_url, &self.config) {
            debug!(subject_id, url = %image_url, "skipping persistence: url is durable or non-expiring");
            return false;
        }

        {
            let mut inner = self.inner.lock().expect("queue mutex poisoned");
            if inner.processed.contains(subject_id)
                || inner.queue.iter().any(|item| item.subject_id == subject_id)
            {
                debug!(subject_id, "skipping persistence: duplicate subject");
                return false;
            }
            inner.queue.push_back(QueueItem {
                subject_id: subject_id.to_string(),
                image_url: image_url.to_string(),
                retry_count: 0,
            });
        }

        self.drain();
        true
    }

    /// Pop and process items while capacity remains.
    fn drain(self: Arc<Self>) {
        loop {
            let item = {
                let mut inner = self.inner.lock().expect("queue mutex poisoned");
                if inner.active >= self.config.queue_concurrency {
                    return;
                }
                let Some(item) = inner.queue.pop_front() else {
                    return;
                };
                // Oldest entries are evicted so the dedup set cannot grow
                // for the whole process lifetime.
                if inner.processed.len() >= self.config.processed_capacity {
                    inner.processed.shift_remove_index(0);
                }
                inner.processed.insert(item.subject_id.clone());
                inner.active += 1;
                item
            };

            let queue = Arc::clone(&self);
            tokio::spawn(async move {
                match queue.process(&item).await {
                    Ok(storage_url) => {
                        info!(
                            subject_id = %item.subject_id,
                            storage_url = %storage_url,
                            "image persisted"
                        );
                    }
                    Err(e) => {
                        // Best-effort: the item is dropped, not retried.
                        warn!(
                            subject_id = %item.subject_id,
                            url = %item.image_url,
                            error = %e,
                            "image persistence failed"
                        );
                    }
                }
                {
                    let mut inner = queue.inner.lock().expect("queue mutex poisoned");
                    inner.active -= 1;
                }
                queue.drain();
            });
        }
    }

    /// Process one item: upload target, download, upload, attach.
    async fn process(&self, item: &QueueItem) -> Result<String, PersistError> {
        let upload_url = self.store.create_upload_url().await?;
        let (bytes, content_type) =
            client::fetch_bytes(&self.client, &item.image_url, self.config.page_timeout).await?;
        let storage_url = self
            .store
            .upload(&upload_url, bytes, content_type.as_deref())
            .await?;
        self.store
            .attach_image(&item.subject_id, &storage_url)
            .await?;
        Ok(storage_url)
    }

    /// Queue depth, in-flight count, and processed-set size.
    pub fn status(&self) -> QueueStatus {
        let inner = self.inner.lock().expect("queue mutex poisoned");
        QueueStatus {
            queued: inner.queue.len(),
            active: inner.active,
            processed: inner.processed.len(),
        }
    }

    /// Clear the processed-subject dedup set.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("queue mutex poisoned");
        inner.processed.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UnfurlConfig {
        UnfurlConfig::default()
    }

    #[test]
    fn test_expiry_param_needs_persistence() {
        assert!(needs_persistence(
            "https://cdn.example.com/img.jpg?x-expires=123",
            &config()
        ));
        assert!(needs_persistence(
            "https://cdn.example.com/img.jpg?X-Amz-Expires=3600",
            &config()
        ));
    }

    #[test]
    fn test_durable_url_does_not_need_persistence() {
        assert!(!needs_persistence(
            "https://mycompany.convex.cloud/storage/abc",
            &config()
        ));
    }

    #[test]
    fn test_expiring_domain_matches_loosely() {
        assert!(needs_persistence(
            "https://preview.redd.it/abc.jpg",
            &config()
        ));
        // subdomain variant via TLD-stripped substring match
        assert!(needs_persistence(
            "https://p16-sign-va.tiktokcdn-us.com/img.jpeg",
            &config()
        ));
    }

    #[test]
    fn test_plain_public_image_does_not_need_persistence() {
        assert!(!needs_persistence(
            "https://example.com/static/logo.png",
            &config()
        ));
        assert!(!needs_persistence("not a url", &config()));
    }
}
