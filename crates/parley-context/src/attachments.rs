use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Resolves an attachment reference to its stored value: a JSON array of
/// strings (URLs or other payload markers)
#[async_trait]
pub trait AttachmentResolver: Send + Sync {
    async fn resolve(&self, reference: &str) -> Result<String>;
}

pub type SharedAttachmentResolver = Arc<dyn AttachmentResolver>;

/// Resolver for conversations without attachments
pub struct NoAttachments;

#[async_trait]
impl AttachmentResolver for NoAttachments {
    async fn resolve(&self, reference: &str) -> Result<String> {
        anyhow::bail!("No attachment store configured (reference {})", reference)
    }
}

/// Attachment values kept in memory
#[derive(Default)]
pub struct InMemoryAttachments {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, reference: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.get_mut().insert(reference.into(), value.into());
        self
    }

    /// Store the URLs of an attachment under `reference`
    pub async fn insert_urls(&self, reference: impl Into<String>, urls: &[String]) -> Result<()> {
        let value = serde_json::to_string(urls)?;
        self.entries.write().await.insert(reference.into(), value);
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl AttachmentResolver for InMemoryAttachments {
    async fn resolve(&self, reference: &str) -> Result<String> {
        self.entries
            .read()
            .await
            .get(reference)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Attachment not found: {}", reference))
    }
}
