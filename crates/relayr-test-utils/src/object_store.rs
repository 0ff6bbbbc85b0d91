// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory [`ObjectStore`] implementation.

use async_trait::async_trait;
use tokio::sync::Mutex;

use relayr_core::error::RelayrError;
use relayr_core::traits::object_store::{ObjectStore, StoredObject};

/// One captured upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Object store capturing uploads for assertions. Keys are deterministic
/// so tests can predict them.
#[derive(Default)]
pub struct InMemoryObjectStore {
    uploads: Mutex<Vec<Upload>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().await.clone()
    }

    pub async fn upload_count(&self) -> usize {
        self.uploads.lock().await.len()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<StoredObject, RelayrError> {
        self.uploads.lock().await.push(Upload {
            key: key.to_string(),
            bytes,
            content_type: content_type.map(str::to_owned),
        });
        Ok(StoredObject {
            url: format!("memory://{key}"),
        })
    }

    fn generate_key(&self, account_id: &str, category: &str, filename: &str) -> String {
        format!("{account_id}/{category}/{filename}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_is_captured_with_url() {
        let store = InMemoryObjectStore::new();
        let key = store.generate_key("a1", "recordings", "call-1.wav");
        let stored = store
            .upload(&key, b"wav".to_vec(), Some("audio/wav"))
            .await
            .expect("upload");
        assert_eq!(stored.url, "memory://a1/recordings/call-1.wav");
        assert_eq!(store.upload_count().await, 1);
    }
}
