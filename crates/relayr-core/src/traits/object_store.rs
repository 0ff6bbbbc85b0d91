// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Object storage collaborator contract for media and call recordings.

use async_trait::async_trait;

use crate::error::RelayrError;

/// Result of a successful upload.
#[derive(Debug, Clone)]
pub struct StoredObject {
    /// Publicly resolvable URL of the stored blob.
    pub url: String,
}

/// Blob storage used for downloaded channel media and call recordings.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Uploads `bytes` under `key` and returns the stored location.
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<StoredObject, RelayrError>;

    /// Builds an account-scoped storage key for a category and filename.
    fn generate_key(&self, account_id: &str, category: &str, filename: &str) -> String;
}
