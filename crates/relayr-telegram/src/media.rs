// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media ingestion for inbound Telegram attachments.
//!
//! Resolves a provider file id via `getFile`, downloads the bytes, uploads
//! them to object storage, and records a [`MediaFile`] row the message
//! links to.

use chrono::Utc;
use teloxide::Bot;
use teloxide::net::Download;
use teloxide::prelude::Requester;
use teloxide::types::FileId;
use tracing::debug;
use uuid::Uuid;

use relayr_core::error::RelayrError;
use relayr_core::traits::object_store::ObjectStore;
use relayr_core::traits::repository::Repository;
use relayr_core::types::MediaFile;

/// Downloads a file from Telegram servers by provider file id.
pub async fn download_file(bot: &Bot, file_id: &str) -> Result<Vec<u8>, RelayrError> {
    let file = bot
        .get_file(FileId(file_id.to_owned()))
        .await
        .map_err(|e| RelayrError::transport(format!("failed to resolve telegram file: {e}"), e))?;

    let mut buf = Vec::new();
    bot.download_file(&file.path, &mut buf)
        .await
        .map_err(|e| RelayrError::transport(format!("failed to download telegram file: {e}"), e))?;

    debug!(file_id = %file_id, size = buf.len(), "downloaded file from telegram");
    Ok(buf)
}

/// Full ingestion path: download, upload to object storage, persist the
/// [`MediaFile`] row. Returns the stored media file for message linking.
pub async fn ingest_media(
    bot: &Bot,
    repo: &dyn Repository,
    store: &dyn ObjectStore,
    account_id: &str,
    file_id: &str,
) -> Result<MediaFile, RelayrError> {
    let bytes = download_file(bot, file_id).await?;

    let size_bytes = bytes.len() as u64;
    let filename = format!("{file_id}.bin");
    let key = store.generate_key(account_id, "telegram", &filename);
    let stored = store.upload(&key, bytes, None).await?;

    let media = MediaFile {
        id: Uuid::new_v4().to_string(),
        account_id: account_id.to_string(),
        name: filename,
        mime_type: None,
        size_bytes,
        storage_key: key,
        url: stored.url,
        created_at: Utc::now(),
    };
    repo.insert_media_file(&media).await?;
    Ok(media)
}
