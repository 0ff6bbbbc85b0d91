// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media ingestion for inbound WhatsApp attachments.
//!
//! Cloud API media is fetched in two steps: resolve the media id to a
//! short-lived download URL, then download with the integration's token.
//! The bytes land in object storage with a [`MediaFile`] row.

use chrono::Utc;
use uuid::Uuid;

use relayr_core::error::RelayrError;
use relayr_core::traits::object_store::ObjectStore;
use relayr_core::traits::repository::Repository;
use relayr_core::types::{MediaFile, WhatsappSettings};

use crate::client::WhatsappClient;

/// Extension guess for the common Cloud API media mime types.
fn extension_for(mime: Option<&str>) -> &'static str {
    match mime {
        Some("image/jpeg") => "jpg",
        Some("image/png") => "png",
        Some("video/mp4") => "mp4",
        Some("audio/ogg") | Some("audio/ogg; codecs=opus") => "ogg",
        Some("application/pdf") => "pdf",
        _ => "bin",
    }
}

/// Full ingestion path: resolve, download, upload, persist.
pub async fn ingest_media(
    client: &WhatsappClient,
    repo: &dyn Repository,
    store: &dyn ObjectStore,
    account_id: &str,
    settings: &WhatsappSettings,
    media_id: &str,
) -> Result<MediaFile, RelayrError> {
    let info = client.media_info(settings, media_id).await?;
    let bytes = client.download_media(settings, &info.url).await?;
    let size_bytes = bytes.len() as u64;

    let filename = format!("{media_id}.{}", extension_for(info.mime_type.as_deref()));
    let key = store.generate_key(account_id, "whatsapp", &filename);
    let stored = store.upload(&key, bytes, info.mime_type.as_deref()).await?;

    let media = MediaFile {
        id: Uuid::new_v4().to_string(),
        account_id: account_id.to_string(),
        name: filename,
        mime_type: info.mime_type,
        size_bytes,
        storage_key: key,
        url: stored.url,
        created_at: Utc::now(),
    };
    repo.insert_media_file(&media).await?;
    Ok(media)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_guessing() {
        assert_eq!(extension_for(Some("image/jpeg")), "jpg");
        assert_eq!(extension_for(Some("application/pdf")), "pdf");
        assert_eq!(extension_for(Some("text/calendar")), "bin");
        assert_eq!(extension_for(None), "bin");
    }
}
