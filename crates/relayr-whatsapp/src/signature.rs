// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! X-Hub-Signature-256 verification for Meta webhook deliveries.
//!
//! The signature is an HMAC-SHA256 over the raw request bytes, keyed with
//! the integration's app secret and sent as `sha256=<hex>`. Verification
//! must happen on the raw body before any parsing or persistence.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use relayr_core::error::RelayrError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies a `X-Hub-Signature-256` header value against the raw body.
pub fn verify_signature(
    app_secret: &str,
    raw_body: &[u8],
    header: &str,
) -> Result<(), RelayrError> {
    let hex_digest = header
        .strip_prefix("sha256=")
        .ok_or_else(|| RelayrError::Signature("header is not a sha256 signature".into()))?;

    let expected = hex::decode(hex_digest)
        .map_err(|_| RelayrError::Signature("signature is not valid hex".into()))?;

    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .map_err(|_| RelayrError::Signature("invalid app secret".into()))?;
    mac.update(raw_body);
    // verify_slice is constant-time.
    mac.verify_slice(&expected)
        .map_err(|_| RelayrError::Signature("signature mismatch".into()))
}

/// Computes the `sha256=<hex>` header value for a body (used by tests and
/// outbound webhook simulation).
pub fn sign(app_secret: &str, raw_body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(app_secret.as_bytes())
        .expect("hmac accepts keys of any length");
    mac.update(raw_body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}
