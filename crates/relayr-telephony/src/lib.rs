// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony integration for the relayr communication core.
//!
//! An ARI REST client, provider event normalization, and the call state
//! machine with its recording archival pipeline. Call status is driven by
//! provider events only.

pub mod ari;
pub mod events;
pub mod service;

pub use ari::AriClient;
pub use events::{TelephonyEvent, parse_event};
pub use service::{CallService, recording_name};
