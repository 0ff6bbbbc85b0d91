// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation and message lifecycle for relayr.
//!
//! Owns the mapping from external identities to open conversations, the
//! inbound/outbound message records, and the monotonic status model that
//! provider callbacks feed. Delivery itself happens in the worker pools;
//! this crate only persists state and enqueues jobs.

pub mod service;

pub use service::{ConversationService, InboundRecord, resolve_integration};
