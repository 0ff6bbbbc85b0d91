// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue processors for relayr.
//!
//! One processor per named queue: webhooks, outbound sends, calls, and
//! notifications. The binary wires these into worker pools; everything
//! here is plain job-in, state-out logic over the collaborator traits.

pub mod call;
pub mod notification;
pub mod outbound;
pub mod registry;
pub mod webhook;

pub use call::CallProcessor;
pub use notification::{NotificationOutcome, NotificationProcessor};
pub use outbound::OutboundProcessor;
pub use registry::AdapterRegistry;
pub use webhook::WebhookProcessor;
