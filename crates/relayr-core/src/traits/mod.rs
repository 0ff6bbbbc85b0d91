// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator trait definitions for the Relayr core.
//!
//! Persistence, object storage, and the job queue are external systems;
//! the core depends only on the contracts defined here. All traits use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod channel;
pub mod object_store;
pub mod queue;
pub mod repository;

pub use channel::ChannelAdapter;
pub use object_store::{ObjectStore, StoredObject};
pub use queue::{Job, JobHandle, JobProcessor, JobQueue, RetryPolicy};
pub use repository::Repository;
