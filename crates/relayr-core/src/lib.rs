// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Relayr multi-channel communication core.
//!
//! This crate provides the domain model, error types, job payloads, and
//! collaborator traits used throughout the Relayr workspace. Channel
//! adapters, queue processors, and services all build on the contracts
//! defined here.

pub mod error;
pub mod jobs;
pub mod traits;
pub mod types;

pub use error::RelayrError;
pub use traits::{
    ChannelAdapter, Job, JobHandle, JobProcessor, JobQueue, ObjectStore, Repository, RetryPolicy,
    StoredObject,
};
pub use types::{ChannelKind, MessageDirection, MessageStatus};
