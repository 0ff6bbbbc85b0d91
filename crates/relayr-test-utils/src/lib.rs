// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for relayr integration tests and dev mode.
//!
//! In-memory implementations of the collaborator traits plus fixture
//! builders, so the worker pools and services run fast and deterministic
//! without external engines.

pub mod fixtures;
pub mod mock_channel;
pub mod object_store;
pub mod queue;
pub mod repository;

pub use mock_channel::{MockChannel, ScriptedFailure, SentRecord};
pub use object_store::InMemoryObjectStore;
pub use queue::CapturingQueue;
pub use repository::InMemoryRepository;
