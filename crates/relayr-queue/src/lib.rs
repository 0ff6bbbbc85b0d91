// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process queue engine and worker pool.
//!
//! Implements the [`relayr_core::traits::queue::JobQueue`] contract with
//! per-queue channels, exponential-backoff retries, and a bounded worker
//! pool. Serves as the dev-mode and test engine; a durable engine slots
//! in behind the same trait.

pub mod memory;
pub mod worker;

pub use memory::{JobState, MemoryQueue};
pub use worker::WorkerPool;
