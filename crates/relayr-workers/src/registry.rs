// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lookup table from channel to its adapter.

use std::collections::HashMap;
use std::sync::Arc;

use relayr_core::error::RelayrError;
use relayr_core::traits::channel::ChannelAdapter;
use relayr_core::types::ChannelKind;

/// Immutable adapter table, built once at startup.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<ChannelKind, Arc<dyn ChannelAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under its own channel kind.
    pub fn register(&mut self, adapter: Arc<dyn ChannelAdapter>) {
        self.adapters.insert(adapter.channel(), adapter);
    }

    /// The adapter for `channel`, or a terminal configuration error when
    /// none was wired in.
    pub fn get(&self, channel: ChannelKind) -> Result<Arc<dyn ChannelAdapter>, RelayrError> {
        self.adapters
            .get(&channel)
            .cloned()
            .ok_or_else(|| RelayrError::Config(format!("no adapter registered for {channel}")))
    }

    pub fn channels(&self) -> Vec<ChannelKind> {
        self.adapters.keys().copied().collect()
    }
}
