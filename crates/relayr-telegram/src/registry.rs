// SPDX-FileCopyrightText: 2026 Relayr Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-integration bot registry.
//!
//! Each active Telegram integration owns its own bot token, so the adapter
//! keeps one [`Bot`] per integration id. Bots are created eagerly for every
//! active integration at startup and lazily on first use for integrations
//! activated afterwards.

use dashmap::DashMap;
use teloxide::Bot;
use tracing::{info, warn};

use relayr_core::error::RelayrError;
use relayr_core::traits::repository::Repository;
use relayr_core::types::{ChannelKind, Integration};

/// Registry of live [`Bot`] instances keyed by integration id.
#[derive(Default)]
pub struct BotRegistry {
    bots: DashMap<String, Bot>,
}

impl BotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates bots for every active Telegram integration.
    ///
    /// Integrations with unparseable settings are skipped with a warning so
    /// one broken tenant cannot block startup for the rest.
    pub async fn initialize_all(&self, repo: &dyn Repository) -> Result<usize, RelayrError> {
        let integrations = repo
            .active_integrations_for_channel(ChannelKind::Telegram)
            .await?;
        let mut initialized = 0;
        for integration in &integrations {
            match self.initialize_bot(integration) {
                Ok(_) => initialized += 1,
                Err(e) => {
                    warn!(
                        integration_id = %integration.id,
                        error = %e,
                        "skipping telegram integration with invalid settings"
                    );
                }
            }
        }
        info!(count = initialized, "telegram bots initialized");
        Ok(initialized)
    }

    /// Creates (or replaces) the bot for one integration.
    pub fn initialize_bot(&self, integration: &Integration) -> Result<Bot, RelayrError> {
        let settings = integration.telegram_settings()?;
        if settings.bot_token.is_empty() {
            return Err(RelayrError::Config(format!(
                "integration {} has an empty bot_token",
                integration.id
            )));
        }
        let bot = Bot::new(&settings.bot_token);
        self.bots.insert(integration.id.clone(), bot.clone());
        Ok(bot)
    }

    /// Returns the bot for an integration, creating it on first use.
    pub fn bot_for(&self, integration: &Integration) -> Result<Bot, RelayrError> {
        if let Some(bot) = self.bots.get(&integration.id) {
            return Ok(bot.clone());
        }
        self.initialize_bot(integration)
    }

    /// Drops the bot for a deactivated integration.
    pub fn remove(&self, integration_id: &str) {
        self.bots.remove(integration_id);
    }

    pub fn len(&self) -> usize {
        self.bots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use relayr_core::types::IntegrationStatus;

    use super::*;

    fn telegram_integration(id: &str, token: &str) -> Integration {
        Integration {
            id: id.into(),
            account_id: "a1".into(),
            channel: ChannelKind::Telegram,
            status: IntegrationStatus::Active,
            settings: serde_json::json!({ "bot_token": token }),
        }
    }

    #[test]
    fn bot_for_creates_lazily_and_caches() {
        let registry = BotRegistry::new();
        let integration = telegram_integration("i1", "123:abc");
        assert!(registry.is_empty());
        registry.bot_for(&integration).expect("bot created");
        assert_eq!(registry.len(), 1);
        registry.bot_for(&integration).expect("bot cached");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn empty_token_is_a_config_error() {
        let registry = BotRegistry::new();
        let integration = telegram_integration("i1", "");
        assert!(matches!(
            registry.initialize_bot(&integration),
            Err(RelayrError::Config(_))
        ));
    }

    #[test]
    fn missing_settings_is_a_config_error() {
        let registry = BotRegistry::new();
        let integration = Integration {
            id: "i1".into(),
            account_id: "a1".into(),
            channel: ChannelKind::Telegram,
            status: IntegrationStatus::Active,
            settings: serde_json::json!({}),
        };
        assert!(registry.initialize_bot(&integration).is_err());
    }

    #[test]
    fn remove_forgets_the_bot() {
        let registry = BotRegistry::new();
        registry
            .bot_for(&telegram_integration("i1", "123:abc"))
            .expect("bot created");
        registry.remove("i1");
        assert!(registry.is_empty());
    }
}
