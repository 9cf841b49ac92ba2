//! Configuration validation utilities.

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, JabbotConfig, LogOutput, StoreConfig, WatchdogConfig};
use crate::store::StoreEndpoint;

/// Validates the entire configuration.
pub fn validate_config(config: &JabbotConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_store_config(&config.store)?;
    validate_watchdog_config(&config.watchdog)?;

    if config.logging.output == LogOutput::File && config.logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }

    Ok(())
}

fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.name.is_empty() {
        return Err(ConfigError::missing_field("bot.name"));
    }

    if bot.name.chars().any(char::is_whitespace) {
        return Err(ConfigError::validation("Bot name cannot contain whitespace"));
    }

    Ok(())
}

fn validate_store_config(store: &StoreConfig) -> ConfigResult<()> {
    if store.key_prefix.is_empty() {
        return Err(ConfigError::missing_field("store.key_prefix"));
    }

    if let Some(url) = &store.url {
        StoreEndpoint::parse(url).map_err(|e| ConfigError::invalid_url(url, e.to_string()))?;
    }

    if store.connect_timeout_ms == 0 || store.command_timeout_ms == 0 {
        return Err(ConfigError::validation(
            "Store timeouts must be greater than 0",
        ));
    }

    Ok(())
}

fn validate_watchdog_config(watchdog: &WatchdogConfig) -> ConfigResult<()> {
    if watchdog.heartbeat_interval_secs == 0 {
        return Err(ConfigError::validation(
            "Heartbeat interval must be greater than 0",
        ));
    }

    if watchdog.defibrillator_secs == 0 {
        return Err(ConfigError::validation(
            "Defibrillator period must be greater than 0",
        ));
    }

    if watchdog.boot_timeout_secs == 0 {
        return Err(ConfigError::validation("Boot timeout must be greater than 0"));
    }

    Ok(())
}
