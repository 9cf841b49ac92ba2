//! Configuration schema definitions.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use jabbot_core::Credentials;
use jabbot_framework::{DEFAULT_FALLBACK_REPLY, DEFAULT_KEY_PREFIX};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JabbotConfig {
    /// Chat identity and server.
    #[serde(default)]
    pub bot: BotConfig,

    /// External counter store.
    #[serde(default)]
    pub store: StoreConfig,

    /// Heartbeat and defibrillator timers.
    #[serde(default)]
    pub watchdog: WatchdogConfig,

    /// Dispatch engine settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// [bot]
// =============================================================================

/// The bot's chat identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// User name the bot logs in as. Messages from this name are ignored.
    #[serde(default = "default_bot_name")]
    pub name: String,

    /// Login password.
    #[serde(default)]
    pub password: String,

    /// Email used for the bot's avatar.
    #[serde(default)]
    pub gravatar_email: Option<String>,

    /// Chat server address, if the session needs one.
    #[serde(default)]
    pub server: Option<String>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            password: String::new(),
            gravatar_email: None,
            server: None,
        }
    }
}

impl BotConfig {
    /// Returns the login credentials.
    pub fn credentials(&self) -> Credentials {
        Credentials {
            name: self.name.clone(),
            password: self.password.clone(),
            gravatar_email: self.gravatar_email.clone(),
        }
    }
}

fn default_bot_name() -> String {
    "jabbot".to_string()
}

// =============================================================================
// [store]
// =============================================================================

/// Counter store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// `redis://[:password@]host[:port]`. Counters stay in memory when unset.
    #[serde(default)]
    pub url: Option<String>,

    /// Prefix of every key the bot writes.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// How long opening a store connection may take.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// How long a single store command may wait for its reply. The
    /// connection is dropped when it expires.
    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: default_key_prefix(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_timeout_ms: default_command_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_command_timeout_ms() -> u64 {
    2000
}

// =============================================================================
// [watchdog]
// =============================================================================

/// Liveness timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// Delay before the first heartbeat.
    #[serde(default = "default_heartbeat_delay_secs")]
    pub heartbeat_delay_secs: u64,

    /// Period between heartbeats.
    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,

    /// Process lifetime before a forced recycle.
    #[serde(default = "default_defibrillator_secs")]
    pub defibrillator_secs: u64,

    /// How long connect plus login may take before the bot gives up and
    /// runs without a session.
    #[serde(default = "default_boot_timeout_secs")]
    pub boot_timeout_secs: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            heartbeat_delay_secs: default_heartbeat_delay_secs(),
            heartbeat_interval_secs: default_heartbeat_interval_secs(),
            defibrillator_secs: default_defibrillator_secs(),
            boot_timeout_secs: default_boot_timeout_secs(),
        }
    }
}

impl WatchdogConfig {
    pub fn heartbeat_delay(&self) -> Duration {
        Duration::from_secs(self.heartbeat_delay_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn defibrillator(&self) -> Duration {
        Duration::from_secs(self.defibrillator_secs)
    }

    pub fn boot_timeout(&self) -> Duration {
        Duration::from_secs(self.boot_timeout_secs)
    }
}

fn default_heartbeat_delay_secs() -> u64 {
    10
}

fn default_heartbeat_interval_secs() -> u64 {
    300
}

fn default_defibrillator_secs() -> u64 {
    3600
}

fn default_boot_timeout_secs() -> u64 {
    30
}

// =============================================================================
// [dispatch]
// =============================================================================

/// Dispatch engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum concurrently running dispatches; `0` means unbounded.
    #[serde(default)]
    pub max_in_flight: usize,

    /// Reply sent when no sprocket understands a private message.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,

    /// How long shutdown waits for in-flight dispatches.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Upper bound on recording usage counters for one dispatch.
    #[serde(default = "default_usage_timeout_ms")]
    pub usage_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 0,
            fallback_reply: default_fallback_reply(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            usage_timeout_ms: default_usage_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    /// The concurrency limit, or `None` when unbounded.
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_in_flight > 0).then_some(self.max_in_flight)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn usage_timeout(&self) -> Duration {
        Duration::from_millis(self.usage_timeout_ms)
    }
}

fn default_fallback_reply() -> String {
    DEFAULT_FALLBACK_REPLY.to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_usage_timeout_ms() -> u64 {
    5000
}

// =============================================================================
// [logging]
// =============================================================================

/// Log verbosity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
///
/// Defaults to stderr: the console session writes its reply frames to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    Stdout,
    #[default]
    Stderr,
    File,
}

/// Logging settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Base level; `RUST_LOG` takes precedence when set.
    #[serde(default)]
    pub level: LogLevel,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include file and line of each event.
    #[serde(default)]
    pub file_location: bool,

    /// Per-module levels, e.g. `jabbot_runtime = "debug"`.
    #[serde(default)]
    pub filters: HashMap<String, LogLevel>,
}
