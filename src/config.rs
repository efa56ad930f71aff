//! Configuration types.
//!
//! Loaded once at startup from a JSON file, then patched from environment
//! variables so secrets never have to live in the file. Read-only after
//! that; shared across requests behind `Arc`.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

use crate::channels::recipients::RecipientDirectory;
use crate::error::ConfigError;
use crate::format::MessageTemplate;
use crate::memo::last_segment;

/// Env var naming the config file.
pub const CONFIG_PATH_ENV: &str = "MEMOS_RELAY_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "./config.json";

/// Top-level relay configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address the webhook server binds to.
    pub listen_addr: String,
    /// Per-request timeout for outbound channel calls.
    pub request_timeout_secs: u64,
    pub memos: MemosConfig,
    pub bark: BarkConfig,
    pub telegram: TelegramConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 10,
            memos: MemosConfig::default(),
            bark: BarkConfig::default(),
            telegram: TelegramConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load from the file named by `MEMOS_RELAY_CONFIG`, then apply
    /// environment overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Read a JSON config file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Patch values from a key lookup (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("MEMOS_RELAY_LISTEN") {
            self.listen_addr = v;
        }
        if let Some(v) = lookup("MEMOS_BASE_URL") {
            self.memos.base_url = v;
        }

        if let Some(v) = lookup("BARK_ENABLED") {
            self.bark.enabled = parse_bool("BARK_ENABLED", &v)?;
        }
        if let Some(v) = lookup("BARK_SERVER_URL") {
            self.bark.server_url = v;
        }
        let username = lookup("BARK_AUTH_USERNAME");
        let password = lookup("BARK_AUTH_PASSWORD");
        if username.is_some() || password.is_some() {
            let auth = self.bark.auth.get_or_insert_with(BasicAuth::default);
            if let Some(u) = username {
                auth.username = u;
            }
            if let Some(p) = password {
                auth.password = Some(SecretString::from(p));
            }
        }

        if let Some(v) = lookup("TELEGRAM_ENABLED") {
            self.telegram.enabled = parse_bool("TELEGRAM_ENABLED", &v)?;
        }
        if let Some(v) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(SecretString::from(v));
        }
        if let Some(v) = lookup("TELEGRAM_PARSE_MODE") {
            self.telegram.parse_mode = v;
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Memos instance settings: links, display names and templates.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MemosConfig {
    /// Public base URL used to build memo detail links.
    pub base_url: String,
    /// User id -> display name.
    pub user_names: HashMap<String, String>,
    /// Activity type -> template.
    pub message_templates: HashMap<String, MessageTemplate>,
}

impl Default for MemosConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            user_names: HashMap::new(),
            message_templates: HashMap::new(),
        }
    }
}

impl MemosConfig {
    /// Display name for a creator such as `users/1`. Looks up the trailing
    /// id; falls back to the raw creator string.
    pub fn display_name(&self, creator: &str) -> String {
        self.user_names
            .get(last_segment(creator))
            .cloned()
            .unwrap_or_else(|| creator.to_string())
    }

    pub fn template(&self, activity_type: &str) -> Option<&MessageTemplate> {
        self.message_templates.get(activity_type)
    }

    /// Detail link for a memo name like `memos/123`.
    pub fn memo_url(&self, memo_name: &str) -> String {
        format!(
            "{}/m/{}",
            self.base_url.trim_end_matches('/'),
            last_segment(memo_name)
        )
    }
}

/// Bark push gateway settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BarkConfig {
    pub enabled: bool,
    pub server_url: String,
    /// Device keys per user; `"*"` for devices that get everything.
    pub device_keys: RecipientDirectory,
    pub icon: Option<String>,
    pub group: Option<String>,
    pub sound: Option<String>,
    /// Basic auth for self-hosted Bark servers.
    pub auth: Option<BasicAuth>,
}

impl Default for BarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_url: "https://api.day.app".to_string(),
            device_keys: RecipientDirectory::default(),
            icon: None,
            group: None,
            sound: None,
            auth: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BasicAuth {
    pub username: String,
    #[serde(deserialize_with = "optional_secret")]
    pub password: Option<SecretString>,
}

impl BasicAuth {
    /// Credentials usable for a request: both parts must be non-empty.
    pub fn credentials(&self) -> Option<(&str, &SecretString)> {
        use secrecy::ExposeSecret;

        let password = self.password.as_ref()?;
        if self.username.is_empty() || password.expose_secret().is_empty() {
            return None;
        }
        Some((self.username.as_str(), password))
    }
}

/// Telegram Bot API settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    #[serde(deserialize_with = "optional_secret")]
    pub bot_token: Option<SecretString>,
    /// Bot API host, overridable for local bot API servers.
    pub api_base: String,
    /// Chat ids per user; `"*"` for chats that get everything.
    pub chat_ids: RecipientDirectory,
    pub parse_mode: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: None,
            api_base: "https://api.telegram.org".to_string(),
            chat_ids: RecipientDirectory::default(),
            parse_mode: "HTML".to_string(),
        }
    }
}

fn optional_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(SecretString::from))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}
