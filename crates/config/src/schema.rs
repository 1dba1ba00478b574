//! Config schema and validation.

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::{
    Error, Result,
    token::{generate_strong_token, is_strong_token},
};

/// Accept YAML numbers or strings for account ids; store strings.
fn yaml_id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        String(String),
        Int(u64),
    }
    Ok(match IdValue::deserialize(deserializer)? {
        IdValue::String(s) => s,
        IdValue::Int(n) => n.to_string(),
    })
}

fn default_ws_uri() -> String {
    "ws://localhost:3001".to_string()
}

fn default_webui_uri() -> String {
    "http://localhost:6099".to_string()
}

fn default_listen_ip() -> String {
    "localhost".to_string()
}

fn default_true() -> bool {
    true
}

fn default_plugins_dir() -> String {
    "plugins".to_string()
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_ws_timeout() -> u64 {
    15
}

/// The `napcat` sub-section: how to reach the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NapcatConfig {
    #[serde(default = "default_ws_uri")]
    pub ws_uri: String,
    #[serde(default)]
    pub ws_token: String,
    /// Interface the gateway's WS server binds. `0.0.0.0` marks the
    /// listener as public and triggers the strong-token policy.
    #[serde(default = "default_listen_ip")]
    pub ws_listen_ip: String,
    #[serde(default = "default_webui_uri")]
    pub webui_uri: String,
    #[serde(default)]
    pub webui_token: String,
    #[serde(default = "default_true")]
    pub enable_webui: bool,
}

impl Default for NapcatConfig {
    fn default() -> Self {
        Self {
            ws_uri: default_ws_uri(),
            ws_token: String::new(),
            ws_listen_ip: default_listen_ip(),
            webui_uri: default_webui_uri(),
            webui_token: String::new(),
            enable_webui: true,
        }
    }
}

impl NapcatConfig {
    /// WS URI with the token appended as a query parameter.
    #[must_use]
    pub fn uri_with_token(&self) -> String {
        format!(
            "{}/?access_token={}",
            self.ws_uri.trim_end_matches('/'),
            urlencoding::encode(&self.ws_token)
        )
    }

    /// Host component of the WS URI.
    #[must_use]
    pub fn ws_host(&self) -> &str {
        let rest = self
            .ws_uri
            .split_once("://")
            .map_or(self.ws_uri.as_str(), |(_, rest)| rest);
        rest.split([':', '/']).next().unwrap_or(rest)
    }

    /// Whether the gateway runs on this machine.
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self.ws_host(), "localhost" | "127.0.0.1")
    }
}

/// The `plugin` sub-section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub skip_plugin_load: bool,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            plugins_dir: default_plugins_dir(),
            data_dir: default_data_dir(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            skip_plugin_load: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// The bot account's QQ id.
    #[serde(default, deserialize_with = "yaml_id")]
    pub bt_uin: String,
    /// The operator's QQ id, granted the root role.
    #[serde(default, deserialize_with = "yaml_id")]
    pub root: String,
    #[serde(default)]
    pub debug: bool,
    /// Default deadline for gateway API calls, in seconds.
    #[serde(default = "default_ws_timeout")]
    pub ws_timeout_secs: u64,
    #[serde(default)]
    pub plugin: PluginConfig,
    #[serde(default)]
    pub napcat: NapcatConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            bt_uin: String::new(),
            root: String::new(),
            debug: false,
            ws_timeout_secs: default_ws_timeout(),
            plugin: PluginConfig::default(),
            napcat: NapcatConfig::default(),
        }
    }
}

impl BotConfig {
    /// Validate and normalize in place.
    ///
    /// `auto_generate_token` opts into replacing a weak token on a public
    /// listener with a generated strong one (explicit consent); otherwise a
    /// weak public token refuses to start.
    pub fn validate(&mut self, auto_generate_token: bool) -> Result<()> {
        if self.bt_uin.is_empty() {
            return Err(Error::Invalid("bt_uin must be set".into()));
        }
        if !self.bt_uin.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Invalid(format!(
                "bt_uin must be numeric, got '{}'",
                self.bt_uin
            )));
        }
        if self.root.is_empty() {
            warn!("root account is not set; permission checks will deny root-only commands");
        }

        if !self.napcat.ws_uri.contains("://") {
            self.napcat.ws_uri = format!("ws://{}", self.napcat.ws_uri);
        }
        self.napcat.ws_uri = self.napcat.ws_uri.trim_end_matches('/').to_string();

        if self.napcat.ws_listen_ip == "0.0.0.0" && !is_strong_token(&self.napcat.ws_token) {
            if auto_generate_token {
                self.napcat.ws_token = generate_strong_token();
                warn!("weak ws token on a public listener replaced with a generated one");
            } else {
                return Err(Error::WeakToken {
                    listen_ip: self.napcat.ws_listen_ip.clone(),
                });
            }
        }

        Ok(())
    }
}
