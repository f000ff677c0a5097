//! Configuration management
//!
//! Layers, lowest to highest precedence: built-in defaults,
//! `config/switchboard.toml` (optional), `SWITCHBOARD__*` environment
//! variables, then the conventional `TELNYX_*` / `PORT` variables.

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub telnyx: TelnyxConfig,
    pub webhook: WebhookConfig,
    pub sse: SseConfig,
    pub sms: SmsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct TelnyxConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_base: String,
    /// Base64 Ed25519 key from the Telnyx portal, used to verify webhooks
    #[serde(default)]
    pub public_key: Option<String>,
    /// Call Control application id used for outbound calls
    #[serde(default)]
    pub connection_id: Option<String>,
    /// Default caller id / SMS sender
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Webhook URL sent with outbound calls when the request has none
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub hold_audio_url: Option<String>,
    pub request_timeout_secs: u64,
}

// Keeps the API key out of logs.
impl std::fmt::Debug for TelnyxConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelnyxConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_base", &self.api_base)
            .field("public_key", &self.public_key.is_some())
            .field("connection_id", &self.connection_id)
            .field("phone_number", &self.phone_number)
            .field("webhook_url", &self.webhook_url)
            .field("hold_audio_url", &self.hold_audio_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Accept webhooks without a signature when no public key is configured
    pub allow_unsigned: bool,
    pub tolerance_secs: u64,
    pub queue_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseConfig {
    pub client_buffer: usize,
    pub keep_alive_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub bulk_delay_ms: u64,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let settings = config::Config::builder()
            .set_default("server.host", defaults.server.host.clone())?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("telnyx.api_base", defaults.telnyx.api_base.clone())?
            .set_default(
                "telnyx.request_timeout_secs",
                defaults.telnyx.request_timeout_secs as i64,
            )?
            .set_default("webhook.allow_unsigned", defaults.webhook.allow_unsigned)?
            .set_default("webhook.tolerance_secs", defaults.webhook.tolerance_secs as i64)?
            .set_default("webhook.queue_capacity", defaults.webhook.queue_capacity as i64)?
            .set_default("sse.client_buffer", defaults.sse.client_buffer as i64)?
            .set_default("sse.keep_alive_secs", defaults.sse.keep_alive_secs as i64)?
            .set_default("sms.bulk_delay_ms", defaults.sms.bulk_delay_ms as i64)?
            .add_source(File::with_name("config/switchboard").required(false))
            .add_source(Environment::with_prefix("SWITCHBOARD").separator("__"))
            .build()?;

        let mut config: Config = settings.try_deserialize()?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply the conventional environment variables through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = non_empty("TELNYX_API_KEY") {
            self.telnyx.api_key = Some(api_key);
        }
        if let Some(public_key) = non_empty("TELNYX_PUBLIC_KEY") {
            self.telnyx.public_key = Some(public_key);
        }
        if let Some(connection_id) = non_empty("TELNYX_CONNECTION_ID") {
            self.telnyx.connection_id = Some(connection_id);
        }
        if let Some(phone_number) = non_empty("TELNYX_PHONE_NUMBER") {
            self.telnyx.phone_number = Some(phone_number);
        }
        if let Some(port) = non_empty("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::Message(format!("PORT is not a valid port: {}", port)))?;
        }

        // An empty key in a config file means "not configured".
        if self.telnyx.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
            self.telnyx.api_key = None;
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            telnyx: TelnyxConfig {
                api_key: None,
                api_base: "https://api.telnyx.com/v2".to_string(),
                public_key: None,
                connection_id: None,
                phone_number: None,
                webhook_url: None,
                hold_audio_url: None,
                request_timeout_secs: 10,
            },
            webhook: WebhookConfig {
                allow_unsigned: false,
                tolerance_secs: 300,
                queue_capacity: 1024,
            },
            sse: SseConfig {
                client_buffer: 64,
                keep_alive_secs: 15,
            },
            sms: SmsConfig { bulk_delay_ms: 350 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert!(config.telnyx.api_key.is_none());
        assert!(!config.webhook.allow_unsigned);
        assert_eq!(config.sms.bulk_delay_ms, 350);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("TELNYX_API_KEY", "KEY123"),
                ("TELNYX_PHONE_NUMBER", "+15550009999"),
                ("PORT", "8081"),
            ]))
            .unwrap();

        assert_eq!(config.telnyx.api_key.as_deref(), Some("KEY123"));
        assert_eq!(config.telnyx.phone_number.as_deref(), Some("+15550009999"));
        assert_eq!(config.server.port, 8081);
    }

    #[test]
    fn test_blank_api_key_is_not_configured() {
        let mut config = Config::default();
        config.telnyx.api_key = Some("   ".to_string());
        config.apply_overrides(lookup(&[("TELNYX_API_KEY", "")])).unwrap();
        assert!(config.telnyx.api_key.is_none());
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let mut config = Config::default();
        assert!(config.apply_overrides(lookup(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = Config::default();
        config.telnyx.api_key = Some("KEY_SECRET".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("KEY_SECRET"));
        assert!(rendered.contains("<redacted>"));
    }
}
