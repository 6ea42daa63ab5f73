use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

use parley_llm::{ChatSettings, ServerConfig};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerSection,
    pub chat: ChatSettings,
    pub window: WindowSection,
    pub logging: LoggingConfig,

    // Secrets (from ENV only)
    #[serde(default)]
    pub api_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default)]
    pub base_url: Option<String>,
    pub origin: String,
    /// Data lines decoded per multi-line block
    #[serde(default = "default_max_embedded_lines")]
    pub max_embedded_lines: usize,
}

fn default_max_embedded_lines() -> usize {
    256
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSection {
    #[serde(default = "default_reserved_tail")]
    pub reserved_tail: usize,
    /// Count tokens with tiktoken; the character estimate is used otherwise
    #[serde(default = "default_true")]
    pub tiktoken: bool,
}

fn default_reserved_tail() -> usize {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. PARLEY_* environment variables, e.g. `PARLEY_CHAT__MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("PARLEY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        // Secrets are never read from TOML
        cfg.api_token = std::env::var("PARLEY_API_TOKEN").map_err(|_| {
            ConfigError::Message("PARLEY_API_TOKEN environment variable is required".to_string())
        })?;

        Ok(cfg)
    }

    pub fn server_config(&self) -> ServerConfig {
        let mut server = ServerConfig::new(self.api_token.clone()).with_origin(&self.server.origin);
        if let Some(base_url) = &self.server.base_url {
            server = server.with_base_url(base_url);
        }
        server
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [server]
            base_url = "https://gw.example.com/v1/"
            origin = "http://localhost:3002"

            [chat]
            model = "gpt-4-32k"
            max_tokens = 2048
            talk_count = 6

            [window]
            reserved_tail = 1

            [logging]
            level = "debug"
            format = "json"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.chat.model, "gpt-4-32k");
        assert_eq!(config.chat.talk_count, 6);
        assert_eq!(config.chat.temperature, 0.5);
        assert_eq!(config.server.max_embedded_lines, 256);
        assert!(config.window.tiktoken);
        assert!(config.api_token.is_empty());

        let server = config.server_config().normalized();
        assert_eq!(server.url("/chat/send"), "https://gw.example.com/v1/chat/send");
    }
}
