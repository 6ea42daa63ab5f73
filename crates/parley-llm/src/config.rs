// Client-side configuration: where the chat service lives and how a
// conversation's requests are parameterized

use serde::{Deserialize, Serialize};

/// Origin used for relative endpoints when no base URL is configured
pub const DEFAULT_ORIGIN: &str = "http://localhost:3002";

/// Connection settings for the chat service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Base URL of the API; requests go to `{base_url}{path}` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Origin of the hosting page, used as `{origin}/api{path}` otherwise
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Bearer token (acquired elsewhere)
    #[serde(default)]
    pub api_token: String,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            origin: default_origin(),
            api_token: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            ..Self::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Trim whitespace and trailing `/` or `\` from URLs, whitespace from the token.
    /// An empty base URL counts as unset.
    pub fn normalized(mut self) -> Self {
        self.base_url = self
            .base_url
            .as_deref()
            .map(trim_url)
            .filter(|url| !url.is_empty());
        self.origin = trim_url(&self.origin);
        self.api_token = self.api_token.trim().to_string();
        self
    }

    /// Resolve an endpoint path to a full URL
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http") {
            return path.to_string();
        }
        match &self.base_url {
            Some(base) => format!("{}{}", base, path),
            None => format!("{}/api{}", self.origin, path),
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches(['/', '\\']).to_string()
}

/// Per-conversation generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSettings {
    pub model: String,

    /// Maximum response tokens, also reserved out of the context budget
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default)]
    pub presence_penalty: f32,

    #[serde(default)]
    pub frequency_penalty: f32,

    /// Number of history turns scanned when building the window
    #[serde(default = "default_talk_count")]
    pub talk_count: usize,

    /// Custom system prompt; the default template is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.5
}

fn default_top_p() -> f32 {
    1.0
}

fn default_talk_count() -> usize {
    10
}

impl ChatSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            presence_penalty: 0.0,
            frequency_penalty: 0.0,
            talk_count: default_talk_count(),
            system_message: None,
            conversation_id: None,
        }
    }

    pub fn max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn talk_count(mut self, count: usize) -> Self {
        self.talk_count = count;
        self
    }

    pub fn system_message(mut self, message: impl Into<String>) -> Self {
        self.system_message = Some(message.into());
        self
    }

    pub fn conversation_id(mut self, id: impl Into<String>) -> Self {
        self.conversation_id = Some(id.into());
        self
    }
}
