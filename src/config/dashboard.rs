// src/config/dashboard.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/dashboard.toml";
pub const ENV_CONFIG_PATH: &str = "DASHBOARD_CONFIG_PATH";

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4-turbo".to_string()
}
fn default_completion_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_backend_base_url() -> String {
    "http://localhost:8000/api/v1".to_string()
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_connect_timeout_secs() -> u64 {
    4
}

/// Hosted completion model used by the streaming chat route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// "openai" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
    /// "ENV" means: read from OPENAI_API_KEY
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: default_completion_base_url(),
            api_key: default_api_key(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// External REST chat backend (`/ask`, `/clear`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_base_url")]
    pub base_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl AppConfig {
    /// Load from an explicit path. `.json` is parsed as JSON, anything else as TOML.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading dashboard config from {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let cfg: AppConfig = if is_json {
            serde_json::from_str(&data).context("parsing dashboard config as JSON")?
        } else {
            toml::from_str(&data).context("parsing dashboard config as TOML")?
        };
        cfg.normalized()
    }

    /// Resolve config location:
    /// 1) $DASHBOARD_CONFIG_PATH (must exist)
    /// 2) config/dashboard.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(&p);
        }
        Self::default().normalized()
    }

    fn normalized(mut self) -> Result<Self> {
        let c = &mut self.completion;
        c.provider = c.provider.trim().to_lowercase();

        // Resolve api key if "ENV"; the mock provider needs none.
        if c.api_key.trim().eq_ignore_ascii_case("env") {
            c.api_key = match c.provider.as_str() {
                "openai" => env::var("OPENAI_API_KEY").unwrap_or_default(),
                "mock" => String::new(),
                other => bail!("Unsupported completion provider in config: {other}"),
            };
        }

        c.base_url = c.base_url.trim_end_matches('/').to_string();
        self.backend.base_url = self.backend.base_url.trim_end_matches('/').to_string();

        if c.timeout_secs == 0 {
            c.timeout_secs = default_timeout_secs();
        }
        if self.backend.timeout_secs == 0 {
            self.backend.timeout_secs = default_timeout_secs();
        }
        Ok(self)
    }
}
