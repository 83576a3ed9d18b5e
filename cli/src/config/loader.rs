//! CLI configuration loader for relay
//!
//! Implements single-source priority loading with flag overrides:
//! 1. --config file/dir (highest priority)
//! 2. Current working directory: ./relay.json or ./.relay/config.json
//! 3. User config directory: <config_dir>/relay/config.json
//! 4. Environment variables only (no files)

use anyhow::{anyhow, Context, Result};
use relay_core::{ModelParams, Protocol, ResolvedLlmConfig, SessionConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const DEFAULT_MODEL: &str = "gpt-4o";

/// Raw configuration file format (simple single-file schema)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawConfig {
    /// Protocol to use
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// API key (can be "env:VAR_NAME" for environment variable)
    pub api_key: String,
    /// Base URL (optional, uses protocol default if not specified)
    pub base_url: Option<String>,
    /// Model name
    #[serde(default = "default_model")]
    pub model: String,
    /// Model parameters (optional)
    #[serde(default)]
    pub params: ModelParams,
    /// Additional headers (optional)
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// System prompt placed at the head of every conversation (optional)
    pub system_prompt: Option<String>,
    /// Token limit for follow-up requests after a tool result (optional)
    pub follow_up_max_tokens: Option<u32>,
    /// Read timeout for MCP server replies, in seconds (optional)
    pub server_timeout_seconds: Option<u64>,
}

fn default_protocol() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Everything the CLI needs to open a session
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub llm: ResolvedLlmConfig,
    pub session: SessionConfig,
    pub server_timeout_seconds: Option<u64>,
}

/// CLI configuration loader
pub struct CliConfigLoader {
    /// Override config file/directory path
    config_override: Option<PathBuf>,
    /// Flag overrides
    api_key_override: Option<String>,
    base_url_override: Option<String>,
    model_override: Option<String>,
    system_prompt_override: Option<String>,
    /// Search locations; `None` means the process defaults
    working_dir: Option<PathBuf>,
    user_config_dir: Option<PathBuf>,
    /// Environment snapshot; `None` reads the process environment
    env: Option<HashMap<String, String>>,
}

impl CliConfigLoader {
    /// Create a new loader
    pub fn new() -> Self {
        Self {
            config_override: None,
            api_key_override: None,
            base_url_override: None,
            model_override: None,
            system_prompt_override: None,
            working_dir: None,
            user_config_dir: None,
            env: None,
        }
    }

    /// Set config file/directory override
    pub fn with_config_override(mut self, path: PathBuf) -> Self {
        self.config_override = Some(path);
        self
    }

    /// Set API key override
    pub fn with_api_key_override(mut self, api_key: String) -> Self {
        self.api_key_override = Some(api_key);
        self
    }

    /// Set base URL override
    pub fn with_base_url_override(mut self, base_url: String) -> Self {
        self.base_url_override = Some(base_url);
        self
    }

    /// Set model override
    pub fn with_model_override(mut self, model: String) -> Self {
        self.model_override = Some(model);
        self
    }

    /// Set system prompt override
    pub fn with_system_prompt_override(mut self, system_prompt: String) -> Self {
        self.system_prompt_override = Some(system_prompt);
        self
    }

    /// Search this directory instead of the current one
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = Some(dir);
        self
    }

    /// Search this directory instead of the platform config directory
    pub fn with_user_config_dir(mut self, dir: PathBuf) -> Self {
        self.user_config_dir = Some(dir);
        self
    }

    /// Read variables from this map instead of the process environment
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = Some(env);
        self
    }

    /// Load and resolve configuration
    pub async fn load(&self) -> Result<LoadedConfig> {
        // Step 1: Find and load base configuration
        let mut config = if let Some(override_path) = &self.config_override {
            self.load_from_path(override_path).await.with_context(|| {
                format!(
                    "Failed to load config from override path: {}",
                    override_path.display()
                )
            })?
        } else {
            self.search_and_load().await?
        };

        // Step 2: Apply flag overrides
        if let Some(api_key) = &self.api_key_override {
            config.api_key = api_key.clone();
        }
        if let Some(base_url) = &self.base_url_override {
            config.base_url = Some(base_url.clone());
        }
        if let Some(model) = &self.model_override {
            config.model = model.clone();
        }
        if let Some(system_prompt) = &self.system_prompt_override {
            config.system_prompt = Some(system_prompt.clone());
        }

        // Step 3: Resolve to final configuration
        self.resolve_config(config)
    }

    /// Search for config in priority order
    async fn search_and_load(&self) -> Result<RawConfig> {
        if let Some(config) = self.try_load_cwd().await? {
            return Ok(config);
        }

        if let Some(config) = self.try_load_user_config().await? {
            return Ok(config);
        }

        self.try_load_env_only()
    }

    /// Try loading from current working directory
    async fn try_load_cwd(&self) -> Result<Option<RawConfig>> {
        let cwd = match &self.working_dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };

        let relay_json = cwd.join("relay.json");
        if relay_json.exists() {
            return Ok(Some(self.load_file(&relay_json).await?));
        }

        let relay_dir_config = cwd.join(".relay").join("config.json");
        if relay_dir_config.exists() {
            return Ok(Some(self.load_file(&relay_dir_config).await?));
        }

        Ok(None)
    }

    /// Try loading from the user config directory
    async fn try_load_user_config(&self) -> Result<Option<RawConfig>> {
        let config_dir = self.user_config_dir.clone().or_else(dirs::config_dir);
        if let Some(config_dir) = config_dir {
            let config_path = config_dir.join("relay").join("config.json");
            if config_path.exists() {
                return Ok(Some(self.load_file(&config_path).await?));
            }
        }
        Ok(None)
    }

    /// Try loading from environment variables only
    fn try_load_env_only(&self) -> Result<RawConfig> {
        let api_key = self
            .env_var("RELAY_API_KEY")
            .or_else(|| self.env_var("OPENAI_API_KEY"))
            .or_else(|| self.api_key_override.clone())
            .ok_or_else(|| {
                anyhow!(
                    "No configuration found. Please create a relay.json file or set RELAY_API_KEY (or OPENAI_API_KEY)"
                )
            })?;

        let base_url = self
            .env_var("RELAY_BASE_URL")
            .or_else(|| self.env_var("OPENAI_BASE_URL"));
        let model = self
            .env_var("RELAY_MODEL")
            .or_else(|| self.env_var("OPENAI_MODEL"))
            .unwrap_or_else(default_model);

        Ok(RawConfig {
            protocol: default_protocol(),
            api_key,
            base_url,
            model,
            params: ModelParams::default(),
            headers: HashMap::new(),
            system_prompt: None,
            follow_up_max_tokens: None,
            server_timeout_seconds: None,
        })
    }

    /// Load configuration from a specific path (file or directory)
    async fn load_from_path(&self, path: &Path) -> Result<RawConfig> {
        if path.is_file() {
            self.load_file(path).await
        } else if path.is_dir() {
            let config_file = path.join("config.json");
            if config_file.exists() {
                self.load_file(&config_file).await
            } else {
                Err(anyhow!(
                    "No config.json found in directory: {}",
                    path.display()
                ))
            }
        } else {
            Err(anyhow!("Config path does not exist: {}", path.display()))
        }
    }

    /// Load a single config file
    async fn load_file(&self, path: &Path) -> Result<RawConfig> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn env_var(&self, name: &str) -> Option<String> {
        let value = match &self.env {
            Some(env) => env.get(name).cloned(),
            None => std::env::var(name).ok(),
        };
        value.filter(|value| !value.is_empty())
    }

    /// Resolve raw config into core configuration
    fn resolve_config(&self, config: RawConfig) -> Result<LoadedConfig> {
        let protocol = Protocol::parse(&config.protocol);

        // Resolve API key (handle env: prefix)
        let api_key = match config.api_key.strip_prefix("env:") {
            Some(var_name) => self
                .env_var(var_name)
                .ok_or_else(|| anyhow!("Environment variable not found: {}", var_name))?,
            None => config.api_key,
        };

        let base_url = match config.base_url {
            Some(base_url) => base_url,
            None => protocol
                .default_base_url()
                .map(str::to_string)
                .ok_or_else(|| {
                    anyhow!(
                        "No base_url configured and protocol '{}' has no default",
                        protocol.as_str()
                    )
                })?,
        };

        let llm = ResolvedLlmConfig::new(protocol, base_url, api_key, config.model)
            .with_params(config.params.clone())
            .with_headers(config.headers);

        llm.validate()
            .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

        let mut session = SessionConfig::default()
            .with_system_prompt(config.system_prompt)
            .with_model_params(config.params);
        if let Some(max_tokens) = config.follow_up_max_tokens {
            session.follow_up_max_tokens = max_tokens;
        }

        Ok(LoadedConfig {
            llm,
            session,
            server_timeout_seconds: config.server_timeout_seconds,
        })
    }
}

impl Default for CliConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Loader isolated from the real cwd, config dir and environment
    fn isolated(dir: &TempDir, env: &[(&str, &str)]) -> CliConfigLoader {
        CliConfigLoader::new()
            .with_working_dir(dir.path().join("cwd"))
            .with_user_config_dir(dir.path().join("config"))
            .with_env(
                env.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
    }

    fn write(path: PathBuf, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_cwd_config_wins_over_user_config() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("cwd/relay.json"),
            r#"{"api_key": "sk-cwd", "model": "qwen-plus",
                "base_url": "https://dashscope.aliyuncs.com/compatible-mode/v1"}"#,
        );
        write(
            dir.path().join("config/relay/config.json"),
            r#"{"api_key": "sk-user"}"#,
        );

        let loaded = isolated(&dir, &[]).load().await.unwrap();
        assert_eq!(loaded.llm.api_key, "sk-cwd");
        assert_eq!(loaded.llm.model, "qwen-plus");
        assert_eq!(loaded.llm.protocol, Protocol::OpenAICompat);
    }

    #[tokio::test]
    async fn test_dot_relay_dir_and_user_config() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("config/relay/config.json"),
            r#"{"api_key": "sk-user", "system_prompt": "Be brief."}"#,
        );

        let loaded = isolated(&dir, &[]).load().await.unwrap();
        assert_eq!(loaded.llm.api_key, "sk-user");
        assert_eq!(loaded.llm.model, DEFAULT_MODEL);
        assert_eq!(loaded.llm.base_url, "https://api.openai.com/v1");
        assert_eq!(loaded.session.system_prompt.as_deref(), Some("Be brief."));

        write(
            dir.path().join("cwd/.relay/config.json"),
            r#"{"api_key": "sk-dir", "follow_up_max_tokens": 1024, "server_timeout_seconds": 5}"#,
        );
        let loaded = isolated(&dir, &[]).load().await.unwrap();
        assert_eq!(loaded.llm.api_key, "sk-dir");
        assert_eq!(loaded.session.follow_up_max_tokens, 1024);
        assert_eq!(loaded.server_timeout_seconds, Some(5));
    }

    #[tokio::test]
    async fn test_env_only() {
        let dir = TempDir::new().unwrap();
        let loaded = isolated(
            &dir,
            &[
                ("OPENAI_API_KEY", "sk-openai"),
                ("RELAY_BASE_URL", "http://localhost:8000/v1"),
                ("RELAY_MODEL", "qwen-max"),
            ],
        )
        .load()
        .await
        .unwrap();

        assert_eq!(loaded.llm.api_key, "sk-openai");
        assert_eq!(loaded.llm.base_url, "http://localhost:8000/v1");
        assert_eq!(loaded.llm.model, "qwen-max");
        assert_eq!(loaded.session.follow_up_max_tokens, 8192);
    }

    #[tokio::test]
    async fn test_no_configuration() {
        let dir = TempDir::new().unwrap();
        let err = isolated(&dir, &[]).load().await.unwrap_err();
        assert!(err.to_string().contains("No configuration found"));
    }

    #[tokio::test]
    async fn test_env_prefixed_api_key() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("cwd/relay.json"),
            r#"{"api_key": "env:QWEN_KEY"}"#,
        );

        let loaded = isolated(&dir, &[("QWEN_KEY", "sk-qwen")])
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.llm.api_key, "sk-qwen");

        let err = isolated(&dir, &[]).load().await.unwrap_err();
        assert!(format!("{:#}", err).contains("QWEN_KEY"));
    }

    #[tokio::test]
    async fn test_flag_overrides_win() {
        let dir = TempDir::new().unwrap();
        write(dir.path().join("cwd/relay.json"), r#"{"api_key": "sk-file"}"#);

        let loaded = isolated(&dir, &[])
            .with_api_key_override("sk-flag".to_string())
            .with_model_override("qwen-turbo".to_string())
            .with_base_url_override("https://example.com/v1".to_string())
            .with_system_prompt_override("Answer in Chinese.".to_string())
            .load()
            .await
            .unwrap();

        assert_eq!(loaded.llm.api_key, "sk-flag");
        assert_eq!(loaded.llm.model, "qwen-turbo");
        assert_eq!(loaded.llm.base_url, "https://example.com/v1");
        assert_eq!(
            loaded.session.system_prompt.as_deref(),
            Some("Answer in Chinese.")
        );
    }

    #[tokio::test]
    async fn test_config_override_path() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("custom/config.json"),
            r#"{"api_key": "sk-custom", "params": {"temperature": 0.2}}"#,
        );

        let loaded = isolated(&dir, &[])
            .with_config_override(dir.path().join("custom"))
            .load()
            .await
            .unwrap();
        assert_eq!(loaded.llm.api_key, "sk-custom");
        assert_eq!(loaded.session.model_params.temperature, Some(0.2));

        let err = isolated(&dir, &[])
            .with_config_override(dir.path().join("missing.json"))
            .load()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("override path"));
    }

    #[tokio::test]
    async fn test_headers_reach_llm_config() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("cwd/relay.json"),
            r#"{"api_key": "sk-test", "headers": {"X-DashScope-SSE": "disable"}}"#,
        );

        let loaded = isolated(&dir, &[]).load().await.unwrap();
        assert_eq!(
            loaded.llm.headers.get("X-DashScope-SSE").map(String::as_str),
            Some("disable")
        );
    }

    #[tokio::test]
    async fn test_azure_protocol_is_not_supported() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("cwd/relay.json"),
            r#"{"protocol": "azure_openai", "api_key": "sk-test"}"#,
        );
        let err = isolated(&dir, &[]).load().await.unwrap_err();
        assert!(err.to_string().contains("has no default"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path().join("cwd/relay.json"),
            r#"{"api_key": "sk-test", "base_url": "ftp://example.com"}"#,
        );
        let err = isolated(&dir, &[]).load().await.unwrap_err();
        assert!(err.to_string().contains("validation failed"));
    }
}
