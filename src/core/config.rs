//! Configuration management for the gateway.
//!
//! This module handles loading the YAML routing document (bearer tokens,
//! providers and per-provider models) with support for environment variable
//! expansion, plus the command-line/environment settings used to bootstrap
//! the server process.

use anyhow::{Context, Result};
use clap::Parser;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::sync::OnceLock;

/// Fixed timeout applied to every upstream call.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Process bootstrap settings.
///
/// Every flag falls back to an environment variable, so the gateway can be
/// configured entirely through `.env` in container deployments.
#[derive(Debug, Clone, Parser)]
#[command(name = "open-gateway", about = "OpenAI-compatible chat completion gateway")]
pub struct ServerArgs {
    /// Path to the YAML configuration file
    #[arg(short = 'c', long = "config", env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: String,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind to
    #[arg(long, env = "PORT", default_value_t = 4283)]
    pub port: u16,

    /// Default log level (RUST_LOG takes precedence when set)
    #[arg(long = "log-level", env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// The routing document, loaded once at startup and never mutated.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub oai: OaiConfig,
}

/// Bearer tokens accepted from callers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub tokens: Vec<String>,
}

/// Providers and their model namespaces.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OaiConfig {
    /// Provider name -> provider record
    #[serde(default, rename = "provider")]
    pub providers: BTreeMap<String, ProviderRecord>,

    /// Provider name -> (caller-visible model name -> model record)
    #[serde(default, rename = "model")]
    pub models: BTreeMap<String, BTreeMap<String, ModelRecord>>,
}

/// A named upstream origin with its own credential.
#[derive(Clone, Deserialize)]
pub struct ProviderRecord {
    /// Upstream origin; a trailing slash is insignificant
    pub base_url: String,

    /// Secret sent upstream as `Authorization: Bearer <api_key>`
    pub api_key: String,

    /// Headers added to every request for this provider
    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,
}

// The api key must never end up in logs, so Debug is written by hand.
impl fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("extra_headers", &self.extra_headers)
            .finish()
    }
}

/// Per-(provider, model) routing record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelRecord {
    /// Upstream model name substituted for the caller-supplied one
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(default)]
    pub extra_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub extra_body: Map<String, Value>,
}

impl GatewayConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use open_gateway::core::config::GatewayConfig;
    ///
    /// let config = GatewayConfig::load("config.yaml").expect("Failed to load config");
    /// ```
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))
    }

    /// Parse a YAML document after expanding `${VAR}` references.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        let config: GatewayConfig = serde_yaml::from_str(&expanded)?;
        Ok(config)
    }

    /// Set of bearer tokens accepted from callers.
    pub fn token_set(&self) -> HashSet<String> {
        self.auth.tokens.iter().cloned().collect()
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderRecord> {
        self.oai.providers.get(name)
    }

    /// Look up a model inside its provider's namespace.
    pub fn model(&self, provider: &str, model: &str) -> Option<&ModelRecord> {
        self.oai.models.get(provider).and_then(|models| models.get(model))
    }

    /// Every `provider:model` route identifier, in map iteration order.
    pub fn route_ids(&self) -> Vec<String> {
        self.oai
            .models
            .iter()
            .flat_map(|(provider, models)| {
                models
                    .keys()
                    .map(move |model| format!("{}:{}", provider, model))
            })
            .collect()
    }

    pub fn model_count(&self) -> usize {
        self.oai.models.values().map(BTreeMap::len).sum()
    }
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-?([^}]*))?\}")
            .expect("env var pattern is a valid regex")
    })
}

/// Expand environment variables in configuration content.
///
/// Supports patterns: ${VAR}, ${VAR:-default}, ${VAR:default}. Unset
/// variables without a default expand to the empty string.
fn expand_env_vars(content: &str) -> String {
    env_var_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(&caps[1]).unwrap_or_else(|_| default_value.to_string())
        })
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
auth:
  tokens:
    - sk-gateway-1
    - sk-gateway-2
oai:
  provider:
    openrouter:
      base_url: https://openrouter.ai/api/v1/
      api_key: or-key
      extra_headers:
        HTTP-Referer: https://example.com
    siliconflow:
      base_url: https://api.siliconflow.cn/v1
      api_key: sf-key
  model:
    openrouter:
      kimi-k2:
        identifier: moonshotai/kimi-k2
      glm-4.5:thinking:
        identifier: z-ai/glm-4.5
        extra_headers:
          X-Title: gateway
        extra_body:
          reasoning:
            enabled: true
          temperature: 0.6
    siliconflow:
      glm-4.5v: {}
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();

        assert_eq!(config.auth.tokens, vec!["sk-gateway-1", "sk-gateway-2"]);
        assert_eq!(config.oai.providers.len(), 2);

        let openrouter = config.provider("openrouter").unwrap();
        assert_eq!(openrouter.base_url, "https://openrouter.ai/api/v1/");
        assert_eq!(openrouter.api_key, "or-key");
        assert_eq!(
            openrouter.extra_headers.get("HTTP-Referer").unwrap(),
            "https://example.com"
        );

        let thinking = config.model("openrouter", "glm-4.5:thinking").unwrap();
        assert_eq!(thinking.identifier.as_deref(), Some("z-ai/glm-4.5"));
        assert_eq!(thinking.extra_headers.get("X-Title").unwrap(), "gateway");
        assert_eq!(thinking.extra_body["reasoning"], json!({"enabled": true}));
        assert_eq!(thinking.extra_body["temperature"], json!(0.6));

        let no_identifier = config.model("siliconflow", "glm-4.5v").unwrap();
        assert!(no_identifier.identifier.is_none());
        assert!(no_identifier.extra_body.is_empty());
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let config = GatewayConfig::from_yaml_str("auth:\n  tokens: [a]\n").unwrap();
        assert!(config.oai.providers.is_empty());
        assert!(config.oai.models.is_empty());
        assert_eq!(config.route_ids(), Vec::<String>::new());
    }

    #[test]
    fn test_model_lookup_is_namespaced() {
        let config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();
        assert!(config.model("openrouter", "kimi-k2").is_some());
        assert!(config.model("siliconflow", "kimi-k2").is_none());
        assert!(config.model("unknown", "kimi-k2").is_none());
    }

    #[test]
    fn test_route_ids_follow_map_order() {
        let config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(
            config.route_ids(),
            vec![
                "openrouter:glm-4.5:thinking",
                "openrouter:kimi-k2",
                "siliconflow:glm-4.5v",
            ]
        );
        assert_eq!(config.model_count(), 3);
    }

    #[test]
    fn test_token_set() {
        let config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();
        let tokens = config.token_set();
        assert!(tokens.contains("sk-gateway-1"));
        assert!(!tokens.contains("or-key"));
    }

    #[test]
    fn test_provider_debug_masks_api_key() {
        let config = GatewayConfig::from_yaml_str(SAMPLE).unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("or-key"));
        assert!(!rendered.contains("sf-key"));
        assert!(rendered.contains("***"));
    }

    #[test]
    #[serial]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("GATEWAY_TEST_VAR", "test_value");
        }
        let output = expand_env_vars("api_key: ${GATEWAY_TEST_VAR}");
        assert_eq!(output, "api_key: test_value");
        unsafe {
            std::env::remove_var("GATEWAY_TEST_VAR");
        }
    }

    #[test]
    #[serial]
    fn test_expand_env_vars_with_default() {
        unsafe {
            std::env::remove_var("GATEWAY_MISSING_VAR");
        }
        assert_eq!(
            expand_env_vars("api_key: ${GATEWAY_MISSING_VAR:-fallback}"),
            "api_key: fallback"
        );
        assert_eq!(
            expand_env_vars("api_key: ${GATEWAY_MISSING_VAR:fallback}"),
            "api_key: fallback"
        );
        assert_eq!(expand_env_vars("api_key: ${GATEWAY_MISSING_VAR}"), "api_key: ");
    }

    #[test]
    fn test_expand_env_vars_leaves_plain_text() {
        let input = "base_url: https://example.com/$path";
        assert_eq!(expand_env_vars(input), input);
    }

    #[test]
    #[serial]
    fn test_load_config_from_file_with_env() {
        unsafe {
            std::env::set_var("GATEWAY_TEST_API_KEY", "env-api-key");
        }

        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
auth:
  tokens: [sk-test]
oai:
  provider:
    local:
      base_url: http://localhost:8000
      api_key: ${GATEWAY_TEST_API_KEY}
  model:
    local:
      llama:
        identifier: llama-3.1-8b
"#;
        temp_file.write_all(config_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = GatewayConfig::load(temp_file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.provider("local").unwrap().api_key, "env-api-key");
        assert_eq!(config.route_ids(), vec!["local:llama"]);

        unsafe {
            std::env::remove_var("GATEWAY_TEST_API_KEY");
        }
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = GatewayConfig::load("nonexistent_gateway_config.yaml");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("nonexistent_gateway_config.yaml"));
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"oai: [unterminated").unwrap();
        temp_file.flush().unwrap();

        let result = GatewayConfig::load(temp_file.path().to_str().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_provider_requires_api_key() {
        let yaml = "oai:\n  provider:\n    p:\n      base_url: http://x\n";
        assert!(GatewayConfig::from_yaml_str(yaml).is_err());
    }

    #[test]
    fn test_example_config_parses() {
        let config = GatewayConfig::from_yaml_str(include_str!("../../config.example.yaml")).unwrap();
        assert_eq!(config.oai.providers.len(), 2);
        assert_eq!(
            config
                .model("openrouter", "glm-4.5:thinking")
                .and_then(|m| m.identifier.as_deref()),
            Some("z-ai/glm-4.5")
        );
    }

    #[test]
    #[serial]
    fn test_server_args_defaults() {
        unsafe {
            std::env::remove_var("CONFIG_PATH");
            std::env::remove_var("HOST");
            std::env::remove_var("PORT");
            std::env::remove_var("LOG_LEVEL");
        }
        let args = ServerArgs::try_parse_from(["open-gateway"]).unwrap();
        assert_eq!(args.config, "config.yaml");
        assert_eq!(args.host, "0.0.0.0");
        assert_eq!(args.port, 4283);
        assert_eq!(args.log_level, "info");
    }

    #[test]
    #[serial]
    fn test_server_args_env_and_flags() {
        unsafe {
            std::env::set_var("PORT", "9000");
        }
        let args =
            ServerArgs::try_parse_from(["open-gateway", "-c", "/etc/gw.yaml", "--host", "127.0.0.1"])
                .unwrap();
        assert_eq!(args.config, "/etc/gw.yaml");
        assert_eq!(args.host, "127.0.0.1");
        assert_eq!(args.port, 9000);
        unsafe {
            std::env::remove_var("PORT");
        }
    }
}
