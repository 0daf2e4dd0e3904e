use std::env;

use thiserror::Error;

pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_RETRIES: u32 = 2;
const DEFAULT_RETRY_BASE_BACKOFF_MS: u64 = 250;

/// Connection and retry settings for the Azure OpenAI deployment.
///
/// The four connection values gate the gateway: when any of them is absent
/// it reports itself disabled and the engine runs fallback-only. An unset
/// API version takes the default; one set to a blank value stays blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_version: String,
    pub deployment: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_base_backoff_ms: u64,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            api_version: DEFAULT_API_VERSION.to_string(),
            deployment: None,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_backoff_ms: DEFAULT_RETRY_BASE_BACKOFF_MS,
        }
    }
}

impl ContentConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = optional_trimmed(&lookup, "AZURE_OPENAI_ENDPOINT")
            .map(|value| value.trim_end_matches('/').to_string());
        if let Some(endpoint) = endpoint.as_deref()
            && !endpoint.starts_with("http://")
            && !endpoint.starts_with("https://")
        {
            return Err(ConfigError::InvalidConfiguration(
                "AZURE_OPENAI_ENDPOINT must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            api_key: optional_trimmed(&lookup, "AZURE_OPENAI_API_KEY"),
            api_version: lookup("AZURE_OPENAI_API_VERSION")
                .map(|value| value.trim().to_string())
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            deployment: optional_trimmed(&lookup, "AZURE_OPENAI_DEPLOYMENT"),
            timeout_ms: parse_u64(&lookup, "CONTENT_LLM_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            max_retries: parse_u32(&lookup, "CONTENT_LLM_MAX_RETRIES", DEFAULT_MAX_RETRIES)?,
            retry_base_backoff_ms: parse_u64(
                &lookup,
                "CONTENT_LLM_RETRY_BASE_BACKOFF_MS",
                DEFAULT_RETRY_BASE_BACKOFF_MS,
            )?,
        })
    }

    /// Builds a config pointing at an explicit endpoint, for tests and tools.
    pub fn for_endpoint(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        deployment: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into().trim_end_matches('/').to_string()),
            api_key: Some(api_key.into()),
            deployment: Some(deployment.into()),
            ..Self::default()
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
            && self.api_key.is_some()
            && self.deployment.is_some()
            && !self.api_version.is_empty()
    }

    pub fn chat_completions_url(&self) -> Option<String> {
        let endpoint = self.endpoint.as_deref()?;
        let deployment = self.deployment.as_deref()?;
        if self.api_version.is_empty() {
            return None;
        }
        Some(format!(
            "{endpoint}/openai/deployments/{deployment}/chat/completions?api-version={}",
            self.api_version
        ))
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid integer in env var {key}: {value}")]
    ParseInt { key: String, value: String },
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build Azure OpenAI http client: {0}")]
    HttpClient(String),
}

fn parse_u64<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed(lookup, key) {
        Some(value) => value.parse::<u64>().map_err(|_| ConfigError::ParseInt {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn parse_u32<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match optional_trimmed(lookup, key) {
        Some(value) => value.parse::<u32>().map_err(|_| ConfigError::ParseInt {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}

fn optional_trimmed<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{ConfigError, ContentConfig, DEFAULT_API_VERSION};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect::<HashMap<_, _>>();
        move |key| values.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ContentConfig::from_lookup(lookup_from(&[])).expect("config should load");

        assert_eq!(config, ContentConfig::default());
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.max_retries, 2);
        assert!(!config.is_configured());
        assert!(config.chat_completions_url().is_none());
    }

    #[test]
    fn explicitly_blank_api_version_disables_the_gateway() {
        let config = ContentConfig::from_lookup(lookup_from(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "key"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4o-mini"),
            ("AZURE_OPENAI_API_VERSION", "  "),
        ]))
        .expect("config should load");

        assert_eq!(config.api_version, "");
        assert!(!config.is_configured());
        assert!(config.chat_completions_url().is_none());

        let configured = ContentConfig {
            api_version: DEFAULT_API_VERSION.to_string(),
            ..config
        };
        assert!(configured.is_configured());
    }

    #[test]
    fn blank_values_count_as_absent() {
        let config = ContentConfig::from_lookup(lookup_from(&[
            ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com/"),
            ("AZURE_OPENAI_API_KEY", "   "),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt-4o-mini"),
        ]))
        .expect("config should load");

        assert_eq!(config.api_key, None);
        assert_eq!(config.api_version, DEFAULT_API_VERSION);
        assert!(!config.is_configured());
        assert_eq!(
            config.chat_completions_url().as_deref(),
            Some(
                "https://example.openai.azure.com/openai/deployments/gpt-4o-mini/chat/completions?api-version=2024-02-15-preview"
            )
        );
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = ContentConfig::from_lookup(lookup_from(&[("CONTENT_LLM_MAX_RETRIES", "two")]))
            .expect_err("non-numeric retries should fail");
        assert_eq!(
            err,
            ConfigError::ParseInt {
                key: "CONTENT_LLM_MAX_RETRIES".to_string(),
                value: "two".to_string(),
            }
        );

        let err = ContentConfig::from_lookup(lookup_from(&[(
            "AZURE_OPENAI_ENDPOINT",
            "example.openai.azure.com",
        )]))
        .expect_err("scheme-less endpoint should fail");
        assert!(matches!(err, ConfigError::InvalidConfiguration(_)));
    }
}
