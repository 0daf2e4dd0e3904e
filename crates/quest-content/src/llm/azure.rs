use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::gateway::{
    ContentGateway, GatewayError, GatewayFuture, GatewayRequest, GatewayResponse, TokenUsage,
};
use crate::config::{ConfigError, ContentConfig};

/// Chat-completions client for an Azure OpenAI deployment.
#[derive(Clone)]
pub struct AzureOpenAiGateway {
    client: reqwest::Client,
    config: ContentConfig,
}

impl AzureOpenAiGateway {
    pub fn new(config: ContentConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    async fn send_once(
        &self,
        url: &str,
        api_key: &str,
        request: &GatewayRequest,
    ) -> Result<GatewayResponse, String> {
        let request_body = json!({
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt }
            ],
            "response_format": {
                "type": "json_object"
            }
        });

        let response = self
            .client
            .post(url)
            .header("api-key", api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    "request_timed_out".to_string()
                } else {
                    format!("request_unavailable: {err}")
                }
            })?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
        let body = response
            .text()
            .await
            .map_err(|_| "response_body_read_failed".to_string())?;

        if !status.is_success() {
            return Err(format!(
                "status={} code={}",
                status.as_u16(),
                parse_provider_error_code(&body)
            ));
        }

        let parsed: AzureSuccessResponse = serde_json::from_str(&body)
            .map_err(|_| "response_json_parse_failed".to_string())?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| "missing_choice".to_string())?
            .message
            .content;

        let output = match content {
            Value::String(raw) => serde_json::from_str::<Value>(raw.trim())
                .map_err(|_| "content_not_json".to_string())?,
            value @ (Value::Object(_) | Value::Array(_)) => value,
            _ => return Err("unsupported_content_shape".to_string()),
        };

        Ok(GatewayResponse {
            output,
            model: parsed.model,
            provider_request_id: header_request_id.or(parsed.id),
            usage: parsed.usage.map(|usage| TokenUsage {
                prompt_tokens: clamp_u64_to_u32(usage.prompt_tokens.unwrap_or(0)),
                completion_tokens: clamp_u64_to_u32(usage.completion_tokens.unwrap_or(0)),
                total_tokens: clamp_u64_to_u32(usage.total_tokens.unwrap_or(0)),
            }),
            attempts: 1,
        })
    }
}

impl ContentGateway for AzureOpenAiGateway {
    fn is_enabled(&self) -> bool {
        self.config.is_configured()
    }

    fn invoke_json<'a>(&'a self, request: GatewayRequest) -> GatewayFuture<'a> {
        Box::pin(async move {
            let (Some(url), Some(api_key)) = (
                self.config.chat_completions_url(),
                self.config.api_key.as_deref(),
            ) else {
                return Err(GatewayError::NotConfigured);
            };

            let total_attempts = request
                .max_retries
                .unwrap_or(self.config.max_retries)
                .saturating_add(1);
            let mut last_error = String::from("no_attempts");

            for attempt in 0..total_attempts {
                match self.send_once(&url, api_key, &request).await {
                    Ok(mut response) => {
                        response.attempts = attempt + 1;
                        debug!(
                            kind = request.kind.as_str(),
                            attempt = attempt + 1,
                            "azure openai attempt succeeded"
                        );
                        return Ok(response);
                    }
                    Err(err) => {
                        warn!(
                            kind = request.kind.as_str(),
                            attempt = attempt + 1,
                            total_attempts,
                            "azure openai attempt failed: {err}"
                        );
                        last_error = err;
                    }
                }

                if attempt + 1 < total_attempts {
                    let backoff_multiplier = 2_u64.saturating_pow(attempt);
                    let backoff_ms = self
                        .config
                        .retry_base_backoff_ms
                        .saturating_mul(backoff_multiplier);
                    if backoff_ms > 0 {
                        sleep(Duration::from_millis(backoff_ms)).await;
                    }
                }
            }

            Err(GatewayError::Transport(last_error))
        })
    }
}

#[derive(Debug, Deserialize)]
struct AzureSuccessResponse {
    id: Option<String>,
    model: Option<String>,
    choices: Vec<AzureChoice>,
    usage: Option<AzureUsage>,
}

#[derive(Debug, Deserialize)]
struct AzureChoice {
    message: AzureMessage,
}

#[derive(Debug, Deserialize)]
struct AzureMessage {
    content: Value,
}

#[derive(Debug, Deserialize)]
struct AzureUsage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    ["apim-request-id", "x-request-id"].iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string)
    })
}

fn parse_provider_error_code(body: &str) -> String {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderErrorDetails>,
    }

    #[derive(Deserialize)]
    struct ProviderErrorDetails {
        code: Option<Value>,
    }

    let parsed = serde_json::from_str::<ProviderErrorEnvelope>(body).ok();
    let Some(provider_error_code) = parsed
        .and_then(|envelope| envelope.error)
        .and_then(|details| details.code)
    else {
        return "unknown".to_string();
    };

    match provider_error_code {
        Value::String(code) => code,
        Value::Number(code) => code.to_string(),
        _ => "unknown".to_string(),
    }
}

fn clamp_u64_to_u32(value: u64) -> u32 {
    value.min(u32::MAX as u64) as u32
}

#[cfg(test)]
mod tests {
    use super::parse_provider_error_code;

    #[test]
    fn provider_error_code_accepts_strings_and_numbers() {
        assert_eq!(
            parse_provider_error_code(r#"{"error":{"code":"content_filter"}}"#),
            "content_filter"
        );
        assert_eq!(parse_provider_error_code(r#"{"error":{"code":429}}"#), "429");
        assert_eq!(parse_provider_error_code("<html>bad gateway</html>"), "unknown");
    }
}
