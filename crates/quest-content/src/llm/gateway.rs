use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::contracts::ContentKind;

pub type GatewayFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GatewayResponse, GatewayError>> + Send + 'a>>;

#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub kind: ContentKind,
    pub system_prompt: String,
    pub user_prompt: String,
    /// Overrides the gateway's configured retry count for this call.
    pub max_retries: Option<u32>,
}

impl GatewayRequest {
    pub fn new(
        kind: ContentKind,
        system_prompt: impl Into<String>,
        user_prompt: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            max_retries: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub output: Value,
    pub model: Option<String>,
    pub provider_request_id: Option<String>,
    pub usage: Option<TokenUsage>,
    pub attempts: u32,
}

impl GatewayResponse {
    /// A response carrying only the parsed JSON, as produced by scripted gateways.
    pub fn from_output(output: Value) -> Self {
        Self {
            output,
            model: None,
            provider_request_id: None,
            usage: None,
            attempts: 1,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GatewayError {
    #[error("content gateway is not configured")]
    NotConfigured,
    #[error("content gateway request failed: {0}")]
    Transport(String),
}

/// Turns one system/user message pair into a parsed JSON value.
pub trait ContentGateway: Send + Sync {
    fn is_enabled(&self) -> bool;

    fn invoke_json<'a>(&'a self, request: GatewayRequest) -> GatewayFuture<'a>;
}

/// A gateway with no model behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledGateway;

impl ContentGateway for DisabledGateway {
    fn is_enabled(&self) -> bool {
        false
    }

    fn invoke_json<'a>(&'a self, _request: GatewayRequest) -> GatewayFuture<'a> {
        Box::pin(async { Err(GatewayError::NotConfigured) })
    }
}
