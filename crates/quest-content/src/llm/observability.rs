use std::time::Duration;

use serde::Serialize;
use tracing::info;

use super::contracts::ContentKind;
use super::gateway::GatewayResponse;

/// Where a returned payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    ModelOutput,
    DeterministicFallback,
}

impl ContentSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModelOutput => "model_output",
            Self::DeterministicFallback => "deterministic_fallback",
        }
    }
}

/// Why the engine served deterministic content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    FallbackOnly,
    GatewayNotConfigured,
    ContractViolation,
}

impl FallbackReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FallbackOnly => "fallback_only",
            Self::GatewayNotConfigured => "gateway_not_configured",
            Self::ContractViolation => "contract_violation",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContentTelemetryEvent {
    pub kind: &'static str,
    pub source: &'static str,
    pub latency_ms: u64,
    pub attempts: u32,
    pub model: Option<String>,
    pub provider_request_id: Option<String>,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
    pub fallback_reason: Option<&'static str>,
}

impl ContentTelemetryEvent {
    pub fn new(
        kind: ContentKind,
        source: ContentSource,
        latency: Duration,
        response: Option<&GatewayResponse>,
        fallback_reason: Option<FallbackReason>,
    ) -> Self {
        let usage = response.and_then(|response| response.usage.as_ref());

        Self {
            kind: kind.as_str(),
            source: source.as_str(),
            latency_ms: duration_to_millis(latency),
            attempts: response.map(|response| response.attempts).unwrap_or(0),
            model: response.and_then(|response| response.model.clone()),
            provider_request_id: response.and_then(|response| response.provider_request_id.clone()),
            prompt_tokens: usage.map(|usage| usage.prompt_tokens),
            completion_tokens: usage.map(|usage| usage.completion_tokens),
            total_tokens: usage.map(|usage| usage.total_tokens),
            fallback_reason: fallback_reason.map(FallbackReason::as_str),
        }
    }
}

pub fn log_content_event(event: &ContentTelemetryEvent) {
    info!(
        kind = event.kind,
        source = event.source,
        latency_ms = event.latency_ms,
        attempts = event.attempts,
        model = event.model.as_deref().unwrap_or("none"),
        provider_request_id = event.provider_request_id.as_deref().unwrap_or("none"),
        prompt_tokens = event.prompt_tokens.unwrap_or(0),
        completion_tokens = event.completion_tokens.unwrap_or(0),
        total_tokens = event.total_tokens.unwrap_or(0),
        fallback_reason = event.fallback_reason.unwrap_or("none"),
        "content generated"
    );
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
