use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::warn;

use super::azure::AzureOpenAiGateway;
use super::contracts::{
    AnalysisExpectation, AnalysisPayload, ContentContract, GateExpectation, GatePayload,
    Part1Payload, Part2Expectation, Part2Payload,
};
use super::fallback::{fallback_analysis, fallback_gate, fallback_part1, fallback_part2};
use super::gateway::{ContentGateway, GatewayError, GatewayRequest, GatewayResponse};
use super::observability::{
    ContentSource, ContentTelemetryEvent, FallbackReason, log_content_event,
};
use super::prompts::{
    ContentPrompt, SYSTEM_RULES, analysis_prompt, gate_prompt, part1_prompt, part2_prompt,
};
use super::validation::{SchemaViolation, validate_payload};
use crate::config::{ConfigError, ContentConfig};
use crate::models::{AnalysisRequest, EducationStatus, GateRequest, Part1Request, Part2Request};

/// A contract-satisfying payload and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Generated<T> {
    pub payload: T,
    pub source: ContentSource,
}

impl<T> Generated<T> {
    pub fn is_fallback(&self) -> bool {
        self.source == ContentSource::DeterministicFallback
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid content request: {0}")]
    InvalidInput(String),
    #[error("content gateway request failed: {0}")]
    Transport(String),
    #[error("deterministic fallback broke its own contract: {0}")]
    FallbackContract(SchemaViolation),
}

/// Selected once per engine; every operation runs the same code path after that.
#[derive(Clone)]
pub enum GenerationMode {
    Live(Arc<dyn ContentGateway>),
    FallbackOnly,
}

impl fmt::Debug for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live(_) => f.write_str("Live"),
            Self::FallbackOnly => f.write_str("FallbackOnly"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentEngine {
    mode: GenerationMode,
}

impl ContentEngine {
    pub fn new(gateway: Arc<dyn ContentGateway>) -> Self {
        let mode = if gateway.is_enabled() {
            GenerationMode::Live(gateway)
        } else {
            GenerationMode::FallbackOnly
        };

        Self { mode }
    }

    pub fn fallback_only() -> Self {
        Self {
            mode: GenerationMode::FallbackOnly,
        }
    }

    pub fn from_config(config: ContentConfig) -> Result<Self, ConfigError> {
        let gateway = AzureOpenAiGateway::new(config)?;
        Ok(Self::new(Arc::new(gateway)))
    }

    pub fn mode(&self) -> &GenerationMode {
        &self.mode
    }

    pub fn is_live(&self) -> bool {
        matches!(self.mode, GenerationMode::Live(_))
    }

    pub async fn gen_part1(
        &self,
        request: &Part1Request,
    ) -> Result<Generated<Part1Payload>, ContentError> {
        let has_course = request
            .poly_course
            .as_deref()
            .is_some_and(|course| !course.trim().is_empty());
        if request.education_status.is_poly() && !has_course {
            return Err(ContentError::InvalidInput(
                "poly_course is required when education_status is Poly".to_string(),
            ));
        }

        self.generate(|| part1_prompt(request), (), || {
            fallback_part1(request.education_status)
        })
        .await
    }

    pub async fn gen_part2(
        &self,
        request: &Part2Request,
    ) -> Result<Generated<Part2Payload>, ContentError> {
        let is_poly = request.is_poly();
        self.generate(|| part2_prompt(request), Part2Expectation { is_poly }, || {
            fallback_part2(is_poly)
        })
        .await
    }

    pub async fn gen_analysis(
        &self,
        request: &AnalysisRequest,
    ) -> Result<Generated<AnalysisPayload>, ContentError> {
        ensure_path_choice_matches_stage(
            Some(request.education_status),
            request.poly_path_choice.is_some(),
        )?;

        let options_kind = request.options_kind();
        self.generate(
            || analysis_prompt(request),
            AnalysisExpectation { options_kind },
            || fallback_analysis(options_kind),
        )
        .await
    }

    pub async fn gen_gate(
        &self,
        request: &GateRequest,
    ) -> Result<Generated<GatePayload>, ContentError> {
        if request.option_name.trim().is_empty() {
            return Err(ContentError::InvalidInput(
                "option_name must not be empty".to_string(),
            ));
        }
        ensure_path_choice_matches_stage(
            request.education_status,
            request.poly_path_choice.is_some(),
        )?;
        if request.work_path
            && request
                .education_status
                .is_some_and(|status| !status.is_poly())
        {
            return Err(ContentError::InvalidInput(
                "work_path applies only to Poly students".to_string(),
            ));
        }

        let work_path = request.work_path;
        self.generate(|| gate_prompt(request), GateExpectation { work_path }, || {
            fallback_gate(&request.option_name, work_path)
        })
        .await
    }

    /// Builds the prompt only in live mode; fallback-only engines never render one.
    async fn generate<T, P, F>(
        &self,
        prompt: P,
        expectation: T::Expectation,
        fallback: F,
    ) -> Result<Generated<T>, ContentError>
    where
        T: ContentContract,
        P: FnOnce() -> ContentPrompt + Send,
        F: FnOnce() -> T + Send,
    {
        let started_at = Instant::now();
        let gateway = match &self.mode {
            GenerationMode::Live(gateway) => gateway,
            GenerationMode::FallbackOnly => {
                return serve_fallback(
                    started_at,
                    expectation,
                    fallback(),
                    FallbackReason::FallbackOnly,
                    None,
                );
            }
        };

        let prompt = prompt();
        let request = GatewayRequest::new(prompt.kind, SYSTEM_RULES, prompt.render());
        match gateway.invoke_json(request).await {
            Ok(response) => match validate_payload::<T>(&response.output, expectation) {
                Ok(payload) => {
                    log_content_event(&ContentTelemetryEvent::new(
                        T::KIND,
                        ContentSource::ModelOutput,
                        started_at.elapsed(),
                        Some(&response),
                        None,
                    ));
                    Ok(Generated {
                        payload,
                        source: ContentSource::ModelOutput,
                    })
                }
                Err(violation) => {
                    warn!(
                        kind = T::KIND.as_str(),
                        "generated content failed contract, using fallback: {violation}"
                    );
                    serve_fallback(
                        started_at,
                        expectation,
                        fallback(),
                        FallbackReason::ContractViolation,
                        Some(&response),
                    )
                }
            },
            Err(GatewayError::NotConfigured) => {
                warn!(
                    kind = T::KIND.as_str(),
                    "content gateway is not configured, using fallback"
                );
                serve_fallback(
                    started_at,
                    expectation,
                    fallback(),
                    FallbackReason::GatewayNotConfigured,
                    None,
                )
            }
            Err(GatewayError::Transport(message)) => {
                warn!(kind = T::KIND.as_str(), "content generation failed: {message}");
                Err(ContentError::Transport(message))
            }
        }
    }
}

fn serve_fallback<T: ContentContract>(
    started_at: Instant,
    expectation: T::Expectation,
    payload: T,
    reason: FallbackReason,
    response: Option<&GatewayResponse>,
) -> Result<Generated<T>, ContentError> {
    payload
        .check(expectation)
        .map_err(ContentError::FallbackContract)?;

    log_content_event(&ContentTelemetryEvent::new(
        T::KIND,
        ContentSource::DeterministicFallback,
        started_at.elapsed(),
        response,
        Some(reason),
    ));

    Ok(Generated {
        payload,
        source: ContentSource::DeterministicFallback,
    })
}

fn ensure_path_choice_matches_stage(
    education_status: Option<EducationStatus>,
    has_path_choice: bool,
) -> Result<(), ContentError> {
    if has_path_choice && education_status.is_some_and(|status| !status.is_poly()) {
        return Err(ContentError::InvalidInput(
            "poly_path_choice is only valid when education_status is Poly".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{ContentEngine, ContentError};
    use crate::llm::observability::ContentSource;
    use crate::models::{
        AnalysisRequest, EducationStatus, GateRequest, Part1Request, Part2Request, PolyPathChoice,
    };

    #[tokio::test]
    async fn fallback_only_engine_serves_fixed_secondary_part1() {
        let engine = ContentEngine::fallback_only();
        let generated = engine
            .gen_part1(&Part1Request {
                education_status: EducationStatus::SecondarySchool,
                poly_course: None,
            })
            .await
            .expect("fallback part1 should succeed");

        assert_eq!(generated.source, ContentSource::DeterministicFallback);
        let first = &generated.payload.questions[0];
        assert_eq!(first.id(), "q1");
        assert_eq!(first.prompt(), "Which school tasks do you enjoy most?");
    }

    #[tokio::test]
    async fn fallback_only_engine_threads_poly_flag_into_part2() {
        let engine = ContentEngine::fallback_only();
        let poly = engine
            .gen_part2(&Part2Request {
                education_status: EducationStatus::Poly,
                part1_answers: Vec::new(),
            })
            .await
            .expect("poly part2 should succeed");
        assert!(poly.payload.poly_extra_question.is_some());

        let jc = engine
            .gen_part2(&Part2Request {
                education_status: EducationStatus::Jc,
                part1_answers: Vec::new(),
            })
            .await
            .expect("jc part2 should succeed");
        assert!(jc.payload.poly_extra_question.is_none());
    }

    #[tokio::test]
    async fn caller_input_errors_fail_fast() {
        let engine = ContentEngine::fallback_only();

        let err = engine
            .gen_part1(&Part1Request {
                education_status: EducationStatus::Poly,
                poly_course: Some("  ".to_string()),
            })
            .await
            .expect_err("poly without course should fail");
        assert!(matches!(err, ContentError::InvalidInput(_)));

        let err = engine
            .gen_analysis(&AnalysisRequest {
                education_status: EducationStatus::Jc,
                poly_path_choice: Some(PolyPathChoice::Work),
                inferred_fields: Vec::new(),
                part2_answers: Vec::new(),
            })
            .await
            .expect_err("path choice outside poly should fail");
        assert!(matches!(err, ContentError::InvalidInput(_)));

        let err = engine
            .gen_gate(&GateRequest::new(" ", false))
            .await
            .expect_err("blank option should fail");
        assert!(matches!(err, ContentError::InvalidInput(_)));

        let err = engine
            .gen_gate(
                &GateRequest::new("Digital Design", true)
                    .with_stage(EducationStatus::SecondarySchool, None),
            )
            .await
            .expect_err("work path outside poly should fail");
        assert!(matches!(err, ContentError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn gate_without_work_path_has_no_work_lines() {
        let engine = ContentEngine::fallback_only();
        let generated = engine
            .gen_gate(&GateRequest::new("Computer Engineering", false))
            .await
            .expect("gate should succeed");

        assert!(generated.is_fallback());
        assert!(generated.payload.work_style_line.is_none());
        assert!(generated.payload.salary_outlook_line.is_none());
    }
}
