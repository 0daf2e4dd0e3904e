use std::sync::Arc;

use quest_content::config::{ConfigError, ContentConfig};
use quest_content::llm::{
    AnalysisPayload, AzureOpenAiGateway, ContentEngine, ContentGateway, ContentSource,
    DisabledGateway, GatePayload, GatewayFuture, GatewayRequest, GatewayResponse, Part1Payload,
    Part2Payload, SchemaViolation, validate_analysis, validate_gate, validate_part1,
    validate_part2,
};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::case::{CaseRequest, EvalCaseFixture};
use crate::cli::{CliOptions, EvalMode};
use crate::fixture_io::{FixtureIoError, load_cases};
use crate::quality::evaluate_quality;

#[derive(Debug)]
pub struct EvalSummary {
    mode: EvalMode,
    results: Vec<CaseResult>,
}

impl EvalSummary {
    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|result| !result.failures.is_empty())
    }

    pub fn print(&self) {
        println!("Content Eval Harness ({})", self.mode.as_str());

        let mut passed = 0usize;
        for result in &self.results {
            if result.failures.is_empty() {
                passed += 1;
                println!("[PASS] {}: {}", result.case_id, result.description);
            } else {
                println!("[FAIL] {}: {}", result.case_id, result.description);
                for failure in &result.failures {
                    println!("  - {failure}");
                }
            }
        }

        let total = self.results.len();
        let failed = total.saturating_sub(passed);
        println!(
            "Summary: {} total, {} passed, {} failed",
            total, passed, failed
        );
    }
}

#[derive(Debug)]
struct CaseResult {
    case_id: String,
    description: String,
    failures: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Fixtures(#[from] FixtureIoError),
    #[error("failed to initialize Azure OpenAI in live mode: {0}")]
    Config(#[from] ConfigError),
    #[error("live mode requires AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY and AZURE_OPENAI_DEPLOYMENT")]
    LiveNotConfigured,
    #[error("live mode requires at least one fixture with include_in_live_smoke=true")]
    NoLiveCases,
    #[error("no fixture matched --case {0}")]
    NoMatchingCases(String),
}

/// A resolved engine payload, whichever kind the case asked for.
#[derive(Debug, Clone)]
pub enum ResolvedContent {
    Part1(Part1Payload),
    Part2(Part2Payload),
    Analysis(AnalysisPayload),
    Gate(GatePayload),
}

pub async fn run_eval(options: &CliOptions) -> Result<EvalSummary, EvalError> {
    let mut cases = load_cases()?;
    cases.sort_by(|left, right| left.case_id.cmp(&right.case_id));

    if let Some(filter) = options.case_filter.as_deref() {
        cases.retain(|case| case.case_id.contains(filter));
        if cases.is_empty() {
            return Err(EvalError::NoMatchingCases(filter.to_string()));
        }
    }

    let live_gateway: Option<Arc<dyn ContentGateway>> = if options.mode == EvalMode::Live {
        cases.retain(|case| case.include_in_live_smoke);
        if cases.is_empty() {
            return Err(EvalError::NoLiveCases);
        }

        let gateway = AzureOpenAiGateway::new(ContentConfig::from_env()?)?;
        if !gateway.is_enabled() {
            return Err(EvalError::LiveNotConfigured);
        }
        Some(Arc::new(gateway))
    } else {
        None
    };

    let mut results = Vec::with_capacity(cases.len());
    for case in &cases {
        let gateway = match &live_gateway {
            Some(gateway) => Arc::clone(gateway),
            None => mocked_gateway(case),
        };
        results.push(run_case(case, options.mode, gateway).await);
    }

    Ok(EvalSummary {
        mode: options.mode,
        results,
    })
}

fn mocked_gateway(case: &EvalCaseFixture) -> Arc<dyn ContentGateway> {
    match &case.mocked_model_output {
        Some(output) => Arc::new(ScriptedGateway {
            output: output.clone(),
        }),
        None => Arc::new(DisabledGateway),
    }
}

async fn run_case(
    case: &EvalCaseFixture,
    mode: EvalMode,
    gateway: Arc<dyn ContentGateway>,
) -> CaseResult {
    let mut failures = Vec::new();
    let finish = |failures| CaseResult {
        case_id: case.case_id.clone(),
        description: case.description.clone(),
        failures,
    };

    let request = match case.request() {
        Ok(request) => request,
        Err(err) => {
            failures.push(format!("input: {err}"));
            return finish(failures);
        }
    };

    let recorder = Arc::new(RecordingGateway::new(gateway));
    let engine = ContentEngine::new(recorder.clone());

    let resolved = resolve(&engine, &request).await;
    let model_output = recorder.last_output().await;

    let (schema_valid, schema_error) = match model_output.as_ref() {
        Some(output) => match validate_raw(&request, output) {
            Ok(()) => (true, None),
            Err(err) => (false, Some(err.to_string())),
        },
        None => (false, Some("missing_model_output".to_string())),
    };

    if schema_valid != case.expectations.schema_valid {
        failures.push(format!(
            "schema_validity: expected={}, actual={}, details={}",
            case.expectations.schema_valid,
            schema_valid,
            schema_error.as_deref().unwrap_or("validation succeeded")
        ));
    }

    let (content, source) = match resolved {
        Ok(resolved) => resolved,
        Err(err) => {
            failures.push(format!("content_engine: {err}"));
            return finish(failures);
        }
    };

    if let Some(expected_source) = case.expectations.output_source {
        if expected_source.as_str() != source.as_str() {
            failures.push(format!(
                "output_source: expected={}, actual={}",
                expected_source.as_str(),
                source.as_str()
            ));
        }
    } else if mode == EvalMode::Live && source != ContentSource::ModelOutput {
        failures.push(format!(
            "output_source: live smoke requires model_output, got {}",
            source.as_str()
        ));
    }

    let option_name = match &request {
        CaseRequest::Gate(gate) => Some(gate.option_name.as_str()),
        _ => None,
    };
    for issue in evaluate_quality(&content, &case.expectations.quality, option_name) {
        failures.push(format!("quality: {issue}"));
    }

    info!(
        case_id = case.case_id.as_str(),
        kind = case.kind.as_str(),
        source = source.as_str(),
        failures = failures.len(),
        "content eval case finished"
    );

    finish(failures)
}

async fn resolve(
    engine: &ContentEngine,
    request: &CaseRequest,
) -> Result<(ResolvedContent, ContentSource), quest_content::llm::ContentError> {
    Ok(match request {
        CaseRequest::Part1(request) => {
            let generated = engine.gen_part1(request).await?;
            (ResolvedContent::Part1(generated.payload), generated.source)
        }
        CaseRequest::Part2(request) => {
            let generated = engine.gen_part2(request).await?;
            (ResolvedContent::Part2(generated.payload), generated.source)
        }
        CaseRequest::Analysis(request) => {
            let generated = engine.gen_analysis(request).await?;
            (ResolvedContent::Analysis(generated.payload), generated.source)
        }
        CaseRequest::Gate(request) => {
            let generated = engine.gen_gate(request).await?;
            (ResolvedContent::Gate(generated.payload), generated.source)
        }
    })
}

fn validate_raw(request: &CaseRequest, output: &Value) -> Result<(), SchemaViolation> {
    match request {
        CaseRequest::Part1(_) => validate_part1(output).map(|_| ()),
        CaseRequest::Part2(request) => validate_part2(output, request.is_poly()).map(|_| ()),
        CaseRequest::Analysis(request) => {
            validate_analysis(output, request.options_kind()).map(|_| ())
        }
        CaseRequest::Gate(request) => validate_gate(output, request.work_path).map(|_| ()),
    }
}

/// Replays one recorded model output for every call.
struct ScriptedGateway {
    output: Value,
}

impl ContentGateway for ScriptedGateway {
    fn is_enabled(&self) -> bool {
        true
    }

    fn invoke_json<'a>(&'a self, _request: GatewayRequest) -> GatewayFuture<'a> {
        Box::pin(async move { Ok(GatewayResponse::from_output(self.output.clone())) })
    }
}

/// Keeps the raw output of the last successful call so the harness can
/// judge it separately from what the engine finally served.
struct RecordingGateway {
    inner: Arc<dyn ContentGateway>,
    last_output: Mutex<Option<Value>>,
}

impl RecordingGateway {
    fn new(inner: Arc<dyn ContentGateway>) -> Self {
        Self {
            inner,
            last_output: Mutex::new(None),
        }
    }

    async fn last_output(&self) -> Option<Value> {
        self.last_output.lock().await.clone()
    }
}

impl ContentGateway for RecordingGateway {
    fn is_enabled(&self) -> bool {
        self.inner.is_enabled()
    }

    fn invoke_json<'a>(&'a self, request: GatewayRequest) -> GatewayFuture<'a> {
        Box::pin(async move {
            let result = self.inner.invoke_json(request).await;
            if let Ok(response) = &result {
                *self.last_output.lock().await = Some(response.output.clone());
            }
            result
        })
    }
}
