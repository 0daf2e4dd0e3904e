use quest_content::llm::ContentKind;
use quest_content::models::{AnalysisRequest, GateRequest, Part1Request, Part2Request};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct EvalCaseFixture {
    pub case_id: String,
    pub description: String,
    pub kind: ContentKind,
    #[serde(default)]
    pub include_in_live_smoke: bool,
    pub input: Value,
    #[serde(default)]
    pub mocked_model_output: Option<Value>,
    #[serde(default)]
    pub expectations: EvalExpectations,
}

impl EvalCaseFixture {
    pub fn request(&self) -> Result<CaseRequest, serde_json::Error> {
        let input = self.input.clone();
        Ok(match self.kind {
            ContentKind::Part1 => CaseRequest::Part1(serde_json::from_value(input)?),
            ContentKind::Part2 => CaseRequest::Part2(serde_json::from_value(input)?),
            ContentKind::Analysis => CaseRequest::Analysis(serde_json::from_value(input)?),
            ContentKind::Gate => CaseRequest::Gate(serde_json::from_value(input)?),
        })
    }
}

/// The typed engine request a fixture's `input` decodes into.
#[derive(Debug, Clone)]
pub enum CaseRequest {
    Part1(Part1Request),
    Part2(Part2Request),
    Analysis(AnalysisRequest),
    Gate(GateRequest),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvalExpectations {
    #[serde(default = "default_schema_valid")]
    pub schema_valid: bool,
    #[serde(default)]
    pub output_source: Option<ExpectedOutputSource>,
    #[serde(default)]
    pub quality: QualityExpectations,
}

impl Default for EvalExpectations {
    fn default() -> Self {
        Self {
            schema_valid: true,
            output_source: None,
            quality: QualityExpectations::default(),
        }
    }
}

fn default_schema_valid() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutputSource {
    ModelOutput,
    DeterministicFallback,
}

impl ExpectedOutputSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ModelOutput => "model_output",
            Self::DeterministicFallback => "deterministic_fallback",
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct QualityExpectations {
    #[serde(default)]
    pub min_mcq_options: Option<usize>,
    #[serde(default)]
    pub min_feedback_lines: Option<usize>,
    #[serde(default)]
    pub min_info_dialog_lines: Option<usize>,
    #[serde(default)]
    pub min_dragon_resources: Option<usize>,
    #[serde(default)]
    pub info_mentions_option: bool,
}
