use std::fmt;
use std::ops::RangeInclusive;

use schemars::{JsonSchema, schema_for};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::validation::SchemaViolation;
use crate::models::OptionsKind;

pub const PART1_DISTRIBUTION: [QuestionType; 5] = [
    QuestionType::Mcq,
    QuestionType::Mcq,
    QuestionType::Slider,
    QuestionType::Rating,
    QuestionType::Text,
];

pub const PART2_DISTRIBUTION: [QuestionType; 12] = [
    QuestionType::Mcq,
    QuestionType::Mcq,
    QuestionType::Mcq,
    QuestionType::Mcq,
    QuestionType::Slider,
    QuestionType::Slider,
    QuestionType::Slider,
    QuestionType::Rating,
    QuestionType::Rating,
    QuestionType::Rating,
    QuestionType::Text,
    QuestionType::Text,
];

pub const POLY_EXTRA_QUESTION_ID: &str = "poly_path";
pub const POLY_PATH_OPTIONS: [&str; 2] = ["Work", "Go to uni"];

pub const MIN_MCQ_OPTIONS: usize = 2;
pub const RATING_SCALE_MIN: f64 = 1.0;
pub const RATING_SCALE_MAX: f64 = 5.0;
pub const INFERRED_FIELD_COUNT: usize = 3;
pub const STRENGTH_TAG_COUNT: usize = 3;
pub const WORK_STYLE_TAG_RANGE: RangeInclusive<usize> = 2..=4;
pub const FEEDBACK_LINE_RANGE: RangeInclusive<usize> = 2..=5;
pub const SUGGESTED_OPTION_COUNT: usize = 3;
pub const MIN_INFO_DIALOG_LINES: usize = 3;
pub const MIN_DRAGON_RESOURCES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Part1,
    Part2,
    Analysis,
    Gate,
}

impl ContentKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Part1 => "part1",
            Self::Part2 => "part2",
            Self::Analysis => "analysis",
            Self::Gate => "gate",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Mcq,
    Slider,
    Rating,
    Text,
}

impl QuestionType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mcq => "mcq",
            Self::Slider => "slider",
            Self::Rating => "rating",
            Self::Text => "text",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    Mcq {
        id: String,
        prompt: String,
        options: Vec<String>,
    },
    Slider {
        id: String,
        prompt: String,
        scale: SliderScale,
    },
    Rating {
        id: String,
        prompt: String,
        scale: RatingScale,
    },
    Text {
        id: String,
        prompt: String,
        placeholder: String,
    },
}

impl Question {
    pub fn id(&self) -> &str {
        match self {
            Self::Mcq { id, .. }
            | Self::Slider { id, .. }
            | Self::Rating { id, .. }
            | Self::Text { id, .. } => id,
        }
    }

    pub fn prompt(&self) -> &str {
        match self {
            Self::Mcq { prompt, .. }
            | Self::Slider { prompt, .. }
            | Self::Rating { prompt, .. }
            | Self::Text { prompt, .. } => prompt,
        }
    }

    pub const fn question_type(&self) -> QuestionType {
        match self {
            Self::Mcq { .. } => QuestionType::Mcq,
            Self::Slider { .. } => QuestionType::Slider,
            Self::Rating { .. } => QuestionType::Rating,
            Self::Text { .. } => QuestionType::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SliderScale {
    pub min: f64,
    pub max: f64,
    pub min_label: String,
    pub max_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl RatingScale {
    pub const fn one_to_five() -> Self {
        Self {
            min: RATING_SCALE_MIN,
            max: RATING_SCALE_MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Part1Payload {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Part2Payload {
    pub inferred_fields: Vec<String>,
    pub questions: Vec<Question>,
    #[serde(default)]
    pub poly_extra_question: Option<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisPayload {
    pub strength_tags: Vec<String>,
    pub work_style_tags: Vec<String>,
    pub feedback_lines: Vec<String>,
    pub suggested_options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct GatePayload {
    pub info_dialog_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_style_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary_outlook_line: Option<String>,
    pub dragon: DragonQuest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DragonQuest {
    pub micro_quest_1_week: String,
    pub mini_project_1_month: String,
    pub resources: Vec<String>,
}

/// A payload shape with a fixed structural contract.
///
/// `Expectation` carries the caller context that switches parts of the
/// contract on or off (the Poly extra question, the work-path lines).
/// The same value must drive both the prompt and the validator.
pub trait ContentContract:
    Clone + fmt::Debug + Serialize + DeserializeOwned + JsonSchema + Send + Sync + 'static
{
    type Expectation: Copy + fmt::Debug + Send + Sync;

    const KIND: ContentKind;

    fn check(&self, expectation: Self::Expectation) -> Result<(), SchemaViolation>;
}

/// Part 2 expects the extra path question only for Poly students.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part2Expectation {
    pub is_poly: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisExpectation {
    pub options_kind: OptionsKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateExpectation {
    pub work_path: bool,
}

pub fn output_schema(kind: ContentKind) -> Value {
    let schema = match kind {
        ContentKind::Part1 => serde_json::to_value(schema_for!(Part1Payload)),
        ContentKind::Part2 => serde_json::to_value(schema_for!(Part2Payload)),
        ContentKind::Analysis => serde_json::to_value(schema_for!(AnalysisPayload)),
        ContentKind::Gate => serde_json::to_value(schema_for!(GatePayload)),
    };

    // A null schema fails compilation and surfaces as SchemaViolation::SchemaCompile.
    schema.unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        ContentKind, GatePayload, Part2Payload, Question, QuestionType, RatingScale,
        output_schema,
    };

    #[test]
    fn question_decodes_by_type_tag() {
        let question: Question = serde_json::from_value(json!({
            "id": "q4",
            "type": "rating",
            "prompt": "How confident are you?",
            "scale": {"min": 1, "max": 5}
        }))
        .expect("rating question should decode");

        assert_eq!(question.question_type(), QuestionType::Rating);
        assert_eq!(question.id(), "q4");
        assert!(matches!(
            question,
            Question::Rating { ref scale, .. } if *scale == RatingScale::one_to_five()
        ));
    }

    #[test]
    fn rating_scale_rejects_extra_keys() {
        let result = serde_json::from_value::<Question>(json!({
            "id": "q4",
            "type": "rating",
            "prompt": "How confident are you?",
            "scale": {"min": 1, "max": 5, "min_label": "low"}
        }));

        assert!(result.is_err());
    }

    #[test]
    fn optional_fields_serialize_as_the_contract_expects() {
        let part2 = Part2Payload {
            inferred_fields: vec!["A".into(), "B".into(), "C".into()],
            questions: Vec::new(),
            poly_extra_question: None,
        };
        let encoded = serde_json::to_value(&part2).expect("part2 should encode");
        assert_eq!(encoded["poly_extra_question"], json!(null));

        let gate: GatePayload = serde_json::from_value(json!({
            "info_dialog_lines": ["a", "b", "c"],
            "work_style_line": null,
            "dragon": {
                "micro_quest_1_week": "week",
                "mini_project_1_month": "month",
                "resources": ["docs", "forum"]
            }
        }))
        .expect("gate should decode");
        let encoded = serde_json::to_value(&gate).expect("gate should encode");
        assert!(encoded.get("work_style_line").is_none());
        assert!(encoded.get("salary_outlook_line").is_none());
    }

    #[test]
    fn output_schema_is_generated_for_every_kind() {
        for kind in [
            ContentKind::Part1,
            ContentKind::Part2,
            ContentKind::Analysis,
            ContentKind::Gate,
        ] {
            let schema = output_schema(kind);
            assert!(schema.is_object(), "schema for {kind} should be an object");
        }
    }
}
