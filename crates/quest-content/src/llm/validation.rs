use std::collections::HashSet;
use std::sync::LazyLock;

use jsonschema::JSONSchema;
use serde_json::Value;
use thiserror::Error;

use super::contracts::{
    AnalysisExpectation, AnalysisPayload, ContentContract, ContentKind, FEEDBACK_LINE_RANGE,
    GateExpectation, GatePayload, INFERRED_FIELD_COUNT, MIN_DRAGON_RESOURCES,
    MIN_INFO_DIALOG_LINES, MIN_MCQ_OPTIONS, PART1_DISTRIBUTION, PART2_DISTRIBUTION,
    POLY_PATH_OPTIONS, Part1Payload, Part2Expectation, Part2Payload, Question, QuestionType,
    RATING_SCALE_MAX, RATING_SCALE_MIN, STRENGTH_TAG_COUNT, SUGGESTED_OPTION_COUNT,
    WORK_STYLE_TAG_RANGE, output_schema,
};
use crate::models::OptionsKind;

/// The first contract rule a payload broke.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaViolation {
    #[error("{kind} schema failed to compile: {message}")]
    SchemaCompile { kind: ContentKind, message: String },
    #[error("{kind} payload is malformed: {detail}")]
    Malformed { kind: ContentKind, detail: String },
    #[error("{kind}: {field} must contain {expected} items, got {actual}")]
    Cardinality {
        kind: ContentKind,
        field: &'static str,
        expected: String,
        actual: usize,
    },
    #[error("{kind}: question {index} must have id {expected}, got {actual}")]
    QuestionId {
        kind: ContentKind,
        index: usize,
        expected: String,
        actual: String,
    },
    #[error("{kind}: question {id} must be type {expected}, got {actual}")]
    QuestionType {
        kind: ContentKind,
        id: String,
        expected: QuestionType,
        actual: QuestionType,
    },
    #[error("{kind}: mcq question {id} needs at least 2 options, got {actual}")]
    McqOptions {
        kind: ContentKind,
        id: String,
        actual: usize,
    },
    #[error("{kind}: rating question {id} scale must be exactly 1-5")]
    RatingScale { kind: ContentKind, id: String },
    #[error("part2: inferred_fields must be distinct, {field} repeats")]
    DuplicateInferredField { field: String },
    #[error("part2: poly_extra_question {0}")]
    PolyExtraQuestion(&'static str),
    #[error("gate: {field} {reason}")]
    WorkPathLine {
        field: &'static str,
        reason: &'static str,
    },
}

pub fn validate_part1(payload: &Value) -> Result<Part1Payload, SchemaViolation> {
    validate_payload::<Part1Payload>(payload, ())
}

pub fn validate_part2(payload: &Value, is_poly: bool) -> Result<Part2Payload, SchemaViolation> {
    validate_payload::<Part2Payload>(payload, Part2Expectation { is_poly })
}

pub fn validate_analysis(
    payload: &Value,
    options_kind: OptionsKind,
) -> Result<AnalysisPayload, SchemaViolation> {
    validate_payload::<AnalysisPayload>(payload, AnalysisExpectation { options_kind })
}

pub fn validate_gate(payload: &Value, need_salary: bool) -> Result<GatePayload, SchemaViolation> {
    validate_payload::<GatePayload>(
        payload,
        GateExpectation {
            work_path: need_salary,
        },
    )
}

/// Structural pass, typed decode, then contract rules. First failure wins.
pub fn validate_payload<T: ContentContract>(
    payload: &Value,
    expectation: T::Expectation,
) -> Result<T, SchemaViolation> {
    let kind = T::KIND;
    let validator = validator_for_kind(kind)?;

    if let Err(mut errors) = validator.validate(payload) {
        let detail = errors
            .next()
            .map(|err| err.to_string())
            .unwrap_or_else(|| "schema validation failed".to_string());
        return Err(SchemaViolation::Malformed { kind, detail });
    }

    let decoded = serde_json::from_value::<T>(payload.clone()).map_err(|err| {
        SchemaViolation::Malformed {
            kind,
            detail: err.to_string(),
        }
    })?;
    decoded.check(expectation)?;
    Ok(decoded)
}

impl ContentContract for Part1Payload {
    type Expectation = ();

    const KIND: ContentKind = ContentKind::Part1;

    fn check(&self, _expectation: ()) -> Result<(), SchemaViolation> {
        check_question_sequence(Self::KIND, &self.questions, &PART1_DISTRIBUTION)
    }
}

impl ContentContract for Part2Payload {
    type Expectation = Part2Expectation;

    const KIND: ContentKind = ContentKind::Part2;

    fn check(&self, expectation: Part2Expectation) -> Result<(), SchemaViolation> {
        exact_count(
            Self::KIND,
            "inferred_fields",
            INFERRED_FIELD_COUNT,
            self.inferred_fields.len(),
        )?;
        let mut seen = HashSet::new();
        for field in &self.inferred_fields {
            if !seen.insert(field.trim().to_lowercase()) {
                return Err(SchemaViolation::DuplicateInferredField {
                    field: field.clone(),
                });
            }
        }

        check_question_sequence(Self::KIND, &self.questions, &PART2_DISTRIBUTION)?;

        match (&self.poly_extra_question, expectation.is_poly) {
            (Some(question), true) => check_poly_extra_question(question),
            (None, true) => Err(SchemaViolation::PolyExtraQuestion(
                "is required for Poly students",
            )),
            (Some(_), false) => Err(SchemaViolation::PolyExtraQuestion(
                "must be null for non-Poly students",
            )),
            (None, false) => Ok(()),
        }
    }
}

impl ContentContract for AnalysisPayload {
    type Expectation = AnalysisExpectation;

    const KIND: ContentKind = ContentKind::Analysis;

    // Whether suggestions name courses or careers is a prompt-level concern;
    // structurally both kinds share one contract.
    fn check(&self, _expectation: AnalysisExpectation) -> Result<(), SchemaViolation> {
        exact_count(
            Self::KIND,
            "strength_tags",
            STRENGTH_TAG_COUNT,
            self.strength_tags.len(),
        )?;
        ranged_count(
            Self::KIND,
            "work_style_tags",
            *WORK_STYLE_TAG_RANGE.start(),
            *WORK_STYLE_TAG_RANGE.end(),
            self.work_style_tags.len(),
        )?;
        ranged_count(
            Self::KIND,
            "feedback_lines",
            *FEEDBACK_LINE_RANGE.start(),
            *FEEDBACK_LINE_RANGE.end(),
            self.feedback_lines.len(),
        )?;
        exact_count(
            Self::KIND,
            "suggested_options",
            SUGGESTED_OPTION_COUNT,
            self.suggested_options.len(),
        )
    }
}

impl ContentContract for GatePayload {
    type Expectation = GateExpectation;

    const KIND: ContentKind = ContentKind::Gate;

    fn check(&self, expectation: GateExpectation) -> Result<(), SchemaViolation> {
        min_count(
            Self::KIND,
            "info_dialog_lines",
            MIN_INFO_DIALOG_LINES,
            self.info_dialog_lines.len(),
        )?;

        let lines = [
            ("salary_outlook_line", self.salary_outlook_line.is_some()),
            ("work_style_line", self.work_style_line.is_some()),
        ];
        for (field, present) in lines {
            match (expectation.work_path, present) {
                (true, false) => {
                    return Err(SchemaViolation::WorkPathLine {
                        field,
                        reason: "is required for the work path",
                    });
                }
                (false, true) => {
                    return Err(SchemaViolation::WorkPathLine {
                        field,
                        reason: "must be absent outside the work path",
                    });
                }
                _ => {}
            }
        }

        min_count(
            Self::KIND,
            "dragon.resources",
            MIN_DRAGON_RESOURCES,
            self.dragon.resources.len(),
        )
    }
}

fn check_question_sequence(
    kind: ContentKind,
    questions: &[Question],
    distribution: &[QuestionType],
) -> Result<(), SchemaViolation> {
    exact_count(kind, "questions", distribution.len(), questions.len())?;

    for (index, (question, expected_type)) in questions.iter().zip(distribution).enumerate() {
        let expected_id = format!("q{}", index + 1);
        if question.id() != expected_id {
            return Err(SchemaViolation::QuestionId {
                kind,
                index: index + 1,
                expected: expected_id,
                actual: question.id().to_string(),
            });
        }
        if question.question_type() != *expected_type {
            return Err(SchemaViolation::QuestionType {
                kind,
                id: expected_id,
                expected: *expected_type,
                actual: question.question_type(),
            });
        }
        check_question(kind, question)?;
    }

    Ok(())
}

fn check_question(kind: ContentKind, question: &Question) -> Result<(), SchemaViolation> {
    match question {
        Question::Mcq { id, options, .. } if options.len() < MIN_MCQ_OPTIONS => {
            Err(SchemaViolation::McqOptions {
                kind,
                id: id.clone(),
                actual: options.len(),
            })
        }
        Question::Rating { id, scale, .. }
            if scale.min != RATING_SCALE_MIN || scale.max != RATING_SCALE_MAX =>
        {
            Err(SchemaViolation::RatingScale {
                kind,
                id: id.clone(),
            })
        }
        _ => Ok(()),
    }
}

fn check_poly_extra_question(question: &Question) -> Result<(), SchemaViolation> {
    let Question::Mcq { options, .. } = question else {
        return Err(SchemaViolation::PolyExtraQuestion("must be an mcq question"));
    };
    if options.iter().map(String::as_str).ne(POLY_PATH_OPTIONS) {
        return Err(SchemaViolation::PolyExtraQuestion(
            "options must be exactly [\"Work\",\"Go to uni\"]",
        ));
    }

    Ok(())
}

fn exact_count(
    kind: ContentKind,
    field: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), SchemaViolation> {
    if actual == expected {
        return Ok(());
    }

    Err(SchemaViolation::Cardinality {
        kind,
        field,
        expected: format!("exactly {expected}"),
        actual,
    })
}

fn ranged_count(
    kind: ContentKind,
    field: &'static str,
    min: usize,
    max: usize,
    actual: usize,
) -> Result<(), SchemaViolation> {
    if (min..=max).contains(&actual) {
        return Ok(());
    }

    Err(SchemaViolation::Cardinality {
        kind,
        field,
        expected: format!("{min} to {max}"),
        actual,
    })
}

fn min_count(
    kind: ContentKind,
    field: &'static str,
    min: usize,
    actual: usize,
) -> Result<(), SchemaViolation> {
    if actual >= min {
        return Ok(());
    }

    Err(SchemaViolation::Cardinality {
        kind,
        field,
        expected: format!("at least {min}"),
        actual,
    })
}

static PART1_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    JSONSchema::compile(&output_schema(ContentKind::Part1)).map_err(|err| err.to_string())
});

static PART2_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    JSONSchema::compile(&output_schema(ContentKind::Part2)).map_err(|err| err.to_string())
});

static ANALYSIS_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    JSONSchema::compile(&output_schema(ContentKind::Analysis)).map_err(|err| err.to_string())
});

static GATE_VALIDATOR: LazyLock<Result<JSONSchema, String>> = LazyLock::new(|| {
    JSONSchema::compile(&output_schema(ContentKind::Gate)).map_err(|err| err.to_string())
});

fn validator_for_kind(kind: ContentKind) -> Result<&'static JSONSchema, SchemaViolation> {
    let validator_result = match kind {
        ContentKind::Part1 => &*PART1_VALIDATOR,
        ContentKind::Part2 => &*PART2_VALIDATOR,
        ContentKind::Analysis => &*ANALYSIS_VALIDATOR,
        ContentKind::Gate => &*GATE_VALIDATOR,
    };

    validator_result
        .as_ref()
        .map_err(|message| SchemaViolation::SchemaCompile {
            kind,
            message: message.clone(),
        })
}
