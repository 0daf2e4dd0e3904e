use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::contracts::QuestionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum EducationStatus {
    #[serde(rename = "Secondary School")]
    SecondarySchool,
    #[serde(rename = "JC")]
    Jc,
    #[serde(rename = "Poly")]
    Poly,
}

impl EducationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SecondarySchool => "Secondary School",
            Self::Jc => "JC",
            Self::Poly => "Poly",
        }
    }

    pub const fn is_poly(self) -> bool {
        matches!(self, Self::Poly)
    }
}

impl fmt::Display for EducationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EducationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Secondary School" => Ok(Self::SecondarySchool),
            "JC" => Ok(Self::Jc),
            "Poly" => Ok(Self::Poly),
            other => Err(UnknownVariant {
                field: "education_status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum PolyPathChoice {
    #[serde(rename = "Work")]
    Work,
    #[serde(rename = "Go to uni")]
    GoToUni,
}

impl PolyPathChoice {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::GoToUni => "Go to uni",
        }
    }
}

impl fmt::Display for PolyPathChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolyPathChoice {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Work" => Ok(Self::Work),
            "Go to uni" => Ok(Self::GoToUni),
            other => Err(UnknownVariant {
                field: "poly_path_choice",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {field} value: {value}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

/// Whether suggested options should name courses or job roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionsKind {
    Courses,
    Careers,
}

impl OptionsKind {
    pub fn for_stage(
        education_status: EducationStatus,
        poly_path_choice: Option<PolyPathChoice>,
    ) -> Self {
        if education_status.is_poly() && poly_path_choice == Some(PolyPathChoice::Work) {
            Self::Careers
        } else {
            Self::Courses
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Courses => "courses",
            Self::Careers => "careers",
        }
    }
}

/// One answered question, as collected by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub prompt: String,
    pub answer: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part1Request {
    pub education_status: EducationStatus,
    #[serde(default)]
    pub poly_course: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part2Request {
    pub education_status: EducationStatus,
    #[serde(default)]
    pub part1_answers: Vec<AnswerRecord>,
}

impl Part2Request {
    pub fn is_poly(&self) -> bool {
        self.education_status.is_poly()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub education_status: EducationStatus,
    #[serde(default)]
    pub poly_path_choice: Option<PolyPathChoice>,
    #[serde(default)]
    pub inferred_fields: Vec<String>,
    #[serde(default)]
    pub part2_answers: Vec<AnswerRecord>,
}

impl AnalysisRequest {
    pub fn options_kind(&self) -> OptionsKind {
        OptionsKind::for_stage(self.education_status, self.poly_path_choice)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateRequest {
    pub option_name: String,
    pub work_path: bool,
    #[serde(default)]
    pub education_status: Option<EducationStatus>,
    #[serde(default)]
    pub poly_path_choice: Option<PolyPathChoice>,
}

impl GateRequest {
    pub fn new(option_name: impl Into<String>, work_path: bool) -> Self {
        Self {
            option_name: option_name.into(),
            work_path,
            education_status: None,
            poly_path_choice: None,
        }
    }

    pub fn with_stage(
        mut self,
        education_status: EducationStatus,
        poly_path_choice: Option<PolyPathChoice>,
    ) -> Self {
        self.education_status = Some(education_status);
        self.poly_path_choice = poly_path_choice;
        self
    }

    /// Work path applies only to Poly students heading to work.
    pub fn work_path_for(
        education_status: EducationStatus,
        poly_path_choice: Option<PolyPathChoice>,
    ) -> bool {
        OptionsKind::for_stage(education_status, poly_path_choice) == OptionsKind::Careers
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        AnswerRecord, EducationStatus, GateRequest, OptionsKind, Part1Request, PolyPathChoice,
    };
    use crate::llm::contracts::QuestionType;

    #[test]
    fn education_status_uses_display_labels_on_the_wire() {
        let request: Part1Request = serde_json::from_value(json!({
            "education_status": "Secondary School",
            "poly_course": null
        }))
        .expect("request should decode");

        assert_eq!(request.education_status, EducationStatus::SecondarySchool);
        assert_eq!(
            serde_json::to_value(EducationStatus::Jc).expect("status should encode"),
            json!("JC")
        );
        assert_eq!("Poly".parse::<EducationStatus>(), Ok(EducationStatus::Poly));
        assert!("University".parse::<EducationStatus>().is_err());
    }

    #[test]
    fn options_kind_is_careers_only_for_poly_work() {
        assert_eq!(
            OptionsKind::for_stage(EducationStatus::Poly, Some(PolyPathChoice::Work)),
            OptionsKind::Careers
        );
        assert_eq!(
            OptionsKind::for_stage(EducationStatus::Poly, Some(PolyPathChoice::GoToUni)),
            OptionsKind::Courses
        );
        assert_eq!(
            OptionsKind::for_stage(EducationStatus::Jc, Some(PolyPathChoice::Work)),
            OptionsKind::Courses
        );
        assert!(GateRequest::work_path_for(
            EducationStatus::Poly,
            Some(PolyPathChoice::Work)
        ));
        assert!(!GateRequest::work_path_for(EducationStatus::Poly, None));
    }

    #[test]
    fn answer_record_keeps_type_tag_and_raw_answer() {
        let record: AnswerRecord = serde_json::from_value(json!({
            "id": "q3",
            "type": "slider",
            "prompt": "How much do you like working with people?",
            "answer": 7
        }))
        .expect("answer should decode");

        assert_eq!(record.question_type, QuestionType::Slider);
        assert_eq!(record.answer, json!(7));
        assert_eq!(
            "Go to uni".parse::<PolyPathChoice>(),
            Ok(PolyPathChoice::GoToUni)
        );
    }
}
