use quest_content::llm::Question;

use crate::case::QualityExpectations;
use crate::engine::ResolvedContent;

pub fn evaluate_quality(
    content: &ResolvedContent,
    expectations: &QualityExpectations,
    option_name: Option<&str>,
) -> Vec<String> {
    let mut issues = Vec::new();

    match content {
        ResolvedContent::Part1(payload) => {
            check_questions("questions", &payload.questions, expectations, &mut issues);
        }
        ResolvedContent::Part2(payload) => {
            require_all_non_empty("inferred_fields", &payload.inferred_fields, &mut issues);
            check_questions("questions", &payload.questions, expectations, &mut issues);
            if let Some(question) = &payload.poly_extra_question {
                check_questions(
                    "poly_extra_question",
                    std::slice::from_ref(question),
                    expectations,
                    &mut issues,
                );
            }
        }
        ResolvedContent::Analysis(payload) => {
            require_all_non_empty("strength_tags", &payload.strength_tags, &mut issues);
            require_all_non_empty("work_style_tags", &payload.work_style_tags, &mut issues);
            require_all_non_empty("feedback_lines", &payload.feedback_lines, &mut issues);
            require_all_non_empty("suggested_options", &payload.suggested_options, &mut issues);
            require_min_len(
                "feedback_lines",
                payload.feedback_lines.len(),
                expectations.min_feedback_lines,
                &mut issues,
            );
        }
        ResolvedContent::Gate(payload) => {
            require_all_non_empty("info_dialog_lines", &payload.info_dialog_lines, &mut issues);
            require_non_empty_text(
                "dragon.micro_quest_1_week",
                &payload.dragon.micro_quest_1_week,
                &mut issues,
            );
            require_non_empty_text(
                "dragon.mini_project_1_month",
                &payload.dragon.mini_project_1_month,
                &mut issues,
            );
            require_all_non_empty("dragon.resources", &payload.dragon.resources, &mut issues);
            require_min_len(
                "info_dialog_lines",
                payload.info_dialog_lines.len(),
                expectations.min_info_dialog_lines,
                &mut issues,
            );
            require_min_len(
                "dragon.resources",
                payload.dragon.resources.len(),
                expectations.min_dragon_resources,
                &mut issues,
            );

            if expectations.info_mentions_option
                && let Some(option_name) = option_name
            {
                let needle = option_name.to_ascii_lowercase();
                let mentioned = payload
                    .info_dialog_lines
                    .iter()
                    .any(|line| line.to_ascii_lowercase().contains(&needle));
                if !mentioned {
                    issues.push(format!(
                        "info_dialog_lines: expected a line mentioning {option_name}"
                    ));
                }
            }
        }
    }

    issues
}

fn check_questions(
    field: &str,
    questions: &[Question],
    expectations: &QualityExpectations,
    issues: &mut Vec<String>,
) {
    for question in questions {
        let label = format!("{field}.{}", question.id());
        require_non_empty_text(&format!("{label}.prompt"), question.prompt(), issues);
        if question.prompt().contains('\n') {
            issues.push(format!("{label}.prompt: must be single-line"));
        }

        match question {
            Question::Mcq { options, .. } => {
                require_all_non_empty(&format!("{label}.options"), options, issues);
                require_min_len(
                    &format!("{label}.options"),
                    options.len(),
                    expectations.min_mcq_options,
                    issues,
                );
            }
            Question::Slider { scale, .. } => {
                if scale.min >= scale.max {
                    issues.push(format!("{label}.scale: min must be below max"));
                }
                require_non_empty_text(&format!("{label}.scale.min_label"), &scale.min_label, issues);
                require_non_empty_text(&format!("{label}.scale.max_label"), &scale.max_label, issues);
            }
            Question::Rating { .. } => {}
            Question::Text { placeholder, .. } => {
                require_non_empty_text(&format!("{label}.placeholder"), placeholder, issues);
            }
        }
    }
}

fn require_non_empty_text(field: &str, value: &str, issues: &mut Vec<String>) {
    if value.trim().is_empty() {
        issues.push(format!("{field}: must be non-empty"));
    }
}

fn require_all_non_empty(field: &str, values: &[String], issues: &mut Vec<String>) {
    for (index, value) in values.iter().enumerate() {
        if value.trim().is_empty() {
            issues.push(format!("{field}[{index}]: must be non-empty"));
        }
    }
}

fn require_min_len(
    field: &str,
    actual: usize,
    expected_min: Option<usize>,
    issues: &mut Vec<String>,
) {
    if let Some(expected_min) = expected_min
        && actual < expected_min
    {
        issues.push(format!(
            "{field}: expected at least {expected_min} items, got {actual}"
        ));
    }
}

#[cfg(test)]
mod tests {
    use quest_content::llm::fallback::{fallback_gate, fallback_part2};

    use super::evaluate_quality;
    use crate::case::QualityExpectations;
    use crate::engine::ResolvedContent;

    #[test]
    fn fallback_content_meets_quality_floor() {
        let expectations = QualityExpectations {
            min_mcq_options: Some(2),
            min_info_dialog_lines: Some(3),
            min_dragon_resources: Some(4),
            info_mentions_option: true,
            ..QualityExpectations::default()
        };

        let gate = ResolvedContent::Gate(fallback_gate("Digital Design", false));
        assert!(evaluate_quality(&gate, &expectations, Some("Digital Design")).is_empty());

        let part2 = ResolvedContent::Part2(fallback_part2(true));
        assert!(evaluate_quality(&part2, &expectations, None).is_empty());
    }

    #[test]
    fn reports_missing_option_mention_and_short_lists() {
        let expectations = QualityExpectations {
            min_dragon_resources: Some(5),
            info_mentions_option: true,
            ..QualityExpectations::default()
        };

        let gate = ResolvedContent::Gate(fallback_gate("Digital Design", false));
        let issues = evaluate_quality(&gate, &expectations, Some("Marine Biology"));
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("dragon.resources"));
        assert!(issues[1].contains("Marine Biology"));
    }
}
