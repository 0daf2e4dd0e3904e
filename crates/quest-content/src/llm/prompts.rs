use serde_json::Value;
use sha2::{Digest, Sha256};

use super::contracts::{ContentKind, PART1_DISTRIBUTION, PART2_DISTRIBUTION, QuestionType};
use super::safety::{sanitize_context_payload, sanitize_untrusted_text};
use crate::models::{AnalysisRequest, GateRequest, OptionsKind, Part1Request, Part2Request};

/// Sent as the system message for every content kind.
pub const SYSTEM_RULES: &str = "You are the content engine for a game-like career guidance application called 'Career Quest Map'. \
Return valid JSON only. Do not include any extra text, markdown, comments, or code fences. \
All strings must be safe for a game UI: avoid emojis, avoid newlines inside strings, avoid tabs, keep concise. \
Do not invent precise real-world statistics. If asked about salary/employment, use safe ranges or qualitative phrasing. \
Follow the requested schema exactly and obey counts and constraints.";

/// The four parts of a per-call instruction, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPrompt {
    pub kind: ContentKind,
    pub task: String,
    pub context_lines: Vec<String>,
    pub hard_rules: Vec<String>,
    pub schema_hint: String,
}

impl ContentPrompt {
    pub fn render(&self) -> String {
        build_prompt(
            &self.task,
            &self.context_lines,
            &self.hard_rules,
            &self.schema_hint,
        )
    }

    /// Stable hex digest of the rendered instruction, usable as a cache key.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.render().as_bytes());
        digest
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect::<String>()
    }
}

pub fn build_prompt(
    task: &str,
    context_lines: &[String],
    hard_rules: &[String],
    schema_hint: &str,
) -> String {
    let context = context_lines.join("\n");
    let rules = hard_rules
        .iter()
        .map(|rule| format!("- {rule}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Task:\n{task}\n\nContext:\n{}\n\nHard rules:\n{}\n\nSchema:\n{schema_hint}\n",
        context.trim(),
        rules.trim()
    )
}

/// Rules pinning each question id to its type, plus id sequencing.
pub fn distribution_rules(distribution: &[QuestionType]) -> Vec<String> {
    let mut rules = distribution
        .iter()
        .enumerate()
        .map(|(index, question_type)| {
            format!(
                "Question id \"q{}\" must be type \"{}\".",
                index + 1,
                question_type.as_str()
            )
        })
        .collect::<Vec<_>>();
    rules.push("Question IDs must be sequential and unique (q1..qN).".to_string());
    rules.push("Keep each prompt concise and single-line.".to_string());
    rules.push("For questions: MCQ options must be 4 options (short).".to_string());
    rules
}

pub fn part1_prompt(request: &Part1Request) -> ContentPrompt {
    let poly_course = request
        .poly_course
        .as_deref()
        .map(sanitize_untrusted_text)
        .unwrap_or_default();

    let context_lines = lines(&[
        format!("education_status: {}", request.education_status).as_str(),
        format!("poly_course_of_study: {poly_course}").as_str(),
        "Part 1 topic focus:",
        "- If Secondary School or JC: general career curiosity, interests, passions, personality, preferred activities.",
        "- If Poly: difficulty with current course, frustrations, other passions/interests, motivation, preferred learning style.",
        "Question quality goal:",
        "- Questions should feel meaningful, reflective, and easy to answer honestly.",
        "- Help the student discover patterns in interests, strengths, and learning preferences.",
    ]);

    let mut hard_rules = lines(&[
        "Output JSON only.",
        "Exactly 5 questions.",
        "Questions must be sequential and feel like a natural progression (broad -> specific).",
        "Do not repeat the same theme twice.",
        "Do not mention brand names, paid-only tools, or sensitive personal data.",
    ]);
    hard_rules.extend(distribution_rules(&PART1_DISTRIBUTION));
    hard_rules.extend(lines(&[
        "For slider: scale min=0 max=10 and provide meaningful min_label and max_label.",
        "For rating: scale min=1 max=5.",
        "For text: include a short placeholder.",
        "Each question must test a distinct dimension: interest, motivation, confidence, preferred style, or values.",
        "Use plain language suitable for teenagers and young adults.",
        "Avoid vague prompts. Prefer concrete, relatable scenarios.",
        "MCQ options must be balanced and plausible, not obviously right or wrong.",
    ]));

    ContentPrompt {
        kind: ContentKind::Part1,
        task: "Generate Part 1: exactly 5 sequential questions for the House.".to_string(),
        context_lines,
        hard_rules,
        schema_hint: part1_schema_hint(),
    }
}

pub fn part2_prompt(request: &Part2Request) -> ContentPrompt {
    let is_poly = request.is_poly();
    let answers = compact_json(&request.part1_answers);

    let context_lines = lines(&[
        format!("education_status: {}", request.education_status).as_str(),
        format!("part1_answers_json: {answers}").as_str(),
        "Inference requirement:",
        "- Use Part 1 answers to infer exactly 3 potential fields of interest.",
        "- Then ask 12 questions that narrow among those fields.",
        "Question strategy:",
        "- Early questions compare fields; later questions go deeper into preferences, strengths, and day-to-day tasks.",
        "- Questions should reveal trade-offs and help the student make an informed direction choice.",
    ]);

    let mut hard_rules = lines(&[
        "Output JSON only.",
        "inferred_fields must contain exactly 3 distinct fields, each 1-3 words (e.g., 'Software', 'Design', 'Business').",
        "questions must contain exactly 12 questions.",
        "All 12 questions must relate to the inferred fields and help narrow interest.",
        "Keep questions appropriate to the user's education level.",
        "Do not include real statistics. Keep any outlook language qualitative.",
    ]);
    hard_rules.extend(distribution_rules(&PART2_DISTRIBUTION));
    hard_rules.extend(lines(&[
        "For slider: scale min=0 max=10 and provide meaningful labels.",
        "For rating: scale min=1 max=5.",
        "For text: include a short placeholder.",
    ]));
    if is_poly {
        hard_rules.extend(lines(&[
            "If education_status is Poly: poly_extra_question must be present as an MCQ with options Work and Go to uni.",
            "poly_extra_question options must be exactly: [\"Work\",\"Go to uni\"] (2 options).",
        ]));
    } else {
        hard_rules.push(
            "If education_status is not Poly: poly_extra_question must be null.".to_string(),
        );
    }
    hard_rules.extend(lines(&[
        "Each question should discriminate between at least two inferred fields.",
        "Avoid repeating near-duplicate prompts with different wording.",
        "Use realistic day-to-day scenarios (projects, teamwork, problem types, work environment).",
        "Text questions should invite short reflection on reasons, not one-word answers.",
        "MCQ options must represent meaningful trade-offs aligned to inferred fields.",
    ]));

    ContentPrompt {
        kind: ContentKind::Part2,
        task: "Generate Part 2: infer 3 potential fields and ask 12 sequential narrowing questions for the Wise Man.".to_string(),
        context_lines,
        hard_rules,
        schema_hint: part2_schema_hint(is_poly),
    }
}

pub fn analysis_prompt(request: &AnalysisRequest) -> ContentPrompt {
    let options_kind = request.options_kind();
    let poly_path_choice = request
        .poly_path_choice
        .map(|choice| choice.as_str())
        .unwrap_or_default();

    let context_lines = lines(&[
        format!("education_status: {}", request.education_status).as_str(),
        format!("poly_path_choice: {poly_path_choice}").as_str(),
        format!("inferred_fields: {}", compact_json(&request.inferred_fields)).as_str(),
        format!("part2_answers_json: {}", compact_json(&request.part2_answers)).as_str(),
        "Output tone:",
        "- Fantasy-lite, like a wise man advising a young explorer. Keep lines short.",
        "Outcome goal:",
        "- Give the student clarity, confidence, and concrete next steps.",
    ]);

    let hard_rules = lines(&[
        "Output JSON only.",
        "strength_tags: exactly 3 (use clear single-word or short-phrase tags).",
        "work_style_tags: 2 to 4 items.",
        "feedback_lines: 2 to 5 short lines.",
        "suggested_options: exactly 3.",
        format!(
            "suggested_options must be specific {}. For courses use names like 'Computer Engineering', 'Business Management'. For careers use roles like 'Junior Data Analyst', 'Mobile App Developer'.",
            options_kind.as_str()
        ).as_str(),
        "Do not output generic options like 'Engineering' or 'IT'. Be specific.",
        "Avoid precise statistics.",
        "Feedback lines must be insightful: each line should include an observation and a practical next step.",
        "Feedback should reflect patterns from provided answers, not generic advice.",
        "Keep language encouraging but realistic; avoid exaggerated promises.",
        "Suggested options should be coherent with inferred fields and work-style signals.",
    ]);

    ContentPrompt {
        kind: ContentKind::Analysis,
        task: "Produce analysis: strength tags, work style tags, short feedback lines, and 3 suggested options.".to_string(),
        context_lines,
        hard_rules,
        schema_hint: analysis_schema_hint(options_kind),
    }
}

pub fn gate_prompt(request: &GateRequest) -> ContentPrompt {
    let option_name = sanitize_untrusted_text(&request.option_name);
    let education_status = request
        .education_status
        .map(|status| status.as_str())
        .unwrap_or_default();
    let poly_path_choice = request
        .poly_path_choice
        .map(|choice| choice.as_str())
        .unwrap_or_default();

    let context_lines = lines(&[
        format!("option_name: {option_name}").as_str(),
        format!("work_path: {}", if request.work_path { "True" } else { "False" }).as_str(),
        format!("education_status: {education_status}").as_str(),
        format!("poly_path_choice: {poly_path_choice}").as_str(),
        "Scene requirements:",
        "- Wise man explains: subjects to study, employment outlook (safe wording), impact on people.",
        "- Then the player can choose Yes/No (UI handles this).",
        "- If Yes: dragon warrior provides a 1-week micro quest, 1-month mini project, and resources.",
        "Feasibility constraint:",
        "- Quests must be feasible for Secondary School, JC, and Poly students (no expensive equipment).",
        "Tone:",
        "- Fantasy-lite, short dialog lines.",
        "Quality goal:",
        "- Guidance should feel practical, specific, and motivating for a student deciding their next step.",
    ]);

    let mut hard_rules = lines(&[
        "Output JSON only.",
        "info_dialog_lines must be 3 to 7 short lines.",
        "info_dialog_lines must include: subjects to study, employment outlook in safe wording, impact on people.",
        "Do not assume paid-only services.",
        "Do not include precise statistics.",
        "Micro quest: 1 week, 5-7 short sessions (<=60 min each), very beginner-friendly and clearly step-by-step, ending with one tangible output.",
        "Mini project: 1 month with 3 phases (Plan, Build, Review) ending with a showable deliverable; must stay beginner-friendly with clear task scope and outputs.",
        "Both micro quest and mini project must use free tools and no expensive equipment.",
        "dragon.resources must include exactly 4 free or commonly accessible items: official docs/reference, beginner tutorial/course, example project/template, community/forum.",
        "info_dialog_lines should mention what the student will learn, how they might apply it, and why it matters.",
        "Avoid vague claims like 'many opportunities'; use clearer but still safe wording.",
    ]);
    if request.work_path {
        hard_rules.extend(lines(&[
            "Include work_style_line (1 short line).",
            "Include salary_outlook_line using safe ranges or qualitative phrasing for a poly fresh graduate.",
            "Salary line must avoid exact single numbers; use ranges or qualitative phrasing.",
        ]));
    } else {
        hard_rules
            .push("Do not include work_style_line or salary_outlook_line.".to_string());
    }

    ContentPrompt {
        kind: ContentKind::Gate,
        task: "Generate gate scene content for the chosen option.".to_string(),
        context_lines,
        hard_rules,
        schema_hint: gate_schema_hint(request.work_path),
    }
}

pub fn question_schema_hint() -> &'static str {
    "Question schema (use only one per question depending on type):\n\
- MCQ:\n  {\"id\":\"q1\",\"type\":\"mcq\",\"prompt\":\"...\",\"options\":[\"...\",\"...\",\"...\",\"...\"]}\n\
- Slider:\n  {\"id\":\"q2\",\"type\":\"slider\",\"prompt\":\"...\",\"scale\":{\"min\":0,\"max\":10,\"min_label\":\"...\",\"max_label\":\"...\"}}\n\
- Rating:\n  {\"id\":\"q3\",\"type\":\"rating\",\"prompt\":\"...\",\"scale\":{\"min\":1,\"max\":5}}\n\
- Text:\n  {\"id\":\"q4\",\"type\":\"text\",\"prompt\":\"...\",\"placeholder\":\"...\"}\n\
Notes:\n\
- Do not add extra keys.\n\
- Prompts must be sequential (q1..qN)."
}

fn part1_schema_hint() -> String {
    format!(
        "Schema A JSON:\n{{\n  \"questions\": [\n    /* exactly 5 questions following the Question schema */\n  ]\n}}\n\n{}",
        question_schema_hint()
    )
}

fn part2_schema_hint(is_poly: bool) -> String {
    let extra = if is_poly {
        "\"poly_extra_question\":{\"id\":\"poly_path\",\"type\":\"mcq\",\"prompt\":\"...\",\"options\":[\"Work\",\"Go to uni\"]}"
    } else {
        "\"poly_extra_question\":null"
    };

    format!(
        "Schema B JSON:\n{{\n  \"inferred_fields\": [\"field1\",\"field2\",\"field3\"],\n  \"questions\": [\n    /* exactly 12 questions following the Question schema */\n  ],\n  {extra}\n}}\n\n{}",
        question_schema_hint()
    )
}

fn analysis_schema_hint(options_kind: OptionsKind) -> String {
    format!(
        "Schema C JSON:\n{{\n  \"strength_tags\": [\"...\",\"...\",\"...\"],\n  \"work_style_tags\": [\"...\",\"...\",\"...\"],\n  \"feedback_lines\": [\"...\",\"...\"],\n  \"suggested_options\": [\"...\",\"...\",\"...\"]\n}}\n\
Rules:\n\
- strength_tags: exactly 3 lines with meaningful reasons\n\
- work_style_tags: 2 to 4 lines with meaningful insights\n\
- feedback_lines: 2 to 5 lines with realistic and impactful feedback\n\
- suggested_options: exactly 3\n\
- suggested_options must be {} (specific names, not generic categories)",
        options_kind.as_str()
    )
}

fn gate_schema_hint(work_path: bool) -> String {
    let work_lines = if work_path {
        "  \"work_style_line\": \"...\",\n  \"salary_outlook_line\": \"...\",\n"
    } else {
        ""
    };
    let work_rules = if work_path {
        "\n- work_style_line must describe typical work style in that industry\n\
- salary_outlook_line must be a safe range or qualitative phrasing for a poly fresh graduate"
    } else {
        ""
    };

    format!(
        "Schema D JSON:\n{{\n  \"info_dialog_lines\": [\"...\",\"...\",\"...\"],\n{work_lines}  \"dragon\": {{\n    \"micro_quest_1_week\": \"...\",\n    \"mini_project_1_month\": \"...\",\n    \"resources\": [\"...\",\"...\",\"...\",\"...\"]\n  }}\n}}\n\
Rules:\n\
- info_dialog_lines must include: subjects to study with real online resources, employment outlook in safe wording, impact on people{work_rules}"
    )
}

fn compact_json<T: serde::Serialize>(value: &T) -> String {
    let raw = serde_json::to_value(value).unwrap_or(Value::Null);
    sanitize_context_payload(&raw).to_string()
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}
