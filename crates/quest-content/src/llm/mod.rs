pub mod azure;
pub mod contracts;
pub mod engine;
pub mod fallback;
pub mod gateway;
pub mod observability;
pub mod prompts;
pub mod safety;
pub mod validation;

pub use azure::AzureOpenAiGateway;
pub use contracts::{
    AnalysisPayload, ContentContract, ContentKind, DragonQuest, GatePayload, Part1Payload,
    Part2Payload, Question, QuestionType, RatingScale, SliderScale, output_schema,
};
pub use engine::{ContentEngine, ContentError, Generated, GenerationMode};
pub use gateway::{
    ContentGateway, DisabledGateway, GatewayError, GatewayFuture, GatewayRequest,
    GatewayResponse, TokenUsage,
};
pub use observability::ContentSource;
pub use prompts::{ContentPrompt, SYSTEM_RULES, build_prompt};
pub use validation::{
    SchemaViolation, validate_analysis, validate_gate, validate_part1, validate_part2,
};
