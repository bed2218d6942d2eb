use std::sync::Arc;

use log::{info, warn};
use serde_json::{Value, json};

use crate::error::{FormGenieError, Result};
use crate::llm_manager::LLMProvider;
use crate::schema::{FormSchema, QuestionType};

/// Survey text offered by `--sample`.
pub const SAMPLE_TEXT: &str = "Student Feedback Survey

Course Name: Introduction to Artificial Intelligence
Please provide your honest feedback to help us improve this course.

1. How would you rate the overall quality of this course?
- Excellent
- Good
- Average
- Poor

2. Which topics did you find most interesting? (Select all that apply)
[ ] Machine Learning Fundamentals
[ ] Natural Language Processing
[ ] Computer Vision
[ ] Reinforcement Learning

3. Please provide any specific suggestions for improving the course content.

4. Your Name (Optional)";

/// Turns free-form text into a `FormSchema` with one structured model call.
pub struct FormGenerator {
    provider: Option<Arc<dyn LLMProvider>>,
    response_schema: Value,
}

impl FormGenerator {
    /// `None` means no credential is configured; every generation then fails with
    /// a configuration error.
    pub fn new(provider: Option<Arc<dyn LLMProvider>>) -> Self {
        Self {
            provider,
            response_schema: form_response_schema(),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.as_deref().map(|p| p.name()).unwrap_or("none")
    }

    pub fn model_name(&self) -> &str {
        self.provider.as_deref().map(|p| p.model_name()).unwrap_or("none")
    }

    pub async fn generate(&self, raw_text: &str) -> Result<FormSchema> {
        if raw_text.trim().is_empty() {
            return Err(FormGenieError::Validation(
                "Input text cannot be empty.".to_string(),
            ));
        }

        let provider = self.provider.as_ref().ok_or_else(|| {
            FormGenieError::Configuration(
                "GEMINI_API_KEY is not configured. Set your Gemini API key in the environment, a .env file or an api file."
                    .to_string(),
            )
        })?;

        info!("Generating form with {} ({})", provider.name(), provider.model_name());
        let prompt = build_prompt(raw_text);
        let response = provider
            .send_structured(&prompt, &self.response_schema)
            .await
            .map_err(|e| FormGenieError::Generation(format!("Failed to generate form: {:#}", e)))?;

        let schema = parse_response(&response)?;

        for question in schema.unsupported_questions() {
            warn!(
                "Question '{}' has unsupported type '{}' and will not be published",
                question.text, question.kind
            );
        }
        info!(
            "Generated form '{}' with {} questions ({} publishable)",
            schema.title,
            schema.questions.len(),
            schema.supported_questions().count()
        );

        Ok(schema)
    }
}

fn parse_response(response: &str) -> Result<FormSchema> {
    let json_text = strip_code_fence(response.trim());
    FormSchema::from_json(json_text)
        .map_err(|e| FormGenieError::Generation(format!("Failed to generate form: {}", e)))
}

/// Models occasionally wrap JSON in a markdown fence even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn build_prompt(raw_text: &str) -> String {
    format!(
        r#"You are an expert AI assistant named FormGenie. Your task is to analyze the following raw text and convert it into a structured JSON format suitable for creating a web form.

Instructions:
1.  Identify a suitable title and an optional description for the form based on the text's content.
2.  Detect all questions within the text.
3.  For each question, accurately classify its type as one of: 'multiple_choice', 'checkbox', 'short_answer', or 'long_answer'.
    - 'multiple_choice': Use for questions where only one answer can be selected from a list (e.g., radio buttons).
    - 'checkbox': Use for questions where multiple answers can be selected.
    - 'short_answer': Use for questions requiring a brief, single-line text response.
    - 'long_answer': Use for questions requiring a detailed, multi-line text response.
4.  Extract all options for 'multiple_choice' and 'checkbox' questions.
5.  Determine if a question seems mandatory and set 'is_required' to true. Default to false if unsure.
6.  Return a single, valid JSON object that strictly adheres to the provided schema.

Raw text to analyze:
---
{}
---"#,
        raw_text
    )
}

/// Response schema in the OpenAPI subset accepted by Gemini structured output.
pub fn form_response_schema() -> Value {
    let kinds = QuestionType::SUPPORTED;
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "A concise title for the form."
            },
            "description": {
                "type": "STRING",
                "description": "An optional brief description or instructions for the form."
            },
            "questions": {
                "type": "ARRAY",
                "description": "A list of all questions identified in the text.",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "type": {
                            "type": "STRING",
                            "description": "The type of question. Must be one of: 'multiple_choice', 'checkbox', 'short_answer', 'long_answer'.",
                            "enum": kinds
                        },
                        "text": {
                            "type": "STRING",
                            "description": "The full text of the question."
                        },
                        "options": {
                            "type": "ARRAY",
                            "description": "A list of options for multiple_choice or checkbox questions. Should be empty for other types.",
                            "items": {"type": "STRING"}
                        },
                        "is_required": {
                            "type": "BOOLEAN",
                            "description": "Whether the question is mandatory. Defaults to false."
                        }
                    },
                    "required": ["type", "text"]
                }
            }
        },
        "required": ["title", "questions"]
    })
}
