use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Kind of a question. Unknown wire values are kept in `Unsupported`
/// so a schema coming back from the model never fails to parse on them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    MultipleChoice,  // one answer from a list
    Checkbox,        // any number of answers from a list
    ShortAnswer,     // single line of free text
    LongAnswer,      // paragraph of free text
    Unsupported(String),
}

impl QuestionType {
    pub const SUPPORTED: [&'static str; 4] =
        ["multiple_choice", "checkbox", "short_answer", "long_answer"];

    pub fn as_str(&self) -> &str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkbox => "checkbox",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::LongAnswer => "long_answer",
            QuestionType::Unsupported(raw) => raw,
        }
    }

    /// Choice questions are the only ones whose options mean anything.
    pub fn is_choice(&self) -> bool {
        matches!(self, QuestionType::MultipleChoice | QuestionType::Checkbox)
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, QuestionType::Unsupported(_))
    }
}

impl From<String> for QuestionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "multiple_choice" => QuestionType::MultipleChoice,
            "checkbox" => QuestionType::Checkbox,
            "short_answer" => QuestionType::ShortAnswer,
            "long_answer" => QuestionType::LongAnswer,
            _ => QuestionType::Unsupported(value),
        }
    }
}

impl From<QuestionType> for String {
    fn from(value: QuestionType) -> Self {
        match value {
            QuestionType::Unsupported(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "type")]
    pub kind: QuestionType,
    pub text: String,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_required: bool,
}

/// Model output may carry an explicit `null` where a field is optional.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Question {
    /// Options of a choice question. Text questions always yield an empty slice.
    pub fn choice_options(&self) -> &[String] {
        if self.kind.is_choice() { &self.options } else { &[] }
    }
}

/// Structured form produced by generation and consumed by preview and publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSchema {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl FormSchema {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Parse a saved schema file. An empty file or a bare `null` holds no form yet.
    pub fn from_saved(json: &str) -> serde_json::Result<Option<Self>> {
        if json.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(json)
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Description worth sending. Only an empty string counts as no description;
    /// whitespace is passed through as written.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().filter(|d| !d.is_empty())
    }

    pub fn supported_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| q.kind.is_supported())
    }

    pub fn unsupported_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|q| !q.kind.is_supported())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> FormSchema {
        FormSchema {
            title: "Course Feedback".to_string(),
            description: Some("Help us improve.".to_string()),
            questions: vec![
                Question {
                    kind: QuestionType::MultipleChoice,
                    text: "Overall rating?".to_string(),
                    options: vec!["Good".to_string(), "Good".to_string(), "Poor".to_string()],
                    is_required: true,
                },
                Question {
                    kind: QuestionType::LongAnswer,
                    text: "Suggestions?".to_string(),
                    options: vec![],
                    is_required: false,
                },
            ],
        }
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let schema = sample();
        let json = schema.to_pretty_json().unwrap();
        let parsed = FormSchema::from_json(&json).unwrap();
        assert_eq!(parsed, schema);
        // duplicate options survive untouched
        assert_eq!(parsed.questions[0].options.len(), 3);
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let schema = FormSchema::from_json(
            r#"{"title":"T","questions":[{"type":"short_answer","text":"Name?"}]}"#,
        )
        .unwrap();
        assert_eq!(schema.description, None);
        assert!(!schema.questions[0].is_required);
        assert!(schema.questions[0].options.is_empty());
    }

    #[test]
    fn test_unknown_type_is_kept_not_rejected() {
        let schema = FormSchema::from_json(
            r#"{"title":"T","questions":[{"type":"rating_scale","text":"Rate"}]}"#,
        )
        .unwrap();
        assert_eq!(
            schema.questions[0].kind,
            QuestionType::Unsupported("rating_scale".to_string())
        );
        assert_eq!(schema.supported_questions().count(), 0);
        assert_eq!(schema.unsupported_questions().count(), 1);

        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["questions"][0]["type"], "rating_scale");
    }

    #[test]
    fn test_only_empty_description_counts_as_absent() {
        let mut schema = sample();
        schema.description = Some(String::new());
        assert_eq!(schema.description(), None);
        schema.description = Some("   ".to_string());
        assert_eq!(schema.description(), Some("   "));
        schema.description = Some("D".to_string());
        assert_eq!(schema.description(), Some("D"));
    }

    #[test]
    fn test_null_options_and_required_fall_back() {
        let schema = FormSchema::from_json(
            r#"{"title":"T","questions":[{"type":"short_answer","text":"Name?","options":null,"is_required":null}]}"#,
        )
        .unwrap();
        assert!(schema.questions[0].options.is_empty());
        assert!(!schema.questions[0].is_required);
    }

    #[test]
    fn test_saved_file_without_form() {
        assert_eq!(FormSchema::from_saved("").unwrap(), None);
        assert_eq!(FormSchema::from_saved(" null\n").unwrap(), None);
        let saved = FormSchema::from_saved(r#"{"title":"T"}"#).unwrap().unwrap();
        assert_eq!(saved.title, "T");
        assert!(FormSchema::from_saved("{").is_err());
    }

    #[test]
    fn test_options_ignored_for_text_questions() {
        let question = Question {
            kind: QuestionType::ShortAnswer,
            text: "Name?".to_string(),
            options: vec!["stray".to_string()],
            is_required: false,
        };
        assert!(question.choice_options().is_empty());
    }

    #[test]
    fn test_missing_title_fails_to_parse() {
        assert!(FormSchema::from_json(r#"{"questions":[]}"#).is_err());
    }
}
