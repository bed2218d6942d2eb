use log::{error, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::auth::AccessToken;
use crate::config::FormsConfig;
use crate::error::FormGenieError;
use crate::schema::{FormSchema, Question, QuestionType};

/// Body of `POST /forms`. The API only accepts the title at creation time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateFormRequest {
    pub info: FormInfo,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedForm {
    pub form_id: String,
    pub responder_uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchUpdateRequest {
    pub requests: Vec<Request>,
}

/// One mutation in a `batchUpdate` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Request {
    UpdateFormInfo(UpdateFormInfo),
    CreateItem(CreateItem),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFormInfo {
    pub info: FormInfo,
    pub update_mask: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateItem {
    pub item: Item,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub title: String,
    pub question_item: QuestionItem,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionItem {
    pub question: RemoteQuestion,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteQuestion {
    pub required: bool,
    #[serde(flatten)]
    pub kind: RemoteQuestionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RemoteQuestionKind {
    ChoiceQuestion(ChoiceQuestion),
    TextQuestion(TextQuestion),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceQuestion {
    #[serde(rename = "type")]
    pub choice_type: ChoiceType,
    pub options: Vec<ChoiceOption>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChoiceType {
    Radio,
    Checkbox,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChoiceOption {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextQuestion {
    pub paragraph: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetails>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    message: Option<String>,
}

/// Remote item for a question, or `None` when the type has no remote counterpart.
fn question_kind(question: &Question) -> Option<RemoteQuestionKind> {
    let choice = |choice_type| {
        RemoteQuestionKind::ChoiceQuestion(ChoiceQuestion {
            choice_type,
            options: question
                .choice_options()
                .iter()
                .map(|value| ChoiceOption { value: value.clone() })
                .collect(),
        })
    };

    match &question.kind {
        QuestionType::MultipleChoice => Some(choice(ChoiceType::Radio)),
        QuestionType::Checkbox => Some(choice(ChoiceType::Checkbox)),
        QuestionType::ShortAnswer => Some(text(false)),
        QuestionType::LongAnswer => Some(text(true)),
        QuestionType::Unsupported(_) => None,
    }
}

fn text(paragraph: bool) -> RemoteQuestionKind {
    RemoteQuestionKind::TextQuestion(TextQuestion { paragraph })
}

/// Build the ordered `batchUpdate` payload for a schema.
///
/// The description update, when present, always comes first. Item indices are
/// assigned after unsupported questions are dropped, so they run 0, 1, 2, ...
/// with no gaps and follow schema order.
pub fn build_requests(schema: &FormSchema) -> Vec<Request> {
    let description = schema.description().map(|description| {
        Request::UpdateFormInfo(UpdateFormInfo {
            info: FormInfo {
                description: Some(description.to_string()),
                ..FormInfo::default()
            },
            update_mask: "description".to_string(),
        })
    });

    let items = schema
        .questions
        .iter()
        .filter_map(|question| question_kind(question).map(|kind| (question, kind)))
        .enumerate()
        .map(|(index, (question, kind))| {
            Request::CreateItem(CreateItem {
                item: Item {
                    title: question.text.clone(),
                    question_item: QuestionItem {
                        question: RemoteQuestion {
                            required: question.is_required,
                            kind,
                        },
                    },
                },
                location: Location { index },
            })
        });

    description.into_iter().chain(items).collect()
}

/// Result of the two-phase publish. Creation and population are separate remote
/// calls with no rollback, so a half-finished form is its own outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PublishOutcome {
    /// The form exists and carries every supported question.
    Published {
        form_id: String,
        responder_uri: String,
        requests_applied: usize,
    },
    /// The blank form exists remotely but populating it failed. It is not deleted.
    CreatedNotPopulated {
        form_id: String,
        responder_uri: String,
        error: FormGenieError,
    },
    /// Nothing was created.
    NotCreated { error: FormGenieError },
}

impl PublishOutcome {
    pub fn responder_uri(&self) -> Option<&str> {
        match self {
            PublishOutcome::Published { responder_uri, .. }
            | PublishOutcome::CreatedNotPopulated { responder_uri, .. } => Some(responder_uri),
            PublishOutcome::NotCreated { .. } => None,
        }
    }

    /// Collapse to the simple contract: the responder URL or a remote error.
    pub fn into_result(self) -> Result<String, FormGenieError> {
        match self {
            PublishOutcome::Published { responder_uri, .. } => Ok(responder_uri),
            PublishOutcome::CreatedNotPopulated { error, .. }
            | PublishOutcome::NotCreated { error } => Err(error),
        }
    }
}

/// Client for the Google Forms v1 REST API.
pub struct FormsClient {
    client: Client,
    base_url: String,
}

impl FormsClient {
    pub fn new(config: &FormsConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Phase one: create a blank form carrying only its title.
    pub async fn create_form(
        &self,
        title: &str,
        token: &AccessToken,
    ) -> Result<CreatedForm, FormGenieError> {
        let body = CreateFormRequest {
            info: FormInfo {
                title: Some(title.to_string()),
                document_title: Some(title.to_string()),
                description: None,
            },
        };

        let response = self
            .client
            .post(format!("{}/forms", self.base_url))
            .bearer_auth(token.secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| FormGenieError::Remote(format!("Google API Error (Create): {}", e)))?;

        if !response.status().is_success() {
            let message = error_message(response, "Failed to create form").await;
            error!("Google Forms create failed: {}", message);
            return Err(FormGenieError::Remote(format!(
                "Google API Error (Create): {}",
                message
            )));
        }

        response.json::<CreatedForm>().await.map_err(|e| {
            FormGenieError::Remote(format!("Google API Error (Create): unexpected response: {}", e))
        })
    }

    /// Phase two: apply all requests in one call.
    pub async fn batch_update(
        &self,
        form_id: &str,
        requests: Vec<Request>,
        token: &AccessToken,
    ) -> Result<(), FormGenieError> {
        let response = self
            .client
            .post(format!("{}/forms/{}:batchUpdate", self.base_url, form_id))
            .bearer_auth(token.secret())
            .json(&BatchUpdateRequest { requests })
            .send()
            .await
            .map_err(|e| FormGenieError::Remote(format!("Google API Error (Update): {}", e)))?;

        if !response.status().is_success() {
            let message = error_message(response, "Failed to update form").await;
            error!("Google Forms batch update failed: {}", message);
            return Err(FormGenieError::Remote(format!(
                "Google API Error (Update): {}",
                message
            )));
        }

        Ok(())
    }

    /// Create the form, then populate it. Never retries and never deletes.
    pub async fn publish(&self, schema: &FormSchema, token: &AccessToken) -> PublishOutcome {
        let created = match self.create_form(&schema.title, token).await {
            Ok(created) => created,
            Err(error) => return PublishOutcome::NotCreated { error },
        };
        info!("Created form {} ({})", created.form_id, created.responder_uri);

        let requests = build_requests(schema);
        let requests_applied = requests.len();
        if requests.is_empty() {
            info!("Form has no description and no supported questions, skipping batch update");
            return PublishOutcome::Published {
                form_id: created.form_id,
                responder_uri: created.responder_uri,
                requests_applied,
            };
        }

        match self.batch_update(&created.form_id, requests, token).await {
            Ok(()) => {
                info!("Applied {} requests to form {}", requests_applied, created.form_id);
                PublishOutcome::Published {
                    form_id: created.form_id,
                    responder_uri: created.responder_uri,
                    requests_applied,
                }
            }
            Err(error) => {
                warn!(
                    "Form {} was created but could not be populated; the blank form remains at {}",
                    created.form_id, created.responder_uri
                );
                PublishOutcome::CreatedNotPopulated {
                    form_id: created.form_id,
                    responder_uri: created.responder_uri,
                    error,
                }
            }
        }
    }
}

async fn error_message(response: reqwest::Response, fallback: &str) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    serde_json::from_str::<ApiErrorBody>(&text)
        .ok()
        .and_then(|body| body.error)
        .and_then(|details| details.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| format!("{} (status {})", fallback, status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn question(kind: &str, text: &str, options: &[&str]) -> Question {
        Question {
            kind: QuestionType::from(kind.to_string()),
            text: text.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            is_required: false,
        }
    }

    fn schema(description: Option<&str>, questions: Vec<Question>) -> FormSchema {
        FormSchema {
            title: "T".to_string(),
            description: description.map(str::to_string),
            questions,
        }
    }

    fn as_json(requests: &[Request]) -> serde_json::Value {
        serde_json::to_value(requests).unwrap()
    }

    #[test]
    fn test_single_short_answer() {
        let requests = build_requests(&schema(None, vec![question("short_answer", "Name?", &[])]));
        assert_eq!(
            as_json(&requests),
            json!([{
                "createItem": {
                    "item": {
                        "title": "Name?",
                        "questionItem": {
                            "question": {"required": false, "textQuestion": {"paragraph": false}}
                        }
                    },
                    "location": {"index": 0}
                }
            }])
        );
    }

    #[test]
    fn test_description_then_checkbox() {
        let requests = build_requests(&schema(
            Some("D"),
            vec![question("checkbox", "Pick", &["A", "B"])],
        ));
        let json = as_json(&requests);
        assert_eq!(requests.len(), 2);
        assert_eq!(
            json[0],
            json!({"updateFormInfo": {"info": {"description": "D"}, "updateMask": "description"}})
        );
        let choice = &json[1]["createItem"]["item"]["questionItem"]["question"]["choiceQuestion"];
        assert_eq!(choice["type"], "CHECKBOX");
        assert_eq!(choice["options"], json!([{"value": "A"}, {"value": "B"}]));
    }

    #[test]
    fn test_choice_and_text_mappings() {
        let mut required = question("multiple_choice", "One", &["x", "x"]);
        required.is_required = true;
        let requests = build_requests(&schema(
            None,
            vec![required, question("long_answer", "Essay", &["ignored"])],
        ));
        let json = as_json(&requests);

        let radio = &json[0]["createItem"]["item"]["questionItem"]["question"];
        assert_eq!(radio["required"], true);
        assert_eq!(radio["choiceQuestion"]["type"], "RADIO");
        assert_eq!(radio["choiceQuestion"]["options"], json!([{"value": "x"}, {"value": "x"}]));

        let text = &json[1]["createItem"]["item"]["questionItem"]["question"];
        assert_eq!(text["textQuestion"]["paragraph"], true);
        assert!(text.get("choiceQuestion").is_none());
    }

    #[test]
    fn test_unsupported_types_leave_no_gaps() {
        let requests = build_requests(&schema(
            Some("D"),
            vec![
                question("dropdown", "Skip me", &["a"]),
                question("short_answer", "First", &[]),
                question("linear_scale", "Skip me too", &[]),
                question("checkbox", "Second", &["a"]),
                question("long_answer", "Third", &[]),
            ],
        ));
        assert_eq!(requests.len(), 4);

        let indices: Vec<usize> = requests
            .iter()
            .filter_map(|r| match r {
                Request::CreateItem(item) => Some(item.location.index),
                Request::UpdateFormInfo(_) => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);

        let titles: Vec<String> = requests
            .iter()
            .filter_map(|r| match r {
                Request::CreateItem(item) => Some(item.item.title.clone()),
                Request::UpdateFormInfo(_) => None,
            })
            .collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_empty_schema_builds_nothing() {
        assert!(build_requests(&schema(None, vec![])).is_empty());
        assert!(build_requests(&schema(Some(""), vec![question("matrix", "Q", &[])])).is_empty());
    }

    fn client(server: &MockServer) -> FormsClient {
        FormsClient::new(&FormsConfig { base_url: server.uri() })
    }

    fn token() -> AccessToken {
        AccessToken::new("ya29.token")
    }

    async fn mount_create(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/forms"))
            .and(header("authorization", "Bearer ya29.token"))
            .and(body_json(json!({"info": {"title": "T", "documentTitle": "T"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "formId": "abc123",
                "responderUri": "https://docs.google.com/forms/d/e/abc123/viewform",
                "info": {"title": "T"}
            })))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_empty_form_makes_one_call() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(path("/forms/abc123:batchUpdate"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let outcome = client(&server).publish(&schema(None, vec![]), &token()).await;
        assert_eq!(
            outcome.into_result().unwrap(),
            "https://docs.google.com/forms/d/e/abc123/viewform"
        );
    }

    #[tokio::test]
    async fn test_description_alone_still_populates() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(method("POST"))
            .and(path("/forms/abc123:batchUpdate"))
            .and(body_json(json!({
                "requests": [{
                    "updateFormInfo": {"info": {"description": "D"}, "updateMask": "description"}
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"replies": [{}]})))
            .expect(1)
            .mount(&server)
            .await;

        let form = schema(Some("D"), vec![question("matrix", "Q", &[])]);
        let outcome = client(&server).publish(&form, &token()).await;
        assert!(matches!(
            outcome,
            PublishOutcome::Published { requests_applied: 1, .. }
        ));
    }

    #[tokio::test]
    async fn test_publish_sends_batch() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        let form = schema(Some("D"), vec![question("checkbox", "Pick", &["A", "B"])]);
        Mock::given(method("POST"))
            .and(path("/forms/abc123:batchUpdate"))
            .and(body_json(json!({"requests": as_json(&build_requests(&form))})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"replies": [{}, {}]})))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).publish(&form, &token()).await;
        assert_eq!(
            outcome,
            PublishOutcome::Published {
                form_id: "abc123".to_string(),
                responder_uri: "https://docs.google.com/forms/d/e/abc123/viewform".to_string(),
                requests_applied: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_create_failure_stops_everything() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/forms"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "The caller does not have permission"}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/forms/abc123:batchUpdate"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let form = schema(None, vec![question("short_answer", "Name?", &[])]);
        let outcome = client(&server).publish(&form, &token()).await;
        assert_eq!(
            outcome,
            PublishOutcome::NotCreated {
                error: FormGenieError::Remote(
                    "Google API Error (Create): The caller does not have permission".to_string()
                ),
            }
        );
    }

    #[tokio::test]
    async fn test_batch_failure_keeps_created_form() {
        let server = MockServer::start().await;
        mount_create(&server).await;
        Mock::given(path("/forms/abc123:batchUpdate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
            .expect(1)
            .mount(&server)
            .await;

        let form = schema(None, vec![question("short_answer", "Name?", &[])]);
        let outcome = client(&server).publish(&form, &token()).await;

        assert_eq!(
            outcome.responder_uri(),
            Some("https://docs.google.com/forms/d/e/abc123/viewform")
        );
        match outcome {
            PublishOutcome::CreatedNotPopulated { form_id, error, .. } => {
                assert_eq!(form_id, "abc123");
                assert!(
                    error
                        .to_string()
                        .starts_with("Google API Error (Update): Failed to update form")
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
