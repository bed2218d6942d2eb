use std::sync::Arc;

use log::{error, info, warn};

use crate::auth::{AccessToken, OAuthClientConfig, TokenResponse};
use crate::error::FormGenieError;
use crate::event_bus::{Event, EventBus, EventEmitter};
use crate::forms::{FormsClient, PublishOutcome};
use crate::generator::{FormGenerator, SAMPLE_TEXT};
use crate::impl_event_emitter;
use crate::schema::FormSchema;

/// State of one generate → preview → publish cycle.
///
/// Generation and publish keep separate error slots and loading flags. The schema
/// and token are only ever replaced whole.
pub struct Session {
    generator: FormGenerator,
    forms: FormsClient,
    oauth: OAuthClientConfig,
    event_bus: Option<Arc<EventBus>>,

    pub raw_text: String,
    pub schema: Option<FormSchema>,
    pub access_token: Option<AccessToken>,
    pub form_url: Option<String>,
    pub last_outcome: Option<PublishOutcome>,
    pub generation_error: Option<FormGenieError>,
    pub publish_error: Option<FormGenieError>,
    pub is_generating: bool,
    pub is_publishing: bool,
}

impl Session {
    pub fn new(generator: FormGenerator, forms: FormsClient, oauth: OAuthClientConfig) -> Self {
        Self {
            generator,
            forms,
            oauth,
            event_bus: None,
            raw_text: String::new(),
            schema: None,
            access_token: None,
            form_url: None,
            last_outcome: None,
            generation_error: None,
            publish_error: None,
            is_generating: false,
            is_publishing: false,
        }
    }

    pub fn oauth(&self) -> &OAuthClientConfig {
        &self.oauth
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.raw_text = text.into();
    }

    pub fn use_sample(&mut self) {
        self.raw_text = SAMPLE_TEXT.to_string();
        self.generation_error = None;
    }

    /// Generate a new schema from `raw_text`, discarding the previous one and any
    /// publish result tied to it.
    pub async fn generate(&mut self) -> Result<&FormSchema, FormGenieError> {
        if self.raw_text.trim().is_empty() {
            let error = FormGenieError::Validation(
                "Please enter some text to generate a form.".to_string(),
            );
            self.generation_error = Some(error.clone());
            return Err(error);
        }

        self.is_generating = true;
        self.generation_error = None;
        self.schema = None;
        self.form_url = None;
        self.last_outcome = None;
        self.publish_error = None;

        let _ = self
            .emit_event(Event::GenerationStarted {
                provider: self.generator.provider_name().to_string(),
                model: self.generator.model_name().to_string(),
            })
            .await;

        let result = self.generator.generate(&self.raw_text).await;
        self.is_generating = false;

        match result {
            Ok(schema) => {
                let _ = self
                    .emit_event(Event::GenerationCompleted {
                        title: schema.title.clone(),
                        questions: schema.questions.len(),
                    })
                    .await;
                Ok(self.schema.insert(schema))
            }
            Err(e) => {
                error!("Error generating form: {}", e);
                let _ = self
                    .emit_event(Event::GenerationFailed { error: e.to_string() })
                    .await;
                self.generation_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Store the outcome of the OAuth token flow.
    pub async fn sign_in(&mut self, response: TokenResponse) -> Result<(), FormGenieError> {
        match response.into_token() {
            Ok(token) => {
                info!("Signed in to Google");
                self.access_token = Some(token);
                self.publish_error = None;
                let _ = self.emit_event(Event::SignedIn).await;
                Ok(())
            }
            Err(e) => {
                let _ = self.emit_event(Event::AuthFailed { error: e.to_string() }).await;
                self.publish_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Publish the current schema with the current token.
    pub async fn publish(&mut self) -> Result<String, FormGenieError> {
        let (Some(schema), Some(token)) = (self.schema.as_ref(), self.access_token.as_ref()) else {
            let error = if self.schema.is_none() {
                FormGenieError::Validation("Generate a form before publishing.".to_string())
            } else {
                FormGenieError::Auth("Sign in with Google before publishing.".to_string())
            };
            self.publish_error = Some(error.clone());
            return Err(error);
        };

        self.is_publishing = true;
        self.publish_error = None;
        self.form_url = None;

        let title = schema.title.clone();
        let _ = self.emit_event(Event::PublishStarted { title }).await;

        let outcome = self.forms.publish(schema, token).await;
        self.is_publishing = false;

        let event = match &outcome {
            PublishOutcome::Published { responder_uri, requests_applied, .. } => {
                Event::PublishCompleted {
                    responder_uri: responder_uri.clone(),
                    requests: *requests_applied,
                }
            }
            PublishOutcome::CreatedNotPopulated { form_id, responder_uri, error } => {
                Event::PublishIncomplete {
                    form_id: form_id.clone(),
                    responder_uri: responder_uri.clone(),
                    error: error.to_string(),
                }
            }
            PublishOutcome::NotCreated { error } => Event::PublishFailed {
                error: error.to_string(),
            },
        };
        let _ = self.emit_event(event).await;

        self.last_outcome = Some(outcome.clone());
        match outcome.into_result() {
            Ok(url) => {
                self.form_url = Some(url.clone());
                Ok(url)
            }
            Err(e) => {
                error!("Failed to create Google Form: {}", e);
                if let Some(uri) = self.last_outcome.as_ref().and_then(|o| o.responder_uri()) {
                    warn!("A blank form was left behind at {}", uri);
                }
                self.publish_error = Some(e.clone());
                Err(e)
            }
        }
    }
}

impl_event_emitter!(Session);
