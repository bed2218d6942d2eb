use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Trait representing a model that can answer with JSON constrained by a schema.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }

    /// Send a prompt together with the response schema and return the raw response text.
    async fn send_structured(&self, prompt: &str, response_schema: &Value) -> Result<String>;
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider returning a canned answer and counting how often it was asked.
    pub struct CannedProvider {
        reply: std::result::Result<String, String>,
        calls: AtomicUsize,
        pub last_prompt: Mutex<Option<String>>,
    }

    impl CannedProvider {
        pub fn ok(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                reply: Err(message.to_string()),
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LLMProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn send_structured(&self, prompt: &str, _response_schema: &Value) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }
}
