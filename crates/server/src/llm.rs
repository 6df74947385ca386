//! JSON-mode chat completions for reflections and personalised suggestions.
//!
//! Every call is a single stateless request. Callers treat any error as
//! "no AI output" and carry on.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::db::entries::JournalEntry;

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response had no message content")]
    EmptyResponse,
    #[error("response was not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a system + user prompt and parse the reply as a JSON object.
    async fn complete_json(&self, system: &str, user: &str) -> Result<Value, LlmError>;
}

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: SecretString,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: SecretString, model: String) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            api_key,
            model,
        })
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete_json(&self, system: &str, user: &str) -> Result<Value, LlmError> {
        let body = json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .http
            .post(OPENAI_CHAT_URL)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        Ok(serde_json::from_str(&content)?)
    }
}

/// Reflection written back onto a journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFeedback {
    pub feedback: String,
    #[serde(default)]
    pub developmental_insight: Option<String>,
}

const FEEDBACK_SYSTEM_PROMPT: &str = "You are a supportive parenting coach. Read the parent's \
journal entry and reply with a JSON object with keys `feedback` (two to four encouraging, \
practical sentences) and `developmental_insight` (one sentence about the child's development, \
or null).";

pub fn feedback_prompt(entry: &JournalEntry, child_age_months: Option<u32>) -> String {
    let mut prompt = String::new();
    if let Some(title) = &entry.title {
        prompt.push_str(&format!("Title: {title}\n"));
    }
    if let Some(mood) = entry.mood {
        prompt.push_str(&format!("Parent's mood: {}\n", mood));
    }
    if let Some(months) = child_age_months {
        prompt.push_str(&format!("Child's age: {months} months\n"));
    }
    prompt.push_str("Entry:\n");
    prompt.push_str(&entry.content);
    prompt
}

/// Ask for a reflection on `entry`; `None` on any failure.
pub async fn generate_entry_feedback(
    llm: &dyn LlmClient,
    entry: &JournalEntry,
    child_age_months: Option<u32>,
) -> Option<EntryFeedback> {
    let prompt = feedback_prompt(entry, child_age_months);
    let value = match llm.complete_json(FEEDBACK_SYSTEM_PROMPT, &prompt).await {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(?error, entry_id = %entry.id, "feedback generation failed");
            return None;
        }
    };

    match serde_json::from_value::<EntryFeedback>(value) {
        Ok(feedback) if !feedback.feedback.trim().is_empty() => Some(feedback),
        Ok(_) => None,
        Err(error) => {
            tracing::warn!(?error, entry_id = %entry.id, "feedback response had unexpected shape");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;
    use crate::{analytics::tests::entry_at, mood::Mood};

    struct CannedLlm {
        reply: Mutex<Option<Result<Value, LlmError>>>,
    }

    impl CannedLlm {
        fn replying(reply: Result<Value, LlmError>) -> Self {
            Self {
                reply: Mutex::new(Some(reply)),
            }
        }
    }

    #[async_trait]
    impl LlmClient for CannedLlm {
        async fn complete_json(&self, _system: &str, _user: &str) -> Result<Value, LlmError> {
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    #[tokio::test]
    async fn test_feedback_parsed_from_json() {
        let llm = CannedLlm::replying(Ok(json!({
            "feedback": "You stayed calm under pressure.",
            "developmental_insight": "Testing limits is typical at this age."
        })));
        let entry = entry_at(Utc::now(), Some(Mood::Tired));
        let feedback = generate_entry_feedback(&llm, &entry, Some(30)).await.unwrap();
        assert_eq!(feedback.feedback, "You stayed calm under pressure.");
        assert!(feedback.developmental_insight.is_some());
    }

    #[tokio::test]
    async fn test_feedback_degrades_to_none() {
        let entry = entry_at(Utc::now(), None);

        let failing = CannedLlm::replying(Err(LlmError::EmptyResponse));
        assert!(generate_entry_feedback(&failing, &entry, None).await.is_none());

        let wrong_shape = CannedLlm::replying(Ok(json!({ "text": "hi" })));
        assert!(generate_entry_feedback(&wrong_shape, &entry, None).await.is_none());
    }

    #[test]
    fn test_feedback_prompt_includes_context() {
        let mut entry = entry_at(Utc::now(), Some(Mood::Proud));
        entry.title = Some("First steps".to_string());
        let prompt = feedback_prompt(&entry, Some(11));
        assert!(prompt.contains("Title: First steps"));
        assert!(prompt.contains("Parent's mood: proud"));
        assert!(prompt.contains("11 months"));
        assert!(prompt.ends_with("We built a pillow fort"));
    }
}
