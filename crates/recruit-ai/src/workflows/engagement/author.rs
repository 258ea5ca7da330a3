use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::notify::{AuthoringRequest, MessageAuthor, NotifyError};
use super::templates::EngagementMessage;
use crate::config::AuthorConfig;

/// Message author backed by any OpenAI-compatible chat completions endpoint
/// (Groq by default).
pub struct OpenAiCompatibleAuthor {
    client: reqwest::blocking::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatibleAuthor {
    pub fn new(config: &AuthorConfig) -> Result<Self, NotifyError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| NotifyError::Transport(format!("http client: {err}")))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

impl std::fmt::Debug for OpenAiCompatibleAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleAuthor")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

impl MessageAuthor for OpenAiCompatibleAuthor {
    fn generate_message(
        &self,
        request: &AuthoringRequest,
    ) -> Result<EngagementMessage, NotifyError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": build_prompt(request) }],
            "temperature": 0.7,
            "max_tokens": 300,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|err| NotifyError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Authoring(format!(
                "completion endpoint returned {status}"
            )));
        }

        let completion: ChatCompletion = response
            .json()
            .map_err(|err| NotifyError::Authoring(format!("invalid completion payload: {err}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| NotifyError::Authoring("completion had no content".to_string()))?;

        parse_authored_message(&content)
    }
}

fn build_prompt(request: &AuthoringRequest) -> String {
    let AuthoringRequest {
        name,
        role,
        day_number,
        company,
    } = request;

    format!(
        "You are a friendly HR buddy writing engaging emails to candidates during their 90-day notice period.\n\n\
Candidate Info:\n- Name: {name} (use first name only)\n- Role: {role}\n- Company: {company}\n- Day: {day_number}/90\n\n\
Tone Guide by Day:\n- Day 1-7: Celebratory! Welcome them warmly\n- Day 8-30: Helpful - share docs, blog, team culture\n\
- Day 31-60: Exciting - tech stack, projects, perks\n- Day 61-85: Practical - logistics, equipment, documents\n\
- Day 86-90: Final countdown - Day 1 prep, excitement\n\n\
Rules:\n1. Start with \"Subject: \" on first line\n2. Keep body under 100 words\n3. Be warm and personal, not corporate\n\
4. Use 1-2 relevant emojis\n5. End with \"{company} Team\"\n6. Ask ONE engaging question to encourage reply\n"
    )
}

/// First line is the subject (with an optional `Subject:` prefix); the body is every
/// remaining non-blank line.
fn parse_authored_message(content: &str) -> Result<EngagementMessage, NotifyError> {
    let mut lines = content.trim().lines();
    let subject = lines
        .next()
        .map(|line| line.trim().trim_start_matches("Subject:").trim().to_string())
        .unwrap_or_default();
    let body = lines
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    if subject.is_empty() || body.is_empty() {
        return Err(NotifyError::Authoring(
            "completion did not contain a subject and body".to_string(),
        ));
    }

    Ok(EngagementMessage { subject, body })
}
