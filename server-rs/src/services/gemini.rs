use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::AiConfig;
use crate::models::ClubSummary;
use crate::services::suggestion::{ModelError, Suggestion, SuggestionModel};

/// Thin client for the Gemini `generateContent` REST endpoint, asking for a
/// JSON answer shaped like [`Suggestion`].
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(config: &AiConfig) -> Option<Self> {
        if config.api_key.is_empty() {
            return None;
        }
        Some(Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        })
    }
}

pub fn build_prompt(interest: &str, clubs: &[ClubSummary]) -> String {
    let listing = clubs
        .iter()
        .enumerate()
        .map(|(i, c)| {
            format!(
                "{}. {} [{}] ({} members, {} events): {}",
                i + 1,
                c.name,
                c.category,
                c.member_count,
                c.event_count,
                c.description.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You help students find a club to join.\n\
         A student is interested in: \"{interest}\"\n\n\
         Active clubs:\n{listing}\n\n\
         Pick the single best club from the list above. Use its exact name as clubName \
         and explain the fit in one or two friendly sentences as reason."
    )
}

fn request_body(prompt: &str) -> Value {
    json!({
        "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "clubName": { "type": "STRING" },
                    "reason": { "type": "STRING" }
                },
                "required": ["clubName", "reason"]
            }
        }
    })
}

fn parse_response(body: &Value) -> Result<Suggestion, ModelError> {
    let text = body["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .ok_or_else(|| ModelError::Malformed("no candidate text".into()))?;
    serde_json::from_str(text).map_err(|e| ModelError::Malformed(e.to_string()))
}

#[async_trait]
impl SuggestionModel for GeminiClient {
    async fn suggest(
        &self,
        interest: &str,
        clubs: &[ClubSummary],
    ) -> Result<Suggestion, ModelError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(&build_prompt(interest, clubs)))
            .send()
            .await?;

        let status = resp.status();
        let body: Value = resp.json().await?;

        if !status.is_success() {
            let message = body["error"]["message"]
                .as_str()
                .unwrap_or("Unknown Gemini error")
                .to_string();
            return Err(ModelError::Status {
                status: status.as_u16(),
                message,
            });
        }
        parse_response(&body)
    }
}
