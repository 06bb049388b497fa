use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are an analytics assistant for a restaurant \
dashboard. Answer briefly using the business context provided.";

/// Canned replies used when no LLM key is configured or the remote call
/// fails. Selected by keyword so the demo stays deterministic.
const FALLBACK_REPLIES: [(&str, &str); 4] = [
    (
        "revenue",
        "Revenue questions are best answered from the KPI cards above; compare the current period against the previous one to spot the trend.",
    ),
    (
        "customer",
        "Check the customer analytics chart: it splits each day's customers into new and returning so you can see retention at a glance.",
    ),
    (
        "menu",
        "The top menu items list ranks dishes by revenue over the selected period; gift cards are excluded from the ranking.",
    ),
    (
        "order",
        "The orders view lists recent completed and open orders for the selected period, newest first.",
    ),
];

const FALLBACK_DEFAULT: &str = "The AI assistant is not configured. Set AI_API_KEY \
to enable live answers; meanwhile the dashboard charts cover revenue, orders, \
menu items and customer retention.";

#[derive(Clone)]
pub struct AiService {
    client: Client,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub response: String,
    /// True when the reply came from the canned table rather than the LLM.
    pub fallback: bool,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl AiService {
    pub fn new(api_key: Option<&str>, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.map(str::to_string),
            model: model.to_string(),
        }
    }

    /// Answer a chat message. Falls back to a templated reply when no key is
    /// configured or the remote call fails; the caller can tell which from
    /// `ChatReply::fallback`.
    pub async fn chat(&self, message: &str, context: Option<&str>) -> ChatReply {
        let Some(api_key) = self.api_key.as_deref() else {
            return Self::fallback_reply(message);
        };

        match self.complete(api_key, message, context).await {
            Ok(response) => ChatReply {
                response,
                fallback: false,
            },
            Err(err) => {
                tracing::warn!("AI completion failed, using fallback reply: {}", err);
                Self::fallback_reply(message)
            }
        }
    }

    async fn complete(
        &self,
        api_key: &str,
        message: &str,
        context: Option<&str>,
    ) -> AppResult<String> {
        let user_content = match context {
            Some(context) => format!("{}\n\nBusiness context: {}", message, context),
            None => message.to_string(),
        };
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &user_content,
                },
            ],
        };

        let response = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("AI API error: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalService(format!(
                "AI API error {}: {}",
                status, body
            )));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to parse AI response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| AppError::ExternalService("AI response had no choices".to_string()))
    }

    fn fallback_reply(message: &str) -> ChatReply {
        let lower = message.to_lowercase();
        let response = FALLBACK_REPLIES
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, reply)| *reply)
            .unwrap_or(FALLBACK_DEFAULT);

        ChatReply {
            response: response.to_string(),
            fallback: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_reply_matches_keywords() {
        let reply = AiService::fallback_reply("How is my revenue this week?");
        assert!(reply.fallback);
        assert!(reply.response.contains("KPI"));

        let reply = AiService::fallback_reply("Tell me a joke");
        assert!(reply.fallback);
        assert_eq!(reply.response, FALLBACK_DEFAULT);
    }

    #[tokio::test]
    async fn chat_without_key_uses_fallback() {
        let service = AiService::new(None, "gpt-4o-mini");
        let reply = service.chat("Which menu items sell best?", None).await;
        assert!(reply.fallback);
    }
}
