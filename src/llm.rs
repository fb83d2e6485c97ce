use crate::config::Settings;
use crate::error::{AnalystError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

const SYSTEM_PROMPT: &str = "You are a careful data analyst. Answer only from the dataset \
context you are given. If the context does not contain the answer, say so.";

/// Base delay between retries; doubled after every failed attempt
const RETRY_BACKOFF_MS: u64 = 500;

/// Text generation backend used by the assistant
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat-completions client
pub struct LlmClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

impl LlmClient {
    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalystError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            max_retries,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = settings.llm_api_key.clone().ok_or_else(|| {
            AnalystError::Config("LLM_API_KEY (or OPENAI_API_KEY) is not set".to_string())
        })?;
        Self::new(
            api_key,
            settings.llm_base_url.clone(),
            settings.llm_model.clone(),
            Duration::from_secs(settings.request_timeout_seconds),
            settings.max_retries,
        )
    }

    async fn call_llm(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "temperature": 0.2
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalystError::Llm(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalystError::Llm(format!(
                "LLM API returned {}: {}",
                status, detail
            )));
        }

        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AnalystError::Llm(format!("Failed to parse LLM response: {}", e)))?;

        extract_content(&response_json)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        info!("Calling {} ({} prompt chars)", self.model, prompt.len());

        let mut attempt = 0;
        loop {
            match self.call_llm(prompt).await {
                Ok(content) => return Ok(content),
                Err(e) if attempt < self.max_retries => {
                    let delay = Duration::from_millis(RETRY_BACKOFF_MS << attempt);
                    attempt += 1;
                    warn!(
                        "LLM call failed (attempt {}/{}): {}; retrying in {:?}",
                        attempt,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// `choices[0].message.content` of a chat-completions response
pub fn extract_content(response: &serde_json::Value) -> Result<String> {
    response["choices"][0]["message"]["content"]
        .as_str()
        .map(|s| s.trim().to_string())
        .ok_or_else(|| AnalystError::Llm("No content in LLM response".to_string()))
}

pub fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        r#"I have a CSV dataset with the following information:

{}

Based on this dataset, please answer the following question:
{}

Provide a clear and concise answer based only on the data provided."#,
        context, question
    )
}

/// Insights for a freshly loaded dataset, or complementary insights for a question
pub fn insight_prompt(context: &str, question: Option<&str>) -> String {
    match question {
        None => format!(
            r#"I have a CSV dataset with the following information:

{}

Please provide 3-5 key insights about this dataset. Focus on:
1. Data distribution
2. Notable patterns
3. Potential areas for further analysis

Keep the insights concise and data-driven."#,
            context
        ),
        Some(q) => format!(
            r#"I have a CSV dataset with the following information:

{}

The user asked: "{}"

Based on this query and the dataset, provide 2-3 additional insights that might be relevant
but weren't directly asked for. These should complement the main answer."#,
            context, q
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_content() {
        let ok = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "  42 rows \n"}}]
        });
        assert_eq!(extract_content(&ok).unwrap(), "42 rows");

        let empty = serde_json::json!({"choices": []});
        assert!(matches!(extract_content(&empty), Err(AnalystError::Llm(_))));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let settings = Settings::default();
        assert!(matches!(
            LlmClient::from_settings(&settings),
            Err(AnalystError::Config(_))
        ));

        let settings = Settings {
            llm_api_key: Some("test-key".to_string()),
            llm_base_url: "http://localhost:8080/v1/".to_string(),
            ..Settings::default()
        };
        let client = LlmClient::from_settings(&settings).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn test_prompts_embed_context_and_question() {
        let answer = answer_prompt("=== DATASET OVERVIEW ===", "How many rows?");
        assert!(answer.contains("=== DATASET OVERVIEW ==="));
        assert!(answer.contains("How many rows?"));

        let initial = insight_prompt("ctx", None);
        assert!(initial.contains("3-5 key insights"));
        let follow_up = insight_prompt("ctx", Some("Which state?"));
        assert!(follow_up.contains("The user asked: \"Which state?\""));
    }
}
