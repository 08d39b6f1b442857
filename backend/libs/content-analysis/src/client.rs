// Hosted inference clients (Hugging Face Inference API, OpenAI chat completions)

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::error::{AnalysisError, Result};
use crate::models::SummaryModel;

/// One `{label, score}` pair from a text-classification model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f64,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

#[async_trait]
pub trait TextClassifier: Send + Sync {
    /// Classify text with the given model. An unsuccessful HTTP status yields an empty list.
    async fn classify(&self, model: &str, text: &str) -> Result<Vec<LabelScore>>;
}

#[async_trait]
pub trait TextSummarizer: Send + Sync {
    async fn summarize(&self, text: &str) -> Result<String>;

    fn model(&self) -> SummaryModel;
}

/// Normalise a classification payload.
///
/// Accepts `[{label, score}, ..]` and the nested `[[{label, score}, ..]]` form the
/// inference API returns for single inputs. Anything else is treated as no data.
pub fn parse_label_scores(value: &Value) -> Vec<LabelScore> {
    let items = match value {
        Value::Array(items) => items,
        _ => return Vec::new(),
    };

    let items: Vec<&Value> = match items.first() {
        Some(Value::Array(_)) => items
            .iter()
            .filter_map(Value::as_array)
            .flatten()
            .collect(),
        _ => items.iter().collect(),
    };

    items
        .into_iter()
        .filter_map(Value::as_object)
        .map(|obj| LabelScore {
            label: obj
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            score: obj.get("score").and_then(Value::as_f64).unwrap_or(0.0),
        })
        .collect()
}

fn build_http_client(timeout: Duration) -> Result<HttpClient> {
    Ok(HttpClient::builder().timeout(timeout).build()?)
}

#[derive(Clone)]
pub struct HuggingFaceClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
}

impl HuggingFaceClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn model_url(&self, model: &str) -> String {
        format!("{}/{}", self.base_url, model)
    }

    /// Summarizer bound to a specific summarization model
    pub fn summarizer(&self, model: &str) -> HuggingFaceSummarizer {
        HuggingFaceSummarizer {
            client: self.clone(),
            model: model.to_string(),
            max_length: 150,
            min_length: 30,
        }
    }
}

#[async_trait]
impl TextClassifier for HuggingFaceClient {
    async fn classify(&self, model: &str, text: &str) -> Result<Vec<LabelScore>> {
        let response = self
            .client
            .post(self.model_url(model))
            .bearer_auth(&self.api_key)
            .json(&json!({ "inputs": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            debug!("Model {} returned status {}", model, response.status());
            return Ok(Vec::new());
        }

        let body: Value = response.json().await?;
        Ok(parse_label_scores(&body))
    }
}

pub struct HuggingFaceSummarizer {
    client: HuggingFaceClient,
    model: String,
    max_length: u32,
    min_length: u32,
}

#[derive(Deserialize)]
struct HfSummary {
    summary_text: String,
}

#[async_trait]
impl TextSummarizer for HuggingFaceSummarizer {
    async fn summarize(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .client
            .post(self.client.model_url(&self.model))
            .bearer_auth(&self.client.api_key)
            .json(&json!({
                "inputs": text,
                "parameters": {
                    "max_length": self.max_length,
                    "min_length": self.min_length,
                    "do_sample": false
                }
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::Status {
                service: "Hugging Face",
                status: response.status().as_u16(),
            });
        }

        let summaries: Vec<HfSummary> = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        Ok(summaries
            .into_iter()
            .next()
            .map(|s| s.summary_text)
            .unwrap_or_default())
    }

    fn model(&self) -> SummaryModel {
        SummaryModel::HuggingFace
    }
}

pub struct OpenAiClient {
    client: HttpClient,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn summary_prompt(text: &str) -> String {
        format!(
            "Please provide a concise summary of the following text in 2-3 sentences:\n\n{}\n\nSummary:",
            text
        )
    }
}

#[async_trait]
impl TextSummarizer for OpenAiClient {
    async fn summarize(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful assistant that creates concise summaries."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::summary_prompt(text),
                },
            ],
            max_tokens: 100,
            temperature: 0.7,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AnalysisError::Status {
                service: "OpenAI",
                status: response.status().as_u16(),
            });
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::MalformedResponse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.trim().to_string())
            .ok_or_else(|| AnalysisError::MalformedResponse("no choices returned".to_string()))
    }

    fn model(&self) -> SummaryModel {
        SummaryModel::OpenAi
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flat_array() {
        let value = json!([
            {"label": "toxic", "score": 0.91},
            {"label": "insult", "score": 0.12}
        ]);
        let scores = parse_label_scores(&value);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0], LabelScore::new("toxic", 0.91));
    }

    #[test]
    fn test_parse_nested_array() {
        let value = json!([[
            {"label": "LABEL_2", "score": 0.8},
            {"label": "LABEL_0", "score": 0.1}
        ]]);
        let scores = parse_label_scores(&value);
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].label, "LABEL_2");
    }

    #[test]
    fn test_parse_error_object_is_empty() {
        let value = json!({"error": "Model is currently loading", "estimated_time": 20.0});
        assert!(parse_label_scores(&value).is_empty());
    }

    #[test]
    fn test_parse_missing_fields() {
        let value = json!([{"label": "joy"}, {"score": 0.4}, "junk"]);
        let scores = parse_label_scores(&value);
        assert_eq!(scores, vec![LabelScore::new("joy", 0.0), LabelScore::new("", 0.4)]);
    }

    #[test]
    fn test_summary_prompt_embeds_text() {
        let prompt = OpenAiClient::summary_prompt("Rust is fun.");
        assert!(prompt.contains("2-3 sentences"));
        assert!(prompt.contains("Rust is fun."));
    }
}
