use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::client::TextSummarizer;
use crate::models::{SummaryModel, SummaryResult};

/// Summarization over an ordered list of providers with an extractive fallback
pub struct SummarizationService {
    providers: Vec<Arc<dyn TextSummarizer>>,
}

impl SummarizationService {
    /// Providers are tried in the given order
    pub fn new(providers: Vec<Arc<dyn TextSummarizer>>) -> Self {
        Self { providers }
    }

    pub async fn process(&self, content: &str) -> SummaryResult {
        if self.providers.is_empty() {
            warn!("No summarization API key configured");
        }

        for provider in &self.providers {
            match provider.summarize(content).await {
                Ok(summary) => {
                    debug!("Summary produced by {}", provider.model().as_str());
                    return SummaryResult::new(content, summary, provider.model());
                }
                Err(e) => {
                    error!(
                        "AI Error in Content Summarization ({}): {}",
                        provider.model().as_str(),
                        e
                    );
                }
            }
        }

        Self::fallback(content)
    }

    /// First two sentences, or the whole text when it has at most two
    pub fn fallback(content: &str) -> SummaryResult {
        let sentences: Vec<&str> = content.split('.').collect();
        let summary = if sentences.len() <= 2 {
            content.to_string()
        } else {
            format!("{}.", sentences[..2].join(". "))
        };

        SummaryResult::new(content, summary, SummaryModel::Fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AnalysisError, Result};
    use async_trait::async_trait;

    struct Fixed(SummaryModel, Option<&'static str>);

    #[async_trait]
    impl TextSummarizer for Fixed {
        async fn summarize(&self, _text: &str) -> Result<String> {
            self.1
                .map(str::to_string)
                .ok_or(AnalysisError::Status { service: "test", status: 503 })
        }

        fn model(&self) -> SummaryModel {
            self.0
        }
    }

    #[test]
    fn test_fallback_takes_two_sentences() {
        let result = SummarizationService::fallback("One. Two. Three. Four.");
        assert_eq!(result.summary, "One.  Two.");
        assert_eq!(result.model, SummaryModel::Fallback);
        assert!(!result.ai_processed);
    }

    #[test]
    fn test_fallback_short_text_unchanged() {
        let result = SummarizationService::fallback("Only one sentence.");
        assert_eq!(result.summary, "Only one sentence.");
        assert_eq!(result.compression_ratio, 1.0);

        let empty = SummarizationService::fallback("");
        assert_eq!(empty.summary, "");
        assert_eq!(empty.compression_ratio, 0.0);
    }

    #[tokio::test]
    async fn test_first_successful_provider_wins() {
        let svc = SummarizationService::new(vec![
            Arc::new(Fixed(SummaryModel::OpenAi, None)),
            Arc::new(Fixed(SummaryModel::HuggingFace, Some("short"))),
        ]);
        let result = svc.process("a much longer input text").await;
        assert_eq!(result.summary, "short");
        assert_eq!(result.model, SummaryModel::HuggingFace);
        assert!(result.ai_processed);
    }

    #[tokio::test]
    async fn test_all_providers_failing_falls_back() {
        let svc = SummarizationService::new(vec![Arc::new(Fixed(SummaryModel::OpenAi, None))]);
        let result = svc.process("First. Second. Third.").await;
        assert_eq!(result.model, SummaryModel::Fallback);
        assert_eq!(result.summary, "First.  Second.");
    }
}
