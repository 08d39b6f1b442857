use std::sync::Arc;
use tracing::{error, warn};

use crate::client::{LabelScore, TextClassifier};
use crate::error::Result;
use crate::models::ModerationResult;

const INAPPROPRIATE_THRESHOLD: f64 = 0.7;
const FLAG_THRESHOLD: f64 = 0.5;

const INAPPROPRIATE_KEYWORDS: &[&str] = &[
    "hate",
    "racist",
    "discriminatory",
    "violent",
    "threat",
    "abuse",
    "harassment",
    "bully",
    "intimidate",
];

/// Toxicity and hate-speech moderation
pub struct ModerationService {
    classifier: Option<Arc<dyn TextClassifier>>,
    toxicity_model: String,
    hate_speech_model: String,
}

impl ModerationService {
    pub fn new(
        classifier: Option<Arc<dyn TextClassifier>>,
        toxicity_model: impl Into<String>,
        hate_speech_model: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            toxicity_model: toxicity_model.into(),
            hate_speech_model: hate_speech_model.into(),
        }
    }

    pub async fn process(&self, content: &str) -> ModerationResult {
        let Some(classifier) = &self.classifier else {
            warn!("Hugging Face API key not configured");
            return Self::fallback(content);
        };

        match self.analyze(classifier.as_ref(), content).await {
            Ok(result) => result,
            Err(e) => {
                error!("AI Error in Content Moderation: {}", e);
                Self::fallback(content)
            }
        }
    }

    async fn analyze(&self, classifier: &dyn TextClassifier, content: &str) -> Result<ModerationResult> {
        let toxicity_data = classifier.classify(&self.toxicity_model, content).await?;
        let hate_data = classifier.classify(&self.hate_speech_model, content).await?;

        let toxicity_score = extract_labelled_score(&toxicity_data, "toxic");
        let hate_speech_score = extract_labelled_score(&hate_data, "hate");

        let mut flags = Vec::new();
        if toxicity_score > FLAG_THRESHOLD {
            flags.push("potentially_toxic".to_string());
        }
        if hate_speech_score > FLAG_THRESHOLD {
            flags.push("potentially_hateful".to_string());
        }

        Ok(ModerationResult {
            is_appropriate: toxicity_score < INAPPROPRIATE_THRESHOLD
                && hate_speech_score < INAPPROPRIATE_THRESHOLD,
            toxicity_score,
            hate_speech_score,
            confidence: toxicity_score.max(hate_speech_score),
            flags,
            ai_processed: true,
        })
    }

    /// Keyword-based moderation used when the classifier is unavailable
    pub fn fallback(content: &str) -> ModerationResult {
        let normalized = content.to_lowercase();
        let flags: Vec<String> = INAPPROPRIATE_KEYWORDS
            .iter()
            .filter(|keyword| normalized.contains(*keyword))
            .map(|keyword| format!("contains_{}", keyword))
            .collect();
        let flagged = !flags.is_empty();

        ModerationResult {
            is_appropriate: !flagged,
            toxicity_score: if flagged { 0.3 } else { 0.0 },
            hate_speech_score: if flagged { 0.2 } else { 0.0 },
            confidence: 0.5,
            flags,
            ai_processed: false,
        }
    }
}

/// Score of the first label containing `needle`, else the highest score, else 0
fn extract_labelled_score(data: &[LabelScore], needle: &str) -> f64 {
    data.iter()
        .find(|item| item.label.to_lowercase().contains(needle))
        .map(|item| item.score)
        .unwrap_or_else(|| data.iter().map(|item| item.score).fold(0.0, f64::max))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct FixedClassifier(HashMap<&'static str, Vec<LabelScore>>);

    #[async_trait]
    impl TextClassifier for FixedClassifier {
        async fn classify(&self, model: &str, _text: &str) -> Result<Vec<LabelScore>> {
            Ok(self.0.get(model).cloned().unwrap_or_default())
        }
    }

    struct FailingClassifier;

    #[async_trait]
    impl TextClassifier for FailingClassifier {
        async fn classify(&self, _model: &str, _text: &str) -> Result<Vec<LabelScore>> {
            Err(AnalysisError::MalformedResponse("boom".to_string()))
        }
    }

    fn service(toxic: Vec<LabelScore>, hate: Vec<LabelScore>) -> ModerationService {
        let mut responses = HashMap::new();
        responses.insert("tox", toxic);
        responses.insert("hate", hate);
        ModerationService::new(Some(Arc::new(FixedClassifier(responses))), "tox", "hate")
    }

    #[test]
    fn test_extract_prefers_matching_label() {
        let data = vec![LabelScore::new("neutral", 0.9), LabelScore::new("Toxic", 0.4)];
        assert_eq!(extract_labelled_score(&data, "toxic"), 0.4);
    }

    #[test]
    fn test_extract_falls_back_to_highest() {
        let data = vec![LabelScore::new("nothate", 0.2), LabelScore::new("other", 0.6)];
        assert_eq!(extract_labelled_score(&data, "toxic"), 0.6);
        assert_eq!(extract_labelled_score(&[], "toxic"), 0.0);
    }

    #[tokio::test]
    async fn test_remote_flags_and_verdict() {
        let svc = service(
            vec![LabelScore::new("toxic", 0.65)],
            vec![LabelScore::new("hate", 0.75)],
        );
        let result = svc.process("anything").await;
        assert!(!result.is_appropriate);
        assert!(result.ai_processed);
        assert_eq!(result.confidence, 0.75);
        assert_eq!(result.flags, vec!["potentially_toxic", "potentially_hateful"]);
    }

    #[tokio::test]
    async fn test_remote_clean_content() {
        let svc = service(
            vec![LabelScore::new("toxic", 0.02)],
            vec![LabelScore::new("nothate", 0.98), LabelScore::new("hate", 0.02)],
        );
        let result = svc.process("have a nice day").await;
        assert!(result.is_appropriate);
        assert!(result.flags.is_empty());
        // "nothate" contains "hate" and comes first
        assert_eq!(result.hate_speech_score, 0.98);
    }

    #[tokio::test]
    async fn test_boundary_scores() {
        let svc = service(
            vec![LabelScore::new("toxic", 0.5)],
            vec![LabelScore::new("hate", 0.7)],
        );
        let result = svc.process("x").await;
        assert!(!result.is_appropriate);
        assert_eq!(result.flags, vec!["potentially_hateful"]);
    }

    #[tokio::test]
    async fn test_missing_key_uses_fallback() {
        let svc = ModerationService::new(None, "tox", "hate");
        let result = svc.process("I will bully you").await;
        assert!(!result.ai_processed);
        assert!(!result.is_appropriate);
        assert_eq!(result.flags, vec!["contains_bully"]);
    }

    #[tokio::test]
    async fn test_classifier_error_uses_fallback() {
        let svc = ModerationService::new(Some(Arc::new(FailingClassifier)), "tox", "hate");
        let result = svc.process("lovely weather").await;
        assert!(!result.ai_processed);
        assert!(result.is_appropriate);
        assert_eq!(result.toxicity_score, 0.0);
    }

    #[test]
    fn test_fallback_scores() {
        let result = ModerationService::fallback("This is a THREAT and pure Hate");
        assert_eq!(result.flags, vec!["contains_hate", "contains_threat"]);
        assert_eq!(result.toxicity_score, 0.3);
        assert_eq!(result.hate_speech_score, 0.2);
        assert_eq!(result.confidence, 0.5);

        let clean = ModerationService::fallback("Good morning");
        assert!(clean.is_appropriate);
        assert_eq!(clean.hate_speech_score, 0.0);
    }
}
