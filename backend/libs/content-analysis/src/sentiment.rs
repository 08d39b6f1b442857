use std::sync::Arc;
use tracing::{error, warn};

use crate::client::{LabelScore, TextClassifier};
use crate::error::Result;
use crate::models::{SentimentLabel, SentimentResult};

const POSITIVE_WORDS: &[&str] = &[
    "good", "great", "awesome", "amazing", "love", "happy", "joy", "excellent", "wonderful",
    "fantastic", "beautiful", "perfect",
];

// "terrible" is listed twice and counts double
const NEGATIVE_WORDS: &[&str] = &[
    "bad", "terrible", "awful", "hate", "sad", "angry", "disappointed", "horrible", "worst",
    "disgusting", "terrible", "upset",
];

/// Sentiment polarity and emotion detection
pub struct SentimentService {
    classifier: Option<Arc<dyn TextClassifier>>,
    sentiment_model: String,
    emotion_model: String,
}

impl SentimentService {
    pub fn new(
        classifier: Option<Arc<dyn TextClassifier>>,
        sentiment_model: impl Into<String>,
        emotion_model: impl Into<String>,
    ) -> Self {
        Self {
            classifier,
            sentiment_model: sentiment_model.into(),
            emotion_model: emotion_model.into(),
        }
    }

    pub async fn process(&self, content: &str) -> SentimentResult {
        let Some(classifier) = &self.classifier else {
            warn!("Hugging Face API key not configured");
            return Self::fallback(content);
        };

        match self.analyze(classifier.as_ref(), content).await {
            Ok(result) => result,
            Err(e) => {
                error!("AI Error in Sentiment Analysis: {}", e);
                Self::fallback(content)
            }
        }
    }

    async fn analyze(&self, classifier: &dyn TextClassifier, content: &str) -> Result<SentimentResult> {
        let sentiment_data = classifier.classify(&self.sentiment_model, content).await?;
        let emotion_data = classifier.classify(&self.emotion_model, content).await?;

        let (sentiment, sentiment_score) = match best_scoring(&sentiment_data) {
            Some(best) => (SentimentLabel::from_model_label(&best.label), best.score),
            None => (SentimentLabel::Neutral, 0.5),
        };

        let (emotion, emotion_score) = match best_scoring(&emotion_data) {
            Some(best) if !best.label.is_empty() => (best.label.to_lowercase(), best.score),
            Some(best) => ("neutral".to_string(), best.score),
            None => ("neutral".to_string(), 0.5),
        };

        Ok(SentimentResult {
            sentiment,
            sentiment_score,
            emotion,
            emotion_score,
            confidence: sentiment_score.max(emotion_score),
            ai_processed: true,
        })
    }

    /// Word-count sentiment used when the classifier is unavailable
    pub fn fallback(content: &str) -> SentimentResult {
        let normalized = content.to_lowercase();
        let count = |words: &[&str]| words.iter().filter(|w| normalized.contains(*w)).count();
        let positive = count(POSITIVE_WORDS);
        let negative = count(NEGATIVE_WORDS);

        let (sentiment, sentiment_score) = if positive > negative {
            (SentimentLabel::Positive, keyword_score(positive))
        } else if negative > positive {
            (SentimentLabel::Negative, keyword_score(negative))
        } else {
            (SentimentLabel::Neutral, 0.5)
        };

        SentimentResult {
            sentiment,
            sentiment_score,
            emotion: "neutral".to_string(),
            emotion_score: 0.5,
            confidence: 0.6,
            ai_processed: false,
        }
    }
}

fn keyword_score(hits: usize) -> f64 {
    (0.5 + hits as f64 * 0.1).min(0.8)
}

/// Strictly highest positive score; earlier items win ties
fn best_scoring(data: &[LabelScore]) -> Option<&LabelScore> {
    let mut best: Option<&LabelScore> = None;
    for item in data {
        if item.score > best.map_or(0.0, |b| b.score) {
            best = Some(item);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedClassifier {
        sentiment: Vec<LabelScore>,
        emotion: Vec<LabelScore>,
    }

    #[async_trait]
    impl TextClassifier for FixedClassifier {
        async fn classify(&self, model: &str, _text: &str) -> Result<Vec<LabelScore>> {
            Ok(if model == "sentiment" {
                self.sentiment.clone()
            } else {
                self.emotion.clone()
            })
        }
    }

    fn service(sentiment: Vec<LabelScore>, emotion: Vec<LabelScore>) -> SentimentService {
        SentimentService::new(
            Some(Arc::new(FixedClassifier { sentiment, emotion })),
            "sentiment",
            "emotion",
        )
    }

    #[tokio::test]
    async fn test_remote_picks_highest() {
        let svc = service(
            vec![
                LabelScore::new("LABEL_0", 0.1),
                LabelScore::new("LABEL_2", 0.85),
                LabelScore::new("LABEL_1", 0.05),
            ],
            vec![LabelScore::new("Joy", 0.6), LabelScore::new("anger", 0.3)],
        );
        let result = svc.process("great stuff").await;
        assert_eq!(result.sentiment, SentimentLabel::Positive);
        assert_eq!(result.sentiment_score, 0.85);
        assert_eq!(result.emotion, "joy");
        assert_eq!(result.confidence, 0.85);
        assert!(result.ai_processed);
    }

    #[tokio::test]
    async fn test_remote_empty_data_defaults_neutral() {
        let svc = service(vec![], vec![LabelScore::new("fear", 0.0)]);
        let result = svc.process("hmm").await;
        assert_eq!(result.sentiment, SentimentLabel::Neutral);
        assert_eq!(result.sentiment_score, 0.5);
        assert_eq!(result.emotion, "neutral");
        assert_eq!(result.emotion_score, 0.5);
        assert!(result.ai_processed);
    }

    #[test]
    fn test_best_scoring_first_wins_ties() {
        let data = vec![LabelScore::new("a", 0.4), LabelScore::new("b", 0.4)];
        assert_eq!(best_scoring(&data).map(|b| b.label.as_str()), Some("a"));
    }

    #[test]
    fn test_fallback_positive() {
        let result = SentimentService::fallback("What a GREAT and wonderful day, I love it");
        assert_eq!(result.sentiment, SentimentLabel::Positive);
        assert!((result.sentiment_score - 0.8).abs() < 1e-9);
        assert_eq!(result.confidence, 0.6);
        assert!(!result.ai_processed);
    }

    #[test]
    fn test_fallback_negative_and_tie() {
        let negative = SentimentService::fallback("this is bad");
        assert_eq!(negative.sentiment, SentimentLabel::Negative);
        assert!((negative.sentiment_score - 0.6).abs() < 1e-9);

        let tie = SentimentService::fallback("good but bad");
        assert_eq!(tie.sentiment, SentimentLabel::Neutral);
        assert_eq!(tie.sentiment_score, 0.5);
    }

    #[test]
    fn test_fallback_terrible_counts_double() {
        let result = SentimentService::fallback("good but terrible");
        assert_eq!(result.sentiment, SentimentLabel::Negative);
        assert!((result.sentiment_score - 0.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_key_uses_fallback() {
        let svc = SentimentService::new(None, "sentiment", "emotion");
        let result = svc.process("I am so happy").await;
        assert_eq!(result.sentiment, SentimentLabel::Positive);
        assert!(!result.ai_processed);
    }
}
