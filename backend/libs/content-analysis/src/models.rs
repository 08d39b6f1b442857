use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Moderation verdict for a piece of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub is_appropriate: bool,
    pub toxicity_score: f64,
    pub hate_speech_score: f64,
    pub confidence: f64,
    pub flags: Vec<String>,
    pub ai_processed: bool,
}

impl ModerationResult {
    pub fn safe() -> Self {
        Self {
            is_appropriate: true,
            toxicity_score: 0.0,
            hate_speech_score: 0.0,
            confidence: 0.5,
            flags: Vec::new(),
            ai_processed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }

    /// Maps classifier labels (`LABEL_0..2` or plain names) to a polarity
    pub fn from_model_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "label_0" | "negative" => SentimentLabel::Negative,
            "label_2" | "positive" => SentimentLabel::Positive,
            _ => SentimentLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub sentiment: SentimentLabel,
    pub sentiment_score: f64,
    pub emotion: String,
    pub emotion_score: f64,
    pub confidence: f64,
    pub ai_processed: bool,
}

impl SentimentResult {
    pub fn neutral() -> Self {
        Self {
            sentiment: SentimentLabel::Neutral,
            sentiment_score: 0.5,
            emotion: "neutral".to_string(),
            emotion_score: 0.5,
            confidence: 0.5,
            ai_processed: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryModel {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "huggingface")]
    HuggingFace,
    Fallback,
}

impl SummaryModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryModel::OpenAi => "openai",
            SummaryModel::HuggingFace => "huggingface",
            SummaryModel::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub original_length: usize,
    pub summary_length: usize,
    pub compression_ratio: f64,
    pub ai_processed: bool,
    pub model: SummaryModel,
}

impl SummaryResult {
    /// Builds a result with lengths and ratio measured in characters
    pub fn new(content: &str, summary: String, model: SummaryModel) -> Self {
        let original_length = content.chars().count();
        let summary_length = summary.chars().count();
        let compression_ratio = if original_length > 0 {
            summary_length as f64 / original_length as f64
        } else {
            0.0
        };

        Self {
            summary,
            original_length,
            summary_length,
            compression_ratio,
            ai_processed: model != SummaryModel::Fallback,
            model,
        }
    }
}

/// Advice attached to an analysis. Serialized as its display text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recommendation {
    ReviseContent,
    MayBeToxic,
    MayContainHateSpeech,
    AddPositiveLanguage,
    PositiveTone,
    ConsiderTone(String),
    AnalysisUnavailable,
    Other(String),
}

impl Recommendation {
    /// Whether this should be surfaced to the author as a warning
    pub fn is_warning(&self) -> bool {
        !matches!(
            self,
            Recommendation::PositiveTone | Recommendation::AnalysisUnavailable
        )
    }

    fn parse(text: &str) -> Self {
        match text {
            "Consider revising content to be more appropriate" => Recommendation::ReviseContent,
            "Content may be perceived as toxic" => Recommendation::MayBeToxic,
            "Content may contain hate speech" => Recommendation::MayContainHateSpeech,
            "Consider adding more positive language" => Recommendation::AddPositiveLanguage,
            "Great positive tone!" => Recommendation::PositiveTone,
            "AI analysis unavailable" => Recommendation::AnalysisUnavailable,
            other => other
                .strip_prefix("Content expresses ")
                .and_then(|rest| rest.strip_suffix(" - consider tone"))
                .map(|emotion| Recommendation::ConsiderTone(emotion.to_string()))
                .unwrap_or_else(|| Recommendation::Other(other.to_string())),
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::ReviseContent => {
                f.write_str("Consider revising content to be more appropriate")
            }
            Recommendation::MayBeToxic => f.write_str("Content may be perceived as toxic"),
            Recommendation::MayContainHateSpeech => f.write_str("Content may contain hate speech"),
            Recommendation::AddPositiveLanguage => {
                f.write_str("Consider adding more positive language")
            }
            Recommendation::PositiveTone => f.write_str("Great positive tone!"),
            Recommendation::ConsiderTone(emotion) => {
                write!(f, "Content expresses {} - consider tone", emotion)
            }
            Recommendation::AnalysisUnavailable => f.write_str("AI analysis unavailable"),
            Recommendation::Other(text) => f.write_str(text),
        }
    }
}

impl Serialize for Recommendation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Recommendation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Recommendation::parse(&text))
    }
}

/// Combined analysis of a post or comment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostAnalysis {
    pub moderation: ModerationResult,
    pub sentiment: SentimentResult,
    pub summary: SummaryResult,
    pub overall_score: f64,
    pub recommendations: Vec<Recommendation>,
}

impl PostAnalysis {
    pub fn is_appropriate(&self) -> bool {
        self.moderation.is_appropriate
    }

    /// Recommendation texts that count as warnings
    pub fn warnings(&self) -> Vec<String> {
        self.recommendations
            .iter()
            .filter(|r| r.is_warning())
            .map(|r| r.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_label_mapping() {
        assert_eq!(SentimentLabel::from_model_label("LABEL_0"), SentimentLabel::Negative);
        assert_eq!(SentimentLabel::from_model_label("LABEL_1"), SentimentLabel::Neutral);
        assert_eq!(SentimentLabel::from_model_label("LABEL_2"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_model_label("Positive"), SentimentLabel::Positive);
        assert_eq!(SentimentLabel::from_model_label("mixed"), SentimentLabel::Neutral);
    }

    #[test]
    fn test_summary_ratio_counts_chars() {
        let result = SummaryResult::new("héllo world", "héllo".to_string(), SummaryModel::OpenAi);
        assert_eq!(result.original_length, 11);
        assert_eq!(result.summary_length, 5);
        assert!(result.ai_processed);
        assert!((result.compression_ratio - 5.0 / 11.0).abs() < 1e-9);

        let empty = SummaryResult::new("", String::new(), SummaryModel::Fallback);
        assert_eq!(empty.compression_ratio, 0.0);
        assert!(!empty.ai_processed);
    }

    #[test]
    fn test_recommendation_text_roundtrip() {
        let recs = vec![
            Recommendation::MayBeToxic,
            Recommendation::ConsiderTone("anger".to_string()),
            Recommendation::PositiveTone,
        ];
        let json = serde_json::to_value(&recs).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                "Content may be perceived as toxic",
                "Content expresses anger - consider tone",
                "Great positive tone!"
            ])
        );
        let back: Vec<Recommendation> = serde_json::from_value(json).unwrap();
        assert_eq!(back, recs);
    }

    #[test]
    fn test_warnings_skip_positive_notes() {
        assert!(Recommendation::ReviseContent.is_warning());
        assert!(Recommendation::ConsiderTone("fear".into()).is_warning());
        assert!(!Recommendation::PositiveTone.is_warning());
        assert!(!Recommendation::AnalysisUnavailable.is_warning());
    }

    #[test]
    fn test_summary_model_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&SummaryModel::OpenAi).unwrap(), "\"openai\"");
        assert_eq!(serde_json::to_string(&SummaryModel::HuggingFace).unwrap(), "\"huggingface\"");
        assert_eq!(serde_json::to_string(&SummaryModel::Fallback).unwrap(), "\"fallback\"");
    }
}
