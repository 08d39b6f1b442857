use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::client::{HuggingFaceClient, OpenAiClient, TextClassifier, TextSummarizer};
use crate::config::AiConfig;
use crate::error::Result;
use crate::models::{
    ModerationResult, PostAnalysis, Recommendation, SentimentLabel, SentimentResult, SummaryModel,
    SummaryResult,
};
use crate::moderation::ModerationService;
use crate::sentiment::SentimentService;
use crate::summarization::SummarizationService;

const MODERATION_WEIGHT: f64 = 0.7;
const SENTIMENT_WEIGHT: f64 = 0.3;
const RECOMMENDATION_THRESHOLD: f64 = 0.5;
const FALLBACK_SUMMARY_CHARS: usize = 100;

/// Coordinates moderation, sentiment and summarization
pub struct AiManager {
    moderation: ModerationService,
    sentiment: SentimentService,
    summarization: SummarizationService,
    analysis_timeout: Duration,
}

impl AiManager {
    /// Wire services from configuration. Services without a key run in fallback mode.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let hf = match config.hf_key() {
            Some(key) => Some(HuggingFaceClient::new(
                &config.hf_base_url,
                key,
                config.request_timeout(),
            )?),
            None => None,
        };

        let mut summarizers: Vec<Arc<dyn TextSummarizer>> = Vec::new();
        if let Some(key) = config.openai_key() {
            summarizers.push(Arc::new(OpenAiClient::new(
                &config.openai_base_url,
                key,
                &config.openai_model,
                config.request_timeout(),
            )?));
        }
        if let Some(hf) = &hf {
            summarizers.push(Arc::new(hf.summarizer(&config.summarization_model)));
        }

        let classifier: Option<Arc<dyn TextClassifier>> =
            hf.map(|client| Arc::new(client) as Arc<dyn TextClassifier>);

        info!(
            hf_enabled = classifier.is_some(),
            summarizers = summarizers.len(),
            "AI manager initialized"
        );

        Ok(Self::with_services(
            ModerationService::new(
                classifier.clone(),
                &config.toxicity_model,
                &config.hate_speech_model,
            ),
            SentimentService::new(classifier, &config.sentiment_model, &config.emotion_model),
            SummarizationService::new(summarizers),
            config.analysis_timeout(),
        ))
    }

    pub fn with_services(
        moderation: ModerationService,
        sentiment: SentimentService,
        summarization: SummarizationService,
        analysis_timeout: Duration,
    ) -> Self {
        Self {
            moderation,
            sentiment,
            summarization,
            analysis_timeout,
        }
    }

    /// Full analysis of a post or comment. Each analysis runs under its own time budget and
    /// falls back on its own, so a slow summarizer never discards a finished moderation verdict.
    pub async fn analyze_post(&self, content: &str) -> PostAnalysis {
        let (moderation, sentiment, summary) = tokio::join!(
            self.bounded("moderation", self.moderation.process(content), || {
                ModerationService::fallback(content)
            }),
            self.bounded("sentiment", self.sentiment.process(content), || {
                SentimentService::fallback(content)
            }),
            self.bounded("summarization", self.summarization.process(content), || {
                SummarizationService::fallback(content)
            }),
        );
        Self::combine(moderation, sentiment, summary)
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        work: impl Future<Output = T>,
        fallback: impl FnOnce() -> T,
    ) -> T {
        match tokio::time::timeout(self.analysis_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    stage,
                    "AI analysis error: timed out after {:?}", self.analysis_timeout
                );
                fallback()
            }
        }
    }

    pub async fn moderate_content(&self, content: &str) -> ModerationResult {
        self.bounded("moderation", self.moderation.process(content), || {
            ModerationService::fallback(content)
        })
        .await
    }

    pub async fn analyze_sentiment(&self, content: &str) -> SentimentResult {
        self.bounded("sentiment", self.sentiment.process(content), || {
            SentimentService::fallback(content)
        })
        .await
    }

    pub async fn summarize_content(&self, content: &str) -> SummaryResult {
        self.bounded("summarization", self.summarization.process(content), || {
            SummarizationService::fallback(content)
        })
        .await
    }

    fn combine(
        moderation: ModerationResult,
        sentiment: SentimentResult,
        summary: SummaryResult,
    ) -> PostAnalysis {
        PostAnalysis {
            overall_score: overall_score(&moderation, &sentiment),
            recommendations: recommendations(&moderation, &sentiment),
            moderation,
            sentiment,
            summary,
        }
    }

    /// Neutral analysis for content that was never analysed
    pub fn fallback_analysis(content: &str) -> PostAnalysis {
        let length = content.chars().count();
        let summary = if length > FALLBACK_SUMMARY_CHARS {
            let head: String = content.chars().take(FALLBACK_SUMMARY_CHARS).collect();
            format!("{}...", head)
        } else {
            content.to_string()
        };

        PostAnalysis {
            moderation: ModerationResult::safe(),
            sentiment: SentimentResult::neutral(),
            summary: SummaryResult {
                summary,
                original_length: length,
                summary_length: length.min(FALLBACK_SUMMARY_CHARS),
                compression_ratio: 0.5,
                ai_processed: false,
                model: SummaryModel::Fallback,
            },
            overall_score: 0.5,
            recommendations: vec![Recommendation::AnalysisUnavailable],
        }
    }
}

/// Weighted quality score in [0, 1]; moderation dominates
pub fn overall_score(moderation: &ModerationResult, sentiment: &SentimentResult) -> f64 {
    let moderation_score = 1.0 - moderation.toxicity_score.max(moderation.hate_speech_score);
    let overall = moderation_score * MODERATION_WEIGHT + sentiment.sentiment_score * SENTIMENT_WEIGHT;
    overall.clamp(0.0, 1.0)
}

pub fn recommendations(
    moderation: &ModerationResult,
    sentiment: &SentimentResult,
) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !moderation.is_appropriate {
        recommendations.push(Recommendation::ReviseContent);
    }
    if moderation.toxicity_score > RECOMMENDATION_THRESHOLD {
        recommendations.push(Recommendation::MayBeToxic);
    }
    if moderation.hate_speech_score > RECOMMENDATION_THRESHOLD {
        recommendations.push(Recommendation::MayContainHateSpeech);
    }

    match sentiment.sentiment {
        SentimentLabel::Negative => recommendations.push(Recommendation::AddPositiveLanguage),
        SentimentLabel::Positive => recommendations.push(Recommendation::PositiveTone),
        SentimentLabel::Neutral => {}
    }

    if matches!(sentiment.emotion.as_str(), "anger" | "fear" | "sadness") {
        recommendations.push(Recommendation::ConsiderTone(sentiment.emotion.clone()));
    }

    recommendations
}
