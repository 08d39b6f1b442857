use serde::Deserialize;
use std::time::Duration;

/// Inference endpoint settings. Missing keys switch the matching analyses to fallback mode.
#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    #[serde(default)]
    pub hf_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,

    #[serde(default = "default_hf_base_url")]
    pub hf_base_url: String,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,

    #[serde(default = "default_toxicity_model")]
    pub toxicity_model: String,
    #[serde(default = "default_hate_speech_model")]
    pub hate_speech_model: String,
    #[serde(default = "default_sentiment_model")]
    pub sentiment_model: String,
    #[serde(default = "default_emotion_model")]
    pub emotion_model: String,
    #[serde(default = "default_summarization_model")]
    pub summarization_model: String,
    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_analysis_timeout_secs")]
    pub analysis_timeout_secs: u64,
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_toxicity_model() -> String {
    "unitary/toxic-bert".to_string()
}

fn default_hate_speech_model() -> String {
    "facebook/roberta-hate-speech-detector".to_string()
}

fn default_sentiment_model() -> String {
    "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string()
}

fn default_emotion_model() -> String {
    "j-hartmann/emotion-english-distilroberta-base".to_string()
}

fn default_summarization_model() -> String {
    "facebook/bart-large-cnn".to_string()
}

fn default_openai_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_analysis_timeout_secs() -> u64 {
    60
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            hf_api_key: None,
            openai_api_key: None,
            hf_base_url: default_hf_base_url(),
            openai_base_url: default_openai_base_url(),
            toxicity_model: default_toxicity_model(),
            hate_speech_model: default_hate_speech_model(),
            sentiment_model: default_sentiment_model(),
            emotion_model: default_emotion_model(),
            summarization_model: default_summarization_model(),
            openai_model: default_openai_model(),
            request_timeout_secs: default_request_timeout_secs(),
            analysis_timeout_secs: default_analysis_timeout_secs(),
        }
    }
}

impl AiConfig {
    /// Hugging Face key, ignoring blank values
    pub fn hf_key(&self) -> Option<&str> {
        non_blank(self.hf_api_key.as_deref())
    }

    /// OpenAI key, ignoring blank values
    pub fn openai_key(&self) -> Option<&str> {
        non_blank(self.openai_api_key.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
