//! Content analysis for posts and comments
//!
//! Three independent analyses back the post/comment creation flow:
//! - **Moderation**: toxicity and hate-speech scores with an appropriateness verdict
//! - **Sentiment**: sentiment polarity plus the dominant emotion
//! - **Summarization**: a short summary of the text
//!
//! Each analysis calls a hosted inference endpoint when an API key is configured and
//! degrades to a deterministic keyword heuristic when the key is absent or the call fails.
//! [`AiManager`] runs them together and folds the results into an overall quality score
//! and a list of recommendations.
//!
//! # Example
//!
//! ```rust,no_run
//! use content_analysis::{AiConfig, AiManager};
//!
//! #[tokio::main]
//! async fn main() {
//!     let manager = AiManager::new(&AiConfig::default()).expect("http client");
//!     let analysis = manager.analyze_post("What a wonderful day!").await;
//!     println!("overall score: {:.2}", analysis.overall_score);
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod manager;
pub mod models;
pub mod moderation;
pub mod sentiment;
pub mod summarization;

pub use client::{
    parse_label_scores, HuggingFaceClient, HuggingFaceSummarizer, LabelScore, OpenAiClient,
    TextClassifier, TextSummarizer,
};
pub use config::AiConfig;
pub use error::{AnalysisError, Result};
pub use manager::AiManager;
pub use models::{
    ModerationResult, PostAnalysis, Recommendation, SentimentLabel, SentimentResult, SummaryModel,
    SummaryResult,
};
pub use moderation::ModerationService;
pub use sentiment::SentimentService;
pub use summarization::SummarizationService;
