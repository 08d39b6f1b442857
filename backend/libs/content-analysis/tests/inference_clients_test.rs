//! HTTP-level tests for the hosted inference clients and the services built on them

use content_analysis::{
    AiConfig, AiManager, HuggingFaceClient, OpenAiClient, SentimentLabel, SummaryModel,
    TextClassifier, TextSummarizer,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TIMEOUT: Duration = Duration::from_secs(5);

fn config_for(server: &MockServer) -> AiConfig {
    AiConfig {
        hf_api_key: Some("hf_test".to_string()),
        hf_base_url: format!("{}/models", server.uri()),
        openai_base_url: format!("{}/v1", server.uri()),
        ..AiConfig::default()
    }
}

#[tokio::test]
async fn test_classify_sends_bearer_and_parses_nested() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/unitary/toxic-bert"))
        .and(header("authorization", "Bearer hf_test"))
        .and(body_partial_json(json!({"inputs": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[
            {"label": "toxic", "score": 0.12},
            {"label": "insult", "score": 0.03}
        ]])))
        .expect(1)
        .mount(&server)
        .await;

    let client =
        HuggingFaceClient::new(&format!("{}/models", server.uri()), "hf_test", TIMEOUT).unwrap();
    let scores = client.classify("unitary/toxic-bert", "hello").await.unwrap();

    assert_eq!(scores.len(), 2);
    assert_eq!(scores[0].label, "toxic");
    assert_eq!(scores[0].score, 0.12);
}

#[tokio::test]
async fn test_classify_non_success_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "loading"})))
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(&server.uri(), "hf_test", TIMEOUT).unwrap();
    let scores = client.classify("any/model", "hello").await.unwrap();
    assert!(scores.is_empty());
}

#[tokio::test]
async fn test_hf_summarizer_reads_summary_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/facebook/bart-large-cnn"))
        .and(body_partial_json(json!({"parameters": {"max_length": 150, "min_length": 30}})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"summary_text": "A summary."}])),
        )
        .mount(&server)
        .await;

    let client = HuggingFaceClient::new(&server.uri(), "hf_test", TIMEOUT).unwrap();
    let summarizer = client.summarizer("facebook/bart-large-cnn");
    assert_eq!(summarizer.summarize("long text").await.unwrap(), "A summary.");
    assert_eq!(summarizer.model(), SummaryModel::HuggingFace);
}

#[tokio::test]
async fn test_openai_summarizer_trims_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "max_tokens": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  Short summary.  "}}]
        })))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(
        &format!("{}/v1", server.uri()),
        "sk-test",
        "gpt-3.5-turbo",
        TIMEOUT,
    )
    .unwrap();
    assert_eq!(client.summarize("text").await.unwrap(), "Short summary.");
}

#[tokio::test]
async fn test_openai_error_status_is_err() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let client = OpenAiClient::new(&server.uri(), "sk-test", "gpt-3.5-turbo", TIMEOUT).unwrap();
    assert!(client.summarize("text").await.is_err());
}

#[tokio::test]
async fn test_manager_uses_remote_models() {
    let server = MockServer::start().await;
    let config = config_for(&server);

    let responses = [
        (&config.toxicity_model, json!([{"label": "toxic", "score": 0.9}])),
        (&config.hate_speech_model, json!([{"label": "hate", "score": 0.1}])),
        (
            &config.sentiment_model,
            json!([[{"label": "negative", "score": 0.8}, {"label": "neutral", "score": 0.2}]]),
        ),
        (&config.emotion_model, json!([[{"label": "anger", "score": 0.7}]])),
        (
            &config.summarization_model,
            json!([{"summary_text": "Angry post."}]),
        ),
    ];
    for (model, body) in responses {
        Mock::given(method("POST"))
            .and(path(format!("/models/{}", model)))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;
    }

    let manager = AiManager::new(&config).unwrap();
    let analysis = manager.analyze_post("some angry text").await;

    assert!(analysis.moderation.ai_processed);
    assert!(!analysis.moderation.is_appropriate);
    assert_eq!(analysis.moderation.flags, vec!["potentially_toxic"]);
    assert_eq!(analysis.sentiment.sentiment, SentimentLabel::Negative);
    assert_eq!(analysis.sentiment.emotion, "anger");
    assert_eq!(analysis.summary.model, SummaryModel::HuggingFace);
    assert_eq!(analysis.summary.summary, "Angry post.");
    // 0.7 * (1 - 0.9) + 0.3 * 0.8
    assert!((analysis.overall_score - 0.31).abs() < 1e-9);
    assert_eq!(
        analysis.warnings(),
        vec![
            "Consider revising content to be more appropriate",
            "Content may be perceived as toxic",
            "Consider adding more positive language",
            "Content expresses anger - consider tone",
        ]
    );
}

#[tokio::test]
async fn test_summarization_prefers_openai_then_falls_back_to_hf() {
    let server = MockServer::start().await;
    let config = AiConfig {
        openai_api_key: Some("sk-test".to_string()),
        ..config_for(&server)
    };

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/models/{}", config.summarization_model)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"summary_text": "HF."}])))
        .expect(1)
        .mount(&server)
        .await;

    let manager = AiManager::new(&config).unwrap();
    let summary = manager.summarize_content("Some text to summarize").await;
    assert_eq!(summary.model, SummaryModel::HuggingFace);
    assert_eq!(summary.summary, "HF.");
}

#[tokio::test]
async fn test_unreachable_endpoint_falls_back() {
    let config = AiConfig {
        hf_api_key: Some("hf_test".to_string()),
        hf_base_url: "http://127.0.0.1:9".to_string(),
        request_timeout_secs: 1,
        ..AiConfig::default()
    };

    let manager = AiManager::new(&config).unwrap();
    let moderation = manager.moderate_content("you are a bully").await;
    assert!(!moderation.ai_processed);
    assert_eq!(moderation.flags, vec!["contains_bully"]);

    let sentiment = manager.analyze_sentiment("so happy").await;
    assert!(!sentiment.ai_processed);
    assert_eq!(sentiment.sentiment, SentimentLabel::Positive);
}
