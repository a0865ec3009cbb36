//! End-to-end tests for the HTTP client and dispatcher against mock servers

use domchat_core::http::error::UNPARSEABLE_ERROR_BODY;
use domchat_core::http::{HttpClient, HttpExecutor, ProviderRequest, RequestOptions};
use domchat_core::providers::{
    AnthropicProvider, GeminiProvider, ModelApiDispatcher, OllamaProvider, OpenAIProvider,
    ProviderError, ProviderType,
};
use domchat_core::{AiCallResult, AiRequest, ConversationTurn, ModelDescriptor};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sse(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/event-stream")
        .set_body_string(body)
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn dispatcher_for(server: &MockServer) -> ModelApiDispatcher {
    let uri = server.uri();
    ModelApiDispatcher::with_executor(HttpClient::new().unwrap())
        .with_openai(OpenAIProvider::new().with_base_url(&uri))
        .with_anthropic(AnthropicProvider::new().with_base_url(&uri))
        .with_gemini(GeminiProvider::new().with_base_url(&uri))
        .with_ollama(OllamaProvider::new().with_base_url(&uri))
        .with_request_timeout(Duration::from_secs(5))
}

#[tokio::test]
async fn test_openai_stream_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(header_exists("x-request-id"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "messages": [
                {"role": "system", "content": "page"},
                {"role": "user", "content": "earlier question"}
            ]
        })))
        .respond_with(sse(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: {\"choices\":[],\"usage\":{\"prompt_tokens\":7,\"completion_tokens\":2}}\n\n",
            "data: [DONE]\n\n",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::OpenAI, "gpt-4o-mini", "page")
        .with_api_key("sk-test")
        .with_turn(ConversationTurn::user("earlier question"));

    let mut deltas = Vec::new();
    let mut sink = |fragment: &str| deltas.push(fragment.to_string());
    let result = dispatcher_for(&server)
        .call(&request, &mut sink)
        .await
        .unwrap();

    assert_eq!(deltas, vec!["Hel", "lo"]);
    assert_eq!(result, AiCallResult::new("Hello", Some(7), Some(2)));

    let model = ModelDescriptor::new(ProviderType::OpenAI, "gpt-4o-mini", 0.15, 0.6);
    assert!(result.cost(&model).is_some());
}

#[tokio::test]
async fn test_anthropic_stream_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "sk-ant-test"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({"system": "page", "max_tokens": 300, "stream": true})))
        .respond_with(sse(concat!(
            "event: message_start\n",
            "data: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":10,\"output_tokens\":0}}}\n\n",
            "event: content_block_delta\n",
            "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Bonjour\"}}\n\n",
            "event: message_delta\n",
            "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"},\"usage\":{\"input_tokens\":0,\"output_tokens\":5}}\n\n",
            "event: message_stop\n",
            "data: {\"type\":\"message_stop\"}\n\n",
        )))
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::Anthropic, "claude-3-5-haiku-20241022", "page")
        .with_api_key("sk-ant-test");
    let result = dispatcher_for(&server)
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap();

    assert_eq!(result, AiCallResult::new("Bonjour", Some(10), Some(5)));
}

#[tokio::test]
async fn test_gemini_stream_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:streamGenerateContent"))
        .and(query_param("key", "AIza-test"))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "user", "parts": [{"text": "page"}]},
                {"role": "model", "parts": [{"text": "earlier answer"}]}
            ]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(concat!(
                    "[{\"candidates\": [{\"content\": {\"parts\": [{\"text\": \"Hi\"}]}}]}\r\n,",
                    "{\"candidates\": [{\"content\": {\"parts\": [{\"text\": \" there\"}]}}],",
                    "\"usageMetadata\": {\"promptTokenCount\": 4, \"candidatesTokenCount\": 2}}\r\n]",
                )),
        )
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::Gemini, "gemini-2.0-flash", "page")
        .with_api_key("AIza-test")
        .with_turn(ConversationTurn::ai("earlier answer"));
    let result = dispatcher_for(&server)
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap();

    assert_eq!(result, AiCallResult::new("Hi there", Some(4), Some(2)));
}

#[tokio::test]
async fn test_ollama_generate_end_to_end() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .and(body_partial_json(json!({
            "model": "llama3.2",
            "prompt": "page\n\nUser: q\n\nAssistant: a",
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.2",
            "response": "local",
            "done": true,
            "prompt_eval_count": 30,
            "eval_count": 6
        })))
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::Ollama, "llama3.2", "page").with_history(vec![
        ConversationTurn::user("q"),
        ConversationTurn::ai("a"),
    ]);
    let result = dispatcher_for(&server)
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap();

    assert_eq!(result, AiCallResult::new("local", Some(30), Some(6)));
}

#[tokio::test]
async fn test_scenario_d_rate_limited_rejects_without_decoding() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"type": "rate_limit_exceeded", "message": "Rate limit reached"}
        })))
        .mount(&server)
        .await;

    let dispatcher = dispatcher_for(&server);
    let cases = [
        AiRequest::new(ProviderType::OpenAI, "gpt-4o", "page").with_api_key("k"),
        AiRequest::new(ProviderType::Anthropic, "claude-3-opus-20240229", "page").with_api_key("k"),
        AiRequest::new(ProviderType::Gemini, "gemini-1.5-pro", "page").with_api_key("k"),
        AiRequest::new(ProviderType::Ollama, "llama3.2", "page"),
    ];

    for request in cases {
        let mut deltas = 0;
        let mut sink = |_: &str| deltas += 1;
        let err = dispatcher.call(&request, &mut sink).await.unwrap_err();

        assert_eq!(deltas, 0);
        assert_eq!(err.status(), Some(429));
        assert!(err.to_string().contains("429"), "{}", err);
        assert!(err.to_string().contains("Rate limit reached"));
        assert!(err.is_retryable());
    }
}

#[tokio::test]
async fn test_gemini_array_error_body_message() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!([{
            "error": {"code": 400, "message": "API key not valid. Please pass a valid API key.", "status": "INVALID_ARGUMENT"}
        }])))
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::Gemini, "gemini-1.5-pro", "page").with_api_key("bad");
    let err = dispatcher_for(&server)
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert!(err.to_string().contains("API key not valid"), "{}", err);
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unparseable_error_body_falls_back() {
    init_logging();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::OpenAI, "gpt-4o", "page").with_api_key("k");
    let err = dispatcher_for(&server)
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap_err();

    match err {
        ProviderError::Http {
            provider,
            status,
            message,
        } => {
            assert_eq!(provider, ProviderType::OpenAI);
            assert_eq!(status, 502);
            assert_eq!(message, UNPARSEABLE_ERROR_BODY);
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_success_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let request = AiRequest::new(ProviderType::Ollama, "llama3.2", "page");
    let err = dispatcher_for(&server)
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::InvalidResponse {
            provider: ProviderType::Ollama,
            ..
        }
    ));
}

#[tokio::test]
async fn test_list_local_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "models": [
                {"name": "llama3.2:latest", "size": 2019393189},
                {"name": "qwen2.5:7b", "size": 4683087332u64}
            ]
        })))
        .mount(&server)
        .await;

    let models = dispatcher_for(&server).list_local_models().await;
    assert_eq!(
        models,
        vec![
            ModelDescriptor::local("llama3.2:latest"),
            ModelDescriptor::local("qwen2.5:7b"),
        ]
    );
}

#[tokio::test]
async fn test_list_local_models_unreachable_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(dispatcher_for(&server).list_local_models().await.is_empty());
}

#[tokio::test]
async fn test_json_request_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let client = HttpClient::new().unwrap();
    let request = ProviderRequest::get(format!("{}/api/tags", server.uri()));
    let options = RequestOptions::new().with_timeout(Duration::from_millis(50));

    let err = client
        .execute_json(ProviderType::Ollama, &request, &options)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::Timeout {
            provider: ProviderType::Ollama
        }
    ));
}
