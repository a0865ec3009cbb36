//! StreamingCallAdapter and dispatcher behaviour over a scripted executor

use async_trait::async_trait;
use bytes::Bytes;
use domchat_core::http::{ByteStream, HttpExecutor, ProviderRequest, RequestOptions};
use domchat_core::providers::{
    AnthropicProvider, GeminiProvider, ModelApiDispatcher, OpenAIProvider, ProviderError,
    ProviderResult, ProviderType, StreamingCallAdapter,
};
use domchat_core::{AiCallResult, AiRequest, StreamUpdate};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Replays fixed chunks and records what was sent
#[derive(Default)]
struct ScriptedExecutor {
    chunks: Vec<ProviderResult<Bytes>>,
    json: Option<Value>,
    pulled: Arc<AtomicUsize>,
    sent: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedExecutor {
    fn streaming(chunks: &[&str]) -> Self {
        Self {
            chunks: chunks
                .iter()
                .map(|c| Ok(Bytes::copy_from_slice(c.as_bytes())))
                .collect(),
            ..Default::default()
        }
    }

    fn json(body: Value) -> Self {
        Self {
            json: Some(body),
            ..Default::default()
        }
    }

    fn take_chunks(&self) -> Vec<ProviderResult<Bytes>> {
        self.chunks
            .iter()
            .map(|c| match c {
                Ok(bytes) => Ok(bytes.clone()),
                Err(_) => Err(ProviderError::Network {
                    provider: ProviderType::OpenAI,
                    message: "connection reset".to_string(),
                }),
            })
            .collect()
    }
}

#[async_trait]
impl HttpExecutor for ScriptedExecutor {
    async fn execute_json(
        &self,
        provider: ProviderType,
        request: &ProviderRequest,
        _options: &RequestOptions,
    ) -> ProviderResult<Value> {
        self.sent.lock().unwrap().push(request.clone());
        self.json.clone().ok_or(ProviderError::Network {
            provider,
            message: "no scripted body".to_string(),
        })
    }

    async fn execute_stream(
        &self,
        _provider: ProviderType,
        request: &ProviderRequest,
        _options: &RequestOptions,
    ) -> ProviderResult<ByteStream> {
        self.sent.lock().unwrap().push(request.clone());
        let pulled = self.pulled.clone();
        let stream = futures::stream::iter(self.take_chunks()).inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        });
        Ok(Box::pin(stream))
    }
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn openai_request() -> AiRequest {
    AiRequest::new(ProviderType::OpenAI, "gpt-4o-mini", "page").with_api_key("sk-test")
}

#[tokio::test]
async fn test_scenario_a_deltas_reach_sink_in_order() {
    let executor = ScriptedExecutor::streaming(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
    ]);
    let provider = OpenAIProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);

    let mut seen = Vec::new();
    let mut sink = |fragment: &str| seen.push(fragment.to_string());
    let result = adapter.call(&openai_request(), &mut sink).await.unwrap();

    assert_eq!(seen, vec!["Hel", "lo"]);
    assert_eq!(result.content, "Hello");
    assert_eq!(result.input_tokens, None);
}

#[tokio::test]
async fn test_stops_reading_after_done() {
    init_logging();
    let executor = ScriptedExecutor::streaming(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"A\"}}]}\n\ndata: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"B\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"C\"}}]}\n\n",
    ]);
    let provider = OpenAIProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);

    let result = adapter
        .call(&openai_request(), &mut |_: &str| {})
        .await
        .unwrap();

    assert_eq!(result.content, "A");
    assert_eq!(executor.pulled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_final_event_without_blank_line_is_delivered() {
    let executor = ScriptedExecutor::streaming(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}",
    ]);
    let provider = OpenAIProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);

    let result = adapter
        .call(&openai_request(), &mut |_: &str| {})
        .await
        .unwrap();
    assert_eq!(result.content, "Hello");
}

#[tokio::test]
async fn test_gemini_array_stream_through_adapter() {
    init_logging();
    let executor = ScriptedExecutor::streaming(&[
        "[{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Once\"}]}}],",
        "\"usageMetadata\":{\"promptTokenCount\":8,\"candidatesTokenCount\":1}}\r\n,",
        "{\"candidates\":[{\"content\":{\"parts\":[{\"text\":\" upon\"}]}}],",
        "\"usageMetadata\":{\"promptTokenCount\":8,\"candidatesTokenCount\":2}}\r\n]",
    ]);
    let provider = GeminiProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);
    let request = AiRequest::new(ProviderType::Gemini, "gemini-2.0-flash", "page")
        .with_api_key("AIza");

    let mut seen = Vec::new();
    let mut sink = |fragment: &str| seen.push(fragment.to_string());
    let result = adapter.call(&request, &mut sink).await.unwrap();

    assert_eq!(seen, vec!["Once", " upon"]);
    assert_eq!(result, AiCallResult::new("Once upon", Some(8), Some(2)));
}

#[tokio::test]
async fn test_scenario_b_anthropic_usage_sums() {
    let executor = ScriptedExecutor::streaming(&[
        "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{\"usage\":{\"input_tokens\":10,\"output_tokens\":0}}}\n\n",
        "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"ok\"}}\n\n",
        "event: message_delta\ndata: {\"type\":\"message_delta\",\"delta\":{},\"usage\":{\"input_tokens\":0,\"output_tokens\":5}}\n\n",
        "event: message_stop\ndata: {\"type\":\"message_stop\"}\n\n",
    ]);
    let provider = AnthropicProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);
    let request = AiRequest::new(ProviderType::Anthropic, "claude-3-5-haiku-20241022", "page")
        .with_api_key("sk-ant");

    let result = adapter.call(&request, &mut |_: &str| {}).await.unwrap();
    assert_eq!(result, AiCallResult::new("ok", Some(10), Some(5)));
}

#[tokio::test]
async fn test_mid_stream_transport_error_aborts_call() {
    let mut executor = ScriptedExecutor::streaming(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
    ]);
    executor.chunks.push(Err(ProviderError::Network {
        provider: ProviderType::OpenAI,
        message: "connection reset".to_string(),
    }));

    let provider = OpenAIProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);

    let mut seen = String::new();
    let mut sink = |fragment: &str| seen.push_str(fragment);
    let err = adapter.call(&openai_request(), &mut sink).await.unwrap_err();

    assert!(matches!(err, ProviderError::Network { .. }));
    assert_eq!(seen, "partial");
}

#[tokio::test]
async fn test_non_streaming_request_uses_complete_body() {
    let executor = ScriptedExecutor::json(json!({
        "candidates": [{"content": {"parts": [{"text": "whole"}]}}],
        "usageMetadata": {"promptTokenCount": 5, "candidatesTokenCount": 1}
    }));
    let provider = GeminiProvider::new();
    let adapter = StreamingCallAdapter::new(&provider, &executor);
    let request = AiRequest::new(ProviderType::Gemini, "gemini-2.0-flash", "page")
        .with_api_key("AIza")
        .with_stream(false);

    let mut calls = 0;
    let mut sink = |_: &str| calls += 1;
    let result = adapter.call(&request, &mut sink).await.unwrap();

    assert_eq!(calls, 0);
    assert_eq!(result, AiCallResult::new("whole", Some(5), Some(1)));
    let sent = executor.sent.lock().unwrap();
    assert!(sent[0].url.contains(":generateContent?key=AIza"));
}

#[tokio::test]
async fn test_missing_key_rejected_before_any_request() {
    let dispatcher = ModelApiDispatcher::with_executor(ScriptedExecutor::default());
    let request = AiRequest::new(ProviderType::Anthropic, "claude-3-opus-20240229", "page");

    let err = dispatcher
        .call(&request, &mut |_: &str| {})
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ProviderError::MissingApiKey {
            provider: ProviderType::Anthropic
        }
    ));
}

#[tokio::test]
async fn test_ollama_needs_no_key() {
    let dispatcher = ModelApiDispatcher::with_executor(ScriptedExecutor::json(json!({
        "response": "local answer",
        "prompt_eval_count": 12,
        "eval_count": 3
    })));
    let request = AiRequest::new(ProviderType::Ollama, "llama3.2", "page");

    let result = dispatcher.call(&request, &mut |_: &str| {}).await.unwrap();
    assert_eq!(result, AiCallResult::new("local answer", Some(12), Some(3)));
}

#[tokio::test]
async fn test_updates_end_with_exactly_one_terminal_message() {
    let dispatcher = ModelApiDispatcher::with_executor(ScriptedExecutor::streaming(&[
        "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\ndata: [DONE]\n\n",
    ]));
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

    let result = dispatcher
        .call_with_updates(&openai_request(), &tx)
        .await
        .unwrap();
    drop(tx);

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    assert_eq!(updates.len(), 3);
    let id = updates[0].request_id();
    assert!(updates.iter().all(|u| u.request_id() == id));
    assert!(matches!(&updates[0], StreamUpdate::Chunk { text, .. } if text == "Hel"));
    assert!(matches!(&updates[1], StreamUpdate::Chunk { text, .. } if text == "lo"));
    assert_eq!(
        updates[2],
        StreamUpdate::Completed {
            request_id: id,
            result
        }
    );
}

#[tokio::test]
async fn test_updates_report_failure() {
    let dispatcher = ModelApiDispatcher::with_executor(ScriptedExecutor::default());
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let request = AiRequest::new(ProviderType::OpenAI, "gpt-4o", "page");

    assert!(dispatcher.call_with_updates(&request, &tx).await.is_err());

    match rx.recv().await {
        Some(StreamUpdate::Failed { message, .. }) => assert!(message.contains("Missing API key")),
        other => panic!("unexpected update: {:?}", other),
    }
    assert!(rx.try_recv().is_err());
}
