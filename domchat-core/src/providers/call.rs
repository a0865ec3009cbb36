//! One end-to-end provider call
//!
//! The adapter sends the request, decodes the body with the provider's
//! framing as chunks arrive, hands text to the sink immediately and folds
//! usage reports. It returns its result exactly once. Dropping the future drops
//! the response body, which aborts the transfer.

use super::{Provider, ProviderResult};
use crate::http::{HttpExecutor, ProviderRequest, RequestOptions};
use crate::protocol::{AiCallResult, AiRequest};
use crate::stream::{DeltaSink, StreamEvent, StreamFraming, UsageAccumulator};
use futures::StreamExt;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Drives a single call against one provider
pub struct StreamingCallAdapter<'a> {
    provider: &'a dyn Provider,
    http: &'a dyn HttpExecutor,
    timeout: Option<Duration>,
}

impl<'a> StreamingCallAdapter<'a> {
    pub fn new(provider: &'a dyn Provider, http: &'a dyn HttpExecutor) -> Self {
        Self {
            provider,
            http,
            timeout: None,
        }
    }

    /// Deadline for complete-body calls
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub async fn call(
        &self,
        request: &AiRequest,
        sink: &mut dyn DeltaSink,
    ) -> ProviderResult<AiCallResult> {
        self.call_with_id(request, Uuid::new_v4(), sink).await
    }

    /// Run the call with a caller-chosen correlation id
    pub async fn call_with_id(
        &self,
        request: &AiRequest,
        request_id: Uuid,
        sink: &mut dyn DeltaSink,
    ) -> ProviderResult<AiCallResult> {
        let mut options = RequestOptions::new().with_request_id(request_id);
        if let Some(timeout) = self.timeout {
            options = options.with_timeout(timeout);
        }

        let http_request = self.provider.build_request(request);

        info!(
            "Calling {} model {} [request_id: {}]",
            self.provider.name(),
            request.model,
            request_id
        );

        let result = match self.provider.framing() {
            Some(framing) if request.stream => {
                self.run_stream(&http_request, &options, framing, sink).await?
            }
            _ => {
                let body = self
                    .http
                    .execute_json(self.provider.provider_type(), &http_request, &options)
                    .await?;
                self.provider.parse_response(body)?
            }
        };

        info!(
            "Call to {} finished with {} chars, usage in={:?} out={:?} [request_id: {}]",
            self.provider.name(),
            result.content.len(),
            result.input_tokens,
            result.output_tokens,
            request_id
        );

        Ok(result)
    }

    async fn run_stream(
        &self,
        http_request: &ProviderRequest,
        options: &RequestOptions,
        framing: StreamFraming,
        sink: &mut dyn DeltaSink,
    ) -> ProviderResult<AiCallResult> {
        let provider_type = self.provider.provider_type();
        let body = self
            .http
            .execute_stream(provider_type, http_request, options)
            .await?;

        let mut fold = CallFold::new(UsageAccumulator::new(framing.usage_policy()));
        let mut events = framing.decode(provider_type, body);

        while let Some(event) = events.next().await {
            let event = event?;
            if event == StreamEvent::Done {
                debug!(
                    "Stream complete; not reading further body [request_id: {}]",
                    options.request_id
                );
            }
            fold.apply(event, sink);
        }

        Ok(fold.into_result())
    }
}

/// Accumulates the pieces of a result from decoder events
struct CallFold {
    content: String,
    usage: UsageAccumulator,
}

impl CallFold {
    fn new(usage: UsageAccumulator) -> Self {
        Self {
            content: String::new(),
            usage,
        }
    }

    fn apply(&mut self, event: StreamEvent, sink: &mut dyn DeltaSink) {
        match &event {
            StreamEvent::Delta { text } => {
                sink.on_delta(text);
                self.content.push_str(text);
            }
            StreamEvent::UsageUpdate { .. } => self.usage.record(&event),
            StreamEvent::Done => {}
        }
    }

    fn into_result(self) -> AiCallResult {
        let (input_tokens, output_tokens) = self.usage.finalize();
        AiCallResult::new(self.content, input_tokens, output_tokens)
    }
}
