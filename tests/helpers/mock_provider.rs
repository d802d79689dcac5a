// ABOUTME: Scripted mock LLM provider for relay and route tests
// ABOUTME: Yields a fixed chunk script and records calls, requests, and stream drops

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use switchboard::errors::AppError;
use switchboard::llm::{
    ChatRequest, ChatResponse, ChatStream, LlmProvider, StreamChunk, TokenUsage,
};

/// One scripted step in a mock streaming response
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Yield a content delta
    Delta(&'static str),
    /// Yield the final chunk carrying a finish reason
    Finish(&'static str),
    /// Fail the stream at this point
    Fail(&'static str),
}

/// Sets its flag when the owning stream is dropped, completed or not
struct DropGuard(Arc<AtomicBool>);

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Scripted LLM provider for exercising the relay without a network.
///
/// The streaming script is replayed for every `complete_stream` call. Call
/// counts, the last request seen, and whether the returned stream has been
/// dropped are all observable from the test.
pub struct MockProvider {
    script: Vec<ScriptStep>,
    completion: ChatResponse,
    healthy: bool,
    refusal: Option<&'static str>,
    /// Number of `complete` calls observed
    pub complete_calls: AtomicUsize,
    /// Number of `complete_stream` calls observed
    pub stream_calls: AtomicUsize,
    /// Set once a returned stream has been dropped
    pub stream_dropped: Arc<AtomicBool>,
    /// Most recent request passed to either completion method
    pub last_request: Mutex<Option<ChatRequest>>,
}

impl MockProvider {
    /// Mock that streams the given script.
    pub fn streaming(script: Vec<ScriptStep>) -> Self {
        Self {
            script,
            completion: Self::default_completion(),
            healthy: true,
            refusal: None,
            complete_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
            stream_dropped: Arc::new(AtomicBool::new(false)),
            last_request: Mutex::new(None),
        }
    }

    /// Mock that answers buffered completions with the given reply.
    pub fn completing(content: &str, total_tokens: u32, finish_reason: &str) -> Self {
        let mut mock = Self::streaming(Vec::new());
        mock.completion = ChatResponse {
            content: content.to_owned(),
            model: "mock-model".to_owned(),
            usage: Some(TokenUsage {
                prompt_tokens: 0,
                completion_tokens: total_tokens,
                total_tokens,
            }),
            finish_reason: Some(finish_reason.to_owned()),
        };
        mock
    }

    /// Mark the mock's health probe as failing.
    #[allow(dead_code)]
    pub fn unhealthy(mut self) -> Self {
        self.healthy = false;
        self
    }

    /// Mock that refuses every completion before producing anything.
    #[allow(dead_code)]
    pub fn refusing(message: &'static str) -> Self {
        let mut mock = Self::streaming(Vec::new());
        mock.refusal = Some(message);
        mock
    }

    /// The request captured by the most recent call, if any.
    pub fn captured_request(&self) -> Option<ChatRequest> {
        self.last_request.lock().unwrap().clone()
    }

    fn default_completion() -> ChatResponse {
        ChatResponse {
            content: "mock reply".to_owned(),
            model: "mock-model".to_owned(),
            usage: None,
            finish_reason: Some("stop".to_owned()),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, AppError> {
        self.complete_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(message) = self.refusal {
            return Err(AppError::external_service("mock", message));
        }
        Ok(self.completion.clone())
    }

    async fn complete_stream(&self, request: &ChatRequest) -> Result<ChatStream, AppError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        if let Some(message) = self.refusal {
            return Err(AppError::external_service("mock", message));
        }

        let script = self.script.clone();
        let dropped = self.stream_dropped.clone();

        let stream = async_stream::stream! {
            let _guard = DropGuard(dropped);
            for step in script {
                match step {
                    ScriptStep::Delta(text) => {
                        yield Ok(StreamChunk {
                            delta: text.to_owned(),
                            is_final: false,
                            finish_reason: None,
                        });
                    }
                    ScriptStep::Finish(reason) => {
                        yield Ok(StreamChunk {
                            delta: String::new(),
                            is_final: true,
                            finish_reason: Some(reason.to_owned()),
                        });
                    }
                    ScriptStep::Fail(message) => {
                        yield Err(AppError::external_service("mock", message));
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }

    async fn health_check(&self) -> Result<bool, AppError> {
        Ok(self.healthy)
    }
}
