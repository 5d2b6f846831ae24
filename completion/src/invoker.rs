use crate::backend::{CompletionBackend, CompletionRequest};
use crate::error::BackendError;
use std::time::Duration;

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant answering over DNS TXT records. \
     Keep every reply under 200 characters. Use plain ASCII only: no emoji, \
     no smart quotes, no special symbols.";
pub const MAX_OUTPUT_TOKENS: u32 = 200;
pub const TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Sends one prompt to the backend with fixed generation settings and an
/// upper bound on how long the caller waits.
pub struct Invoker<B> {
    backend: B,
    timeout: Duration,
}

impl<B: CompletionBackend> Invoker<B> {
    pub fn new(backend: B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn invoke(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        let request = CompletionRequest {
            model,
            system: SYSTEM_INSTRUCTION,
            prompt,
            max_tokens: MAX_OUTPUT_TOKENS,
            temperature: TEMPERATURE,
        };

        match tokio::time::timeout(self.timeout, self.backend.complete(&request)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout)),
        }
    }
}
