//! Completion invoker: one call to a text-generation service per chat query.

mod backend;
mod error;
mod invoker;
mod openai;

pub use backend::{CompletionBackend, CompletionRequest};
pub use error::{classify_description, BackendError, FailureKind};
pub use invoker::{Invoker, DEFAULT_TIMEOUT, MAX_OUTPUT_TOKENS, SYSTEM_INSTRUCTION, TEMPERATURE};
pub use openai::{OpenAiBackend, DEFAULT_BASE_URL};
