//! Validation of chat queries.
//!
//! A chat query is `<key><digit><prompt>`: a 10 character API key, a single
//! model selector digit and the prompt text. Each step below either hands the
//! query on or rejects it with the reply the client will see.

use crate::catalog::ModelCatalog;
use std::fmt;

pub const KEY_LENGTH: usize = 10;
pub const MIN_QUERY_LENGTH: usize = KEY_LENGTH + 1;

/// A rejected query. The `Display` form is the TXT reply, clients look for the
/// `ERROR:` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("ERROR: Invalid format. Use: <10-char-key><model-digit><prompt>")]
    Format,
    #[error("ERROR: Server API key not configured")]
    ServerKeyMissing,
    #[error("ERROR: Invalid API key")]
    InvalidKey,
    #[error("ERROR: Invalid model index. Use 0-{}", .size.saturating_sub(1))]
    InvalidModel { size: usize },
    #[error("ERROR: Empty prompt")]
    EmptyPrompt,
    #[error("ERROR: OpenAI API key not configured")]
    BackendKeyMissing,
}

/// What the chain checks a query against.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    pub server_key: Option<&'a str>,
    pub backend_key_present: bool,
    pub catalog: &'a ModelCatalog,
}

/// A query split into its fixed-width fields.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ChatRequest<'a> {
    key: &'a str,
    model_digit: &'a str,
    prompt: &'a str,
}

impl<'a> ChatRequest<'a> {
    pub fn model_digit(&self) -> &'a str {
        self.model_digit
    }

    pub fn prompt(&self) -> &'a str {
        self.prompt
    }
}

// keeps the key out of log lines
impl fmt::Debug for ChatRequest<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ChatRequest")
            .field("key", &"<redacted>")
            .field("model_digit", &self.model_digit)
            .field("prompt", &self.prompt)
            .finish()
    }
}

/// A query that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedChat<'a> {
    pub model_index: usize,
    pub model: &'a str,
    pub prompt: &'a str,
}

pub fn validate<'a>(query: &'a str, ctx: &ValidationContext<'a>) -> Result<ValidatedChat<'a>, Rejection> {
    let request = check_format(query)?;
    check_auth(&request, ctx.server_key)?;
    let (model_index, model) = check_model(&request, ctx.catalog)?;
    let prompt = check_prompt(&request, ctx.backend_key_present)?;

    Ok(ValidatedChat {
        model_index,
        model,
        prompt,
    })
}

/// Length check followed by the field split. Lengths count characters.
pub fn check_format(query: &str) -> Result<ChatRequest<'_>, Rejection> {
    let key_end = char_boundary(query, KEY_LENGTH).ok_or(Rejection::Format)?;
    let digit_end = char_boundary(query, MIN_QUERY_LENGTH).ok_or(Rejection::Format)?;

    Ok(ChatRequest {
        key: &query[..key_end],
        model_digit: &query[key_end..digit_end],
        prompt: &query[digit_end..],
    })
}

pub fn check_auth(request: &ChatRequest<'_>, server_key: Option<&str>) -> Result<(), Rejection> {
    let server_key = server_key.ok_or(Rejection::ServerKeyMissing)?;

    if keys_match(request.key.as_bytes(), server_key.as_bytes()) {
        Ok(())
    } else {
        Err(Rejection::InvalidKey)
    }
}

pub fn check_model<'c>(request: &ChatRequest<'_>, catalog: &'c ModelCatalog) -> Result<(usize, &'c str), Rejection> {
    let invalid = Rejection::InvalidModel { size: catalog.len() };

    let index = request.model_digit.parse::<usize>().map_err(|_| invalid)?;
    let model = catalog.identifier_at(index).map_err(|_| invalid)?;

    Ok((index, model))
}

pub fn check_prompt<'a>(request: &ChatRequest<'a>, backend_key_present: bool) -> Result<&'a str, Rejection> {
    let prompt = request.prompt.trim();

    if prompt.is_empty() {
        return Err(Rejection::EmptyPrompt);
    }
    if !backend_key_present {
        return Err(Rejection::BackendKeyMissing);
    }

    Ok(prompt)
}

// byte offset after the first `n` characters
fn char_boundary(s: &str, n: usize) -> Option<usize> {
    s.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(s.len()))
        .nth(n)
}

// runs over the whole key regardless of where the first difference is
fn keys_match(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        return false;
    }

    provided
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
