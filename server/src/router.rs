use chat_protocol::{sanitize, validate, ControlCommand, ModelCatalog, Rejection, ValidationContext};
use completion::{CompletionBackend, FailureKind, Invoker};
use configuration::ChatConfiguration;

const PROMPT_PREVIEW: usize = 50;
const RESPONSE_PREVIEW: usize = 100;

/// Replies for failed completions.
pub fn failure_reply(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::InvalidCredential => "ERROR: Invalid OpenAI API key",
        FailureKind::ModelUnavailable => "ERROR: Model not available",
        FailureKind::RateLimited => "ERROR: Rate limit exceeded",
        FailureKind::Other => "ERROR: Failed to generate response",
    }
}

#[derive(Debug, Clone)]
pub struct RouterSettings {
    pub server_key: Option<String>,
    pub catalog: ModelCatalog,
    pub default_txt: String,
    pub log_queries: bool,
}

impl From<&ChatConfiguration> for RouterSettings {
    fn from(c: &ChatConfiguration) -> Self {
        Self {
            server_key: c.auth.api_key().map(str::to_string),
            catalog: c.catalog(),
            default_txt: c.response.default_txt.clone(),
            log_queries: c.logging.enabled,
        }
    }
}

/// Turns a query name into the TXT payload. Every query gets exactly one
/// string back, failures included.
pub struct Router<B> {
    settings: RouterSettings,
    // None when no backend credential is configured
    invoker: Option<Invoker<B>>,
}

impl<B: CompletionBackend> Router<B> {
    pub fn new(settings: RouterSettings, invoker: Option<Invoker<B>>) -> Self {
        Self { settings, invoker }
    }

    pub fn fallback(&self) -> &str {
        &self.settings.default_txt
    }

    pub async fn route(&self, query: &str) -> String {
        if let Some(command) = ControlCommand::parse(query) {
            if self.settings.log_queries {
                tracing::info!("control command: {:?}", command);
            }
            return command.reply(&self.settings.catalog);
        }

        self.chat(query).await
    }

    async fn chat(&self, query: &str) -> String {
        let ctx = ValidationContext {
            server_key: self.settings.server_key.as_deref(),
            backend_key_present: self.invoker.is_some(),
            catalog: &self.settings.catalog,
        };

        let chat = match validate(query, &ctx) {
            Ok(chat) => chat,
            Err(rejection) => {
                if self.settings.log_queries {
                    tracing::info!("rejected query of {} chars: {:?}", query.chars().count(), rejection);
                }
                return rejection.to_string();
            }
        };

        if self.settings.log_queries {
            tracing::info!(
                "model {}:{}, prompt: {}",
                chat.model_index,
                chat.model,
                preview(chat.prompt, PROMPT_PREVIEW)
            );
        }

        let Some(invoker) = &self.invoker else {
            return Rejection::BackendKeyMissing.to_string();
        };

        match invoker.invoke(chat.model, chat.prompt).await {
            Ok(text) => {
                let reply = sanitize(&text);
                if reply.is_empty() {
                    if self.settings.log_queries {
                        tracing::warn!("model {} returned nothing printable", chat.model);
                    }
                    return self.settings.default_txt.clone();
                }

                if self.settings.log_queries {
                    tracing::info!("response: {}", preview(&reply, RESPONSE_PREVIEW));
                }
                reply
            }
            Err(e) => {
                let kind = e.kind();
                if self.settings.log_queries {
                    tracing::warn!("completion failed ({:?}): {}", kind, e);
                }
                failure_reply(kind).to_string()
            }
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use completion::{BackendError, CompletionRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    pub(crate) const KEY: &str = "my-api-key";

    /// Answers every prompt with a fixed result and counts the calls.
    pub(crate) struct Scripted {
        pub(crate) calls: Arc<AtomicUsize>,
        reply: fn() -> Result<String, BackendError>,
    }

    #[async_trait]
    impl CompletionBackend for Scripted {
        async fn complete(&self, _request: &CompletionRequest<'_>) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    pub(crate) fn settings(server_key: Option<&str>) -> RouterSettings {
        RouterSettings {
            server_key: server_key.map(str::to_string),
            catalog: ["gpt-4o", "gpt-4o-mini"].into_iter().collect(),
            default_txt: "fallback answer".to_string(),
            log_queries: true,
        }
    }

    pub(crate) fn router(
        server_key: Option<&str>,
        reply: fn() -> Result<String, BackendError>,
    ) -> (Router<Scripted>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let backend = Scripted {
            calls: calls.clone(),
            reply,
        };
        let invoker = Invoker::new(backend, Duration::from_secs(1));
        (Router::new(settings(server_key), Some(invoker)), calls)
    }

    fn hello() -> Result<String, BackendError> {
        Ok("Hello back".to_string())
    }

    #[tokio::test]
    async fn ping_and_list_skip_auth_and_backend() {
        let (router, calls) = router(None, hello);

        assert_eq!(router.route("PING").await, "PONG");
        assert_eq!(router.route("LIST").await, "Available models: 0:gpt-4o | 1:gpt-4o-mini");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn short_queries_get_format_error() {
        let (router, calls) = router(Some(KEY), hello);

        for query in ["", "ping", "my-api-ke0", "PINGPINGPI"] {
            assert_eq!(router.route(query).await, Rejection::Format.to_string(), "query: {:?}", query);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn wrong_or_missing_key_never_reaches_backend() {
        let (keyed, calls) = router(Some(KEY), hello);
        assert_eq!(keyed.route("not-my-key0Hello").await, "ERROR: Invalid API key");

        let (unconfigured, unconfigured_calls) = router(None, hello);
        assert_eq!(
            unconfigured.route("my-api-key0Hello").await,
            "ERROR: Server API key not configured"
        );

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(unconfigured_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn out_of_range_model_names_the_bound() {
        let (router, calls) = router(Some(KEY), hello);

        assert_eq!(router.route("my-api-key2Hello").await, "ERROR: Invalid model index. Use 0-1");
        assert_eq!(router.route("my-api-key#Hello").await, "ERROR: Invalid model index. Use 0-1");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_backend_key_is_reported() {
        let router: Router<Scripted> = Router::new(settings(Some(KEY)), None);

        assert_eq!(router.route("my-api-key0Hello").await, "ERROR: OpenAI API key not configured");
        assert_eq!(router.route("my-api-key0   ").await, "ERROR: Empty prompt");
    }

    #[tokio::test]
    async fn completion_is_sanitized() {
        fn long_typographic() -> Result<String, BackendError> {
            Ok(format!(
                "\u{201C}DNS\u{201D} \u{2014} it\u{2019}s {}",
                "the phone book of the internet ".repeat(8)
            ))
        }

        let (router, calls) = router(Some(KEY), long_typographic);
        let reply = router.route("my-api-key1What is DNS?").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(reply.len(), 240);
        assert!(reply.starts_with("\"DNS\" - it's the phone book"));
        assert!(reply.ends_with("..."));
        assert!(reply.bytes().all(|b| (0x20..=0x7E).contains(&b)));
    }

    #[tokio::test]
    async fn short_completion_passes_through() {
        let (router, _) = router(Some(KEY), hello);
        assert_eq!(router.route("my-api-key0Hello").await, "Hello back");
    }

    #[tokio::test]
    async fn unprintable_completion_falls_back() {
        fn emoji() -> Result<String, BackendError> {
            Ok("\u{1F44B}\u{1F30D}".to_string())
        }

        let (router, _) = router(Some(KEY), emoji);
        assert_eq!(router.route("my-api-key0Hello").await, "fallback answer");
    }

    #[tokio::test]
    async fn backend_failures_map_to_replies() {
        fn bad_key() -> Result<String, BackendError> {
            Err(BackendError::Opaque("Incorrect API key provided".to_string()))
        }
        fn no_model() -> Result<String, BackendError> {
            Err(BackendError::Opaque("The model does not exist".to_string()))
        }
        fn throttled() -> Result<String, BackendError> {
            Err(BackendError::Opaque("Rate limit reached".to_string()))
        }
        fn broken() -> Result<String, BackendError> {
            Err(BackendError::Malformed("no choices".to_string()))
        }

        let cases: [(fn() -> Result<String, BackendError>, &str); 4] = [
            (bad_key, "ERROR: Invalid OpenAI API key"),
            (no_model, "ERROR: Model not available"),
            (throttled, "ERROR: Rate limit exceeded"),
            (broken, "ERROR: Failed to generate response"),
        ];

        for (reply, expected) in cases {
            let (router, calls) = router(Some(KEY), reply);
            assert_eq!(router.route("my-api-key0Hello").await, expected);
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn replies_do_not_depend_on_query_logging() {
        let quiet_calls = Arc::new(AtomicUsize::new(0));
        let quiet = Router::new(
            RouterSettings {
                log_queries: false,
                ..settings(Some(KEY))
            },
            Some(Invoker::new(
                Scripted {
                    calls: quiet_calls.clone(),
                    reply: hello,
                },
                Duration::from_secs(1),
            )),
        );
        let (verbose, verbose_calls) = router(Some(KEY), hello);

        for query in ["PING", "LIST", "short", "not-my-key0Hello", "my-api-key7Hello", "my-api-key0Hello"] {
            assert_eq!(quiet.route(query).await, verbose.route(query).await, "query: {:?}", query);
        }
        assert_eq!(quiet.route("my-api-key0Hello").await, "Hello back");
        assert_eq!(quiet_calls.load(Ordering::SeqCst), verbose_calls.load(Ordering::SeqCst) + 1);
    }

    #[test]
    fn preview_cuts_on_characters() {
        assert_eq!(preview("short", 50), "short");
        assert_eq!(preview("\u{e9}\u{e9}\u{e9}", 2), "\u{e9}\u{e9}...");
    }
}
