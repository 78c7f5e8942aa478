use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::conversation::{Conversation, Role, Snapshot};
use crate::server::{AskRequest, AskResponse};

/// Shown when the endpoint succeeds but carries no text.
pub const EMPTY_REPLY_FALLBACK: &str = "No response yet.";

/// Shown for any transport or endpoint failure. The real error never
/// reaches the transcript.
pub const ERROR_FALLBACK: &str = "Something went wrong. Try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Sending,
}

/// The widget's view of the ask endpoint. Production talks to the proxy
/// over HTTP; tests script the replies.
#[async_trait]
pub trait AskEndpoint: Send + Sync {
    async fn ask(&self, prompt: &str) -> Result<String>;
}

/// Talks to the proxy's `POST /api/ai`.
pub struct HttpAskEndpoint {
    client: Client,
    url: String,
}

impl HttpAskEndpoint {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            url: format!("{}/api/ai", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl AskEndpoint for HttpAskEndpoint {
    async fn ask(&self, prompt: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .json(&AskRequest {
                prompt: prompt.to_string(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "ask endpoint returned status {}",
                response.status()
            ));
        }

        let reply: AskResponse = response.json().await?;
        Ok(reply.text)
    }
}

/// Request lifecycle controller for one widget instance.
///
/// Owns the transcript and the draft, and guarantees at most one request
/// in flight: a `submit` while `Sending` is dropped, not queued. The
/// phase always returns to `Idle` once the in-flight task resolves,
/// whatever the outcome.
pub struct Assistant {
    conversation: Conversation,
    endpoint: Arc<dyn AskEndpoint>,
    pending: Option<JoinHandle<Result<String>>>,
    /// Not-yet-submitted input, edited by the shell per keystroke.
    pub draft: String,
}

impl Assistant {
    pub fn new(endpoint: Arc<dyn AskEndpoint>) -> Self {
        Self {
            conversation: Conversation::new(),
            endpoint,
            pending: None,
            draft: String::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        if self.pending.is_some() {
            Phase::Sending
        } else {
            Phase::Idle
        }
    }

    pub fn is_sending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Snapshot> {
        self.conversation.subscribe()
    }

    /// Start a submission. No-op when the trimmed input is empty or a
    /// request is already in flight; an accepted submission appends the
    /// user message, clears the draft, and spawns the endpoint call.
    pub fn submit(&mut self, raw_input: &str, context: Option<&str>) {
        let trimmed = raw_input.trim();
        if trimmed.is_empty() || self.pending.is_some() {
            return;
        }

        self.conversation.append(Role::User, trimmed);
        self.draft.clear();

        let prompt = compose_prompt(trimmed, context);
        let endpoint = self.endpoint.clone();
        self.pending = Some(tokio::spawn(
            async move { endpoint.ask(&prompt).await },
        ));
    }

    /// Submit whatever is currently in the draft.
    pub fn submit_draft(&mut self, context: Option<&str>) {
        let raw = self.draft.clone();
        self.submit(&raw, context);
    }

    /// Absorb the in-flight request if it has finished. Non-blocking;
    /// returns true when a reply (or fallback) landed in the transcript.
    pub async fn poll_reply(&mut self) -> bool {
        if !self.pending.as_ref().is_some_and(|task| task.is_finished()) {
            return false;
        }
        self.resolve_reply().await;
        true
    }

    /// Wait for the in-flight request and absorb its outcome. The pending
    /// handle is taken before the outcome is inspected, so the phase is
    /// back at `Idle` on every path out of here.
    pub async fn resolve_reply(&mut self) {
        let Some(task) = self.pending.take() else {
            return;
        };

        let outcome = match task.await {
            Ok(result) => result,
            Err(join_error) => Err(anyhow!("ask task failed: {}", join_error)),
        };

        let reply = match outcome {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => EMPTY_REPLY_FALLBACK.to_string(),
            Err(_) => ERROR_FALLBACK.to_string(),
        };
        self.conversation.append(Role::Assistant, reply);
    }
}

/// Outbound prompt: optional page-supplied context first, then the
/// question. The transcript keeps only the trimmed question.
fn compose_prompt(trimmed: &str, context: Option<&str>) -> String {
    match context.filter(|ctx| !ctx.is_empty()) {
        Some(ctx) => format!("Context: {}\nUser question: {}", ctx, trimmed),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    /// Scripted endpoint: records prompts, replies from a fixed result.
    struct FakeEndpoint {
        prompts: Mutex<Vec<String>>,
        reply: Result<String>,
    }

    impl FakeEndpoint {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Ok(text.to_string()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
                reply: Err(anyhow!("{}", message.to_string())),
            })
        }

        fn recorded(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AskEndpoint for FakeEndpoint {
        async fn ask(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(err) => Err(anyhow!("{}", err)),
            }
        }
    }

    /// Endpoint that holds every request open until released, so tests can
    /// observe the `Sending` phase deterministically.
    struct GatedEndpoint {
        gate: Notify,
    }

    #[async_trait]
    impl AskEndpoint for GatedEndpoint {
        async fn ask(&self, _prompt: &str) -> Result<String> {
            self.gate.notified().await;
            Ok("late reply".to_string())
        }
    }

    #[tokio::test]
    async fn test_end_to_end_with_context() {
        let endpoint = FakeEndpoint::replying("Rick is ...");
        let mut assistant = Assistant::new(endpoint.clone());

        assistant.submit("Who is Rick?", Some("Show: example universe"));
        assert_eq!(assistant.phase(), Phase::Sending);
        assistant.resolve_reply().await;

        assert_eq!(
            endpoint.recorded(),
            vec!["Context: Show: example universe\nUser question: Who is Rick?".to_string()]
        );
        let messages = assistant.conversation().messages().to_vec();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "Who is Rick?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Rick is ...");
        assert_eq!(assistant.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_prompt_without_context_is_bare() {
        let endpoint = FakeEndpoint::replying("ok");
        let mut assistant = Assistant::new(endpoint.clone());

        assistant.submit("  spaced out  ", None);
        assistant.resolve_reply().await;

        assert_eq!(endpoint.recorded(), vec!["spaced out".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_and_whitespace_input_rejected() {
        let endpoint = FakeEndpoint::replying("never sent");
        let mut assistant = Assistant::new(endpoint.clone());
        assistant.draft = "   ".to_string();

        assistant.submit("", None);
        assistant.submit("   ", None);

        assert!(assistant.conversation().is_empty());
        assert_eq!(assistant.phase(), Phase::Idle);
        assert_eq!(assistant.draft, "   ");
        assert!(endpoint.recorded().is_empty());
    }

    #[tokio::test]
    async fn test_single_flight_drops_overlapping_submit() {
        let endpoint = Arc::new(GatedEndpoint {
            gate: Notify::new(),
        });
        let mut assistant = Assistant::new(endpoint.clone());

        assistant.submit("first", None);
        assert!(assistant.is_sending());

        // A second submission while sending is dropped outright
        assistant.draft = "second".to_string();
        assistant.submit_draft(None);
        assert_eq!(assistant.conversation().len(), 1);
        assert_eq!(assistant.draft, "second");

        endpoint.gate.notify_one();
        assistant.resolve_reply().await;

        assert_eq!(assistant.conversation().len(), 2);
        assert_eq!(assistant.phase(), Phase::Idle);

        // A fresh submission is accepted once idle again
        assistant.submit("third", None);
        assert!(assistant.is_sending());
        endpoint.gate.notify_one();
        assistant.resolve_reply().await;
        assert_eq!(assistant.conversation().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_reply_becomes_placeholder() {
        let endpoint = FakeEndpoint::replying("");
        let mut assistant = Assistant::new(endpoint);

        assistant.submit("hello?", None);
        assistant.resolve_reply().await;

        let messages = assistant.conversation().messages().to_vec();
        assert_eq!(messages[1].content, EMPTY_REPLY_FALLBACK);
        assert_eq!(assistant.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_endpoint_failure_becomes_apology() {
        let endpoint = FakeEndpoint::failing("500 AI request failed");
        let mut assistant = Assistant::new(endpoint);

        assistant.submit("hello?", None);
        assistant.resolve_reply().await;

        let messages = assistant.conversation().messages().to_vec();
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, ERROR_FALLBACK);
        assert_eq!(assistant.phase(), Phase::Idle);

        // Failure is not fatal: the next submission goes through
        assistant.submit("again", None);
        assert!(assistant.is_sending());
    }

    #[tokio::test]
    async fn test_draft_cleared_only_on_acceptance() {
        let endpoint = FakeEndpoint::replying("ok");
        let mut assistant = Assistant::new(endpoint);

        assistant.draft = "Who is Rick?".to_string();
        assistant.submit_draft(None);
        assert_eq!(assistant.draft, "");
        assistant.resolve_reply().await;
    }

    #[tokio::test]
    async fn test_replies_interleave_in_submission_order() {
        let endpoint = FakeEndpoint::replying("answer");
        let mut assistant = Assistant::new(endpoint);

        assistant.submit("q1", None);
        assistant.resolve_reply().await;
        assistant.submit("q2", None);
        assistant.resolve_reply().await;

        let messages = assistant.conversation().messages().to_vec();
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q1", "answer", "q2", "answer"]);
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_poll_reply_is_noop_while_pending() {
        let endpoint = Arc::new(GatedEndpoint {
            gate: Notify::new(),
        });
        let mut assistant = Assistant::new(endpoint.clone());

        assistant.submit("slow one", None);
        assert!(!assistant.poll_reply().await);
        assert!(assistant.is_sending());

        endpoint.gate.notify_one();
        assistant.resolve_reply().await;
        assert!(!assistant.poll_reply().await);
        assert_eq!(assistant.conversation().len(), 2);
    }
}
