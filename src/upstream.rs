use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

pub const UPSTREAM_URL: &str = "https://api.openai.com/v1/responses";
pub const UPSTREAM_MODEL: &str = "gpt-4.1-mini";

/// Instruction prepended to every forwarded prompt. Server-owned; callers
/// of the proxy never see or influence it.
const INSTRUCTION_PREFIX: &str = "Give a concise character bio and trivia.";

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    input: String,
}

/// Client for the hosted completion service.
///
/// Holds the credential read at construction; the credential is never
/// logged and never appears in a response. An empty credential is allowed
/// and simply fails upstream with an auth error.
pub struct UpstreamClient {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl UpstreamClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            url: UPSTREAM_URL.to_string(),
            api_key: api_key.into(),
            model: UPSTREAM_MODEL.to_string(),
        }
    }

    /// Credential from the environment. A missing variable becomes an empty
    /// key, which surfaces later as an upstream auth failure rather than a
    /// startup crash.
    pub fn from_env() -> Self {
        Self::new(std::env::var("OPENAI_API_KEY").unwrap_or_default())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Forward a prompt and return the first extractable text fragment.
    ///
    /// A response whose payload carries no such fragment is a success with
    /// an empty string; only transport errors and non-2xx statuses are
    /// errors here.
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let request = CompletionRequest {
            model: &self.model,
            input: compose_input(prompt),
        };

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "upstream completion request failed with status {}",
                response.status()
            ));
        }

        let payload: Value = response.json().await?;
        Ok(extract_output_text(&payload).unwrap_or_default().to_string())
    }
}

fn compose_input(prompt: &str) -> String {
    format!("{} {}", INSTRUCTION_PREFIX, prompt)
}

/// Walk `output[0].content[0].text` in the upstream payload.
///
/// Any miss along the path (absent field, or a wrong type at any level)
/// yields `None`; the caller treats that the same as empty text.
pub fn extract_output_text(payload: &Value) -> Option<&str> {
    payload
        .get("output")?
        .get(0)?
        .get("content")?
        .get(0)?
        .get("text")?
        .as_str()
}
