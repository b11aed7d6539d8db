//! Ollama embedding and generation providers.
//!
//! This module is only available when the `ollama` feature is enabled. Both
//! providers talk to a local Ollama server over HTTP:
//!
//! - `POST /api/embed` for batched embeddings
//! - `POST /api/generate` for one-off completions
//! - `POST /api/chat` for conversational completions with history
//!
//! Clients load once on a background task started at construction. The
//! embedder's load performs a warmup embedding so the server pulls the model
//! into memory before the first real request; the generator's load checks
//! that the server is reachable. The first call on either provider suspends
//! until its load finishes, and a failed load is replayed to every later
//! call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::GenerationProvider;
use crate::loading::ClientCell;

/// The default Ollama server endpoint.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Environment variable overriding the endpoint in [`OllamaEmbedder::from_env`]
/// and [`OllamaGenerator::from_env`].
pub const ENDPOINT_ENV: &str = "OLLAMA_HOST";

/// The default embedding model.
pub const DEFAULT_EMBED_MODEL: &str = "nomic-embed-text";

/// The default generation model.
pub const DEFAULT_CHAT_MODEL: &str = "llama3.2";

/// Maximum texts per `/api/embed` request. Callers see one logical batch
/// whatever its size.
const EMBED_BATCH_SIZE: usize = 32;

fn endpoint_from_env() -> String {
    std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
}

fn embedding_error(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: "Ollama".into(), message: message.into() }
}

fn generation_error(message: impl Into<String>) -> RagError {
    RagError::GenerationError { provider: "Ollama".into(), message: message.into() }
}

/// Treat whitespace-only model output as no output.
fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

// ── Ollama API request/response types ──────────────────────────────

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// One conversation turn in the wire format `/api/chat` expects.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    message: Option<ChatResponseMessage>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: String,
}

// ── Embedding provider ─────────────────────────────────────────────

/// Handle produced by the embedder's load task.
struct EmbedClient {
    http: reqwest::Client,
    url: String,
    /// Embedding width reported by the warmup request.
    dimensions: usize,
}

async fn load_embed_client(
    url: String,
    model: String,
) -> std::result::Result<EmbedClient, String> {
    let http = reqwest::Client::new();
    // Embedding an empty input makes the server pull the model into memory
    // and reveals the vector width.
    let request = EmbedRequest { model: &model, input: vec![""] };
    let response = http
        .post(&url)
        .json(&request)
        .send()
        .await
        .map_err(|e| format!("warmup request failed: {e}"))?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(format!("warmup returned {status}: {body}"));
    }
    let parsed: EmbedResponse =
        response.json().await.map_err(|e| format!("failed to parse warmup response: {e}"))?;
    let dimensions = match parsed.embeddings.first() {
        Some(vector) if !vector.is_empty() => vector.len(),
        _ => return Err(format!("model '{model}' returned no warmup embedding")),
    };
    debug!(provider = "Ollama", model = %model, dimensions, "embedding model loaded");
    Ok(EmbedClient { http, url, dimensions })
}

/// An [`EmbeddingProvider`] backed by a local Ollama server.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::ollama::OllamaEmbedder;
///
/// let provider = OllamaEmbedder::from_env();
/// let embeddings = provider.embed(&["hello world"]).await?;
/// ```
pub struct OllamaEmbedder {
    model: String,
    cell: ClientCell<EmbedClient>,
}

impl OllamaEmbedder {
    /// Create a provider against `endpoint` and start loading `model` in the
    /// background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let url = format!("{}/api/embed", endpoint.into().trim_end_matches('/'));
        let load_model = model.clone();
        let cell = ClientCell::spawn(load_embed_client(url, load_model));
        Self { model, cell }
    }

    /// Create a provider against `OLLAMA_HOST` (or the local default) with
    /// the default embedding model.
    pub fn from_env() -> Self {
        Self::new(endpoint_from_env(), DEFAULT_EMBED_MODEL)
    }

    async fn client(&self) -> Result<std::sync::Arc<EmbedClient>> {
        self.cell.get().await.map_err(embedding_error)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let client = self.client().await?;

        debug!(provider = "Ollama", model = %self.model, batch = texts.len(), "embedding batch");

        let mut vectors = Vec::with_capacity(texts.len());
        for window in texts.chunks(EMBED_BATCH_SIZE) {
            let request = EmbedRequest { model: &self.model, input: window.to_vec() };
            let response = client
                .http
                .post(&client.url)
                .json(&request)
                .send()
                .await
                .map_err(|e| {
                    error!(provider = "Ollama", error = %e, "embed request failed");
                    embedding_error(format!("request failed: {e}"))
                })?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                error!(provider = "Ollama", %status, "embed API error");
                return Err(embedding_error(format!("API returned {status}: {body}")));
            }

            let parsed: EmbedResponse = response.json().await.map_err(|e| {
                error!(provider = "Ollama", error = %e, "failed to parse embed response");
                embedding_error(format!("failed to parse response: {e}"))
            })?;

            if parsed.embeddings.len() != window.len() {
                return Err(embedding_error(format!(
                    "expected {} embeddings, got {}",
                    window.len(),
                    parsed.embeddings.len()
                )));
            }
            for vector in &parsed.embeddings {
                if vector.len() != client.dimensions {
                    return Err(embedding_error(format!(
                        "embedding width changed from {} to {}",
                        client.dimensions,
                        vector.len()
                    )));
                }
            }
            vectors.extend(parsed.embeddings);
        }
        Ok(vectors)
    }

    async fn ready(&self) -> Result<()> {
        self.client().await.map(|_| ())
    }
}

// ── Generation provider ────────────────────────────────────────────

/// Handle produced by the generator's load task.
struct ChatClient {
    http: reqwest::Client,
    generate_url: String,
    chat_url: String,
}

async fn load_chat_client(endpoint: String) -> std::result::Result<ChatClient, String> {
    let http = reqwest::Client::new();
    let response = http
        .get(format!("{endpoint}/api/version"))
        .send()
        .await
        .map_err(|e| format!("server unreachable: {e}"))?;
    if !response.status().is_success() {
        return Err(format!("version check returned {}", response.status()));
    }
    debug!(provider = "Ollama", endpoint = %endpoint, "generation client ready");
    Ok(ChatClient {
        http,
        generate_url: format!("{endpoint}/api/generate"),
        chat_url: format!("{endpoint}/api/chat"),
    })
}

/// A [`GenerationProvider`] backed by a local Ollama server.
///
/// Conversation history lives on the instance; [`chat`](GenerationProvider::chat)
/// turns append to it and [`clear_history`](GenerationProvider::clear_history)
/// drops it.
///
/// # Example
///
/// ```rust,ignore
/// use docvault_rag::ollama::OllamaGenerator;
///
/// let provider = OllamaGenerator::from_env();
/// let answer = provider.query("Why is the sky blue?").await?;
/// ```
pub struct OllamaGenerator {
    model: String,
    cell: ClientCell<ChatClient>,
    history: Mutex<Vec<ChatMessage>>,
}

impl OllamaGenerator {
    /// Create a provider against `endpoint` for `model` and start checking
    /// the server in the background.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        Self {
            model: model.into(),
            cell: ClientCell::spawn(load_chat_client(endpoint)),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider against `OLLAMA_HOST` (or the local default) with
    /// the default generation model.
    pub fn from_env() -> Self {
        Self::new(endpoint_from_env(), DEFAULT_CHAT_MODEL)
    }

    async fn client(&self) -> Result<std::sync::Arc<ChatClient>> {
        self.cell.get().await.map_err(generation_error)
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    async fn query(&self, prompt: &str) -> Result<Option<String>> {
        let client = self.client().await?;

        debug!(provider = "Ollama", model = %self.model, prompt_len = prompt.len(), "generate");

        let request = GenerateRequest { model: &self.model, prompt, stream: false };
        let response = client
            .http
            .post(&client.generate_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "generate request failed");
                generation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "Ollama", %status, "generate API error");
            return Err(generation_error(format!("API returned {status}: {body}")));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse generate response");
            generation_error(format!("failed to parse response: {e}"))
        })?;

        Ok(non_empty(parsed.response))
    }

    async fn chat(&self, prompt: &str) -> Result<Option<String>> {
        let client = self.client().await?;

        // The lock is held across the request, so turns on one instance
        // cannot interleave mid-flight.
        let mut history = self.history.lock().await;
        history.push(ChatMessage { role: "user", content: prompt.to_string() });

        debug!(provider = "Ollama", model = %self.model, turns = history.len(), "chat");

        let request =
            ChatRequest { model: &self.model, messages: history.as_slice(), stream: false };
        let response = client
            .http
            .post(&client.chat_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(provider = "Ollama", error = %e, "chat request failed");
                generation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(provider = "Ollama", %status, "chat API error");
            return Err(generation_error(format!("API returned {status}: {body}")));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = "Ollama", error = %e, "failed to parse chat response");
            generation_error(format!("failed to parse response: {e}"))
        })?;

        let reply = parsed.message.map(|m| m.content).and_then(non_empty);
        if let Some(text) = &reply {
            history.push(ChatMessage { role: "assistant", content: text.clone() });
        }
        Ok(reply)
    }

    async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    async fn ready(&self) -> Result<()> {
        self.client().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embed_request_wire_format() {
        let request = EmbedRequest { model: "nomic-embed-text", input: vec!["a", "b"] };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "nomic-embed-text", "input": ["a", "b"]})
        );
    }

    #[test]
    fn embed_response_parses() {
        let parsed: EmbedResponse =
            serde_json::from_str(r#"{"model":"m","embeddings":[[0.1,0.2],[0.3,0.4]]}"#).unwrap();
        assert_eq!(parsed.embeddings.len(), 2);
        assert_eq!(parsed.embeddings[0], vec![0.1, 0.2]);
    }

    #[test]
    fn generate_request_disables_streaming() {
        let request = GenerateRequest { model: "llama3.2", prompt: "hi", stream: false };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], serde_json::json!(false));
    }

    #[test]
    fn generate_response_tolerates_missing_text() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert_eq!(parsed.response, "");
        assert!(non_empty(parsed.response).is_none());
    }

    #[test]
    fn chat_request_carries_the_whole_history() {
        let history = vec![
            ChatMessage { role: "user", content: "hi".into() },
            ChatMessage { role: "assistant", content: "hello".into() },
        ];
        let request = ChatRequest { model: "llama3.2", messages: &history, stream: false };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn chat_response_parses_with_and_without_message() {
        let parsed: ChatResponse =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":"hey"}}"#).unwrap();
        assert_eq!(parsed.message.unwrap().content, "hey");

        let empty: ChatResponse = serde_json::from_str(r#"{"done":true}"#).unwrap();
        assert!(empty.message.is_none());
    }

    #[test]
    fn whitespace_output_counts_as_no_output() {
        assert_eq!(non_empty("  \n ".to_string()), None);
        assert_eq!(non_empty("answer".to_string()), Some("answer".to_string()));
    }

    #[tokio::test]
    async fn empty_batch_never_touches_the_backend() {
        // Unroutable endpoint: any request would fail, an empty batch succeeds.
        let provider = OllamaEmbedder::new("http://127.0.0.1:9", "nomic-embed-text");
        let embeddings = provider.embed(&[]).await.unwrap();
        assert!(embeddings.is_empty());
    }
}
