//! Chat model providers.
//!
//! Each provider sends the rendered [`Prompt`] as a single user message and
//! turns the HTTP response into a [`ResponseStream`]:
//!
//! | Provider | Endpoint | Wire format |
//! |----------|----------|-------------|
//! | `openai` | `POST {url}/chat/completions` | SSE `data:` lines, `[DONE]` terminator |
//! | `ollama` | `POST {url}/api/chat` | newline-delimited JSON, `"done": true` terminator |
//! | `disabled` | none | always fails |
//!
//! With `stream = false` the provider makes one non-streamed request and
//! yields the whole answer as a single fragment. Requests are never
//! retried.

use anyhow::{bail, Context};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};
use std::collections::VecDeque;
use std::time::Duration;

use docchat_core::prompt::Prompt;
use docchat_core::stream::{ChatModel, ResponseStream};
use docchat_core::{Error, Result};

use crate::config::LlmConfig;

const OPENAI_URL: &str = "https://api.openai.com/v1";
const OLLAMA_URL: &str = "http://localhost:11434";
const OPERATION: &str = "chat completion";

pub fn create_chat_model(config: &LlmConfig) -> anyhow::Result<Box<dyn ChatModel>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledChat)),
        "openai" => Ok(Box::new(OpenAIChat::new(config)?)),
        "ollama" => Ok(Box::new(OllamaChat::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

/// `timeout_secs` bounds the wait for each read, not the whole response.
fn http_client(timeout_secs: u64) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .read_timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Non-streamed requests are also bounded as a whole.
fn with_total_timeout(
    request: reqwest::RequestBuilder,
    stream: bool,
    timeout: Duration,
) -> reqwest::RequestBuilder {
    if stream {
        request
    } else {
        request.timeout(timeout)
    }
}

// ============ Disabled ============

pub struct DisabledChat;

#[async_trait]
impl ChatModel for DisabledChat {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn stream(&self, _prompt: &Prompt) -> Result<ResponseStream> {
        Err(Error::provider(
            OPERATION,
            "language model is disabled; set [llm] provider in the config",
        ))
    }
}

// ============ OpenAI ============

pub struct OpenAIChat {
    model: String,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    api_key: String,
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAIChat {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::with_key(config, api_key)
    }

    fn with_key(config: &LlmConfig, api_key: String) -> anyhow::Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: config.stream,
            api_key,
            base_url: config
                .url
                .clone()
                .unwrap_or_else(|| OPENAI_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAIChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, prompt: &Prompt) -> Result<ResponseStream> {
        let body = serde_json::json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "stream": self.stream,
            "messages": [{"role": "user", "content": prompt.render()}],
        });
        let response = send(with_total_timeout(
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&body),
            self.stream,
            self.timeout,
        ))
        .await?;

        if !self.stream {
            let json = read_json(response).await?;
            let answer = json
                .pointer("/choices/0/message/content")
                .and_then(|c| c.as_str())
                .ok_or_else(|| Error::provider(OPERATION, "response has no message content"))?;
            return Ok(ResponseStream::from_fragments(vec![Ok(answer.to_string())]));
        }

        Ok(ResponseStream::new(decode_lines(
            response.bytes_stream(),
            parse_sse_line,
        )))
    }
}

/// Decode one SSE line of an OpenAI chat completion stream.
fn parse_sse_line(line: &str) -> std::result::Result<Decoded, String> {
    let Some(payload) = line.strip_prefix("data:") else {
        // Comments, `event:` and `id:` lines carry no text.
        return Ok(Decoded::skip());
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(Decoded::done(None));
    }
    let json: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| format!("invalid stream event: {}", e))?;
    if let Some(err) = json.get("error") {
        return Err(error_message(err));
    }
    let fragment = json
        .pointer("/choices/0/delta/content")
        .and_then(|c| c.as_str())
        .map(str::to_string);
    Ok(Decoded {
        fragment,
        done: false,
    })
}

// ============ Ollama ============

pub struct OllamaChat {
    model: String,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaChat {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        Ok(Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            stream: config.stream,
            url: config
                .url
                .clone()
                .unwrap_or_else(|| OLLAMA_URL.to_string()),
            timeout: Duration::from_secs(config.timeout_secs),
            client: http_client(config.timeout_secs)?,
        })
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream(&self, prompt: &Prompt) -> Result<ResponseStream> {
        let body = serde_json::json!({
            "model": self.model,
            "stream": self.stream,
            "options": {
                "temperature": self.temperature,
                "num_predict": self.max_tokens,
            },
            "messages": [{"role": "user", "content": prompt.render()}],
        });
        let response = send(with_total_timeout(
            self.client.post(format!("{}/api/chat", self.url)).json(&body),
            self.stream,
            self.timeout,
        ))
        .await
        .map_err(|e| match e {
            Error::Provider { operation, message } if message.starts_with("network error") => {
                Error::Provider {
                    operation,
                    message: format!("{} (is Ollama running at {}?)", message, self.url),
                }
            }
            other => other,
        })?;

        if !self.stream {
            let json = read_json(response).await?;
            let answer = json
                .pointer("/message/content")
                .and_then(|c| c.as_str())
                .ok_or_else(|| Error::provider(OPERATION, "response has no message content"))?;
            return Ok(ResponseStream::from_fragments(vec![Ok(answer.to_string())]));
        }

        Ok(ResponseStream::new(decode_lines(
            response.bytes_stream(),
            parse_ollama_line,
        )))
    }
}

/// Decode one NDJSON line of an Ollama chat stream.
fn parse_ollama_line(line: &str) -> std::result::Result<Decoded, String> {
    let json: serde_json::Value =
        serde_json::from_str(line).map_err(|e| format!("invalid stream event: {}", e))?;
    if let Some(err) = json.get("error") {
        return Err(error_message(err));
    }
    let fragment = json
        .pointer("/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string);
    let done = json.get("done").and_then(|d| d.as_bool()).unwrap_or(false);
    Ok(Decoded { fragment, done })
}

// ============ Shared plumbing ============

/// What one line of a streamed response contributed.
#[derive(Debug, PartialEq)]
struct Decoded {
    fragment: Option<String>,
    /// The provider signalled the end of the answer.
    done: bool,
}

impl Decoded {
    fn skip() -> Self {
        Self {
            fragment: None,
            done: false,
        }
    }

    fn done(fragment: Option<String>) -> Self {
        Self {
            fragment,
            done: true,
        }
    }
}

fn error_message(err: &serde_json::Value) -> String {
    err.get("message")
        .and_then(|m| m.as_str())
        .or_else(|| err.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}

async fn send(request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let response = request
        .send()
        .await
        .map_err(|e| Error::provider(OPERATION, format!("network error: {}", e)))?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::provider(
            OPERATION,
            format!("HTTP {}: {}", status, body.trim()),
        ));
    }
    Ok(response)
}

async fn read_json(response: reqwest::Response) -> Result<serde_json::Value> {
    response
        .json()
        .await
        .map_err(|e| Error::provider(OPERATION, format!("invalid response: {}", e)))
}

struct LineState<T> {
    bytes: BoxStream<'static, T>,
    buffer: Vec<u8>,
    pending: VecDeque<Result<String>>,
    finished: bool,
}

/// Split a byte stream into lines and decode each with `parse`.
///
/// Lines are split on raw bytes so multi-byte characters that straddle
/// network chunks survive. The stream ends at the first error, after a
/// line reports `done`, or when the body ends.
fn decode_lines<S, B, E>(
    bytes: S,
    parse: fn(&str) -> std::result::Result<Decoded, String>,
) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = LineState {
        bytes: bytes.boxed(),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(chunk.as_ref());
                    while let Some(pos) = state.buffer.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                        if feed_line(&mut state, &line, parse) {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(Error::provider(OPERATION, format!("network error: {}", e))));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    feed_line(&mut state, &rest, parse);
                }
            }
        }
    })
}

/// Decode one line into `state.pending`. Returns true once the stream is
/// finished.
fn feed_line<T>(
    state: &mut LineState<T>,
    line: &[u8],
    parse: fn(&str) -> std::result::Result<Decoded, String>,
) -> bool {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    if line.is_empty() {
        return state.finished;
    }
    match parse(line) {
        Ok(decoded) => {
            if let Some(fragment) = decoded.fragment {
                state.pending.push_back(Ok(fragment));
            }
            if decoded.done {
                state.finished = true;
            }
        }
        Err(message) => {
            state.pending.push_back(Err(Error::provider(OPERATION, message)));
            state.finished = true;
        }
    }
    state.finished
}
