//! Streamed model responses.
//!
//! [`ChatModel::stream`] starts a model request and hands back a
//! [`ResponseStream`]: a lazy, finite, non-restartable sequence of text
//! fragments. The consumer renders fragments as they arrive and
//! concatenates them into the full answer once the stream is exhausted.
//!
//! The stream ends after the model finishes or after the first error.
//! An error that follows at least one fragment is reported as
//! [`Error::StreamInterrupted`]; fragments already rendered stay valid and
//! nothing is retried. Dropping the stream cancels the underlying request.

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::{Error, Result};
use crate::prompt::Prompt;

/// A language model that answers a rendered prompt as a stream of text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Send the prompt and start streaming the answer.
    ///
    /// Failures before any output (connection, authentication, HTTP
    /// status) are returned here as [`Error::Provider`].
    async fn stream(&self, prompt: &Prompt) -> Result<ResponseStream>;
}

/// Text fragments of one model answer.
pub struct ResponseStream {
    inner: Option<BoxStream<'static, Result<String>>>,
    yielded: bool,
}

impl ResponseStream {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<String>> + Send + 'static,
    {
        Self {
            inner: Some(stream.boxed()),
            yielded: false,
        }
    }

    /// Build a stream from already-known fragments.
    pub fn from_fragments<I>(fragments: I) -> Self
    where
        I: IntoIterator<Item = Result<String>>,
        I::IntoIter: Send + 'static,
    {
        Self::new(stream::iter(fragments))
    }

    /// Next non-empty fragment, or `None` once the stream has ended.
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        self.next().await
    }

    /// True once the stream has completed or failed.
    pub fn is_finished(&self) -> bool {
        self.inner.is_none()
    }

    /// Drain the stream into the full answer text.
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl Stream for ResponseStream {
    type Item = Result<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };
            match ready!(inner.poll_next_unpin(cx)) {
                Some(Ok(fragment)) if fragment.is_empty() => continue,
                Some(Ok(fragment)) => {
                    this.yielded = true;
                    return Poll::Ready(Some(Ok(fragment)));
                }
                Some(Err(err)) => {
                    this.inner = None;
                    let err = if this.yielded {
                        interrupted(err)
                    } else {
                        err
                    };
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    this.inner = None;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

fn interrupted(err: Error) -> Error {
    match err {
        Error::StreamInterrupted { .. } => err,
        Error::Provider { message, .. } => Error::StreamInterrupted { message },
        other => Error::StreamInterrupted {
            message: other.to_string(),
        },
    }
}
