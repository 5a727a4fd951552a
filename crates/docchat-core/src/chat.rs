//! One question/answer exchange against the active collection.
//!
//! [`Assistant::ask`] runs retrieval, assembles the prompt from the
//! collection's history and starts the model stream. The returned
//! [`Exchange`] hands out fragments for rendering while accumulating the
//! answer; [`Exchange::finish`] records the completed turn in the
//! [`Session`].
//!
//! ```rust,no_run
//! # use docchat_core::chat::Assistant;
//! # use docchat_core::history::Session;
//! # async fn run(assistant: Assistant<'_>, session: &mut Session) -> docchat_core::Result<()> {
//! let mut exchange = assistant.ask(session, "What does the policy cover?").await?;
//! while let Some(fragment) = exchange.next_fragment().await {
//!     print!("{}", fragment?);
//! }
//! exchange.finish(session).await?;
//! # Ok(())
//! # }
//! ```

use crate::embedding::Embedder;
use crate::error::{Error, Result};
use crate::history::Session;
use crate::models::ScoredChunk;
use crate::prompt::{Prompt, DEFAULT_PERSONA};
use crate::retrieve::retrieve;
use crate::stream::{ChatModel, ResponseStream};

/// Retrieval-augmented question answering over the session's active
/// collection.
pub struct Assistant<'a> {
    embedder: &'a dyn Embedder,
    model: &'a dyn ChatModel,
    persona: String,
}

impl<'a> Assistant<'a> {
    pub fn new(embedder: &'a dyn Embedder, model: &'a dyn ChatModel) -> Self {
        Self {
            embedder,
            model,
            persona: DEFAULT_PERSONA.to_string(),
        }
    }

    /// Replace the opening line of every prompt.
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    /// Start answering `question` against the active collection.
    ///
    /// # Errors
    ///
    /// - [`Error::NoActiveCollection`] when nothing is selected.
    /// - [`Error::Provider`] when embedding the question or starting the
    ///   model request fails.
    pub async fn ask(&self, session: &Session, question: &str) -> Result<Exchange> {
        let active = session.active().ok_or(Error::NoActiveCollection)?;

        let sources = retrieve(active.index.as_ref(), self.embedder, question).await?;
        let prompt = Prompt::assemble(
            &self.persona,
            session.get(&active.name),
            &sources,
            question,
        );

        tracing::info!(
            collection = %active.name,
            model = self.model.model_name(),
            passages = sources.len(),
            "asking model"
        );
        let stream = self.model.stream(&prompt).await?;

        Ok(Exchange {
            collection: active.name.clone(),
            question: question.to_string(),
            prompt,
            sources,
            stream,
            answer: String::new(),
            failed: false,
        })
    }
}

/// An answer being streamed for one question.
pub struct Exchange {
    collection: String,
    question: String,
    prompt: Prompt,
    sources: Vec<ScoredChunk>,
    stream: ResponseStream,
    answer: String,
    failed: bool,
}

impl Exchange {
    /// Next answer fragment, appended to [`answer`](Exchange::answer)
    /// before it is returned.
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        match self.stream.next_fragment().await? {
            Ok(fragment) => {
                self.answer.push_str(&fragment);
                Some(Ok(fragment))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    /// The answer received so far. After a failure this is the partial
    /// output that was already rendered.
    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    /// Passages that were placed in the prompt, most similar first.
    pub fn sources(&self) -> &[ScoredChunk] {
        &self.sources
    }

    /// Drain any remaining fragments and record the turn in `session`.
    ///
    /// Returns the full answer. A stream that failed is not recorded.
    pub async fn finish(mut self, session: &mut Session) -> Result<String> {
        if self.failed {
            return Err(Error::StreamInterrupted {
                message: "answer incomplete, not added to history".to_string(),
            });
        }
        while let Some(fragment) = self.next_fragment().await {
            fragment?;
        }
        session.append(&self.collection, &self.question, &self.answer);
        Ok(self.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::InMemoryIndex;
    use crate::index::VectorIndex;
    use crate::models::Chunk;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    struct AxisEmbedder;

    /// "flood" maps to one axis, everything else to the other.
    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model_name(&self) -> &str {
            "axis"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            Ok(texts
                .iter()
                .map(|t| {
                    if t.to_lowercase().contains("flood") {
                        vec![1.0, 0.0]
                    } else {
                        vec![0.0, 1.0]
                    }
                })
                .collect())
        }
    }

    /// Answers "not in the document" when the context is empty, echoes
    /// the context otherwise, and records every prompt it sees.
    struct ScriptedModel {
        prompts: Mutex<Vec<Prompt>>,
        fail_after_first: bool,
    }

    impl ScriptedModel {
        fn new() -> Self {
            Self {
                prompts: Mutex::new(Vec::new()),
                fail_after_first: false,
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn stream(&self, prompt: &Prompt) -> Result<ResponseStream> {
            self.prompts.lock().unwrap().push(prompt.clone());
            let answer = if prompt.context.is_empty() {
                "The document does not contain the answer.".to_string()
            } else {
                format!("According to the document: {}", prompt.context)
            };
            let (head, tail) = answer.split_at(4);
            let mut fragments = vec![Ok(head.to_string())];
            if self.fail_after_first {
                fragments.push(Err(Error::provider("chat completion", "connection reset")));
            } else {
                fragments.push(Ok(tail.to_string()));
            }
            Ok(ResponseStream::from_fragments(fragments))
        }
    }

    async fn flood_index() -> Arc<dyn VectorIndex> {
        let index = InMemoryIndex::new("policy");
        let chunk = Chunk {
            id: "c0".to_string(),
            chunk_index: 0,
            page: 0,
            text: "Flood damage is excluded.".to_string(),
            hash: String::new(),
        };
        index.add(&chunk, &[1.0, 0.0]).await.unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_ask_without_active_collection() {
        let model = ScriptedModel::new();
        let assistant = Assistant::new(&AxisEmbedder, &model);
        let session = Session::new();
        let err = assistant.ask(&session, "anything").await.err().unwrap();
        assert!(matches!(err, Error::NoActiveCollection));
    }

    #[tokio::test]
    async fn test_streamed_answer_is_recorded() {
        let model = ScriptedModel::new();
        let assistant = Assistant::new(&AxisEmbedder, &model);
        let mut session = Session::new();
        session.activate(flood_index().await);

        let mut exchange = assistant.ask(&session, "Are floods covered?").await.unwrap();
        assert_eq!(exchange.sources().len(), 1);
        let mut rendered = String::new();
        while let Some(fragment) = exchange.next_fragment().await {
            rendered.push_str(&fragment.unwrap());
        }
        let answer = exchange.finish(&mut session).await.unwrap();

        assert_eq!(rendered, answer);
        assert!(answer.contains("Flood damage is excluded."));
        let history = session.get("policy");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].question, "Are floods covered?");
        assert_eq!(history[0].answer, answer);
    }

    #[tokio::test]
    async fn test_no_matching_chunks_gives_empty_context() {
        let model = ScriptedModel::new();
        let assistant = Assistant::new(&AxisEmbedder, &model);
        let mut session = Session::new();
        session.activate(flood_index().await);

        let exchange = assistant.ask(&session, "Who is the CEO?").await.unwrap();
        assert!(exchange.sources().is_empty());
        assert!(exchange.prompt().context.is_empty());
        let answer = exchange.finish(&mut session).await.unwrap();
        assert!(answer.contains("does not contain the answer"));
    }

    #[tokio::test]
    async fn test_history_feeds_next_prompt() {
        let model = ScriptedModel::new();
        let assistant = Assistant::new(&AxisEmbedder, &model).with_persona("You help with insurance.");
        let mut session = Session::new();
        session.activate(flood_index().await);

        let first = assistant.ask(&session, "Are floods covered?").await.unwrap();
        first.finish(&mut session).await.unwrap();
        let second = assistant.ask(&session, "Why not?").await.unwrap();
        second.finish(&mut session).await.unwrap();

        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[0].history.is_empty());
        assert!(prompts[1].history.starts_with("User: Are floods covered?\nAssistant: "));
        assert_eq!(prompts[1].persona, "You help with insurance.");
    }

    #[tokio::test]
    async fn test_interrupted_stream_keeps_partial_and_skips_history() {
        let mut model = ScriptedModel::new();
        model.fail_after_first = true;
        let assistant = Assistant::new(&AxisEmbedder, &model);
        let mut session = Session::new();
        session.activate(flood_index().await);

        let mut exchange = assistant.ask(&session, "Are floods covered?").await.unwrap();
        assert_eq!(exchange.next_fragment().await.unwrap().unwrap(), "Acco");
        let err = exchange.next_fragment().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::StreamInterrupted { .. }));
        assert_eq!(exchange.answer(), "Acco");
        assert!(exchange.next_fragment().await.is_none());

        assert!(exchange.finish(&mut session).await.is_err());
        assert!(session.get("policy").is_empty());
    }
}
