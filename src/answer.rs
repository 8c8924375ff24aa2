//! Retrieval-augmented answering.
//!
//! [`AnswerSynthesizer`] retrieves the top chunks for a question, joins
//! their text into one context block, and asks the configured
//! [`Generator`] to answer the question from that context.

use std::sync::Arc;

use corpus_rag_core::generation::{ChatMessage, Generator};
use corpus_rag_core::models::SearchResult;
use corpus_rag_core::Result;

use crate::config::Config;
use crate::engine::{open_engine, RetrievalEngine};
use crate::generation::create_generator;

/// Reply used when retrieval finds nothing to ground an answer on.
pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find any relevant information in the indexed corpus to answer your question.";

/// Placed between chunk texts in the context block.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// A generated answer and the chunks it was grounded on.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    /// Empty when no context was found and [`NO_CONTEXT_ANSWER`] was returned.
    pub sources: Vec<SearchResult>,
}

pub struct AnswerSynthesizer {
    engine: Arc<RetrievalEngine>,
    generator: Arc<dyn Generator>,
    k: usize,
}

impl AnswerSynthesizer {
    pub fn new(engine: Arc<RetrievalEngine>, generator: Arc<dyn Generator>, k: usize) -> Self {
        Self {
            engine,
            generator,
            k,
        }
    }

    /// Answer `question`, propagating retrieval and generation failures.
    pub async fn try_answer(&self, question: &str) -> Result<Answer> {
        let results = self.engine.try_search(question, self.k).await?;
        self.synthesize(question, results).await
    }

    /// Answer `question` for display.
    ///
    /// Retrieval problems degrade to [`NO_CONTEXT_ANSWER`]; a generation
    /// failure becomes an apology message that includes the error.
    pub async fn answer(&self, question: &str) -> String {
        let results = self.engine.search(question, self.k).await;
        match self.synthesize(question, results).await {
            Ok(answer) => answer.text,
            Err(e) => {
                tracing::warn!(error = %e, "answer generation failed");
                format!(
                    "Sorry, I encountered an error while trying to answer your question: {}",
                    e
                )
            }
        }
    }

    async fn synthesize(&self, question: &str, results: Vec<SearchResult>) -> Result<Answer> {
        if results.is_empty() {
            return Ok(Answer {
                text: NO_CONTEXT_ANSWER.to_string(),
                sources: Vec::new(),
            });
        }

        let context = build_context(&results);
        let messages = vec![ChatMessage::user(build_prompt(question, &context))];
        tracing::info!(
            model = self.generator.model_name(),
            chunks = results.len(),
            context_chars = context.chars().count(),
            "sending question to generator"
        );

        let text = self.generator.generate(&messages).await?;
        Ok(Answer {
            text,
            sources: results,
        })
    }
}

/// Join chunk texts, best match first, with [`CONTEXT_SEPARATOR`].
pub fn build_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

/// The single user prompt sent to the generator.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are an expert software engineer.\n\
         Based on the following context, answer the question.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Keep the following in mind while answering:\n\
         - Your final output should always be a concise answer to the question.\n\
         - Provide relevant code snippets from the context if necessary.\n\
         - Format the answer as markdown.\n"
    )
}

/// `crag ask`: one-shot answer printed with its sources.
pub async fn run_ask(config: &Config, question: &str) -> anyhow::Result<()> {
    let engine = open_engine(config)?;
    let generator = create_generator(&config.generation)?;
    let synthesizer = AnswerSynthesizer::new(engine, generator, config.retrieval.answer_k);

    let answer = synthesizer.try_answer(question).await?;
    println!("{}", answer.text);
    if !answer.sources.is_empty() {
        println!();
        println!("Sources:");
        for source in &answer.sources {
            println!("  chunk {} [{:.2}]", source.chunk_id, source.similarity);
        }
    }
    Ok(())
}
