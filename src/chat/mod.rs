// Chat module
// Line-oriented question and answer loop over a loaded index


use std::io::{BufRead, Write};

use tracing::{error, info};

use crate::embeddings::Embedder;
use crate::index::VectorIndex;
use crate::llm::{GenerationOptions, Generator};
use crate::prompt;
use crate::retriever::Retriever;
use crate::{LoreError, Result};

pub const QUESTION_PROMPT: &str = "Question: ";
pub const SEPARATOR: &str = "------------------------";

/// One answered question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub context: String,
    pub response: String,
}

/// Answers questions independently of one another; nothing is remembered
/// between calls to [`ChatSession::answer`].
pub struct ChatSession<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn Embedder,
    generator: &'a dyn Generator,
    retriever: Retriever,
    options: GenerationOptions,
}

impl<'a> ChatSession<'a> {
    #[inline]
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn Embedder,
        generator: &'a dyn Generator,
        retriever: Retriever,
        options: GenerationOptions,
    ) -> Self {
        Self {
            index,
            embedder,
            generator,
            retriever,
            options,
        }
    }

    /// Retrieve context for `question`, compose the prompt and generate a reply
    #[inline]
    pub fn answer(&self, question: &str) -> Result<Exchange> {
        let context = self
            .retriever
            .context_for(question, self.index, self.embedder)?;
        let prompt = prompt::compose(&context, question);

        let response = self
            .generator
            .generate(&prompt, &self.options)
            .map_err(|e| LoreError::Generation(format!("{:#}", e)))?;

        Ok(Exchange { context, response })
    }

    /// Read questions from `input` until it is exhausted, writing each
    /// exchange to `output`.
    ///
    /// A question that fails is reported on `output` and the loop moves on.
    /// Only I/O errors on `input` or `output` end the loop early.
    #[inline]
    pub fn run<R: BufRead, W: Write>(&self, mut input: R, mut output: W) -> Result<usize> {
        let mut answered = 0;
        let mut line = String::new();

        loop {
            write!(output, "{}", QUESTION_PROMPT)?;
            output.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                break;
            }

            let question = line.trim();
            if question.is_empty() {
                continue;
            }

            info!("Answering question: {}", question);
            match self.answer(question) {
                Ok(exchange) => {
                    write_exchange(&mut output, question, &exchange)?;
                    answered += 1;
                }
                Err(e) => {
                    error!("Failed to answer question: {}", e);
                    writeln!(output, "Error: {}\n", e)?;
                }
            }
        }

        Ok(answered)
    }
}

/// Print an exchange the same way the interactive loop does
#[inline]
pub fn write_exchange<W: Write>(output: &mut W, question: &str, exchange: &Exchange) -> Result<()> {
    writeln!(output, "{}{}", QUESTION_PROMPT, question)?;
    writeln!(output, "{}\n\n\n{}", exchange.context, SEPARATOR)?;
    writeln!(output, "Response: {}\n", exchange.response)?;
    Ok(())
}
