//! Relevancy scoring prompts for batches of listing papers.
//!
//! The instructional preamble is compiled in from `prompts/relevancy_prompt.txt`
//! and can be overridden at runtime with another template file.

use crate::paper::{Paper, Query};
use std::path::Path;
use tracing::{debug, warn};

/// Default instructions, including the JSON line format the parser expects.
pub const DEFAULT_INSTRUCTIONS: &str = include_str!("../../prompts/relevancy_prompt.txt");

/// Instruction used when an override template cannot be read.
pub const FALLBACK_INSTRUCTIONS: &str = "Please analyze the following papers and provide a relevancy score (1-10) and reasons for the match:\n\n";

/// Separator placed before every paper block
const PAPER_SEPARATOR: &str = "###\n";

/// Cue that makes the model start its numbered reply at item 1
pub const RESPONSE_CUE: &str = "\n Generate response:\n1.";

/// Instructional preamble for relevancy prompts, read once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    preamble: String,
}

impl PromptTemplate {
    /// Read the preamble from `path`, or use the compiled-in default when no
    /// path is given. An unreadable override is not an error: the minimal
    /// fallback instruction is used instead.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };

        match std::fs::read_to_string(path) {
            Ok(content) => {
                debug!(path = %path.display(), "Loaded relevancy prompt template");
                Self {
                    preamble: content + "\n",
                }
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "Relevancy prompt template unavailable, using built-in instructions"
                );
                Self::fallback()
            }
        }
    }

    /// The compiled-in default template.
    pub fn builtin() -> Self {
        Self {
            preamble: format!("{DEFAULT_INSTRUCTIONS}\n"),
        }
    }

    pub fn fallback() -> Self {
        Self {
            preamble: FALLBACK_INSTRUCTIONS.to_string(),
        }
    }

    pub fn preamble(&self) -> &str {
        &self.preamble
    }

    /// Encode one batch. Paper numbering is 1-indexed and restarts per batch.
    pub fn encode(&self, query: &Query, papers: &[Paper]) -> String {
        let mut prompt = String::with_capacity(self.preamble.len() + papers.len() * 512);
        prompt.push_str(&self.preamble);
        prompt.push_str(&query.interest_statement());

        for (idx, paper) in papers.iter().enumerate() {
            let n = idx + 1;
            prompt.push_str(PAPER_SEPARATOR);
            prompt.push_str(&format!("{n}. Title: {}\n", paper.title));
            prompt.push_str(&format!("{n}. Authors: {}\n", paper.authors));
            prompt.push_str(&format!("{n}. Abstract: {}\n", paper.abstract_text));
        }
        prompt.push_str(RESPONSE_CUE);

        debug!(papers = papers.len(), length = prompt.len(), "Encoded prompt");
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}
