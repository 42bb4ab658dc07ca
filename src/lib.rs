//! # arxiv-digest
//!
//! Daily arXiv digest - ranks new submissions against a research interest with an LLM
//!
//! ## Modules
//!
//! - [`listing`] - arXiv "new submissions" scraping
//! - [`filter`] - Subject tag filtering
//! - [`prompts`] - Relevancy prompt encoding
//! - [`llm`] - Chat-completion client and provider selection
//! - [`ranker`] - Batch scoring, reply parsing and sorting
//! - [`digest`] - End-to-end pipeline and result files
//! - [`settings`] - Stored API key
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use arxiv_digest::digest::{DigestPipeline, DigestRequest};
//! use arxiv_digest::listing::{ListingClient, ListingConfig};
//! use arxiv_digest::llm::{InferenceProvider, LlmConfig, OpenAiCompatibleClient};
//! use arxiv_digest::prompts::PromptTemplate;
//! use arxiv_digest::ranker::RankerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let llm = LlmConfig::new(InferenceProvider::OpenAi, "sk-...");
//!     let pipeline = DigestPipeline::new(
//!         ListingClient::new(ListingConfig::default())?,
//!         OpenAiCompatibleClient::new(&llm)?,
//!         PromptTemplate::load(None),
//!         RankerConfig::new(llm.model()),
//!     );
//!     let request = DigestRequest {
//!         topic: "Computer Science".into(),
//!         subjects: "Machine Learning, Robotics".into(),
//!         interest: "sample-efficient reinforcement learning".into(),
//!         max_results: 5,
//!     };
//!     let results = pipeline.run(&request).await?;
//!     println!("Found {} results", results.len());
//!     Ok(())
//! }
//! ```

pub mod digest;
pub mod error;
pub mod filter;
pub mod listing;
pub mod llm;
pub mod paper;
pub mod prompts;
pub mod ranker;
pub mod settings;
pub mod taxonomy;

pub use error::{DigestError, Result};
pub use paper::{DigestEntry, Paper, Query, ScoreResult};
