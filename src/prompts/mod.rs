//! Prompt module for LLM-based operations.
//!
//! Prompt text and encoding for the relevancy ranking step.

pub mod relevancy;

pub use relevancy::*;
