//! End-to-end digest: listing → subject filter → LLM ranking → top results.

use crate::error::Result;
use crate::filter::filter_by_subjects;
use crate::listing::ListingClient;
use crate::llm::CompletionClient;
use crate::paper::{DigestEntry, Query};
use crate::prompts::relevancy::PromptTemplate;
use crate::ranker::{self, RankerConfig};
use crate::taxonomy;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Upper bound on results returned, whatever the caller asks for
pub const MAX_RESULTS_CEILING: usize = 10;

/// One digest run, as the CLI or HTTP API describe it.
#[derive(Debug, Clone, Deserialize)]
pub struct DigestRequest {
    pub topic: String,
    /// Comma-separated subject names, resolved against the taxonomy
    pub subjects: String,
    pub interest: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_max_results() -> usize {
    MAX_RESULTS_CEILING
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

/// Everything a run needs besides the request itself.
pub struct DigestPipeline<C> {
    listing: ListingClient,
    client: C,
    template: PromptTemplate,
    ranker: RankerConfig,
}

impl<C: CompletionClient> DigestPipeline<C> {
    pub fn new(listing: ListingClient, client: C, template: PromptTemplate, ranker: RankerConfig) -> Self {
        Self {
            listing,
            client,
            template,
            ranker,
        }
    }

    /// Run the whole pipeline and shape the best papers for output.
    ///
    /// Listing problems produce an empty digest; a malformed model reply is
    /// returned as an error.
    pub async fn run(&self, request: &DigestRequest) -> Result<Vec<DigestEntry>> {
        info!(
            topic = %request.topic,
            subjects = %request.subjects,
            max_results = request.max_results,
            "Starting digest"
        );

        let subjects = taxonomy::resolve_subjects(&request.subjects);
        let papers = self.listing.fetch_papers(&request.topic).await;
        let papers = filter_by_subjects(papers, &subjects);

        let query = Query::new(request.topic.clone(), subjects, request.interest.clone());
        let ranked = ranker::rank(&self.client, &self.template, papers, &query, &self.ranker).await?;

        let limit = request.max_results.min(MAX_RESULTS_CEILING);
        let entries: Vec<DigestEntry> = ranked.iter().take(limit).map(DigestEntry::from).collect();

        info!(count = entries.len(), ranked = ranked.len(), "Digest complete");
        Ok(entries)
    }
}

/// Write entries to `path`. JSON output is a bare array.
pub fn save_results(path: &Path, entries: &[DigestEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let content = serde_json::to_string_pretty(entries)?;
            std::fs::write(path, content)?;
        }
        OutputFormat::Csv => {
            let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
            for entry in entries {
                wtr.serialize(entry)?;
            }
            wtr.flush()?;
        }
    }

    info!(path = %path.display(), count = entries.len(), "Results written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paper::{Paper, ScoreResult};
    use tempfile::TempDir;

    fn entry(title: &str, score: i64) -> DigestEntry {
        let mut paper = Paper::new(title, "abs", "u", "p", "a", vec!["Robotics (cs.RO)".into()]);
        paper.merge_score(ScoreResult { score, reasons: "why".into() });
        DigestEntry::from(&paper)
    }

    #[test]
    fn test_request_defaults_max_results() {
        let req: DigestRequest = serde_json::from_str(
            r#"{"topic": "Computer Science", "subjects": "Robotics", "interest": "robots"}"#,
        )
        .expect("deserialize");
        assert_eq!(req.max_results, MAX_RESULTS_CEILING);
    }

    #[test]
    fn test_save_json_array() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.json");
        save_results(&path, &[entry("A", 9), entry("B", 3)], OutputFormat::Json)?;

        let loaded: Vec<DigestEntry> = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].title, "A");
        assert_eq!(loaded[1].relevancy_score, Some(3));
        Ok(())
    }

    #[test]
    fn test_save_csv_has_header() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("results.csv");
        save_results(&path, &[entry("A", 9)], OutputFormat::Csv)?;

        let content = std::fs::read_to_string(&path)?;
        let header = content.lines().next().unwrap_or_default();
        assert_eq!(
            header,
            "title,abstract,url,pdf_url,authors,subjects,relevancy_score,reasons_for_match"
        );
        Ok(())
    }
}
