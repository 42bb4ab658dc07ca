//! LLM relevancy ranking for listing papers.
//!
//! Papers are split into fixed-size batches, each batch becomes one prompt and
//! one completion request, and the numbered reply is parsed back into scores.
//! Scored papers from all batches are merged and sorted by score.

use crate::error::{DigestError, Result};
use crate::llm::{CompletionClient, GenerationParams};
use crate::paper::{Paper, Query, ScoreResult};
use crate::prompts::relevancy::PromptTemplate;
use futures::stream::{self, StreamExt, TryStreamExt};
use regex::Regex;
use serde::Deserialize;
use std::cmp::Reverse;
use tracing::{debug, info, warn};

/// Papers per prompt
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Completion budget per paper in a batch
const TOKENS_PER_PAPER: u32 = 128;

/// Phrase that marks a reply line as carrying a score
const SCORE_LINE_MARKER: &str = "relevancy score";

/// Ranking configuration
#[derive(Debug, Clone)]
pub struct RankerConfig {
    pub model: String,
    pub batch_size: usize,
    /// Minimum score kept (inclusive)
    pub threshold: i64,
    pub temperature: f32,
    pub top_p: f32,
    /// Batches in flight at once; 1 dispatches strictly in sequence
    pub concurrency: usize,
}

impl RankerConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            batch_size: DEFAULT_BATCH_SIZE,
            threshold: 0,
            temperature: 0.4,
            top_p: 1.0,
            concurrency: 1,
        }
    }

    fn generation_params(&self) -> Result<GenerationParams> {
        let max_tokens = u32::try_from(self.batch_size)
            .ok()
            .and_then(|size| size.checked_mul(TOKENS_PER_PAPER))
            .ok_or_else(|| {
                DigestError::Validation(format!("batch size {} is too large", self.batch_size))
            })?;

        Ok(GenerationParams {
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens,
        })
    }
}

/// One score line as the model writes it
#[derive(Debug, Deserialize)]
struct RawScoreItem {
    #[serde(rename = "Relevancy score")]
    relevancy_score: serde_json::Value,
    #[serde(rename = "Reasons for match")]
    reasons_for_match: String,
}

/// Score every paper and return the ones at or above the threshold, best first.
///
/// Ties keep the order the papers were submitted in. A batch whose reply is
/// empty contributes nothing; a batch whose reply breaks the line schema fails
/// the whole call with [`DigestError::MalformedResponse`].
pub async fn rank<C: CompletionClient>(
    client: &C,
    template: &PromptTemplate,
    papers: Vec<Paper>,
    query: &Query,
    config: &RankerConfig,
) -> Result<Vec<Paper>> {
    if config.batch_size == 0 {
        return Err(DigestError::Validation("batch size must be at least 1".to_string()));
    }

    info!(
        count = papers.len(),
        batch_size = config.batch_size,
        model = %config.model,
        "Ranking papers"
    );

    let params = config.generation_params()?;
    let batches = into_batches(papers, config.batch_size);
    let total = batches.len();

    // `buffered` yields in submission order, so merge order never depends on
    // which request finishes first.
    let scored: Vec<Vec<Paper>> = stream::iter(batches.into_iter().enumerate())
        .map(|(idx, batch)| {
            let params = &params;
            async move {
                let batch_no = idx + 1;
                let prompt = template.encode(query, &batch);

                debug!(batch = batch_no, total, "Sending batch");
                let reply = client.complete(&prompt, params).await?;
                debug!(batch = batch_no, total, "Received batch reply");

                parse_response(batch, reply.as_deref(), config.threshold).map_err(|e| match e {
                    DigestError::Parse(message) => DigestError::MalformedResponse {
                        batch: batch_no,
                        message,
                    },
                    other => other,
                })
            }
        })
        .buffered(config.concurrency.max(1))
        .try_collect()
        .await?;

    let mut ranked: Vec<Paper> = scored.into_iter().flatten().collect();
    sort_by_score(&mut ranked);

    info!(count = ranked.len(), "Ranking complete");
    Ok(ranked)
}

/// Stable descending sort; unscored papers count as 0.
pub fn sort_by_score(papers: &mut [Paper]) {
    papers.sort_by_key(|p| Reverse(p.relevancy_score().unwrap_or(0)));
}

fn into_batches(papers: Vec<Paper>, size: usize) -> Vec<Vec<Paper>> {
    let mut batches = Vec::with_capacity(papers.len().div_ceil(size));
    let mut iter = papers.into_iter().peekable();
    while iter.peek().is_some() {
        batches.push(iter.by_ref().take(size).collect());
    }
    batches
}

/// Merge one batch reply into its papers.
///
/// Score line `i` belongs to paper `i` of the batch. Extra papers or extra
/// lines are left unpaired. Papers scoring below `threshold` are dropped.
///
/// # Errors
///
/// Returns [`DigestError::Parse`] if any score line is not a valid record.
pub fn parse_response(batch: Vec<Paper>, reply: Option<&str>, threshold: i64) -> Result<Vec<Paper>> {
    let Some(reply) = reply.filter(|r| !r.trim().is_empty()) else {
        warn!(papers = batch.len(), "Empty model reply, batch contributes no papers");
        return Ok(Vec::new());
    };

    let items = parse_score_lines(reply)?;

    if items.len() != batch.len() {
        warn!(
            papers = batch.len(),
            score_lines = items.len(),
            "Score line count differs from batch size, pairing by position"
        );
    }

    let mut selected = Vec::new();
    for (mut paper, item) in batch.into_iter().zip(items) {
        if item.score < threshold {
            debug!(title = %paper.title, score = item.score, threshold, "Below threshold");
            continue;
        }
        paper.merge_score(item);
        selected.push(paper);
    }

    debug!(selected = selected.len(), "Batch reply processed");
    Ok(selected)
}

/// Pull every score record out of a reply, in reply order.
fn parse_score_lines(reply: &str) -> Result<Vec<ScoreResult>> {
    let noise = Regex::new(r"^\d+\. |\\").map_err(|e| DigestError::Parse(e.to_string()))?;

    reply
        .replace("\n\n", "\n")
        .split('\n')
        .filter(|line| line.to_lowercase().contains(SCORE_LINE_MARKER))
        .map(|line| {
            let cleaned = noise.replace_all(line, "");
            let raw: RawScoreItem = serde_json::from_str(&cleaned).map_err(|e| {
                let preview: String = line.chars().take(200).collect();
                DigestError::Parse(format!("invalid score line ({}): {}", e, preview))
            })?;

            Ok(ScoreResult {
                score: normalize_score(&raw.relevancy_score)?,
                reasons: raw.reasons_for_match,
            })
        })
        .collect()
}

/// Accept `7`, `"7"` and `"7/10"`.
pub fn normalize_score(value: &serde_json::Value) -> Result<i64> {
    let invalid = || DigestError::Parse(format!("invalid relevancy score: {}", value));

    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .ok_or_else(invalid),
        serde_json::Value::String(s) => {
            let numerator = match s.split_once('/') {
                Some((numerator, _)) => numerator,
                None => s.as_str(),
            };
            numerator.trim().parse::<i64>().map_err(|_| invalid())
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn papers(n: usize) -> Vec<Paper> {
        (0..n)
            .map(|i| Paper::new(format!("Paper {i}"), "abstract", "", "", "author", vec![]))
            .collect()
    }

    fn line(n: usize, score: serde_json::Value, reasons: &str) -> String {
        format!(
            "{n}. {}",
            json!({"Relevancy score": score, "Reasons for match": reasons})
        )
    }

    /// Replays canned replies and records the prompts it was sent.
    struct ScriptedClient {
        replies: Mutex<VecDeque<Option<String>>>,
        prompts: Mutex<Vec<(String, GenerationParams)>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Option<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<Option<String>> {
            self.prompts
                .lock()
                .expect("lock")
                .push((prompt.to_string(), params.clone()));
            Ok(self.replies.lock().expect("lock").pop_front().flatten())
        }
    }

    #[test]
    fn test_normalize_score() {
        assert_eq!(normalize_score(&json!("7/10")).expect("fraction"), 7);
        assert_eq!(normalize_score(&json!(7)).expect("int"), 7);
        assert_eq!(normalize_score(&json!(" 8 ")).expect("padded"), 8);
        assert_eq!(normalize_score(&json!(6.0)).expect("float"), 6);
        assert!(normalize_score(&json!("high")).is_err());
        assert!(normalize_score(&json!(null)).is_err());
    }

    #[test]
    fn test_null_reply_is_empty() {
        assert!(parse_response(papers(3), None, 0).expect("null").is_empty());
        assert!(parse_response(papers(3), Some("  \n"), 0).expect("blank").is_empty());
    }

    #[test]
    fn test_positional_pairing_shorter_reply() {
        let reply = format!("{}\n\n{}", line(1, json!(4), "a"), line(2, json!(9), "b"));
        let out = parse_response(papers(4), Some(&reply), 0).expect("parse");
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title, "Paper 0");
        assert_eq!(out[0].relevancy_score(), Some(4));
        assert_eq!(out[1].title, "Paper 1");
        assert_eq!(out[1].reasons_for_match(), Some("b"));
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let reply = [
            line(1, json!(4), "below"),
            line(2, json!(5), "equal"),
            line(3, json!("6/10"), "above"),
        ]
        .join("\n");
        let out = parse_response(papers(3), Some(&reply), 5).expect("parse");
        let titles: Vec<&str> = out.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Paper 1", "Paper 2"]);
    }

    #[test]
    fn test_narrative_lines_ignored_and_noise_stripped() {
        let reply = "Sure! Here are my scores.\n\
                     1. {\"Relevancy score\": \"8/10\", \"Reasons for match\": \"uses \\\\RL\"}\n\
                     Hope this helps.";
        let out = parse_response(papers(1), Some(reply), 0).expect("parse");
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].relevancy_score(), Some(8));
        assert_eq!(out[0].reasons_for_match(), Some("uses RL"));
    }

    #[test]
    fn test_malformed_line_fails_batch() {
        let reply = format!(
            "{}\n2. Relevancy score: 7, looks relevant",
            line(1, json!(9), "fine")
        );
        let err = parse_response(papers(2), Some(&reply), 0).expect_err("must fail");
        assert!(matches!(err, DigestError::Parse(_)));
    }

    #[test]
    fn test_missing_reasons_fails_batch() {
        let reply = "1. {\"Relevancy score\": 7}";
        let err = parse_response(papers(1), Some(reply), 0).expect_err("reasons are required");
        assert!(matches!(err, DigestError::Parse(_)));
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected() {
        let client = ScriptedClient::new(vec![Some(line(1, json!(5), "x"))]);
        let query = Query::new("Statistics", vec![], "anything");
        let mut config = RankerConfig::new("m");
        config.batch_size = 40_000_000;

        let err = rank(&client, &PromptTemplate::fallback(), papers(2), &query, &config)
            .await
            .expect_err("max_tokens overflows u32");
        assert!(matches!(err, DigestError::Validation(_)));
        assert!(client.prompts.lock().expect("lock").is_empty());

        config.batch_size = usize::MAX;
        assert!(matches!(config.generation_params(), Err(DigestError::Validation(_))));

        config.batch_size = 4;
        assert_eq!(config.generation_params().expect("params").max_tokens, 512);
    }

    #[test]
    fn test_sort_is_stable_descending() {
        let mut list = papers(4);
        for (paper, score) in list.iter_mut().zip([3, 7, 7, 1]) {
            paper.merge_score(ScoreResult { score, reasons: String::new() });
        }
        sort_by_score(&mut list);
        let order: Vec<&str> = list.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(order, vec!["Paper 1", "Paper 2", "Paper 0", "Paper 3"]);
    }

    #[test]
    fn test_unscored_sort_as_zero() {
        let mut list = papers(2);
        list[1].merge_score(ScoreResult { score: 1, reasons: String::new() });
        sort_by_score(&mut list);
        assert_eq!(list[0].title, "Paper 1");
    }

    #[test]
    fn test_into_batches() {
        let sizes: Vec<usize> = into_batches(papers(9), 4).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![4, 4, 1]);
        assert!(into_batches(Vec::new(), 4).is_empty());
    }

    #[tokio::test]
    async fn test_rank_single_batch_end_to_end() {
        let reply = [
            line(1, json!(9), "r0"),
            line(2, json!(2), "r1"),
            line(3, json!(9), "r2"),
            line(4, json!(5), "r3"),
        ]
        .join("\n");
        let client = ScriptedClient::new(vec![Some(reply)]);
        let query = Query::new("Computer Science", vec!["Robotics".into()], "robots");
        let config = RankerConfig::new("test-model");

        let ranked = rank(&client, &PromptTemplate::fallback(), papers(4), &query, &config)
            .await
            .expect("rank");

        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();
        let scores: Vec<Option<i64>> = ranked.iter().map(Paper::relevancy_score).collect();
        assert_eq!(titles, vec!["Paper 0", "Paper 2", "Paper 3", "Paper 1"]);
        assert_eq!(scores, vec![Some(9), Some(9), Some(5), Some(2)]);

        let prompts = client.prompts.lock().expect("lock");
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].1.max_tokens, 512);
        assert_eq!(prompts[0].1.model, "test-model");
        assert!(prompts[0].0.contains("4. Title: Paper 3\n"));
    }

    #[tokio::test]
    async fn test_rank_batches_restart_numbering_and_skip_null() {
        let client = ScriptedClient::new(vec![
            None,
            Some(format!("{}\n{}", line(1, json!(3), "x"), line(2, json!(8), "y"))),
        ]);
        let query = Query::new("Statistics", vec![], "anything");
        let mut config = RankerConfig::new("m");
        config.batch_size = 2;

        let ranked = rank(&client, &PromptTemplate::fallback(), papers(4), &query, &config)
            .await
            .expect("rank");

        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Paper 3", "Paper 2"]);

        let prompts = client.prompts.lock().expect("lock");
        assert!(prompts[1].0.contains("1. Title: Paper 2\n"));
        assert!(!prompts[1].0.contains("3. Title:"));
    }

    #[tokio::test]
    async fn test_rank_reports_malformed_batch_number() {
        let client = ScriptedClient::new(vec![
            Some(line(1, json!(5), "ok")),
            Some("1. {\"Relevancy score\": 5,".to_string()),
        ]);
        let query = Query::new("Statistics", vec![], "anything");
        let mut config = RankerConfig::new("m");
        config.batch_size = 1;

        let err = rank(&client, &PromptTemplate::fallback(), papers(2), &query, &config)
            .await
            .expect_err("second batch is malformed");
        assert!(matches!(err, DigestError::MalformedResponse { batch: 2, .. }));
    }

    /// Answers every prompt with one fixed score, slower for earlier papers.
    struct DelayedClient;

    impl CompletionClient for DelayedClient {
        async fn complete(&self, prompt: &str, _params: &GenerationParams) -> Result<Option<String>> {
            let delay_ms = if prompt.contains("Title: Paper 0\n") {
                300
            } else if prompt.contains("Title: Paper 1\n") {
                150
            } else {
                10
            };
            tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            Ok(Some(line(1, json!(5), "same")))
        }
    }

    #[tokio::test]
    async fn test_concurrent_batches_keep_submission_order() {
        let query = Query::new("Statistics", vec![], "anything");
        let mut config = RankerConfig::new("m");
        config.batch_size = 1;
        config.concurrency = 4;

        let ranked = rank(&DelayedClient, &PromptTemplate::fallback(), papers(4), &query, &config)
            .await
            .expect("rank");

        let titles: Vec<&str> = ranked.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Paper 0", "Paper 1", "Paper 2", "Paper 3"]);
    }
}
