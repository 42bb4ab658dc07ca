//! Subject filtering of listing papers.

use crate::paper::Paper;
use tracing::{debug, info};

/// Keep papers where some requested subject is a case-insensitive substring
/// of one of the paper's own subject tags. Input order is preserved.
pub fn filter_by_subjects(papers: Vec<Paper>, subjects: &[String]) -> Vec<Paper> {
    info!(subjects = ?subjects, count = papers.len(), "Filtering papers by subject");

    let wanted: Vec<String> = subjects.iter().map(|s| s.to_lowercase()).collect();

    let kept: Vec<Paper> = papers
        .into_iter()
        .filter(|paper| {
            let matched = matches_any(paper, &wanted);
            debug!(title = %paper.title, matched, "Subject check");
            matched
        })
        .collect();

    info!(count = kept.len(), "Papers matching subjects");
    kept
}

fn matches_any(paper: &Paper, wanted_lower: &[String]) -> bool {
    paper.subjects.iter().any(|tag| {
        let tag = tag.to_lowercase();
        wanted_lower.iter().any(|w| tag.contains(w.as_str()))
    })
}
