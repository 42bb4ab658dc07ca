//! Paper records and the shapes that flow around them.

use serde::{Deserialize, Serialize};

/// Separator used when subject tags travel as a single string.
pub const SUBJECT_SEPARATOR: &str = "; ";

/// One candidate paper from a listing page, plus its scoring state.
///
/// `score` stays `None` until a scoring batch merges a [`ScoreResult`] in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paper {
    pub title: String,
    pub abstract_text: String,
    /// Abstract page URL
    pub url: String,
    pub pdf_url: String,
    /// Free-form author line as shown on the listing
    pub authors: String,
    /// Subject tags in listing order
    pub subjects: Vec<String>,
    score: Option<ScoreResult>,
}

impl Paper {
    pub fn new(
        title: impl Into<String>,
        abstract_text: impl Into<String>,
        url: impl Into<String>,
        pdf_url: impl Into<String>,
        authors: impl Into<String>,
        subjects: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            abstract_text: abstract_text.into(),
            url: url.into(),
            pdf_url: pdf_url.into(),
            authors: authors.into(),
            subjects,
            score: None,
        }
    }

    /// Subjects joined the way the listing page shows them.
    pub fn subjects_joined(&self) -> String {
        self.subjects.join(SUBJECT_SEPARATOR)
    }

    pub fn relevancy_score(&self) -> Option<i64> {
        self.score.as_ref().map(|s| s.score)
    }

    pub fn reasons_for_match(&self) -> Option<&str> {
        self.score.as_ref().map(|s| s.reasons.as_str())
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    /// Attach a score. Score and reasons are set together, once; a second
    /// merge is ignored and reported as `false`.
    pub fn merge_score(&mut self, result: ScoreResult) -> bool {
        if self.score.is_some() {
            return false;
        }
        self.score = Some(result);
        true
    }
}

/// Score and justification the model produced for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: i64,
    pub reasons: String,
}

/// What the reader is looking for. Built once per run, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    topic: String,
    subjects: Vec<String>,
    interest: String,
}

impl Query {
    pub fn new(topic: impl Into<String>, subjects: Vec<String>, interest: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            subjects,
            interest: interest.into(),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    pub fn interest(&self) -> &str {
        &self.interest
    }

    /// The statement placed between the instructions and the papers.
    pub fn interest_statement(&self) -> String {
        format!(
            "Topic: {}\nSubjects: {}\nInterests: {}\n",
            self.topic,
            self.subjects.join(", "),
            self.interest
        )
    }
}

/// A ranked paper as handed to persistence and front-ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigestEntry {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub url: String,
    pub pdf_url: String,
    pub authors: String,
    pub subjects: String,
    pub relevancy_score: Option<i64>,
    pub reasons_for_match: Option<String>,
}

impl From<&Paper> for DigestEntry {
    fn from(p: &Paper) -> Self {
        Self {
            title: clean_title(&p.title),
            abstract_text: p.abstract_text.clone(),
            url: p.url.clone(),
            pdf_url: p.pdf_url.clone(),
            authors: p.authors.clone(),
            subjects: p.subjects_joined().replace("Subjects:\n", ""),
            relevancy_score: p.relevancy_score(),
            reasons_for_match: p.reasons_for_match().map(str::to_string),
        }
    }
}

/// Strip the "Title:" label residue listing extraction sometimes leaves behind.
fn clean_title(title: &str) -> String {
    match title.strip_prefix("Title:\n") {
        Some(rest) => rest.trim_start().to_string(),
        None => title.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Paper {
        Paper::new(
            "A Paper",
            "Some abstract",
            "https://arxiv.org/abs/2401.00001",
            "https://arxiv.org/pdf/2401.00001",
            "Ada Lovelace, Alan Turing",
            vec!["Machine Learning (cs.LG)".to_string(), "Robotics (cs.RO)".to_string()],
        )
    }

    #[test]
    fn test_new_paper_is_unscored() {
        let paper = sample();
        assert!(!paper.is_scored());
        assert_eq!(paper.relevancy_score(), None);
        assert_eq!(paper.reasons_for_match(), None);
    }

    #[test]
    fn test_merge_score_sets_both_once() {
        let mut paper = sample();
        assert!(paper.merge_score(ScoreResult { score: 8, reasons: "close match".into() }));
        assert!(!paper.merge_score(ScoreResult { score: 1, reasons: "late".into() }));
        assert_eq!(paper.relevancy_score(), Some(8));
        assert_eq!(paper.reasons_for_match(), Some("close match"));
    }

    #[test]
    fn test_subjects_joined() {
        assert_eq!(
            sample().subjects_joined(),
            "Machine Learning (cs.LG); Robotics (cs.RO)"
        );
    }

    #[test]
    fn test_interest_statement() {
        let query = Query::new(
            "Computer Science",
            vec!["Machine Learning".into(), "Robotics".into()],
            "sample-efficient RL",
        );
        assert_eq!(
            query.interest_statement(),
            "Topic: Computer Science\nSubjects: Machine Learning, Robotics\nInterests: sample-efficient RL\n"
        );
    }

    #[test]
    fn test_digest_entry_cleans_labels() {
        let mut paper = sample();
        paper.title = "Title:\n          A Paper".to_string();
        paper.subjects = vec!["Subjects:\nRobotics (cs.RO)".to_string()];
        paper.merge_score(ScoreResult { score: 6, reasons: "ok".into() });

        let entry = DigestEntry::from(&paper);
        assert_eq!(entry.title, "A Paper");
        assert_eq!(entry.subjects, "Robotics (cs.RO)");
        assert_eq!(entry.relevancy_score, Some(6));

        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["abstract"], "Some abstract");
        assert_eq!(json["reasons_for_match"], "ok");
    }
}
