//! arXiv "new submissions" listing scraper.
//!
//! Fetches `https://arxiv.org/list/{code}/new` and extracts one [`Paper`] per
//! `<dt>/<dd>` pair of the listing's definition list. Fetch and layout problems
//! are logged and degrade to an empty listing.

use crate::error::{DigestError, OptionExt, Result};
use crate::paper::Paper;
use crate::taxonomy;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

/// Default arXiv URL
pub const DEFAULT_ARXIV_URL: &str = "https://arxiv.org";

/// Papers taken from the top of a listing
pub const MAX_LISTING_PAPERS: usize = 20;

/// User agent string for requests
const USER_AGENT: &str = concat!("arxiv-digest/", env!("CARGO_PKG_VERSION"));

/// Listing fetch options
#[derive(Debug, Clone)]
pub struct ListingConfig {
    /// Custom base URL for mirror sites
    pub base_url: String,
    pub max_papers: usize,
    pub timeout: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ARXIV_URL.to_string(),
            max_papers: MAX_LISTING_PAPERS,
            timeout: Duration::from_secs(30),
        }
    }
}

/// HTTP client for listing pages
pub struct ListingClient {
    client: reqwest::Client,
    config: ListingConfig,
}

impl ListingClient {
    pub fn new(config: ListingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DigestError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Papers listed for `topic`, capped at `max_papers`.
    ///
    /// Never fails: unknown topics, fetch errors and unexpected page layouts
    /// are logged and yield an empty list.
    pub async fn fetch_papers(&self, topic: &str) -> Vec<Paper> {
        let Some(code) = taxonomy::topic_code(topic) else {
            error!(topic = topic, "Invalid topic");
            return Vec::new();
        };

        info!(topic = topic, code = code, "Fetching new submissions");

        let html = match self.fetch_listing_html(code).await {
            Ok(html) => html,
            Err(e) => {
                error!(code = code, error = %e, "Failed to fetch listing");
                return Vec::new();
            }
        };

        match parse_listing(&html) {
            Ok(mut papers) => {
                info!(total = papers.len(), "Parsed listing");
                papers.truncate(self.config.max_papers);
                papers
            }
            Err(e) => {
                error!(code = code, error = %e, "Failed to parse listing");
                Vec::new()
            }
        }
    }

    /// Raw listing page for a category code.
    pub async fn fetch_listing_html(&self, code: &str) -> Result<String> {
        let url = build_listing_url(&self.config.base_url, code)?;
        debug!(url = %url, "Fetching page");

        let response = self
            .client
            .get(url.as_str())
            .header("Accept", "text/html,application/xhtml+xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Api {
                code: status.as_u16() as i32,
                message: format!("HTTP error: {}", status),
            });
        }

        response.text().await.map_err(DigestError::Network)
    }
}

/// Build the listing URL for a category code
fn build_listing_url(base_url: &str, code: &str) -> Result<Url> {
    Url::parse(&format!("{}/list/{}/new", base_url.trim_end_matches('/'), code))
        .map_err(|e| DigestError::Config(format!("Invalid base URL: {}", e)))
}

/// Parse a listing page into papers, in page order.
///
/// # Errors
///
/// Returns [`DigestError::Parse`] when the content region or its definition
/// list is missing, or when titles and details don't pair up.
pub fn parse_listing(html: &str) -> Result<Vec<Paper>> {
    let document = Html::parse_document(html);

    let content_selector = selector("div#content")?;
    let dl_selector = selector("dl")?;
    let dt_selector = selector("dt")?;
    let dd_selector = selector("dd")?;

    let content = document
        .select(&content_selector)
        .next()
        .ok_or_parse("content div not found")?;
    let dl = content
        .select(&dl_selector)
        .next()
        .ok_or_parse("dl element not found")?;

    let titles: Vec<ElementRef> = dl.select(&dt_selector).collect();
    let details: Vec<ElementRef> = dl.select(&dd_selector).collect();
    if titles.len() != details.len() {
        return Err(DigestError::Parse(format!(
            "mismatch between number of titles ({}) and details ({})",
            titles.len(),
            details.len()
        )));
    }

    let extractor = EntryExtractor::new()?;
    let mut papers = Vec::with_capacity(titles.len());
    for (dt, dd) in titles.into_iter().zip(details) {
        match extractor.extract(dt, dd) {
            Ok(paper) => {
                debug!(title = %paper.title, url = %paper.url, "Parsed paper");
                papers.push(paper);
            }
            Err(e) => warn!(error = %e, "Skipping listing entry"),
        }
    }

    Ok(papers)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DigestError::Parse(e.to_string()))
}

/// Selectors for the pieces of one listing entry
struct EntryExtractor {
    abstract_link: Selector,
    title: Selector,
    authors: Selector,
    subjects: Selector,
    abstract_text: Selector,
}

impl EntryExtractor {
    fn new() -> Result<Self> {
        Ok(Self {
            abstract_link: selector(r#"a[title="Abstract"]"#)?,
            title: selector("div.list-title")?,
            authors: selector("div.list-authors")?,
            subjects: selector("div.list-subjects")?,
            abstract_text: selector("p.mathjax")?,
        })
    }

    fn extract(&self, dt: ElementRef, dd: ElementRef) -> Result<Paper> {
        let link_text = dt
            .select(&self.abstract_link)
            .next()
            .map(element_text)
            .ok_or_parse("abstract link not found")?;
        let arxiv_id = link_text
            .trim()
            .rsplit(':')
            .next()
            .filter(|id| !id.is_empty())
            .ok_or_parse("empty arXiv identifier")?
            .to_string();

        let title = self
            .first_text(dd, &self.title)
            .map(|t| t.replace("Title: ", "").trim().to_string())
            .unwrap_or_default();

        let authors = self
            .first_text(dd, &self.authors)
            .map(|t| t.replace("Authors:\n", "").replace('\n', "").trim().to_string())
            .unwrap_or_default();

        let subjects = self
            .first_text(dd, &self.subjects)
            .map(|t| {
                t.replace("Subjects: ", "")
                    .trim()
                    .split("; ")
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let abstract_text = self
            .first_text(dd, &self.abstract_text)
            .map(|t| t.replace('\n', " ").trim().to_string())
            .unwrap_or_default();

        Ok(Paper::new(
            title,
            abstract_text,
            format!("{}/abs/{}", DEFAULT_ARXIV_URL, arxiv_id),
            format!("{}/pdf/{}", DEFAULT_ARXIV_URL, arxiv_id),
            authors,
            subjects,
        ))
    }

    fn first_text(&self, dd: ElementRef, selector: &Selector) -> Option<String> {
        dd.select(selector).next().map(element_text)
    }
}

fn element_text(element: ElementRef) -> String {
    element.text().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r##"<html><body>
<div id="content">
<dl>
<dt><a name="item1">[1]</a> <a href="/abs/2401.00001" title="Abstract">arXiv:2401.00001</a></dt>
<dd><div class="meta">
<div class="list-title mathjax">Title: Learning to Walk</div>
<div class="list-authors">Authors:
<a href="#">Ada Lovelace</a>, <a href="#">Alan Turing</a></div>
<div class="list-subjects">Subjects: Robotics (cs.RO); Machine Learning (cs.LG)</div>
<p class="mathjax">We teach robots
to walk.</p>
</div></dd>
<dt><a href="/abs/2401.00002" title="Abstract">arXiv:2401.00002</a></dt>
<dd><div class="meta">
<div class="list-title mathjax">Title: Parsing Everything</div>
<div class="list-subjects">Subjects: Computation and Language (cs.CL)</div>
</div></dd>
</dl>
</div>
</body></html>"##;

    #[test]
    fn test_build_listing_url() {
        let url = build_listing_url("https://arxiv.org/", "cs").expect("Failed to build URL");
        assert_eq!(url.as_str(), "https://arxiv.org/list/cs/new");
    }

    #[test]
    fn test_parse_listing() {
        let papers = parse_listing(LISTING).expect("Parse failed");
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.title, "Learning to Walk");
        assert_eq!(first.authors, "Ada Lovelace, Alan Turing");
        assert_eq!(first.subjects, vec!["Robotics (cs.RO)", "Machine Learning (cs.LG)"]);
        assert_eq!(first.abstract_text, "We teach robots to walk.");
        assert_eq!(first.url, "https://arxiv.org/abs/2401.00001");
        assert_eq!(first.pdf_url, "https://arxiv.org/pdf/2401.00001");

        let second = &papers[1];
        assert_eq!(second.authors, "");
        assert_eq!(second.abstract_text, "");
        assert!(!second.is_scored());
    }

    #[test]
    fn test_parse_missing_content() {
        let err = parse_listing("<html><body></body></html>").expect_err("no content div");
        assert!(matches!(err, DigestError::Parse(_)));
    }

    #[test]
    fn test_parse_missing_dl() {
        let err = parse_listing(r#"<html><body><div id="content"><p>none</p></div></body></html>"#)
            .expect_err("no dl");
        assert!(err.to_string().contains("dl element"));
    }

    #[test]
    fn test_parse_count_mismatch() {
        let html = r#"<div id="content"><dl><dt>a</dt><dt>b</dt><dd>x</dd></dl></div>"#;
        let err = parse_listing(html).expect_err("mismatch");
        assert!(err.to_string().contains("mismatch"));
    }
}
