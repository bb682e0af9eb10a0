//! Article text extraction.
//!
//! The pipeline only relies on the narrow `extract(url) -> text` contract;
//! any failure, including a page that yields no usable text, is a terminal
//! extraction failure for that article and fails the whole job.

use crate::error::{ArticastError, Result};
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// Trait for fetching cleaned article text from a URL.
pub trait ArticleExtractor: Send + Sync {
    /// Fetch and clean the article behind `url`.
    ///
    /// Empty text is a failure, never an empty success.
    fn extract(&self, url: &str) -> Result<String>;
}

/// HTTP-backed extractor: fetch the page, pull readable paragraph text.
pub struct HttpArticleExtractor {
    client: reqwest::blocking::Client,
}

impl HttpArticleExtractor {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("articast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ArticastError::Other(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl ArticleExtractor for HttpArticleExtractor {
    fn extract(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| ArticastError::Extraction {
                url: url.to_string(),
                message: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(ArticastError::Extraction {
                url: url.to_string(),
                message: format!("server returned {}", response.status()),
            });
        }

        let html = response.text().map_err(|e| ArticastError::Extraction {
            url: url.to_string(),
            message: format!("failed to read body: {}", e),
        })?;

        let text = article_text(&html);
        if text.is_empty() {
            return Err(ArticastError::Extraction {
                url: url.to_string(),
                message: "no usable article text".to_string(),
            });
        }
        Ok(text)
    }
}

/// Pull readable article text out of page HTML.
///
/// Prefers paragraphs inside `<article>`/`<main>` containers and falls back
/// to all paragraphs; text is joined with spaces and whitespace-normalized.
pub fn article_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in ["article p", "main p", "p"] {
        let Ok(selector) = Selector::parse(selector_str) else {
            continue;
        };
        let paragraphs: Vec<String> = document
            .select(&selector)
            .map(|p| p.text().collect::<Vec<_>>().join(" "))
            .map(|t| normalize_whitespace(&t))
            .filter(|t| !t.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return paragraphs.join(" ");
        }
    }

    String::new()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Mock extractor for testing.
pub struct MockArticleExtractor {
    articles: HashMap<String, String>,
    failures: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockArticleExtractor {
    pub fn new() -> Self {
        Self {
            articles: HashMap::new(),
            failures: HashSet::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Configure the text returned for a URL.
    pub fn with_article(mut self, url: &str, text: &str) -> Self {
        self.articles.insert(url.to_string(), text.to_string());
        self
    }

    /// Configure a URL to fail extraction.
    pub fn with_failure(mut self, url: &str) -> Self {
        self.failures.insert(url.to_string());
        self
    }

    /// URLs extracted so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of extract calls for one URL.
    pub fn call_count_for(&self, url: &str) -> usize {
        self.calls()
            .iter()
            .filter(|recorded| recorded.as_str() == url)
            .count()
    }
}

impl Default for MockArticleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ArticleExtractor for MockArticleExtractor {
    fn extract(&self, url: &str) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.to_string());
        }

        if self.failures.contains(url) {
            return Err(ArticastError::Extraction {
                url: url.to_string(),
                message: "mock extraction failure".to_string(),
            });
        }

        match self.articles.get(url) {
            Some(text) => Ok(text.clone()),
            None => Ok(format!("Mock article for {url}. It has two sentences.")),
        }
    }
}
