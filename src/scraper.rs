use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::{Client, ClientBuilder};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::error::{AppError, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(20);
const USER_AGENT: &str = "QuizGenerator-Scraper/1.0";

/// Longest url the `quizzes` table is meant to hold.
pub const MAX_URL_LENGTH: usize = 512;

/// Elements dropped wholesale before any text is collected.
const STRIPPED_TAGS: [&str; 4] = ["table", "style", "script", "sup"];
const STRIPPED_CLASSES: [&str; 2] = ["toc", "reference"];

// Create static selectors to avoid recompiling them each time
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1#firstHeading").expect("Failed to parse title selector")
});

static CONTENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#mw-content-text").expect("Failed to parse content selector")
});

static BLOCK_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h2, h3, p").expect("Failed to parse block selector")
});

static CITATION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[.*?\]$").expect("Failed to compile citation regex")
});

static SPACE_BEFORE_NEWLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+\n").expect("Failed to compile whitespace regex")
});

static BLANK_LINES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{2,}").expect("Failed to compile blank line regex")
});

/// Naive entity buckets. Only `people` is ever filled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KeyEntities {
    pub people: Vec<String>,
    pub organizations: Vec<String>,
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    pub title: String,
    pub cleaned_text: String,
    pub sections: Vec<String>,
    pub entities: KeyEntities,
}

/// The single outbound GET the scraper performs.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<String>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let html = response.text().await?;
        Ok(html)
    }
}

pub struct WikipediaScraper {
    fetcher: Arc<dyn PageFetcher>,
}

impl WikipediaScraper {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Takes a url already accepted by [`validate_wikipedia_url`].
    pub async fn fetch_article(&self, url: &Url) -> Result<Article> {
        tracing::debug!(%url, "Fetching article HTML");
        let html = self.fetcher.fetch(url).await?;
        tracing::debug!(bytes = html.len(), "Article HTML received");

        parse_article(&html)
    }
}

/// Accepts only absolute http(s) urls whose host contains `wikipedia.org`.
pub fn validate_wikipedia_url(raw: &str) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(AppError::InvalidUrl("URL cannot be empty".to_string()));
    }
    if raw.chars().count() > MAX_URL_LENGTH {
        return Err(AppError::InvalidUrl(format!(
            "URL exceeds {} characters",
            MAX_URL_LENGTH
        )));
    }

    let url = Url::parse(raw)
        .map_err(|e| AppError::InvalidUrl(format!("Invalid URL format: {}", e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(AppError::InvalidUrl("Invalid URL format".to_string()));
    }

    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    if !host.contains("wikipedia.org") {
        return Err(AppError::NotWikipedia(raw.to_string()));
    }

    Ok(url)
}

pub fn parse_article(html: &str) -> Result<Article> {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|heading| text_of(heading, "", false))
        .filter(|title| !title.is_empty())
        .unwrap_or_else(|| "Untitled".to_string());

    let content = document
        .select(&CONTENT_SELECTOR)
        .next()
        .ok_or_else(|| AppError::ContentNotFound("Wikipedia page content not found".to_string()))?;

    let mut sections = Vec::new();
    let mut text_blocks = Vec::new();

    for block in content.select(&BLOCK_SELECTOR) {
        if is_inside_stripped(block, content) {
            continue;
        }

        match block.value().name() {
            "h2" | "h3" => sections.push(strip_citation_suffix(&text_of(block, " ", true))),
            _ => {
                let text = text_of(block, " ", true);
                if !text.is_empty() {
                    text_blocks.push(text);
                }
            }
        }
    }

    let cleaned_text = clean_whitespace(&text_blocks.join("\n\n"));
    let entities = extract_entities(&cleaned_text);

    Ok(Article {
        title,
        cleaned_text,
        sections,
        entities,
    })
}

fn is_stripped(element: ElementRef<'_>) -> bool {
    let value = element.value();
    STRIPPED_TAGS.contains(&value.name())
        || value.classes().any(|class| STRIPPED_CLASSES.contains(&class))
}

fn is_inside_stripped(element: ElementRef<'_>, container: ElementRef<'_>) -> bool {
    is_stripped(element)
        || element
            .ancestors()
            .take_while(|node| node.id() != container.id())
            .filter_map(ElementRef::wrap)
            .any(is_stripped)
}

/// Trimmed, non-empty text pieces joined with `separator`.
fn text_of(element: ElementRef<'_>, separator: &str, skip_stripped: bool) -> String {
    let mut pieces = Vec::new();
    collect_pieces(element, skip_stripped, &mut pieces);
    pieces.join(separator)
}

fn collect_pieces<'a>(element: ElementRef<'a>, skip_stripped: bool, pieces: &mut Vec<&'a str>) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                pieces.push(trimmed);
            }
        } else if let Some(child) = ElementRef::wrap(child) {
            if skip_stripped && is_stripped(child) {
                continue;
            }
            collect_pieces(child, skip_stripped, pieces);
        }
    }
}

fn strip_citation_suffix(heading: &str) -> String {
    CITATION_SUFFIX.replace(heading, "").into_owned()
}

pub fn clean_whitespace(text: &str) -> String {
    let text = SPACE_BEFORE_NEWLINE.replace_all(text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Every title-case token longer than three characters lands in `people`.
/// Organisations and locations are never detected.
pub fn extract_entities(text: &str) -> KeyEntities {
    let people = text
        .split_whitespace()
        .filter(|word| word.chars().count() > 3 && is_title_case(word))
        .map(str::to_string)
        .collect();

    KeyEntities {
        people,
        ..KeyEntities::default()
    }
}

/// Each run of cased letters starts with one uppercase letter followed only by
/// lowercase letters, and at least one cased letter exists.
fn is_title_case(word: &str) -> bool {
    let mut seen_cased = false;
    let mut previous_cased = false;

    for c in word.chars() {
        if c.is_uppercase() {
            if previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !previous_cased {
                return false;
            }
            previous_cased = true;
            seen_cased = true;
        } else {
            previous_cased = false;
        }
    }

    seen_cased
}
