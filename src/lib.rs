pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod quiz;
pub mod scraper;
pub mod store;

use std::sync::Arc;
use crate::quiz::QuizSynthesizer;
use crate::scraper::WikipediaScraper;
use crate::store::QuizStore;

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub scraper: Arc<WikipediaScraper>,
    pub synthesizer: Arc<QuizSynthesizer>,
    pub store: QuizStore,
}
