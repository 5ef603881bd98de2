use serde::{Deserialize, Serialize};
use serde_json::Value;
use chrono::{DateTime, Utc};

use crate::scraper::KeyEntities;
use crate::store::QuizRecord;

#[derive(Deserialize)]
pub struct GenerateQuizRequest {
    // Missing or null is validated like an empty url.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct GenerateQuizResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub sections: Vec<String>,
    pub key_entities: KeyEntities,
    pub quiz: Value,
}

#[derive(Serialize)]
pub struct QuizDetailResponse {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub date_generated: DateTime<Utc>,
    pub scraped_content: String,
    pub quiz: Value,
}

impl From<QuizRecord> for QuizDetailResponse {
    fn from(record: QuizRecord) -> Self {
        Self {
            id: record.id,
            url: record.url,
            title: record.title,
            date_generated: record.date_generated,
            scraped_content: record.scraped_content,
            quiz: record.quiz,
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}
