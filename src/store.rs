use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::error::{AppError, Result};

/// Column list for `quizzes` queries.
const QUIZ_COLUMNS: &str = "id, url, title, date_generated, scraped_content, full_quiz_data";

#[derive(sqlx::FromRow)]
struct QuizRow {
    id: i64,
    url: String,
    title: Option<String>,
    date_generated: DateTime<Utc>,
    scraped_content: Option<String>,
    full_quiz_data: Option<String>,
}

/// A stored quiz with its payload deserialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuizRecord {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub date_generated: DateTime<Utc>,
    pub scraped_content: String,
    pub quiz: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct QuizSummary {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub date_generated: DateTime<Utc>,
}

impl TryFrom<QuizRow> for QuizRecord {
    type Error = AppError;

    fn try_from(row: QuizRow) -> Result<Self> {
        let quiz = match row.full_quiz_data.as_deref() {
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                AppError::StorageError(format!("Stored quiz {} is not valid JSON: {}", row.id, e))
            })?,
            None => Value::Null,
        };

        Ok(QuizRecord {
            id: row.id,
            url: row.url,
            title: row.title.unwrap_or_default(),
            date_generated: row.date_generated,
            scraped_content: row.scraped_content.unwrap_or_default(),
            quiz,
        })
    }
}

/// One row per url in the `quizzes` table.
#[derive(Clone)]
pub struct QuizStore {
    pool: SqlitePool,
}

impl QuizStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database behind `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Inserts a new quiz or overwrites title, content and payload of the row
    /// already holding `url`. `id` and `date_generated` of an existing row
    /// never change.
    pub async fn upsert(
        &self,
        url: &str,
        title: &str,
        content: &str,
        payload: &Value,
    ) -> Result<QuizRecord> {
        let serialized = serde_json::to_string(payload)
            .map_err(|e| AppError::StorageError(format!("Failed to serialize quiz: {}", e)))?;

        let query = format!(
            "INSERT INTO quizzes (url, title, date_generated, scraped_content, full_quiz_data) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(url) DO UPDATE SET \
                title = excluded.title, \
                scraped_content = excluded.scraped_content, \
                full_quiz_data = excluded.full_quiz_data \
             RETURNING {QUIZ_COLUMNS}"
        );
        let row = sqlx::query_as::<_, QuizRow>(&query)
            .bind(url)
            .bind(title)
            .bind(Utc::now())
            .bind(content)
            .bind(&serialized)
            .fetch_one(&self.pool)
            .await?;

        tracing::debug!(id = row.id, url, "Quiz persisted");
        QuizRecord::try_from(row)
    }

    pub async fn get(&self, id: i64) -> Result<QuizRecord> {
        let query = format!("SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = ?");
        let row = sqlx::query_as::<_, QuizRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound(id))?;

        QuizRecord::try_from(row)
    }

    pub async fn list_all(&self) -> Result<Vec<QuizSummary>> {
        let summaries = sqlx::query_as::<_, QuizSummary>(
            "SELECT id, url, COALESCE(title, '') AS title, date_generated \
             FROM quizzes ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }
}
