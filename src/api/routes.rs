use axum::{
    routing::{get, post},
    Router,
    extract::{rejection::JsonRejection, Json, Path, State},
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use std::time::Instant;

use crate::error::{AppError, Result};
use crate::api::models::{GenerateQuizRequest, GenerateQuizResponse, HealthResponse, QuizDetailResponse};
use crate::quiz::unwrap_quiz;
use crate::scraper::validate_wikipedia_url;
use crate::store::QuizSummary;
use crate::AppState;

/// Articles shorter than this (in characters) are not worth a quiz.
pub const MIN_CONTENT_CHARS: usize = 100;

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/generate_quiz", post(generate_quiz_handler))
        .route("/history", get(history_handler))
        .route("/quiz/:id", get(quiz_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

async fn generate_quiz_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<GenerateQuizRequest>, JsonRejection>,
) -> Result<Json<GenerateQuizResponse>> {
    let Json(req) = payload.map_err(|rejection| AppError::InvalidUrl(rejection.body_text()))?;
    let raw_url = req.url.unwrap_or_default();
    let parsed = validate_wikipedia_url(&raw_url)?;
    let url = raw_url.trim();

    tracing::info!(url, "Generating quiz");
    let start_time = Instant::now();

    let article = state.scraper.fetch_article(&parsed).await?;
    let length = article.cleaned_text.chars().count();
    tracing::debug!(
        title = %article.title,
        chars = length,
        sections = article.sections.len(),
        "Article scraped"
    );

    if length < MIN_CONTENT_CHARS {
        return Err(AppError::InsufficientContent { length });
    }

    let quiz = state
        .synthesizer
        .synthesize(&article.title, &article.cleaned_text)
        .await?;

    let record = state
        .store
        .upsert(url, &article.title, &article.cleaned_text, &quiz)
        .await?;

    tracing::info!(id = record.id, url, elapsed = ?start_time.elapsed(), "Quiz generated");

    Ok(Json(GenerateQuizResponse {
        id: record.id,
        url: record.url,
        title: article.title,
        sections: article.sections,
        key_entities: article.entities,
        quiz,
    }))
}

async fn history_handler(State(state): State<AppState>) -> Result<Json<Vec<QuizSummary>>> {
    let history = state.store.list_all().await?;
    tracing::debug!(count = history.len(), "History loaded");
    Ok(Json(history))
}

async fn quiz_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<QuizDetailResponse>> {
    let mut record = state.store.get(id).await?;
    record.quiz = unwrap_quiz(record.quiz);
    Ok(Json(record.into()))
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
