/// HTTP surface of the site: guide reads, submission writes, blog feed.
///
/// JSON in, JSON out. Handlers stay thin — validation and persistence live
/// in the stores, and errors map to responses through `AppError`.
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use waypost_common::feed::{FeedPost, FeedService};

use crate::error::AppError;
use crate::guides::GuideStore;
use crate::model::GuideRecord;
use crate::store::SubmissionStore;

const DEFAULT_POST_LIMIT: usize = 5;

#[derive(Clone)]
pub struct AppState {
    pub guides: Arc<GuideStore>,
    pub contact: Arc<SubmissionStore>,
    pub itinerary: Arc<SubmissionStore>,
    pub feed: Arc<FeedService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/guides", get(list_guides))
        .route("/api/guides/{slug}", get(get_guide))
        .route("/api/contact", post(submit_contact))
        .route("/api/itinerary-request", post(submit_itinerary))
        .route("/api/posts", get(list_posts))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_guides(
    State(state): State<AppState>,
) -> Result<Json<Vec<GuideRecord>>, AppError> {
    Ok(Json(state.guides.all_guides()?))
}

async fn get_guide(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<GuideRecord>, AppError> {
    match state.guides.guide(&slug)? {
        Some(guide) => Ok(Json(guide)),
        None => Err(AppError::NotFound(slug)),
    }
}

async fn submit_contact(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let fields = into_object(body)?;
    state.contact.record_contact(fields).await?;
    Ok(Json(json!({ "success": true })))
}

async fn submit_itinerary(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AppError> {
    let fields = into_object(body)?;
    let receipt = state.itinerary.record_itinerary(fields).await?;
    Ok(Json(json!({
        "success": true,
        "requestId": receipt.request_id,
        "message": receipt.message,
    })))
}

#[derive(Debug, Deserialize)]
struct PostsQuery {
    limit: Option<usize>,
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostsQuery>,
) -> Result<Json<Vec<FeedPost>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_POST_LIMIT);
    let posts = state.feed.posts(limit).await.map_err(AppError::from)?;
    Ok(Json(posts))
}

/// Unwrap a submission body. Malformed JSON and non-object bodies are both
/// validation failures so the caller always gets the `success`/`error`
/// envelope, never a bare extractor rejection.
fn into_object(body: Result<Json<Value>, JsonRejection>) -> Result<Map<String, Value>, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::Validation(
            "request body must be a JSON object".to_string(),
        )),
    }
}
