use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::{
    dto::{AddAnswerRequest, AddQuestionRequest, SearchRequest},
    repo_types::{Answer, QuestionSummary},
    services,
};
use crate::{
    auth::extractors::MaybeUser,
    error::{AppError, AppResult},
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/questions", get(list_questions))
        .route("/questions/:q_id", get(get_question))
        .route("/questions/:q_id/answers", get(get_answers))
        .route("/questions/:q_id/answers/:a_id", get(get_answer))
        .route("/search", post(search))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/questions/add", post(add_question))
        .route("/questions/:q_id/answers/add", post(add_answer))
}

fn created(location: String) -> Response {
    (StatusCode::CREATED, [(header::LOCATION, location)], Json(true)).into_response()
}

#[instrument(skip(state))]
pub async fn list_questions(State(state): State<AppState>) -> AppResult<Json<Vec<QuestionSummary>>> {
    Ok(Json(state.questions.list_questions().await?))
}

#[instrument(skip(state))]
pub async fn get_question(
    State(state): State<AppState>,
    Path(q_id): Path<String>,
) -> AppResult<Json<QuestionSummary>> {
    let q = state.questions.get_question(&q_id).await?.ok_or_else(|| {
        warn!(%q_id, "question not found");
        AppError::not_found(format!("question {q_id}"))
    })?;
    Ok(Json(q.summary()))
}

#[instrument(skip(state))]
pub async fn get_answers(
    State(state): State<AppState>,
    Path(q_id): Path<String>,
) -> AppResult<Json<Vec<Answer>>> {
    let answers = state
        .questions
        .get_answers(&q_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("question {q_id}")))?;
    Ok(Json(answers))
}

#[instrument(skip(state))]
pub async fn get_answer(
    State(state): State<AppState>,
    Path((q_id, a_id)): Path<(String, String)>,
) -> AppResult<Json<Answer>> {
    Ok(Json(state.questions.get_answer(&q_id, &a_id).await?))
}

#[instrument(skip_all)]
pub async fn add_question(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    payload: Result<Json<AddQuestionRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    let id = services::add_question(state.questions.as_ref(), user.as_ref(), payload).await?;
    Ok(created(format!("/api/questions/{id}")))
}

#[instrument(skip(state, user, payload))]
pub async fn add_answer(
    State(state): State<AppState>,
    Path(q_id): Path<String>,
    MaybeUser(user): MaybeUser,
    payload: Result<Json<AddAnswerRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(payload) = payload?;
    let id = services::add_answer(state.questions.as_ref(), &q_id, user.as_ref(), payload).await?;
    Ok(created(format!("/api/questions/{q_id}/answers/{id}")))
}

#[instrument(skip(state, payload))]
pub async fn search(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> AppResult<Json<Vec<QuestionSummary>>> {
    let Json(payload) = payload?;
    Ok(Json(state.questions.search(&payload.query).await?))
}
