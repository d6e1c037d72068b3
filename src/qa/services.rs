use tracing::info;

use super::{
    dto::{AddAnswerRequest, AddQuestionRequest},
    repo::QuestionStore,
    repo_types::{Author, NewAnswer, NewQuestion},
};
use crate::{
    auth::repo_types::User,
    error::{AppError, AppResult},
};

/// The signed-in user wins over whatever author the payload names.
fn pick_author(current: Option<&User>, claimed: Option<Author>) -> AppResult<Author> {
    if let Some(user) = current {
        return Ok(Author::from(user));
    }
    match claimed {
        Some(a) if !a.username.trim().is_empty() => Ok(Author {
            username: a.username.trim().to_owned(),
            photo: a.photo,
        }),
        _ => Err(AppError::validation("author.username is required")),
    }
}

pub async fn add_question(
    store: &dyn QuestionStore,
    current: Option<&User>,
    req: AddQuestionRequest,
) -> AppResult<String> {
    if req.title.trim().is_empty() {
        return Err(AppError::validation("title must not be empty"));
    }
    let author = pick_author(current, req.author)?;
    let id = store
        .add_question(NewQuestion {
            title: req.title,
            description: req.description,
            author,
        })
        .await?;
    info!(question_id = %id, "question added");
    Ok(id)
}

pub async fn add_answer(
    store: &dyn QuestionStore,
    question_id: &str,
    current: Option<&User>,
    req: AddAnswerRequest,
) -> AppResult<String> {
    if req.body.trim().is_empty() {
        return Err(AppError::validation("body must not be empty"));
    }
    let author = pick_author(current, req.author)?;
    let id = store
        .add_answer(
            question_id,
            NewAnswer {
                body: req.body,
                author,
            },
        )
        .await?;
    info!(%question_id, answer_id = %id, "answer added");
    Ok(id)
}
