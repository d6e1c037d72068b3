use serde::Deserialize;

use super::repo_types::Author;

/// Body of `POST /questions/add`. A client-sent `qId` or `answerList` is
/// ignored.
#[derive(Debug, Deserialize)]
pub struct AddQuestionRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Debug, Deserialize)]
pub struct AddAnswerRequest {
    pub body: String,
    #[serde(default)]
    pub author: Option<Author>,
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: String,
}
