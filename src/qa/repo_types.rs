use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::auth::repo_types::User;

/// Copy of the author's identity taken when a question or answer is written.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    pub username: String,
    #[serde(default)]
    pub photo: String,
}

impl From<&User> for Author {
    fn from(u: &User) -> Self {
        Self {
            username: u.username.clone(),
            photo: u.photo.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Answer {
    #[serde(rename = "aId")]
    pub id: String,
    pub body: String,
    pub author: Author,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    #[serde(rename = "qId")]
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: Author,
    #[serde(rename = "answerList", default)]
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct QuestionSummary {
    #[serde(rename = "qId")]
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Input to `QuestionStore::add_question`; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub title: String,
    pub description: String,
    pub author: Author,
}

#[derive(Debug, Clone)]
pub struct NewAnswer {
    pub body: String,
    pub author: Author,
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Question {
    pub fn create(new: NewQuestion) -> Self {
        Self {
            id: new_id(),
            title: new.title,
            description: new.description,
            author: new.author,
            answers: Vec::new(),
        }
    }

    pub fn summary(&self) -> QuestionSummary {
        QuestionSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
        }
    }

    /// Case-insensitive substring match on title, description or author
    /// username. An empty query matches every question.
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [
            self.title.as_str(),
            self.description.as_str(),
            self.author.username.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

impl Answer {
    pub fn create(new: NewAnswer) -> Self {
        Self {
            id: new_id(),
            body: new.body,
            author: new.author,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: Json<Author>,
    pub answers: Json<Vec<Answer>>,
}

impl From<QuestionRow> for Question {
    fn from(r: QuestionRow) -> Self {
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            author: r.author.0,
            answers: r.answers.0,
        }
    }
}
