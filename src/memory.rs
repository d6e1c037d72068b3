//! Process-local stores used by tests and by the server when no
//! `DATABASE_URL` is configured. Each operation holds the lock for its whole
//! duration, which gives the same per-record atomicity as the Postgres store.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;

use crate::{
    auth::{
        repo::UserStore,
        repo_types::{ProfileUpdate, User},
    },
    error::{AppError, AppResult},
    qa::{
        repo::QuestionStore,
        repo_types::{Answer, NewAnswer, NewQuestion, Question, QuestionSummary},
    },
};

fn lock<T>(m: &Mutex<T>) -> AppResult<MutexGuard<'_, T>> {
    m.lock()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("memory store lock poisoned")))
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<String, User>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: User) -> AppResult<()> {
        let mut users = lock(&self.users)?;
        if users.contains_key(&user.username) {
            return Err(AppError::DuplicateUser(user.username));
        }
        users.insert(user.username.clone(), user);
        Ok(())
    }

    async fn find(&self, username: &str) -> AppResult<Option<User>> {
        Ok(lock(&self.users)?.get(username).cloned())
    }

    async fn update_profile(&self, username: &str, profile: ProfileUpdate) -> AppResult<User> {
        let mut users = lock(&self.users)?;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AppError::not_found(format!("user {username}")))?;
        profile.apply(user);
        Ok(user.clone())
    }

    async fn set_password_hash(&self, username: &str, password_hash: &str) -> AppResult<()> {
        let mut users = lock(&self.users)?;
        let user = users
            .get_mut(username)
            .ok_or_else(|| AppError::not_found(format!("user {username}")))?;
        user.password_hash = password_hash.to_owned();
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryQuestionStore {
    questions: Mutex<Vec<Question>>,
}

#[async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn list_questions(&self) -> AppResult<Vec<QuestionSummary>> {
        Ok(lock(&self.questions)?.iter().map(Question::summary).collect())
    }

    async fn get_question(&self, id: &str) -> AppResult<Option<Question>> {
        Ok(lock(&self.questions)?.iter().find(|q| q.id == id).cloned())
    }

    async fn get_answers(&self, id: &str) -> AppResult<Option<Vec<Answer>>> {
        Ok(lock(&self.questions)?
            .iter()
            .find(|q| q.id == id)
            .map(|q| q.answers.clone()))
    }

    async fn add_question(&self, new: NewQuestion) -> AppResult<String> {
        let q = Question::create(new);
        let id = q.id.clone();
        lock(&self.questions)?.push(q);
        Ok(id)
    }

    async fn add_answer(&self, question_id: &str, new: NewAnswer) -> AppResult<String> {
        let mut questions = lock(&self.questions)?;
        let q = questions
            .iter_mut()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AppError::not_found(format!("question {question_id}")))?;
        let answer = Answer::create(new);
        let id = answer.id.clone();
        q.answers.push(answer);
        Ok(id)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<QuestionSummary>> {
        Ok(lock(&self.questions)?
            .iter()
            .filter(|q| q.matches(query))
            .map(Question::summary)
            .collect())
    }
}
