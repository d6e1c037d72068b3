use async_trait::async_trait;
use sqlx::{types::Json, PgPool};

use crate::{
    error::{AppError, AppResult},
    qa::repo_types::{
        Answer, NewAnswer, NewQuestion, Question, QuestionRow, QuestionSummary,
    },
};

/// Questions with their embedded answer lists. Every mutation must be a
/// single atomic operation on one question.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn list_questions(&self) -> AppResult<Vec<QuestionSummary>>;
    async fn get_question(&self, id: &str) -> AppResult<Option<Question>>;
    async fn get_answers(&self, id: &str) -> AppResult<Option<Vec<Answer>>>;
    async fn add_question(&self, new: NewQuestion) -> AppResult<String>;
    async fn add_answer(&self, question_id: &str, new: NewAnswer) -> AppResult<String>;
    async fn search(&self, query: &str) -> AppResult<Vec<QuestionSummary>>;

    /// Looks through the whole answer list, not just its head.
    async fn get_answer(&self, id: &str, answer_id: &str) -> AppResult<Answer> {
        let answers = self
            .get_answers(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("question {id}")))?;
        answers
            .into_iter()
            .find(|a| a.id == answer_id)
            .ok_or_else(|| AppError::not_found(format!("answer {answer_id}")))
    }
}

// `seq` is assigned at insert time, so it is the insertion order even when
// two rows share a `created_at` timestamp.
const LIST_QUESTIONS_SQL: &str = r#"
    SELECT id, title, description
    FROM questions
    ORDER BY seq
"#;

// strpos on an empty needle is 1, so "" matches every row.
const SEARCH_QUESTIONS_SQL: &str = r#"
    SELECT id, title, description
    FROM questions
    WHERE strpos(lower(title), lower($1)) > 0
       OR strpos(lower(description), lower($1)) > 0
       OR strpos(lower(author->>'username'), lower($1)) > 0
    ORDER BY seq
"#;

#[derive(Clone)]
pub struct PgQuestionStore {
    db: PgPool,
}

impl PgQuestionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QuestionStore for PgQuestionStore {
    async fn list_questions(&self) -> AppResult<Vec<QuestionSummary>> {
        let rows = sqlx::query_as::<_, QuestionSummary>(LIST_QUESTIONS_SQL)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }

    async fn get_question(&self, id: &str) -> AppResult<Option<Question>> {
        let row = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, title, description, author, answers
            FROM questions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Question::from))
    }

    async fn get_answers(&self, id: &str) -> AppResult<Option<Vec<Answer>>> {
        let answers = sqlx::query_scalar::<_, Json<Vec<Answer>>>(
            r#"SELECT answers FROM questions WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(answers.map(|a| a.0))
    }

    async fn add_question(&self, new: NewQuestion) -> AppResult<String> {
        let q = Question::create(new);
        sqlx::query(
            r#"
            INSERT INTO questions (id, title, description, author, answers)
            VALUES ($1, $2, $3, $4, '[]'::jsonb)
            "#,
        )
        .bind(&q.id)
        .bind(&q.title)
        .bind(&q.description)
        .bind(Json(&q.author))
        .execute(&self.db)
        .await?;
        Ok(q.id)
    }

    async fn add_answer(&self, question_id: &str, new: NewAnswer) -> AppResult<String> {
        let answer = Answer::create(new);
        // Single-statement append keeps concurrent answers from clobbering each other.
        let res = sqlx::query(
            r#"
            UPDATE questions
            SET answers = answers || jsonb_build_array($2::jsonb)
            WHERE id = $1
            "#,
        )
        .bind(question_id)
        .bind(Json(&answer))
        .execute(&self.db)
        .await?;
        if res.rows_affected() == 0 {
            return Err(AppError::not_found(format!("question {question_id}")));
        }
        Ok(answer.id)
    }

    async fn search(&self, query: &str) -> AppResult<Vec<QuestionSummary>> {
        let rows = sqlx::query_as::<_, QuestionSummary>(SEARCH_QUESTIONS_SQL)
            .bind(query)
            .fetch_all(&self.db)
            .await?;
        Ok(rows)
    }
}
