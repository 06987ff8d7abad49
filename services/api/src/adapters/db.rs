//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CardStore` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use flashdeck_core::domain::{Card, SourceText, User, UserCredentials};
use flashdeck_core::ports::{CardStore, PortError, PortResult};
use flashdeck_core::scheduler::ReviewOutcome;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CardStore` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    user_id: Uuid,
    username: String,
}
impl UserRecord {
    fn to_domain(self) -> User {
        User {
            user_id: self.user_id,
            username: self.username,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    user_id: Uuid,
    username: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.user_id,
            username: self.username,
            hashed_password: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct AuthSessionRecord {
    user_id: Uuid,
    expires_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct SourceTextRecord {
    id: Uuid,
    user_id: Uuid,
    content: String,
}
impl SourceTextRecord {
    fn to_domain(self) -> SourceText {
        SourceText {
            id: self.id,
            user_id: self.user_id,
            content: self.content,
        }
    }
}

#[derive(FromRow)]
struct CardRecord {
    id: Uuid,
    user_id: Uuid,
    question: String,
    answer: String,
    title: String,
    category: String,
    ease_factor: f64,
    interval: i32,
    repetitions: i32,
    last_review: Option<NaiveDate>,
    next_review: NaiveDate,
    source_id: Option<Uuid>,
    blank_count: i32,
}
impl CardRecord {
    fn to_domain(self) -> Card {
        Card {
            id: self.id,
            user_id: self.user_id,
            question: self.question,
            answer: self.answer,
            title: self.title,
            category: self.category,
            ease_factor: self.ease_factor,
            interval: self.interval,
            repetitions: self.repetitions,
            last_review: self.last_review,
            next_review: self.next_review,
            source_id: self.source_id,
            blank_count: self.blank_count,
        }
    }
}

const CARD_COLUMNS: &str = "id, user_id, question, answer, title, category, ease_factor, \
                            \"interval\", repetitions, last_review, next_review, source_id, blank_count";

//=========================================================================================
// `CardStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CardStore for DbAdapter {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        // Username comparison is case-insensitive, matching the unique index.
        let taken: Option<(Uuid,)> =
            sqlx::query_as("SELECT user_id FROM users WHERE lower(username) = lower($1)")
                .bind(username)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;
        if taken.is_some() {
            return Err(PortError::Conflict(format!(
                "Username '{}' is already taken",
                username
            )));
        }

        let record: UserRecord = sqlx::query_as(
            "INSERT INTO users (user_id, username, password_hash) VALUES ($1, $2, $3) \
             RETURNING user_id, username",
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(hashed_password)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record: CredentialsRecord = sqlx::query_as(
            "SELECT user_id, username, password_hash FROM users WHERE lower(username) = lower($1)",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("User '{}' not found", username))
            }
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        sqlx::query("INSERT INTO auth_sessions (id, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(session_id)
            .bind(user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        let record: Option<AuthSessionRecord> =
            sqlx::query_as("SELECT user_id, expires_at FROM auth_sessions WHERE id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(unexpected)?;

        let record = record.ok_or(PortError::Unauthorized)?;

        // Expired sessions are removed as soon as they are seen.
        if Utc::now() > record.expires_at {
            sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
                .bind(session_id)
                .execute(&self.pool)
                .await
                .map_err(unexpected)?;
            return Err(PortError::Unauthorized);
        }

        Ok(record.user_id)
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn create_source_text(&self, user_id: Uuid, content: &str) -> PortResult<SourceText> {
        let record: SourceTextRecord = sqlx::query_as(
            "INSERT INTO source_texts (id, user_id, content) VALUES ($1, $2, $3) \
             RETURNING id, user_id, content",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn load_cards(&self, user_id: Uuid) -> PortResult<Vec<Card>> {
        // The stable ordering here is what makes same-source deduplication
        // in the quota selector reproducible across requests.
        let records: Vec<CardRecord> = sqlx::query_as(&format!(
            "SELECT {} FROM cards WHERE user_id = $1 ORDER BY created_at, id",
            CARD_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn add_card(&self, card: Card) -> PortResult<Card> {
        let record: CardRecord = sqlx::query_as(&format!(
            "INSERT INTO cards (id, user_id, question, answer, title, category, ease_factor, \
             \"interval\", repetitions, last_review, next_review, source_id, blank_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {}",
            CARD_COLUMNS
        ))
        .bind(card.id)
        .bind(card.user_id)
        .bind(&card.question)
        .bind(&card.answer)
        .bind(&card.title)
        .bind(&card.category)
        .bind(card.ease_factor)
        .bind(card.interval)
        .bind(card.repetitions)
        .bind(card.last_review)
        .bind(card.next_review)
        .bind(card.source_id)
        .bind(card.blank_count)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.to_domain())
    }

    async fn update_card_progress(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        outcome: &ReviewOutcome,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE cards SET ease_factor = $1, \"interval\" = $2, repetitions = $3, \
             last_review = $4, next_review = $5 WHERE id = $6 AND user_id = $7",
        )
        .bind(outcome.ease_factor)
        .bind(outcome.interval)
        .bind(outcome.repetitions)
        .bind(outcome.last_review)
        .bind(outcome.next_review)
        .bind(card_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        Ok(())
    }

    async fn update_card_content(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        question: &str,
        answer: &str,
        title: &str,
        category: &str,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE cards SET question = $1, answer = $2, title = $3, category = $4 \
             WHERE id = $5 AND user_id = $6",
        )
        .bind(question)
        .bind(answer)
        .bind(title)
        .bind(category)
        .bind(card_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        Ok(())
    }

    async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM cards WHERE id = $1 AND user_id = $2")
            .bind(card_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Card {} not found", card_id)));
        }
        Ok(())
    }
}
