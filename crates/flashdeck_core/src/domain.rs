//! crates/flashdeck_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

/// A single question/answer flashcard together with its scheduling statistics.
///
/// The identity (`id`) never changes; the scheduling fields are overwritten
/// in place each time the card is graded.
#[derive(Debug, Clone)]
pub struct Card {
    pub id: Uuid,
    pub user_id: Uuid,
    pub question: String,
    pub answer: String,
    pub title: String,
    pub category: String,
    /// SM-2 ease factor, never below 1.3. New cards start at 2.5.
    pub ease_factor: f64,
    /// Days until the next review. 0 means due immediately.
    pub interval: i32,
    /// Consecutive successful recalls; resets to 0 on failure.
    pub repetitions: i32,
    pub last_review: Option<NaiveDate>,
    /// The card is eligible for review once this date has arrived.
    pub next_review: NaiveDate,
    /// The source text this card was generated from, if any. Manually
    /// created cards have no source.
    pub source_id: Option<Uuid>,
    /// Number of fill-in-blank segments the card represents; a coarse
    /// difficulty signal used by the quota selector. At least 1.
    pub blank_count: i32,
}

impl Card {
    /// Creates a card in its initial scheduling state: due today, never
    /// reviewed, default ease.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_id: Uuid,
        question: String,
        answer: String,
        title: String,
        category: String,
        source_id: Option<Uuid>,
        blank_count: i32,
        today: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            question,
            answer,
            title,
            category,
            ease_factor: 2.5,
            interval: 0,
            repetitions: 0,
            last_review: None,
            next_review: today,
            source_id,
            blank_count: blank_count.max(1),
        }
    }

    /// Whether the card is eligible for review on the given date.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        self.next_review <= today
    }
}

/// The original passage a set of cards was generated from. The core only
/// reads the `Card::source_id` association for deduplication.
#[derive(Debug, Clone)]
pub struct SourceText {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
}

/// A draft card proposed by the generation service, before the user has
/// reviewed and saved it.
#[derive(Debug, Clone)]
pub struct GeneratedCard {
    pub question: String,
    pub answer: String,
    pub blank_count: i32,
}

// Represents a user - used throughout the app.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub username: String,
}

// Only used internally for login/signup - contains sensitive data.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub username: String,
    pub hashed_password: String,
}

// Represents a browser login session (auth cookie).
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
