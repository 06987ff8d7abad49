//! crates/flashdeck_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or AI APIs.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{Card, GeneratedCard, SourceText, User, UserCredentials};
use crate::scheduler::ReviewOutcome;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistent storage for users, login sessions, source texts, and cards.
///
/// The store owns all consistency concerns: a card's statistics update must
/// be applied atomically, and per-user isolation is enforced by passing the
/// `user_id` on every card operation.
#[async_trait]
pub trait CardStore: Send + Sync {
    // --- Auth Methods ---
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User>;

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;

    // --- Source Texts ---
    async fn create_source_text(&self, user_id: Uuid, content: &str) -> PortResult<SourceText>;

    // --- Card Management ---
    async fn load_cards(&self, user_id: Uuid) -> PortResult<Vec<Card>>;

    async fn add_card(&self, card: Card) -> PortResult<Card>;

    async fn update_card_progress(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        outcome: &ReviewOutcome,
    ) -> PortResult<()>;

    async fn update_card_content(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        question: &str,
        answer: &str,
        title: &str,
        category: &str,
    ) -> PortResult<()>;

    async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> PortResult<()>;
}

/// AI generation of fill-in-the-blank cards from a source passage.
#[async_trait]
pub trait CardGenerationService: Send + Sync {
    /// Proposes question/answer drafts for the given text. `keywords`, when
    /// present, steers which terms get blanked out.
    async fn generate_cards(
        &self,
        text: &str,
        keywords: Option<&str>,
    ) -> PortResult<Vec<GeneratedCard>>;
}

/// The calendar date used by the scheduler and the due filter. Abstracted so
/// tests can pin a fixed day.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The real system clock.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}
