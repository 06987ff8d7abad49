//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use chrono::NaiveDate;
use flashdeck_core::domain::Card;
use flashdeck_core::ports::PortError;
use flashdeck_core::scheduler::CardStats;
use flashdeck_core::{compute_next_review, select_hybrid_quota};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{IntoParams, OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        generate_cards_handler,
        save_cards_handler,
        list_cards_handler,
        update_card_handler,
        delete_card_handler,
        review_queue_handler,
        grade_card_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::AuthResponse,
        GenerateCardsRequest,
        GenerateCardsResponse,
        CardDraft,
        SaveCardsRequest,
        NewCardPayload,
        SaveCardsResponse,
        CardResponse,
        UpdateCardRequest,
        ReviewQueueResponse,
        GradeRequest,
        GradeResponse,
    )),
    tags(
        (name = "Flashdeck API", description = "API endpoints for the AI flashcard study tool.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Request to generate card drafts from a source passage.
#[derive(Deserialize, ToSchema)]
pub struct GenerateCardsRequest {
    pub text: String,
    /// Comma-separated terms to prefer when blanking out.
    pub keywords: Option<String>,
}

/// A generated draft, not yet saved to the deck.
#[derive(Serialize, ToSchema)]
pub struct CardDraft {
    pub question: String,
    pub answer: String,
    pub blank_count: i32,
}

#[derive(Serialize, ToSchema)]
pub struct GenerateCardsResponse {
    /// The stored source text; pass it back when saving so the cards share it.
    pub source_id: Uuid,
    pub drafts: Vec<CardDraft>,
}

#[derive(Deserialize, ToSchema)]
pub struct NewCardPayload {
    pub question: String,
    pub answer: String,
    pub blank_count: Option<i32>,
}

#[derive(Deserialize, ToSchema)]
pub struct SaveCardsRequest {
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub source_id: Option<Uuid>,
    pub cards: Vec<NewCardPayload>,
}

fn default_category() -> String {
    "General".to_string()
}

#[derive(Serialize, ToSchema)]
pub struct SaveCardsResponse {
    pub saved: usize,
}

/// A card as exposed over the API.
#[derive(Serialize, ToSchema)]
pub struct CardResponse {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub title: String,
    pub category: String,
    pub ease_factor: f64,
    pub interval: i32,
    pub repetitions: i32,
    pub last_review: Option<NaiveDate>,
    pub next_review: NaiveDate,
    pub source_id: Option<Uuid>,
    pub blank_count: i32,
}

impl From<&Card> for CardResponse {
    fn from(card: &Card) -> Self {
        Self {
            id: card.id,
            question: card.question.clone(),
            answer: card.answer.clone(),
            title: card.title.clone(),
            category: card.category.clone(),
            ease_factor: card.ease_factor,
            interval: card.interval,
            repetitions: card.repetitions,
            last_review: card.last_review,
            next_review: card.next_review,
            source_id: card.source_id,
            blank_count: card.blank_count,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateCardRequest {
    pub question: String,
    pub answer: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_category")]
    pub category: String,
}

#[derive(Deserialize, IntoParams)]
pub struct ReviewQueueParams {
    /// Max cards for today's session; defaults to the server-wide limit.
    pub limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct ReviewQueueResponse {
    /// How many cards are due in total, before the quota is applied.
    pub due_total: usize,
    pub cards: Vec<CardResponse>,
}

#[derive(Deserialize, ToSchema)]
pub struct GradeRequest {
    /// SM-2 recall quality, 0 (blackout) to 5 (perfect).
    pub quality: i32,
}

#[derive(Serialize, ToSchema)]
pub struct GradeResponse {
    pub repetitions: i32,
    pub interval: i32,
    pub ease_factor: f64,
    pub last_review: NaiveDate,
    pub next_review: NaiveDate,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

fn map_port_error(context: &str, e: PortError) -> (StatusCode, String) {
    match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        PortError::Conflict(message) => (StatusCode::CONFLICT, message),
        PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
        PortError::Unexpected(message) => {
            error!("{}: {}", context, message);
            (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate fill-in-the-blank card drafts from a passage of text.
///
/// Stores the passage as a source text and returns the drafts alongside its
/// id; cards saved with that id share it for review-time deduplication.
#[utoipa::path(
    post,
    path = "/cards/generate",
    request_body = GenerateCardsRequest,
    responses(
        (status = 200, description = "Drafts generated", body = GenerateCardsResponse),
        (status = 400, description = "Empty source text"),
        (status = 500, description = "Generation failed")
    )
)]
pub async fn generate_cards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<GenerateCardsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.text.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Source text must not be empty".to_string(),
        ));
    }

    let drafts = state
        .generator
        .generate_cards(&req.text, req.keywords.as_deref())
        .await
        .map_err(|e| map_port_error("Failed to generate cards", e))?;

    let source = state
        .store
        .create_source_text(user_id, &req.text)
        .await
        .map_err(|e| map_port_error("Failed to store source text", e))?;

    let response = GenerateCardsResponse {
        source_id: source.id,
        drafts: drafts
            .iter()
            .map(|d| CardDraft {
                question: d.question.clone(),
                answer: d.answer.clone(),
                blank_count: d.blank_count,
            })
            .collect(),
    };
    Ok(Json(response))
}

/// Save a batch of cards to the user's deck.
///
/// Drafts with an empty question or answer are skipped, mirroring the
/// preview-then-save flow where users blank out rejected drafts.
#[utoipa::path(
    post,
    path = "/cards",
    request_body = SaveCardsRequest,
    responses(
        (status = 201, description = "Cards saved", body = SaveCardsResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn save_cards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Json(req): Json<SaveCardsRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let today = state.clock.today();
    let mut saved = 0;

    for payload in req.cards {
        if payload.question.trim().is_empty() || payload.answer.trim().is_empty() {
            continue;
        }
        let card = Card::new(
            user_id,
            payload.question,
            payload.answer,
            req.title.clone(),
            req.category.clone(),
            req.source_id,
            payload.blank_count.unwrap_or(1),
            today,
        );
        state
            .store
            .add_card(card)
            .await
            .map_err(|e| map_port_error("Failed to save card", e))?;
        saved += 1;
    }

    Ok((StatusCode::CREATED, Json(SaveCardsResponse { saved })))
}

/// List every card in the user's deck.
#[utoipa::path(
    get,
    path = "/cards",
    responses(
        (status = 200, description = "The user's cards", body = [CardResponse]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn list_cards_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let cards = state
        .store
        .load_cards(user_id)
        .await
        .map_err(|e| map_port_error("Failed to load cards", e))?;

    let response: Vec<CardResponse> = cards.iter().map(CardResponse::from).collect();
    Ok(Json(response))
}

/// Edit a card's text content. Scheduling statistics are untouched.
#[utoipa::path(
    put,
    path = "/cards/{id}",
    request_body = UpdateCardRequest,
    params(("id" = Uuid, Path, description = "The card to update")),
    responses(
        (status = 204, description = "Card updated"),
        (status = 404, description = "Card not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .store
        .update_card_content(
            user_id,
            card_id,
            &req.question,
            &req.answer,
            &req.title,
            &req.category,
        )
        .await
        .map_err(|e| map_port_error("Failed to update card", e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Delete a card from the deck.
#[utoipa::path(
    delete,
    path = "/cards/{id}",
    params(("id" = Uuid, Path, description = "The card to delete")),
    responses(
        (status = 204, description = "Card deleted"),
        (status = 404, description = "Card not found"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn delete_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(card_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .store
        .delete_card(user_id, card_id)
        .await
        .map_err(|e| map_port_error("Failed to delete card", e))?;

    Ok(StatusCode::NO_CONTENT)
}

/// Today's review session: the due cards selected under the daily quota.
#[utoipa::path(
    get,
    path = "/review/queue",
    params(ReviewQueueParams),
    responses(
        (status = 200, description = "Today's working set", body = ReviewQueueResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn review_queue_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Query(params): Query<ReviewQueueParams>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // The selector treats a non-positive limit as a precondition violation,
    // so the floor of 1 is enforced here.
    let limit = params
        .limit
        .unwrap_or(state.config.daily_review_limit)
        .max(1);

    let all_cards = state
        .store
        .load_cards(user_id)
        .await
        .map_err(|e| map_port_error("Failed to load cards", e))?;

    let today = state.clock.today();
    let due_cards: Vec<Card> = all_cards
        .iter()
        .filter(|c| c.is_due(today))
        .cloned()
        .collect();

    let selected = select_hybrid_quota(&due_cards, limit, &all_cards);

    let response = ReviewQueueResponse {
        due_total: due_cards.len(),
        cards: selected.iter().map(CardResponse::from).collect(),
    };
    Ok(Json(response))
}

/// Grade a card and reschedule it.
///
/// Quality must be between 0 and 5; the scheduler itself does not validate,
/// so the check lives here at the boundary.
#[utoipa::path(
    post,
    path = "/cards/{id}/review",
    request_body = GradeRequest,
    params(("id" = Uuid, Path, description = "The card being graded")),
    responses(
        (status = 200, description = "Updated scheduling statistics", body = GradeResponse),
        (status = 404, description = "Card not found"),
        (status = 422, description = "Quality outside 0-5"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn grade_card_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(card_id): Path<Uuid>,
    Json(req): Json<GradeRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !(0..=5).contains(&req.quality) {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Quality must be between 0 and 5, got {}", req.quality),
        ));
    }

    let cards = state
        .store
        .load_cards(user_id)
        .await
        .map_err(|e| map_port_error("Failed to load cards", e))?;
    let card = cards
        .iter()
        .find(|c| c.id == card_id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("Card {} not found", card_id)))?;

    let stats = CardStats {
        repetitions: card.repetitions,
        interval: card.interval,
        ease_factor: card.ease_factor,
    };
    let outcome = compute_next_review(req.quality, &stats, state.clock.today());

    state
        .store
        .update_card_progress(user_id, card_id, &outcome)
        .await
        .map_err(|e| map_port_error("Failed to update card progress", e))?;

    let response = GradeResponse {
        repetitions: outcome.repetitions,
        interval: outcome.interval,
        ease_factor: outcome.ease_factor,
        last_review: outcome.last_review,
        next_review: outcome.next_review,
    };
    Ok(Json(response))
}
