pub mod auth;
pub mod middleware;
pub mod rest;
pub mod state;

pub use middleware::require_auth;
pub use rest::{
    delete_card_handler, generate_cards_handler, grade_card_handler, list_cards_handler,
    review_queue_handler, save_cards_handler, update_card_handler,
};
