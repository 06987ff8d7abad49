//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use flashdeck_core::ports::{CardGenerationService, CardStore, Clock};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CardStore>,
    pub generator: Arc<dyn CardGenerationService>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}
