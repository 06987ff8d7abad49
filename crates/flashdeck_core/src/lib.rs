pub mod domain;
pub mod ports;
pub mod quota;
pub mod scheduler;

pub use domain::{AuthSession, Card, GeneratedCard, SourceText, User, UserCredentials};
pub use ports::{CardGenerationService, CardStore, Clock, PortError, PortResult, SystemClock};
pub use quota::select_hybrid_quota;
pub use scheduler::{compute_next_review, CardStats, ReviewOutcome, MIN_EASE_FACTOR};
