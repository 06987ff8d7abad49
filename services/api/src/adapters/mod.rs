pub mod cache;
pub mod card_llm;
pub mod db;

pub use cache::CachedCardStore;
pub use card_llm::OpenAiCardAdapter;
pub use db::DbAdapter;
