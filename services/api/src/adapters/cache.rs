//! services/api/src/adapters/cache.rs
//!
//! A read-through cache in front of a `CardStore`. Card lists are the hot
//! read path (every review-queue request loads the full collection), so they
//! are kept per user for a short TTL and dropped on any write to that user's
//! cards. Auth and source-text operations pass straight through.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use flashdeck_core::domain::{Card, SourceText, User, UserCredentials};
use flashdeck_core::ports::{CardStore, PortResult};
use flashdeck_core::scheduler::ReviewOutcome;
use tokio::sync::RwLock;
use uuid::Uuid;

struct CacheEntry {
    fetched_at: Instant,
    cards: Vec<Card>,
}

/// Caches `load_cards` results per user with a TTL, invalidating on writes.
pub struct CachedCardStore {
    inner: Arc<dyn CardStore>,
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl CachedCardStore {
    pub fn new(inner: Arc<dyn CardStore>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn invalidate(&self, user_id: Uuid) {
        self.entries.write().await.remove(&user_id);
    }
}

#[async_trait]
impl CardStore for CachedCardStore {
    async fn create_user(&self, username: &str, hashed_password: &str) -> PortResult<User> {
        self.inner.create_user(username, hashed_password).await
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        self.inner.get_user_by_username(username).await
    }

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()> {
        self.inner
            .create_auth_session(session_id, user_id, expires_at)
            .await
    }

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid> {
        self.inner.validate_auth_session(session_id).await
    }

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()> {
        self.inner.delete_auth_session(session_id).await
    }

    async fn create_source_text(&self, user_id: Uuid, content: &str) -> PortResult<SourceText> {
        self.inner.create_source_text(user_id, content).await
    }

    async fn load_cards(&self, user_id: Uuid) -> PortResult<Vec<Card>> {
        {
            let entries = self.entries.read().await;
            if let Some(entry) = entries.get(&user_id) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.cards.clone());
                }
            }
        }

        let cards = self.inner.load_cards(user_id).await?;
        self.entries.write().await.insert(
            user_id,
            CacheEntry {
                fetched_at: Instant::now(),
                cards: cards.clone(),
            },
        );
        Ok(cards)
    }

    async fn add_card(&self, card: Card) -> PortResult<Card> {
        let user_id = card.user_id;
        let saved = self.inner.add_card(card).await?;
        self.invalidate(user_id).await;
        Ok(saved)
    }

    async fn update_card_progress(
        &self,
        user_id: Uuid,
        card_id: Uuid,
        outcome: &ReviewOutcome,
    ) -> PortResult<()> {
        self.inner
            .update_card_progress(user_id, card_id, outcome)
            .await?;
        self.invalidate(user_id).await;
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
        self.inner
            .update_card_content(user_id, card_id, question, answer, title, category)
            .await?;
        self.invalidate(user_id).await;
        Ok(())
    }

    async fn delete_card(&self, user_id: Uuid, card_id: Uuid) -> PortResult<()> {
        self.inner.delete_card(user_id, card_id).await?;
        self.invalidate(user_id).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use flashdeck_core::ports::PortError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// An in-memory store that counts how often card lists are loaded.
    #[derive(Default)]
    struct CountingStore {
        cards: Mutex<Vec<Card>>,
        loads: AtomicUsize,
    }

    fn test_card(user_id: Uuid) -> Card {
        Card::new(
            user_id,
            "A ______ question".to_string(),
            "test".to_string(),
            String::new(),
            "General".to_string(),
            None,
            1,
            NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        )
    }

    #[async_trait]
    impl CardStore for CountingStore {
        async fn create_user(&self, _: &str, _: &str) -> PortResult<User> {
            Err(PortError::Unexpected("not used in tests".to_string()))
        }
        async fn get_user_by_username(&self, _: &str) -> PortResult<UserCredentials> {
            Err(PortError::Unexpected("not used in tests".to_string()))
        }
        async fn create_auth_session(
            &self,
            _: &str,
            _: Uuid,
            _: DateTime<Utc>,
        ) -> PortResult<()> {
            Ok(())
        }
        async fn validate_auth_session(&self, _: &str) -> PortResult<Uuid> {
            Err(PortError::Unauthorized)
        }
        async fn delete_auth_session(&self, _: &str) -> PortResult<()> {
            Ok(())
        }
        async fn create_source_text(&self, user_id: Uuid, content: &str) -> PortResult<SourceText> {
            Ok(SourceText {
                id: Uuid::new_v4(),
                user_id,
                content: content.to_string(),
            })
        }
        async fn load_cards(&self, user_id: Uuid) -> PortResult<Vec<Card>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .cards
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.user_id == user_id)
                .cloned()
                .collect())
        }
        async fn add_card(&self, card: Card) -> PortResult<Card> {
            self.cards.lock().unwrap().push(card.clone());
            Ok(card)
        }
        async fn update_card_progress(
            &self,
            _: Uuid,
            _: Uuid,
            _: &ReviewOutcome,
        ) -> PortResult<()> {
            Ok(())
        }
        async fn update_card_content(
            &self,
            _: Uuid,
            _: Uuid,
            _: &str,
            _: &str,
            _: &str,
            _: &str,
        ) -> PortResult<()> {
            Ok(())
        }
        async fn delete_card(&self, _: Uuid, _: Uuid) -> PortResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn repeated_loads_hit_the_cache() {
        let user_id = Uuid::new_v4();
        let inner = Arc::new(CountingStore::default());
        inner.add_card(test_card(user_id)).await.unwrap();

        let cached = CachedCardStore::new(inner.clone(), Duration::from_secs(60));
        cached.load_cards(user_id).await.unwrap();
        cached.load_cards(user_id).await.unwrap();

        assert_eq!(inner.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn writes_invalidate_the_cache() {
        let user_id = Uuid::new_v4();
        let inner = Arc::new(CountingStore::default());

        let cached = CachedCardStore::new(inner.clone(), Duration::from_secs(60));
        assert!(cached.load_cards(user_id).await.unwrap().is_empty());

        cached.add_card(test_card(user_id)).await.unwrap();
        let cards = cached.load_cards(user_id).await.unwrap();

        assert_eq!(cards.len(), 1);
        assert_eq!(inner.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let user_id = Uuid::new_v4();
        let inner = Arc::new(CountingStore::default());

        let cached = CachedCardStore::new(inner.clone(), Duration::from_secs(0));
        cached.load_cards(user_id).await.unwrap();
        cached.load_cards(user_id).await.unwrap();

        assert_eq!(inner.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn users_are_cached_independently() {
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        let inner = Arc::new(CountingStore::default());

        let cached = CachedCardStore::new(inner.clone(), Duration::from_secs(60));
        cached.load_cards(user_a).await.unwrap();
        cached.add_card(test_card(user_b)).await.unwrap();
        cached.load_cards(user_a).await.unwrap();

        // user_a's entry survived user_b's write.
        assert_eq!(inner.loads.load(Ordering::SeqCst), 1);
    }
}
