//! Hybrid daily review selection.
//!
//! Given every card due today, picks the subset to actually present under a
//! per-day quota: at most one card per source text, half the quota spent on
//! the weakest cards (lowest ease factor), the rest on the most overdue, and
//! a final pass that nudges the set's total blank count toward the
//! collection-wide average difficulty.

use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use crate::domain::Card;

/// Maximum number of swap attempts in the difficulty-balancing pass.
const BALANCE_ITERATIONS: usize = 5;

/// Selects today's working set from the cards due for review.
///
/// `all_cards` is the user's full collection and is read only to compute the
/// average blank count used as the difficulty target. The selection is
/// deterministic for identical inputs: sorts are stable and ties fall back
/// to input order, so same-source deduplication keeps the first card per
/// source in iteration order.
///
/// `limit` is a precondition of the caller (the web layer enforces a minimum
/// of 1); a non-positive limit degenerates to an empty selection.
pub fn select_hybrid_quota(due_cards: &[Card], limit: usize, all_cards: &[Card]) -> Vec<Card> {
    // One card per source text; cards without a source are always kept.
    let mut seen_sources: HashSet<Uuid> = HashSet::new();
    let pool: Vec<&Card> = due_cards
        .iter()
        .filter(|card| match card.source_id {
            Some(source) => seen_sources.insert(source),
            None => true,
        })
        .collect();

    // Nothing to balance if the whole pool fits under the quota.
    if pool.len() <= limit {
        return pool.into_iter().cloned().collect();
    }

    let difficulty_count = (limit + 1) / 2;
    let deadline_count = limit - difficulty_count;

    // Weakest cards first: ascending ease factor.
    let mut by_ease = pool.clone();
    by_ease.sort_by(|a, b| {
        a.ease_factor
            .partial_cmp(&b.ease_factor)
            .unwrap_or(Ordering::Equal)
    });
    let mut selected: Vec<&Card> = by_ease.into_iter().take(difficulty_count).collect();
    let mut selected_ids: HashSet<Uuid> = selected.iter().map(|c| c.id).collect();

    // Most overdue among the rest: oldest due date first.
    let mut by_due: Vec<&Card> = pool
        .iter()
        .copied()
        .filter(|c| !selected_ids.contains(&c.id))
        .collect();
    by_due.sort_by_key(|c| c.next_review);
    for card in by_due.into_iter().take(deadline_count) {
        selected_ids.insert(card.id);
        selected.push(card);
    }

    // Steer the total blank count toward the collection average. Skipped
    // when the collection is empty, since the average is undefined.
    if !all_cards.is_empty() {
        let avg_blanks = all_cards.iter().map(|c| c.blank_count as f64).sum::<f64>()
            / all_cards.len() as f64;
        let target = avg_blanks * limit as f64;
        let mut total: i32 = selected.iter().map(|c| c.blank_count).sum();

        for _ in 0..BALANCE_ITERATIONS {
            let gap = total as f64 - target;
            if gap.abs() < 1.0 {
                break;
            }

            let unselected: Vec<&Card> = pool
                .iter()
                .copied()
                .filter(|c| !selected_ids.contains(&c.id))
                .collect();

            let swap = if gap > 0.0 {
                // Too heavy: trade the heaviest selected card for the
                // lightest remaining candidate, if it is actually lighter.
                let out_idx = extreme_index(&selected, |a, b| a.blank_count > b.blank_count);
                let candidate =
                    extreme_card(&unselected, |a, b| a.blank_count < b.blank_count);
                match (out_idx, candidate) {
                    (Some(idx), Some(card)) if card.blank_count < selected[idx].blank_count => {
                        Some((idx, card))
                    }
                    _ => None,
                }
            } else {
                // Too light: symmetric trade upward.
                let out_idx = extreme_index(&selected, |a, b| a.blank_count < b.blank_count);
                let candidate =
                    extreme_card(&unselected, |a, b| a.blank_count > b.blank_count);
                match (out_idx, candidate) {
                    (Some(idx), Some(card)) if card.blank_count > selected[idx].blank_count => {
                        Some((idx, card))
                    }
                    _ => None,
                }
            };

            match swap {
                Some((idx, replacement)) => {
                    let removed = selected[idx];
                    selected_ids.remove(&removed.id);
                    selected_ids.insert(replacement.id);
                    total += replacement.blank_count - removed.blank_count;
                    selected[idx] = replacement;
                }
                None => break,
            }
        }
    }

    selected.truncate(limit);
    selected.into_iter().cloned().collect()
}

/// Index of the first card winning every strict comparison against the
/// current best. First occurrence wins ties, keeping the pass deterministic.
fn extreme_index(cards: &[&Card], better: impl Fn(&Card, &Card) -> bool) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (idx, &card) in cards.iter().enumerate() {
        match best {
            Some(b) if !better(card, cards[b]) => {}
            _ => best = Some(idx),
        }
    }
    best
}

fn extreme_card<'a>(cards: &[&'a Card], better: impl Fn(&Card, &Card) -> bool) -> Option<&'a Card> {
    extreme_index(cards, better).map(|idx| cards[idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn card(
        ease_factor: f64,
        days_overdue: i64,
        source_id: Option<Uuid>,
        blank_count: i32,
    ) -> Card {
        Card {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            question: "What is ______?".to_string(),
            answer: "an answer".to_string(),
            title: String::new(),
            category: "General".to_string(),
            ease_factor,
            interval: 1,
            repetitions: 1,
            last_review: None,
            next_review: today() - Duration::days(days_overdue),
            source_id,
            blank_count,
        }
    }

    fn ids(cards: &[Card]) -> HashSet<Uuid> {
        cards.iter().map(|c| c.id).collect()
    }

    #[test]
    fn empty_due_cards_selects_nothing() {
        let all: Vec<Card> = vec![card(2.5, 0, None, 1)];
        assert!(select_hybrid_quota(&[], 10, &all).is_empty());
    }

    #[test]
    fn pool_within_limit_passes_through() {
        let due: Vec<Card> = (0..3).map(|_| card(2.5, 0, None, 1)).collect();
        let selected = select_hybrid_quota(&due, 5, &due);

        assert_eq!(selected.len(), 3);
        assert_eq!(ids(&selected), ids(&due));
    }

    #[test]
    fn result_never_exceeds_limit() {
        let due: Vec<Card> = (0..20).map(|i| card(2.0 + i as f64 * 0.05, i, None, 1)).collect();
        for limit in 1..=8 {
            assert!(select_hybrid_quota(&due, limit, &due).len() <= limit);
        }
    }

    #[test]
    fn one_card_per_source_text() {
        let source = Uuid::new_v4();
        let due: Vec<Card> = (0..5).map(|_| card(2.5, 0, Some(source), 1)).collect();
        let selected = select_hybrid_quota(&due, 4, &due);

        assert_eq!(selected.len(), 1);
        // First in iteration order wins.
        assert_eq!(selected[0].id, due[0].id);
    }

    #[test]
    fn sourceless_cards_are_exempt_from_dedup() {
        let source = Uuid::new_v4();
        let mut due: Vec<Card> = (0..3).map(|_| card(2.5, 0, Some(source), 1)).collect();
        due.extend((0..3).map(|_| card(2.5, 0, None, 1)));

        let selected = select_hybrid_quota(&due, 10, &due);
        // One for the shared source, all three sourceless.
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn splits_quota_between_weak_and_overdue() {
        // Cards 0-3 are weak (low ease, barely overdue); cards 4-9 are
        // comfortable but increasingly overdue.
        let mut due: Vec<Card> = Vec::new();
        for i in 0..4 {
            due.push(card(1.5 + i as f64 * 0.01, 0, None, 1));
        }
        for i in 0..6 {
            due.push(card(2.5, 10 + i as i64, None, 1));
        }

        let selected = select_hybrid_quota(&due, 4, &due);
        assert_eq!(selected.len(), 4);

        let selected_ids = ids(&selected);
        // Two weakest by ease factor.
        assert!(selected_ids.contains(&due[0].id));
        assert!(selected_ids.contains(&due[1].id));
        // Two most overdue among the rest (largest days_overdue sorts oldest).
        assert!(selected_ids.contains(&due[9].id));
        assert!(selected_ids.contains(&due[8].id));
    }

    #[test]
    fn odd_limit_gives_extra_slot_to_weak_cards() {
        let mut due: Vec<Card> = Vec::new();
        for i in 0..5 {
            due.push(card(1.5 + i as f64 * 0.01, 0, None, 1));
        }
        for i in 0..5 {
            due.push(card(2.5, 10 + i as i64, None, 1));
        }

        let selected = select_hybrid_quota(&due, 5, &due);
        assert_eq!(selected.len(), 5);

        // ceil(5 / 2) = 3 weak slots.
        let selected_ids = ids(&selected);
        assert!(selected_ids.contains(&due[0].id));
        assert!(selected_ids.contains(&due[1].id));
        assert!(selected_ids.contains(&due[2].id));
    }

    #[test]
    fn balancing_swaps_out_overweight_card() {
        // The weakest card carries five blanks; the collection average is 1,
        // so the target for limit 4 is 4 total blanks and the heavy card
        // gets traded for a lighter leftover.
        let mut due: Vec<Card> = Vec::new();
        due.push(card(1.4, 0, None, 5));
        for i in 0..7 {
            due.push(card(2.0 + i as f64 * 0.05, i, None, 1));
        }
        let all: Vec<Card> = (0..20).map(|_| card(2.5, 0, None, 1)).collect();

        let selected = select_hybrid_quota(&due, 4, &all);
        assert_eq!(selected.len(), 4);

        let total: i32 = selected.iter().map(|c| c.blank_count).sum();
        assert_eq!(total, 4);
        assert!(!ids(&selected).contains(&due[0].id));
    }

    #[test]
    fn balancing_swaps_in_heavier_card_when_below_target() {
        // Collection average of 3 blanks per card puts the target at 12 for
        // limit 4. The initial pick is all single-blank cards (total 4), so
        // the five-blank leftover gets pulled in: 4 -> 8, then no lighter
        // candidate can improve further.
        let mut due: Vec<Card> = Vec::new();
        for i in 0..5 {
            due.push(card(1.5 + i as f64 * 0.01, 0, None, 1));
        }
        for i in 0..4 {
            due.push(card(2.5, 10 + i as i64, None, 1));
        }
        due.push(card(3.0, 0, None, 5));
        let all: Vec<Card> = (0..10).map(|_| card(2.5, 0, None, 3)).collect();

        let selected = select_hybrid_quota(&due, 4, &all);
        assert_eq!(selected.len(), 4);

        let total: i32 = selected.iter().map(|c| c.blank_count).sum();
        assert_eq!(total, 8);
        assert!(ids(&selected).contains(&due[9].id));
    }

    #[test]
    fn balancing_skipped_when_collection_empty() {
        let due: Vec<Card> = (0..8).map(|i| card(2.0 + i as f64 * 0.05, i, None, i as i32 + 1)).collect();
        let selected = select_hybrid_quota(&due, 4, &[]);
        assert_eq!(selected.len(), 4);
    }

    #[test]
    fn selection_is_deterministic() {
        let due: Vec<Card> = (0..12)
            .map(|i| card(1.5 + (i % 5) as f64 * 0.2, (i % 7) as i64, None, (i % 3) as i32 + 1))
            .collect();
        let all = due.clone();

        let first: Vec<Uuid> = select_hybrid_quota(&due, 5, &all).iter().map(|c| c.id).collect();
        let second: Vec<Uuid> = select_hybrid_quota(&due, 5, &all).iter().map(|c| c.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn no_duplicate_sources_survive_balancing() {
        let source_a = Uuid::new_v4();
        let source_b = Uuid::new_v4();
        let mut due: Vec<Card> = Vec::new();
        for _ in 0..3 {
            due.push(card(1.5, 0, Some(source_a), 2));
            due.push(card(2.5, 5, Some(source_b), 4));
        }
        for i in 0..6 {
            due.push(card(2.0, i, None, 1));
        }

        let selected = select_hybrid_quota(&due, 4, &due);
        assert!(selected.len() <= 4);

        let mut seen = HashSet::new();
        for card in &selected {
            if let Some(source) = card.source_id {
                assert!(seen.insert(source), "source {} selected twice", source);
            }
        }
    }
}
