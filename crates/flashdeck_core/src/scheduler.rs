//! SM-2 spaced repetition scheduling.
//!
//! Computes the next review date for a card from a recall-quality score,
//! following the SuperMemo-2 algorithm.
//!
//! Quality ratings (0-5):
//! - 0: Complete blackout, no recall
//! - 1: Incorrect, but upon seeing answer, remembered
//! - 2: Incorrect, but answer seemed easy to recall
//! - 3: Correct response with serious difficulty
//! - 4: Correct response after hesitation
//! - 5: Perfect recall

use chrono::{Duration, NaiveDate};

/// Minimum ease factor allowed.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// The scheduling statistics of a card going into a grading event.
#[derive(Debug, Clone, Copy)]
pub struct CardStats {
    /// Consecutive successful recalls so far.
    pub repetitions: i32,
    /// Current inter-repetition interval in days.
    pub interval: i32,
    /// Current ease factor.
    pub ease_factor: f64,
}

impl Default for CardStats {
    fn default() -> Self {
        Self {
            repetitions: 0,
            interval: 0,
            ease_factor: 2.5,
        }
    }
}

/// The updated statistics produced by grading a card.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewOutcome {
    pub repetitions: i32,
    pub interval: i32,
    pub ease_factor: f64,
    pub last_review: NaiveDate,
    pub next_review: NaiveDate,
}

/// Computes the next review date and updated statistics for a card.
///
/// Pure over its inputs; `today` is passed explicitly so callers (and tests)
/// control the clock. Quality is not validated here - the HTTP boundary
/// constrains it to 0..=5 before calling.
pub fn compute_next_review(quality: i32, stats: &CardStats, today: NaiveDate) -> ReviewOutcome {
    let mut repetitions = stats.repetitions;
    let mut interval = stats.interval;
    let mut ease_factor = stats.ease_factor;

    if quality >= 3 {
        // Successful recall.
        interval = match repetitions {
            0 => 1,
            1 => 6,
            _ => (interval as f64 * ease_factor).floor() as i32,
        };
        repetitions += 1;
    } else {
        // Failed recall: back to a 1-day interval.
        repetitions = 0;
        interval = 1;
    }

    // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02))
    // Applied on every grading, failures included; EF never drops below 1.3.
    let q = quality as f64;
    ease_factor += 0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02);
    ease_factor = ease_factor.max(MIN_EASE_FACTOR);

    ReviewOutcome {
        repetitions,
        interval,
        ease_factor,
        last_review: today,
        next_review: today + Duration::days(interval as i64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn first_success_gives_one_day() {
        let outcome = compute_next_review(5, &CardStats::default(), today());

        assert_eq!(outcome.repetitions, 1);
        assert_eq!(outcome.interval, 1);
        // 2.5 + (0.1 - 0 * (0.08 + 0 * 0.02)) = 2.6
        assert!((outcome.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(outcome.next_review, today() + Duration::days(1));
        assert_eq!(outcome.last_review, today());
    }

    #[test]
    fn second_success_gives_six_days() {
        let stats = CardStats {
            repetitions: 1,
            interval: 1,
            ease_factor: 2.6,
        };
        let outcome = compute_next_review(4, &stats, today());

        assert_eq!(outcome.repetitions, 2);
        assert_eq!(outcome.interval, 6);
    }

    #[test]
    fn third_success_multiplies_by_ease() {
        let stats = CardStats {
            repetitions: 2,
            interval: 6,
            ease_factor: 2.6,
        };
        let outcome = compute_next_review(4, &stats, today());

        // floor(6 * 2.6) = 15
        assert_eq!(outcome.repetitions, 3);
        assert_eq!(outcome.interval, 15);
    }

    #[test]
    fn interval_uses_pre_update_ease() {
        // The interval multiplies by the ease factor the card came in with;
        // the ease update happens afterwards.
        let stats = CardStats {
            repetitions: 5,
            interval: 10,
            ease_factor: 2.0,
        };
        let outcome = compute_next_review(3, &stats, today());

        assert_eq!(outcome.interval, 20);
        // 2.0 + (0.1 - 2 * (0.08 + 2 * 0.02)) = 2.0 - 0.14 = 1.86
        assert!((outcome.ease_factor - 1.86).abs() < 1e-9);
    }

    #[test]
    fn failure_resets_regardless_of_history() {
        for quality in 0..3 {
            let stats = CardStats {
                repetitions: 7,
                interval: 90,
                ease_factor: 2.2,
            };
            let outcome = compute_next_review(quality, &stats, today());

            assert_eq!(outcome.repetitions, 0);
            assert_eq!(outcome.interval, 1);
            assert_eq!(outcome.next_review, today() + Duration::days(1));
        }
    }

    #[test]
    fn blackout_clamps_ease_at_floor() {
        let stats = CardStats {
            repetitions: 2,
            interval: 6,
            ease_factor: 2.0,
        };
        let outcome = compute_next_review(0, &stats, today());

        // 2.0 + (0.1 - 5 * (0.08 + 5 * 0.02)) = 1.2, clamped to 1.3
        assert_eq!(outcome.repetitions, 0);
        assert_eq!(outcome.interval, 1);
        assert!((outcome.ease_factor - MIN_EASE_FACTOR).abs() < 1e-9);
    }

    #[test]
    fn ease_never_below_floor_for_any_quality() {
        for quality in 0..=5 {
            for &ease in &[1.3, 1.35, 2.5, 3.0] {
                let stats = CardStats {
                    repetitions: 3,
                    interval: 12,
                    ease_factor: ease,
                };
                let outcome = compute_next_review(quality, &stats, today());
                assert!(
                    outcome.ease_factor >= MIN_EASE_FACTOR,
                    "quality {} ease {} produced {}",
                    quality,
                    ease,
                    outcome.ease_factor
                );
            }
        }
    }

    #[test]
    fn quality_five_raises_ease() {
        let stats = CardStats {
            repetitions: 2,
            interval: 6,
            ease_factor: 2.5,
        };
        let outcome = compute_next_review(5, &stats, today());
        assert!((outcome.ease_factor - 2.6).abs() < 1e-9);
    }

    #[test]
    fn quality_four_keeps_ease() {
        let stats = CardStats {
            repetitions: 2,
            interval: 6,
            ease_factor: 2.5,
        };
        let outcome = compute_next_review(4, &stats, today());
        assert!((outcome.ease_factor - 2.5).abs() < 1e-9);
    }

    #[test]
    fn dates_are_consistent() {
        let stats = CardStats {
            repetitions: 1,
            interval: 1,
            ease_factor: 2.5,
        };
        let outcome = compute_next_review(5, &stats, today());

        assert_eq!(outcome.last_review, today());
        assert_eq!(
            outcome.next_review,
            today() + Duration::days(outcome.interval as i64)
        );
    }
}
