//! End-to-end study flow: tracker accumulates a session, flushes it into
//! the store, and the statistics view reflects it.

use std::sync::Arc;

use chrono::Duration;

use services::progress_store::ProgressStore;
use services::session_tracker::{FlushOutcome, StudySessionTracker};
use services::statistics::LearningOverview;
use storage::repository::{InMemoryStore, ProgressCacheRepository};
use vocab_core::model::{Progress, StreakChange, UserId, UserProfile, WordId};
use vocab_core::time::fixed_now;
use vocab_core::Clock;

async fn store_on(local: &InMemoryStore, clock: Clock) -> ProgressStore {
    let mut store = ProgressStore::new(None, Arc::new(local.clone()), clock).await;
    store.set_current_user(UserProfile::new(UserId::new(1), "Avery"));
    store
}

#[tokio::test]
async fn a_study_session_lands_in_store_and_stats() {
    let local = InMemoryStore::new();
    let clock = Clock::fixed(fixed_now());
    let mut store = store_on(&local, clock).await;

    // Study a few words.
    let mut tracker = StudySessionTracker::new(clock.now());
    for id in [3_u64, 5, 8] {
        store.mark_learned(WordId::new(id)).await.unwrap();
        tracker.note_word_studied();
        tracker.note_word_learned();
    }
    store.update_quiz_score(WordId::new(3), true).await.unwrap();
    store.update_quiz_score(WordId::new(5), false).await.unwrap();
    tracker.note_quiz(50);

    // One minute later the periodic flush fires.
    let later = clock.now() + Duration::seconds(60);
    let outcome = tracker.flush(&mut store, later).await.unwrap();
    assert_eq!(outcome, FlushOutcome::Recorded(StreakChange::Started));

    let progress = store.get().await.unwrap();
    assert_eq!(progress.sessions().len(), 1);
    let record = &progress.sessions()[0];
    assert_eq!(record.duration_secs(), 60);
    assert_eq!(record.words_studied(), 3);
    assert_eq!(record.words_learned(), 3);
    assert_eq!(record.quizzes_taken(), 1);
    assert_eq!(progress.stats().current_streak, 1);
    assert_eq!(progress.stats().total_time_spent_secs, 60);

    let overview = LearningOverview::compute(progress, later, 570);
    assert_eq!(overview.words_learned_this_week, 3);
    assert_eq!(overview.current_streak, 1);
    assert_eq!(overview.streak_label, "1 day");
    assert!((overview.average_quiz_score - 50.0).abs() < 1e-9);

    // The flushed aggregate also reached the local cache.
    let cached = local
        .read(UserId::new(1))
        .await
        .unwrap()
        .expect("mirrored aggregate");
    assert_eq!(Progress::from_partial(cached).sessions().len(), 1);
}

#[tokio::test]
async fn sub_minimum_sessions_are_not_recorded() {
    let local = InMemoryStore::new();
    let clock = Clock::fixed(fixed_now());
    let mut store = store_on(&local, clock).await;

    let mut tracker = StudySessionTracker::new(clock.now());
    tracker.note_word_studied();

    let outcome = tracker
        .flush(&mut store, clock.now() + Duration::seconds(5))
        .await
        .unwrap();
    assert_eq!(outcome, FlushOutcome::TooShort);
    assert!(store.get().await.unwrap().sessions().is_empty());

    // The counters kept accumulating; a later, long-enough flush records
    // the whole span.
    let outcome = tracker
        .flush(&mut store, clock.now() + Duration::seconds(45))
        .await
        .unwrap();
    assert!(matches!(outcome, FlushOutcome::Recorded(_)));
    let progress = store.get().await.unwrap();
    assert_eq!(progress.sessions()[0].duration_secs(), 45);
    assert_eq!(progress.sessions()[0].words_studied(), 1);
}

#[tokio::test]
async fn interval_gating_and_reset_prevent_double_counting() {
    let local = InMemoryStore::new();
    let clock = Clock::fixed(fixed_now());
    let mut store = store_on(&local, clock).await;

    let mut tracker = StudySessionTracker::new(clock.now());

    // Too early for the periodic flush.
    let outcome = tracker
        .flush_if_due(&mut store, clock.now() + Duration::seconds(10))
        .await
        .unwrap();
    assert_eq!(outcome, FlushOutcome::NotDue);

    let first_flush = clock.now() + Duration::seconds(40);
    let outcome = tracker.flush_if_due(&mut store, first_flush).await.unwrap();
    assert!(matches!(outcome, FlushOutcome::Recorded(_)));

    // The next interval counts from the previous flush, not from session
    // start, so overlapping flushes cannot double-count time.
    let second_flush = first_flush + Duration::seconds(35);
    let outcome = tracker.flush_if_due(&mut store, second_flush).await.unwrap();
    assert!(matches!(outcome, FlushOutcome::Recorded(_)));

    let progress = store.get().await.unwrap();
    assert_eq!(progress.sessions().len(), 2);
    assert_eq!(progress.stats().total_time_spent_secs, 75);
    assert_eq!(progress.sessions()[0].duration_secs(), 35);
    assert_eq!(progress.sessions()[1].duration_secs(), 40);
}
