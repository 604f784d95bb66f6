//! Integration tests for a full guessing round driven through fakes.
//!
//! Covers each terminal outcome, the exactly-once leaderboard update,
//! and channel release when an upstream step fails.

use std::time::Duration;

use chunibot::models::guess::{IncomingMessage, MatchMode, Outcome};
use chunibot::models::song::AliasScope;
use chunibot::AppError;

use super::test_helpers::{
    harness, harness_with, jacket_png, titania, FakeCatalog, FakeJackets, RecordingNotifier,
};

const LONG: Duration = Duration::from_secs(30);

fn winning_message(channel: &str, author: &str, content: &str) -> IncomingMessage {
    IncomingMessage {
        ts: Some("1700000000.000100".into()),
        ..IncomingMessage::new(channel, author, content)
    }
}

#[tokio::test]
async fn answered_round_records_one_win_and_acknowledges() {
    let mut h = harness(LONG);
    let game = h.game.clone();
    let round = tokio::spawn(async move {
        game.play("C1", &AliasScope::Team("T1".into()), MatchMode::Lenient)
            .await
    });

    assert_eq!(h.questions.recv().await.as_deref(), Some("C1"));
    let sessions = h.game.sessions();
    assert!(sessions.deliver(IncomingMessage::new("C1", "U_WRONG", "hello")));
    assert!(sessions.deliver(winning_message("C1", "U_WIN", "ティターニア")));
    sessions.deliver(winning_message("C1", "U_LATE", "Titania"));

    let outcome = round.await.expect("join").expect("play").expect("ran");
    assert_eq!(outcome.winner(), Some("U_WIN"));

    assert_eq!(*h.leaderboard.wins.lock().unwrap(), vec!["U_WIN".to_owned()]);
    let acked = h.notifier.acknowledged.lock().unwrap().clone();
    assert_eq!(acked.len(), 1);
    assert_eq!(acked[0].author_id, "U_WIN");

    let results = h.notifier.results.lock().unwrap().clone();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].pick.song, titania());
    assert_eq!(results[0].pick.answers, vec!["Titania", "ティターニア"]);
    assert_eq!(results[0].jacket_url, "https://jackets.test/img/titania.png");
    assert_eq!(
        *h.catalog.scopes.lock().unwrap(),
        vec![AliasScope::Team("T1".into())]
    );
    assert!(!h.game.sessions().is_active("C1"));
}

#[tokio::test]
async fn question_carries_cropped_png_and_timeout() {
    let mut h = harness(LONG);
    let game = h.game.clone();
    let round =
        tokio::spawn(async move { game.play("C1", &AliasScope::Global, MatchMode::Strict).await });
    h.questions.recv().await.expect("question");
    h.game.sessions().skip("C1").expect("skip");
    round.await.expect("join").expect("play");

    let questions = h.notifier.questions.lock().unwrap().clone();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].channel_id, "C1");
    assert_eq!(questions[0].timeout_seconds, 30);
    let preview = image::load_from_memory(&questions[0].preview_png).expect("png");
    assert_eq!((preview.width(), preview.height()), (32, 32));
}

#[tokio::test]
async fn skipped_round_posts_answer_without_win() {
    let mut h = harness(LONG);
    let game = h.game.clone();
    let round =
        tokio::spawn(async move { game.play("C1", &AliasScope::Global, MatchMode::Lenient).await });

    h.questions.recv().await.expect("question");
    h.game.sessions().skip("C1").expect("skip");

    let outcome = round.await.expect("join").expect("play");
    assert_eq!(outcome, Some(Outcome::Skipped));
    assert!(h.leaderboard.wins.lock().unwrap().is_empty());
    assert!(h.notifier.acknowledged.lock().unwrap().is_empty());
    assert_eq!(h.notifier.results.lock().unwrap()[0].outcome, Outcome::Skipped);
    assert!(matches!(
        h.game.sessions().skip("C1"),
        Err(AppError::NoActiveSession(_))
    ));
}

#[tokio::test]
async fn timed_out_round_posts_answer_without_win() {
    let h = harness(Duration::from_millis(150));
    let outcome = h
        .game
        .play("C1", &AliasScope::Global, MatchMode::Lenient)
        .await
        .expect("play");

    assert_eq!(outcome, Some(Outcome::TimedOut));
    assert!(h.leaderboard.wins.lock().unwrap().is_empty());
    assert_eq!(h.notifier.results.lock().unwrap().len(), 1);
    assert!(!h.game.sessions().is_active("C1"));
}

#[tokio::test]
async fn play_in_busy_channel_is_silently_ignored() {
    let mut h = harness(LONG);
    let game = h.game.clone();
    let first =
        tokio::spawn(async move { game.play("C1", &AliasScope::Global, MatchMode::Lenient).await });
    h.questions.recv().await.expect("question");

    let second = h
        .game
        .play("C1", &AliasScope::Global, MatchMode::Lenient)
        .await
        .expect("second play");
    assert!(second.is_none());
    assert_eq!(h.notifier.questions.lock().unwrap().len(), 1);

    h.game.sessions().skip("C1").expect("skip");
    assert_eq!(
        first.await.expect("join").expect("play"),
        Some(Outcome::Skipped)
    );
}

#[tokio::test]
async fn empty_catalog_fails_before_registration() {
    let h = harness_with(
        FakeCatalog::empty(),
        FakeJackets::serving(jacket_png()),
        RecordingNotifier::new(),
        LONG,
    );
    let result = h
        .game
        .play("C1", &AliasScope::Global, MatchMode::Lenient)
        .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(!h.game.sessions().is_active("C1"));
    assert!(h.notifier.questions.lock().unwrap().is_empty());
}

#[tokio::test]
async fn jacket_download_failure_leaves_no_session() {
    let h = harness_with(
        FakeCatalog::with(titania(), &[]),
        FakeJackets::failing(),
        RecordingNotifier::new(),
        LONG,
    );
    let result = h
        .game
        .play("C1", &AliasScope::Global, MatchMode::Lenient)
        .await;

    assert!(matches!(result, Err(AppError::Http(_))));
    assert!(!h.game.sessions().is_active("C1"));
}

#[tokio::test]
async fn undecodable_jacket_leaves_no_session() {
    let h = harness_with(
        FakeCatalog::with(titania(), &[]),
        FakeJackets::serving(bytes::Bytes::from_static(b"<html>404</html>")),
        RecordingNotifier::new(),
        LONG,
    );
    let result = h
        .game
        .play("C1", &AliasScope::Global, MatchMode::Lenient)
        .await;

    assert!(matches!(result, Err(AppError::Image(_))));
    assert!(!h.game.sessions().is_active("C1"));
}

#[tokio::test]
async fn failed_question_post_frees_the_channel() {
    let h = harness_with(
        FakeCatalog::with(titania(), &[]),
        FakeJackets::serving(jacket_png()),
        RecordingNotifier::failing(),
        LONG,
    );
    let result = h
        .game
        .play("C1", &AliasScope::Global, MatchMode::Lenient)
        .await;

    assert!(matches!(result, Err(AppError::Slack(_))));
    assert!(!h.game.sessions().is_active("C1"));
    assert!(h.notifier.results.lock().unwrap().is_empty());
}

#[tokio::test]
async fn consecutive_rounds_each_count_once() {
    let mut h = harness(LONG);
    for _ in 0..3 {
        let game = h.game.clone();
        let round = tokio::spawn(async move {
            game.play("C1", &AliasScope::Global, MatchMode::Strict).await
        });
        h.questions.recv().await.expect("question");
        h.game
            .sessions()
            .deliver(winning_message("C1", "U1", "Titania"));
        let outcome = round.await.expect("join").expect("play");
        let winner = outcome.and_then(|o| o.winner().map(str::to_owned));
        assert_eq!(winner.as_deref(), Some("U1"));
    }
    assert_eq!(h.leaderboard.wins.lock().unwrap().len(), 3);
}
