//! Shared test helpers for round and command integration tests.
//!
//! Provides in-memory fakes for every `GuessGame` collaborator plus
//! construction of `AppState` and `GlobalConfig` so individual test
//! modules can focus on behaviour rather than boilerplate.

use std::future::Future;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use chunibot::config::GlobalConfig;
use chunibot::game::round::GuessGame;
use chunibot::game::session_manager::SessionManager;
use chunibot::game::{JacketSource, Leaderboard, Question, RoundNotifier, RoundResult, SongCatalog};
use chunibot::models::guess::IncomingMessage;
use chunibot::models::song::{AliasScope, Song, SongPick};
use chunibot::persistence::db;
use chunibot::state::AppState;
use chunibot::web::relay::LoginRelay;
use chunibot::{AppError, Result};
use image::{ImageFormat, Rgb, RgbImage};
use tokio::sync::mpsc;

/// Build a `GlobalConfig` with a short round timeout and one owner.
pub fn test_config(timeout_seconds: u64) -> GlobalConfig {
    let toml = format!(
        r#"
jacket_base_url = "https://jackets.test/img"
authorized_user_ids = ["U_OWNER"]

[guess]
timeout_seconds = {timeout_seconds}
crop_size = 32

[login]
enabled = true
port = 0
timeout_seconds = 1
"#
    );
    GlobalConfig::from_toml_str(&toml).expect("valid test config")
}

pub fn titania() -> Song {
    Song {
        id: "1".into(),
        title: "Titania".into(),
        artist: "Team Grimoire".into(),
        genre: "ORIGINAL".into(),
        jacket: "titania.png".into(),
    }
}

/// A small PNG large enough for the test crop size.
pub fn jacket_png() -> Bytes {
    let img = RgbImage::from_pixel(64, 64, Rgb([200, 40, 90]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).expect("encode");
    Bytes::from(out.into_inner())
}

// ─── Fakes ───────────────────────────────────────────────────────────

/// Catalog that always returns the same pick, or fails when empty.
pub struct FakeCatalog {
    pick: Option<SongPick>,
    pub scopes: Mutex<Vec<AliasScope>>,
}

impl FakeCatalog {
    pub fn with(song: Song, aliases: &[&str]) -> Self {
        Self {
            pick: Some(SongPick::new(
                song,
                aliases.iter().map(|a| (*a).to_owned()).collect(),
            )),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self {
            pick: None,
            scopes: Mutex::new(Vec::new()),
        }
    }
}

impl SongCatalog for FakeCatalog {
    fn pick_random(
        &self,
        scope: &AliasScope,
    ) -> Pin<Box<dyn Future<Output = Result<SongPick>> + Send + '_>> {
        self.scopes.lock().unwrap().push(scope.clone());
        let pick = self.pick.clone();
        Box::pin(async move { pick.ok_or_else(|| AppError::NotFound("empty catalog".into())) })
    }
}

/// Jacket source serving fixed bytes, or failing like a dead upstream.
pub struct FakeJackets {
    bytes: Option<Bytes>,
}

impl FakeJackets {
    pub fn serving(bytes: Bytes) -> Self {
        Self { bytes: Some(bytes) }
    }

    pub fn failing() -> Self {
        Self { bytes: None }
    }
}

impl JacketSource for FakeJackets {
    fn fetch<'a>(
        &'a self,
        _jacket: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Bytes>> + Send + 'a>> {
        Box::pin(async move {
            self.bytes
                .clone()
                .ok_or_else(|| AppError::Http("upstream unavailable".into()))
        })
    }

    fn url(&self, jacket: &str) -> String {
        format!("https://jackets.test/img/{jacket}")
    }
}

/// Leaderboard recording every win.
#[derive(Default)]
pub struct RecordingLeaderboard {
    pub wins: Mutex<Vec<String>>,
}

impl Leaderboard for RecordingLeaderboard {
    fn record_win<'a>(
        &'a self,
        user_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.wins.lock().unwrap().push(user_id.to_owned());
            Ok(())
        })
    }
}

/// Notifier recording everything posted; signals each posted question.
pub struct RecordingNotifier {
    pub questions: Mutex<Vec<Question>>,
    pub acknowledged: Mutex<Vec<IncomingMessage>>,
    pub results: Mutex<Vec<RoundResult>>,
    fail_questions: bool,
    question_tx: mpsc::UnboundedSender<String>,
}

impl RecordingNotifier {
    /// Returns the notifier and a receiver yielding the channel of each question.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::build(false)
    }

    /// A notifier whose question posts always fail.
    pub fn failing() -> (Self, mpsc::UnboundedReceiver<String>) {
        Self::build(true)
    }

    fn build(fail_questions: bool) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (question_tx, question_rx) = mpsc::unbounded_channel();
        (
            Self {
                questions: Mutex::new(Vec::new()),
                acknowledged: Mutex::new(Vec::new()),
                results: Mutex::new(Vec::new()),
                fail_questions,
                question_tx,
            },
            question_rx,
        )
    }
}

impl RoundNotifier for RecordingNotifier {
    fn post_question<'a>(
        &'a self,
        question: &'a Question,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if self.fail_questions {
                return Err(AppError::Slack("upload failed".into()));
            }
            self.questions.lock().unwrap().push(question.clone());
            let _ = self.question_tx.send(question.channel_id.clone());
            Ok(())
        })
    }

    fn acknowledge<'a>(
        &'a self,
        message: &'a IncomingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.acknowledged.lock().unwrap().push(message.clone());
            Ok(())
        })
    }

    fn post_result<'a>(
        &'a self,
        result: &'a RoundResult,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.results.lock().unwrap().push(result.clone());
            Ok(())
        })
    }
}

// ─── Assembly ────────────────────────────────────────────────────────

/// A game wired to fakes, with handles to inspect them.
pub struct Harness {
    pub game: GuessGame,
    pub catalog: Arc<FakeCatalog>,
    pub leaderboard: Arc<RecordingLeaderboard>,
    pub notifier: Arc<RecordingNotifier>,
    pub questions: mpsc::UnboundedReceiver<String>,
}

pub fn harness_with(
    catalog: FakeCatalog,
    jackets: FakeJackets,
    notifier: (RecordingNotifier, mpsc::UnboundedReceiver<String>),
    timeout: Duration,
) -> Harness {
    let catalog = Arc::new(catalog);
    let leaderboard = Arc::new(RecordingLeaderboard::default());
    let (notifier, questions) = notifier;
    let notifier = Arc::new(notifier);
    let game = GuessGame::new(
        SessionManager::new(timeout, 0.9),
        Arc::clone(&catalog) as Arc<dyn SongCatalog>,
        Arc::new(jackets),
        Arc::clone(&leaderboard) as Arc<dyn Leaderboard>,
        Arc::clone(&notifier) as Arc<dyn RoundNotifier>,
    )
    .with_crop_size(32);
    Harness {
        game,
        catalog,
        leaderboard,
        notifier,
        questions,
    }
}

/// A game over Titania (alias "ティターニア") with working fakes.
pub fn harness(timeout: Duration) -> Harness {
    harness_with(
        FakeCatalog::with(titania(), &["ティターニア"]),
        FakeJackets::serving(jacket_png()),
        RecordingNotifier::new(),
        timeout,
    )
}

/// Application state over an in-memory database and the given game.
pub async fn app_state(game: GuessGame, config: GlobalConfig) -> Arc<AppState> {
    let db = db::connect_memory().await.expect("db");
    Arc::new(AppState {
        config: Arc::new(config),
        db: Arc::new(db),
        slack: None,
        game,
        relay: LoginRelay::new(),
    })
}
