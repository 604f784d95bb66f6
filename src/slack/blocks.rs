//! Slack Block Kit message builders.
//!
//! Text helpers return Slack `mrkdwn`; user-provided text (song titles,
//! aliases, artists) goes through [`escape`] first. Text arriving from
//! Slack goes through [`unescape`] before it is matched or looked up.

use slack_morphism::prelude::{SlackBlock, SlackBlockText, SlackSectionBlock};

use crate::game::{Question, RoundResult};
use crate::models::guess::Outcome;
use crate::models::leaderboard::LeaderboardEntry;
use crate::models::song::{Song, SongMatch};

/// Escape the three characters Slack treats as control sequences.
#[must_use]
pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Reverse [`escape`] on text Slack delivered to the bot.
///
/// `&amp;` is replaced last so `&amp;lt;` stays the literal `&lt;`.
#[must_use]
pub fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Build a plain text section block.
#[must_use]
pub fn text_section(text: &str) -> SlackBlock {
    SlackBlock::Section(SlackSectionBlock::new().with_text(SlackBlockText::MarkDown(text.into())))
}

/// Comment posted with the cropped jacket.
#[must_use]
pub fn question_text(question: &Question) -> String {
    format!(
        "*Guess the song!*\nYou have {} seconds to guess the song.\nUse `/skip` to skip.",
        question.timeout_seconds
    )
}

/// First line of the answer card.
#[must_use]
pub fn outcome_headline(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Answered { author_id, .. } => format!("<@{author_id}> has the correct answer!"),
        Outcome::Skipped => "Skipped!".to_owned(),
        Outcome::TimedOut => "Time's up!".to_owned(),
    }
}

/// Body of the answer card: every accepted answer, artist, genre, jacket link.
#[must_use]
pub fn answer_text(result: &RoundResult) -> String {
    let answers = result
        .pick
        .answers
        .iter()
        .map(String::as_str)
        .map(escape)
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "*Answer*: {answers}\n\n*Artist*: {}\n*Category*: {}\n<{}|Jacket>",
        escape(&result.pick.song.artist),
        escape(&result.pick.song.genre),
        result.jacket_url,
    )
}

/// Blocks for the answer card.
#[must_use]
pub fn result_blocks(result: &RoundResult) -> Vec<SlackBlock> {
    vec![
        text_section(&outcome_headline(&result.outcome)),
        text_section(&answer_text(result)),
    ]
}

/// Numbered leaderboard listing, or a placeholder when nobody has scored.
#[must_use]
pub fn leaderboard_text(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return "*Guess Leaderboard*\nNobody has guessed a song yet.".to_owned();
    }
    let mut text = String::from("*Guess Leaderboard*");
    for (idx, entry) in entries.iter().enumerate() {
        text.push_str(&format!("\n{}. <@{}>: {}", idx + 1, entry.user_id, entry.score));
    }
    text
}

/// Ephemeral instructions for a `/login` flow.
#[must_use]
pub fn login_instructions(otp: &str, timeout_seconds: u64) -> String {
    format!(
        "Your login passcode is `{otp}`.\n\
         Log in to CHUNITHM-NET in your browser, then run the login helper and enter the passcode.\n\
         The passcode expires in {} minutes. You will receive a direct message once your account is linked.",
        timeout_seconds.div_ceil(60)
    )
}

/// Reply for a lookup whose best candidate is not close enough.
#[must_use]
pub fn did_you_mean_text(found: &SongMatch) -> String {
    if found.matched == found.song.title {
        format!("No songs found. Did you mean *{}*?", escape(&found.song.title))
    } else {
        format!(
            "No songs found. Did you mean *{}* (for *{}*)?",
            escape(&found.matched),
            escape(&found.song.title)
        )
    }
}

/// Blocks for a `/info` song card.
#[must_use]
pub fn song_card(song: &Song, jacket_url: &str) -> Vec<SlackBlock> {
    let fields = vec![
        SlackBlockText::MarkDown(format!("*Artist*\n{}", escape(&song.artist)).into()),
        SlackBlockText::MarkDown(format!("*Category*\n{}", escape(&song.genre)).into()),
    ];
    vec![
        text_section(&format!("*{}*", escape(&song.title))),
        SlackBlock::Section(SlackSectionBlock::new().with_fields(fields)),
        text_section(&format!("<{jacket_url}|Jacket>")),
    ]
}
