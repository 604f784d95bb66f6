//! Slack slash command router.

use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use slack_morphism::prelude::{
    SlackBlock, SlackChannelId, SlackClient, SlackClientEventsUserState,
    SlackClientHyperHttpsConnector, SlackCommandEvent, SlackCommandEventResponse,
    SlackMessageContent, SlackMessageResponseType,
};
use tracing::{error, info, info_span, warn, Instrument};

use crate::game::jacket;
use crate::game::matcher::DEFAULT_SIMILARITY_THRESHOLD;
use crate::models::account::AccountLink;
use crate::models::guess::MatchMode;
use crate::models::song::AliasScope;
use crate::slack::blocks;
use crate::slack::client::SlackMessage;
use crate::state::AppState;
use crate::{AppError, Result};

/// Number of players listed by `/guess-leaderboard`.
pub const LEADERBOARD_SIZE: u32 = 10;

/// Reply shown when `/skip` finds nothing to skip.
pub const NO_SESSION_TEXT: &str = "There is no ongoing session in this channel!";

const GUESS_USAGE: &str = "Usage: `/guess [strict|lenient]`";
const ADDALIAS_USAGE: &str = "Usage: `/addalias <title or alias> <new alias>`";
const REMOVEALIAS_USAGE: &str = "Usage: `/removealias <alias>`";
const INFO_USAGE: &str = "Usage: `/info <title or alias>`";

/// Matches one argument: a double-quoted run or a bare word.
#[allow(clippy::expect_used)]
static ARG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|(\S+)"#).expect("argument pattern is valid"));

/// Who invoked a command, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Workspace the command came from.
    pub team_id: Option<String>,
    /// Channel the command was run in.
    pub channel_id: String,
    /// User who ran the command.
    pub user_id: String,
    /// Everything after the command name.
    pub text: String,
}

impl CommandContext {
    /// Build the context of a Socket Mode command, undoing Slack's
    /// escaping of `&`, `<` and `>` in the argument text.
    #[must_use]
    pub fn from_event(event: &SlackCommandEvent) -> Self {
        Self {
            team_id: Some(event.team_id.to_string()),
            channel_id: event.channel_id.to_string(),
            user_id: event.user_id.to_string(),
            text: blocks::unescape(event.text.as_deref().unwrap_or_default()),
        }
    }

    /// Alias visibility for this invocation.
    #[must_use]
    pub fn scope(&self) -> AliasScope {
        AliasScope::from_team(self.team_id.as_deref())
    }
}

/// Who sees a command reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Only the invoking user.
    Ephemeral,
    /// Everyone in the channel.
    InChannel,
}

/// Immediate response to a slash command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReply {
    /// Reply text; `None` acknowledges without a message.
    pub text: Option<String>,
    /// Block Kit body shown instead of `text` when present.
    pub blocks: Option<Vec<SlackBlock>>,
    /// Audience of the reply.
    pub visibility: Visibility,
}

impl CommandReply {
    /// Reply only the invoking user sees.
    #[must_use]
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            blocks: None,
            visibility: Visibility::Ephemeral,
        }
    }

    /// Reply posted to the whole channel.
    #[must_use]
    pub fn in_channel(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            blocks: None,
            visibility: Visibility::InChannel,
        }
    }

    /// Silent acknowledgement.
    #[must_use]
    pub fn ack() -> Self {
        Self {
            text: None,
            blocks: None,
            visibility: Visibility::Ephemeral,
        }
    }

    /// Attach a Block Kit body; `text` stays as the notification fallback.
    #[must_use]
    pub fn with_blocks(mut self, blocks: Vec<SlackBlock>) -> Self {
        self.blocks = Some(blocks);
        self
    }

    fn into_response(self) -> SlackCommandEventResponse {
        let response_type = match self.visibility {
            Visibility::Ephemeral => SlackMessageResponseType::Ephemeral,
            Visibility::InChannel => SlackMessageResponseType::InChannel,
        };
        SlackCommandEventResponse {
            content: SlackMessageContent {
                text: self.text,
                blocks: self.blocks,
                attachments: None,
                upload: None,
                files: None,
                reactions: None,
                metadata: None,
                markdown_text: None,
            },
            response_type: Some(response_type),
        }
    }
}

/// Split command text into arguments, honouring double quotes.
#[must_use]
pub fn parse_args(text: &str) -> Vec<String> {
    ARG_PATTERN
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_owned())
        .collect()
}

/// Map a command failure to what the invoking user sees.
#[must_use]
pub fn error_reply(err: &AppError) -> CommandReply {
    match err {
        AppError::Unauthorized(_) => {
            CommandReply::ephemeral("You are not allowed to use this command.")
        }
        AppError::NoActiveSession(_) => CommandReply::ephemeral(NO_SESSION_TEXT),
        AppError::NotFound(msg) | AppError::AlreadyExists(msg) | AppError::InvalidInput(msg) => {
            CommandReply::ephemeral(msg.clone())
        }
        other => {
            error!(%other, "slash command failed");
            CommandReply::ephemeral("Something went wrong. Please try again later.")
        }
    }
}

/// Run one slash command against the application state.
///
/// Long-running work (rounds, login waits) is spawned; the returned reply
/// is what Slack shows immediately.
///
/// # Errors
///
/// Returns the failure of the underlying operation; [`error_reply`]
/// turns it into user-facing text.
pub async fn dispatch(
    command: &str,
    ctx: &CommandContext,
    state: &Arc<AppState>,
) -> Result<CommandReply> {
    match command.trim_start_matches('/') {
        "guess" => Ok(start_guess(ctx, state)),
        "skip" => skip(ctx, state),
        "guess-leaderboard" => {
            let entries = state.leaderboard().top(LEADERBOARD_SIZE).await?;
            Ok(CommandReply::in_channel(blocks::leaderboard_text(&entries)))
        }
        "guess-reset" => {
            state.config.ensure_authorized(&ctx.user_id)?;
            let removed = state.leaderboard().reset().await?;
            info!(user_id = %ctx.user_id, removed, "guess leaderboard reset");
            Ok(CommandReply::ephemeral(format!(
                "Leaderboard reset ({removed} entries removed)."
            )))
        }
        "addalias" => add_alias(ctx, state).await,
        "removealias" => remove_alias(ctx, state).await,
        "info" => song_info(ctx, state).await,
        "login" => start_login(ctx, state).await,
        "logout" => {
            if state.accounts().delete(&ctx.user_id).await? {
                Ok(CommandReply::ephemeral("Your account has been unlinked."))
            } else {
                Ok(CommandReply::ephemeral("You do not have a linked account."))
            }
        }
        other => Err(AppError::InvalidInput(format!("unknown command /{other}"))),
    }
}

fn start_guess(ctx: &CommandContext, state: &Arc<AppState>) -> CommandReply {
    let arg = ctx.text.trim();
    let mode = if arg.is_empty() {
        state.config.guess.default_mode
    } else {
        match MatchMode::from_str(arg) {
            Ok(mode) => mode,
            Err(_) => return CommandReply::ephemeral(GUESS_USAGE),
        }
    };

    if state.game.sessions().is_active(&ctx.channel_id) {
        return CommandReply::ack();
    }

    let state = Arc::clone(state);
    let channel_id = ctx.channel_id.clone();
    let scope = ctx.scope();
    tokio::spawn(async move {
        if let Err(err) = state.game.play(&channel_id, &scope, mode).await {
            warn!(%err, channel_id, "guess round failed");
            if let Some(ref slack) = state.slack {
                let message = SlackMessage::plain(
                    SlackChannelId(channel_id.clone()),
                    "Could not start a round. Please try again later.",
                );
                if let Err(err) = slack.enqueue(message).await {
                    warn!(%err, "failed to report round failure");
                }
            }
        }
    });
    CommandReply::ack()
}

fn skip(ctx: &CommandContext, state: &AppState) -> Result<CommandReply> {
    state.game.sessions().skip(&ctx.channel_id)?;
    Ok(CommandReply::ack())
}

async fn add_alias(ctx: &CommandContext, state: &AppState) -> Result<CommandReply> {
    let args = parse_args(&ctx.text);
    let [target, alias] = args.as_slice() else {
        return Ok(CommandReply::ephemeral(ADDALIAS_USAGE));
    };
    let song = state.songs().add_alias(target, alias, &ctx.scope()).await?;
    info!(user_id = %ctx.user_id, song_id = %song.id, %alias, "alias added");
    Ok(CommandReply::in_channel(format!(
        "Added alias *{}* for *{}*.",
        blocks::escape(alias.trim()),
        blocks::escape(&song.title)
    )))
}

async fn remove_alias(ctx: &CommandContext, state: &AppState) -> Result<CommandReply> {
    let args = parse_args(&ctx.text);
    let [alias] = args.as_slice() else {
        return Ok(CommandReply::ephemeral(REMOVEALIAS_USAGE));
    };
    state.songs().remove_alias(alias, &ctx.scope()).await?;
    info!(user_id = %ctx.user_id, %alias, "alias removed");
    Ok(CommandReply::in_channel(format!(
        "Removed alias *{}*.",
        blocks::escape(alias.trim())
    )))
}

async fn song_info(ctx: &CommandContext, state: &AppState) -> Result<CommandReply> {
    let query = ctx.text.trim();
    if query.is_empty() {
        return Ok(CommandReply::ephemeral(INFO_USAGE));
    }

    let found = state
        .songs()
        .search(query, &ctx.scope())
        .await?
        .ok_or_else(|| AppError::NotFound("No songs found.".into()))?;
    if found.similarity < DEFAULT_SIMILARITY_THRESHOLD {
        return Ok(CommandReply::ephemeral(blocks::did_you_mean_text(&found)));
    }

    let url = jacket::jacket_url(&state.config.jacket_base_url, &found.song.jacket);
    Ok(CommandReply::in_channel(found.song.title.clone())
        .with_blocks(blocks::song_card(&found.song, &url)))
}

async fn start_login(ctx: &CommandContext, state: &Arc<AppState>) -> Result<CommandReply> {
    if !state.config.login.enabled {
        return Ok(CommandReply::ephemeral("Login is disabled on this bot."));
    }

    let (otp, rx) = state.relay.reserve().await?;
    let timeout = state.config.login.timeout();
    let reply = CommandReply::ephemeral(blocks::login_instructions(&otp, timeout.as_secs()));

    let state = Arc::clone(state);
    let user_id = ctx.user_id.clone();
    let span = info_span!("login", user_id = %user_id);
    tokio::spawn(
        async move {
            let text = match state.relay.receive(&otp, rx, timeout).await {
                Some(clal) => {
                    let link = AccountLink::new(user_id.clone(), clal);
                    match state.accounts().upsert(&link).await {
                        Ok(()) => {
                            info!("account linked");
                            "Your account has been linked.".to_owned()
                        }
                        Err(err) => {
                            error!(%err, "failed to store account link");
                            "Could not save your account. Please try again later.".to_owned()
                        }
                    }
                }
                None => "Login timed out. Run `/login` again to retry.".to_owned(),
            };
            notify_user(&state, &user_id, text).await;
        }
        .instrument(span),
    );

    Ok(reply)
}

async fn notify_user(state: &AppState, user_id: &str, text: String) {
    let Some(ref slack) = state.slack else {
        info!(user_id, %text, "no slack client; login result not delivered");
        return;
    };
    let result = match slack.open_dm(user_id).await {
        Ok(channel) => slack.enqueue(SlackMessage::plain(channel, text)).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        warn!(%err, user_id, "failed to send login result");
    }
}

/// Handle incoming slash commands routed via Socket Mode.
///
/// # Errors
///
/// Returns an error if the application state is missing.
pub async fn handle_command(
    event: SlackCommandEvent,
    _client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    state: SlackClientEventsUserState,
) -> slack_morphism::UserCallbackResult<SlackCommandEventResponse> {
    info!(command = ?event.command, user = ?event.user_id, "received slash command");

    let app_state: Option<Arc<AppState>> = {
        let guard = state.read().await;
        guard.get_user_state::<Arc<AppState>>().cloned()
    };
    let Some(app) = app_state else {
        warn!("app state not available; cannot process command");
        return Err("app state not available".into());
    };

    let ctx = CommandContext::from_event(&event);
    let reply = match dispatch(&event.command.0, &ctx, &app).await {
        Ok(reply) => reply,
        Err(err) => error_reply(&err),
    };
    Ok(reply.into_response())
}
