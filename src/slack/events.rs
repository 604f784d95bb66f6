//! Slack push event handler feeding channel messages into running rounds.

use std::sync::Arc;

use slack_morphism::prelude::{
    SlackClient, SlackClientEventsUserState, SlackClientHyperHttpsConnector,
    SlackEventCallbackBody, SlackMessageEvent, SlackPushEventCallback,
};
use tracing::{debug, warn};

use crate::models::guess::IncomingMessage;
use crate::slack::blocks;
use crate::state::AppState;

/// Convert a Slack message event into a guess candidate.
///
/// Bot posts, edits and other subtyped events, and messages without text
/// or author are skipped. Slack's `&amp;`/`&lt;`/`&gt;` escaping is undone
/// so the content compares against titles as typed.
#[must_use]
pub fn incoming_message(event: &SlackMessageEvent) -> Option<IncomingMessage> {
    if event.subtype.is_some() || event.sender.bot_id.is_some() {
        return None;
    }
    let channel = event.origin.channel.as_ref()?;
    let author = event.sender.user.as_ref()?;
    let text = event.content.as_ref()?.text.as_ref()?;
    if text.trim().is_empty() {
        return None;
    }

    Some(IncomingMessage {
        channel_id: channel.to_string(),
        author_id: author.to_string(),
        content: blocks::unescape(text),
        ts: Some(event.origin.ts.to_string()),
    })
}

/// Handle push events delivered via Socket Mode.
///
/// # Errors
///
/// Never fails; missing state is logged and the event dropped.
pub async fn handle_push_event(
    event: SlackPushEventCallback,
    _client: Arc<SlackClient<SlackClientHyperHttpsConnector>>,
    state: SlackClientEventsUserState,
) -> slack_morphism::UserCallbackResult<()> {
    let SlackEventCallbackBody::Message(message) = &event.event else {
        return Ok(());
    };
    let Some(incoming) = incoming_message(message) else {
        return Ok(());
    };

    let app_state: Option<Arc<AppState>> = {
        let guard = state.read().await;
        guard.get_user_state::<Arc<AppState>>().cloned()
    };
    let Some(app) = app_state else {
        warn!("app state not available; dropping message event");
        return Ok(());
    };

    let channel_id = incoming.channel_id.clone();
    if app.game.sessions().deliver(incoming) {
        debug!(channel_id, "message routed to guess round");
    }
    Ok(())
}
