//! [`RoundNotifier`] backed by the Slack service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use slack_morphism::prelude::{SlackChannelId, SlackTs};

use crate::game::{Question, RoundNotifier, RoundResult};
use crate::models::guess::IncomingMessage;
use crate::slack::blocks;
use crate::slack::client::{SlackMessage, SlackService};
use crate::Result;

/// Reaction added to the message that won a round.
pub const WINNER_REACTION: &str = "white_check_mark";

/// Posts round output to Slack.
pub struct SlackNotifier {
    slack: Arc<SlackService>,
}

impl SlackNotifier {
    /// Wrap a running Slack service.
    #[must_use]
    pub fn new(slack: Arc<SlackService>) -> Self {
        Self { slack }
    }
}

impl RoundNotifier for SlackNotifier {
    fn post_question<'a>(
        &'a self,
        question: &'a Question,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.slack
                .upload_file(
                    SlackChannelId(question.channel_id.clone()),
                    "image.png",
                    question.preview_png.clone(),
                    Some(blocks::question_text(question)),
                )
                .await
        })
    }

    fn acknowledge<'a>(
        &'a self,
        message: &'a IncomingMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let Some(ts) = message.ts.clone() else {
                return Ok(());
            };
            self.slack
                .add_reaction(
                    SlackChannelId(message.channel_id.clone()),
                    SlackTs(ts),
                    WINNER_REACTION,
                )
                .await
        })
    }

    fn post_result<'a>(
        &'a self,
        result: &'a RoundResult,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            let message = SlackMessage {
                channel: SlackChannelId(result.channel_id.clone()),
                text: Some(blocks::outcome_headline(&result.outcome)),
                blocks: Some(blocks::result_blocks(result)),
                thread_ts: None,
            };
            self.slack.enqueue(message).await
        })
    }
}
