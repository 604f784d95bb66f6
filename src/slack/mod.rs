//! Slack bridge layer modules.

pub mod blocks;
pub mod client;
pub mod commands;
pub mod events;
pub mod notifier;
