//! HTML archive of a ticket channel, rendered with tera.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};
use thiserror::Error;

const TEMPLATE_NAME: &str = "transcript.html";

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("template error: {0}")]
    Template(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TranscriptMessage {
    pub author_name: String,
    pub author_avatar: Option<String>,
    pub author_is_bot: bool,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub embeds: Vec<String>,
    pub attachments: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct Transcript {
    pub file_name: String,
    pub html: String,
    pub message_count: usize,
}

#[derive(Serialize)]
struct RenderedMessage<'a> {
    author_name: &'a str,
    author_avatar: Option<&'a str>,
    author_is_bot: bool,
    timestamp: String,
    content: &'a str,
    embeds: &'a [String],
    attachments: &'a [String],
}

#[derive(Clone, Debug)]
pub struct TranscriptRenderer {
    tera: Tera,
}

impl TranscriptRenderer {
    pub fn new() -> Result<Self, TranscriptError> {
        let mut tera = Tera::default();
        tera.add_raw_template(TEMPLATE_NAME, include_str!("../../../templates/transcript.html"))
            .map_err(|error| TranscriptError::Template(error.to_string()))?;
        Ok(Self { tera })
    }

    /// Renders messages oldest first.
    pub fn render(
        &self,
        guild_name: &str,
        channel_name: &str,
        messages: &[TranscriptMessage],
        exported_at: DateTime<Utc>,
    ) -> Result<Transcript, TranscriptError> {
        let rendered: Vec<RenderedMessage<'_>> = messages
            .iter()
            .map(|message| RenderedMessage {
                author_name: &message.author_name,
                author_avatar: message.author_avatar.as_deref(),
                author_is_bot: message.author_is_bot,
                timestamp: message.timestamp.format("%d/%m/%Y %H:%M").to_string(),
                content: &message.content,
                embeds: &message.embeds,
                attachments: &message.attachments,
            })
            .collect();

        let mut context = Context::new();
        context.insert("guild_name", guild_name);
        context.insert("channel_name", channel_name);
        context.insert("messages", &rendered);
        context.insert("exported_at", &exported_at.format("%d/%m/%Y %H:%M UTC").to_string());

        let html = self
            .tera
            .render(TEMPLATE_NAME, &context)
            .map_err(|error| TranscriptError::Template(error.to_string()))?;

        Ok(Transcript { file_name: file_name(channel_name), html, message_count: messages.len() })
    }
}

pub fn file_name(channel_name: &str) -> String {
    format!("transcript-{channel_name}.html")
}
