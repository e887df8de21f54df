//! Conversion of platform-neutral message templates into serenity builders.

use serenity::all::{
    ButtonStyle as SerenityButtonStyle, ChannelType, CreateActionRow, CreateAttachment,
    CreateButton, CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateInputText,
    CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage,
    CreateModal, CreateSelectMenu, CreateSelectMenuKind, EditInteractionResponse, EditMessage,
    EmojiId as SerenityEmojiId, InputTextStyle, ReactionType,
};

use zen_core::emojis::EmojiRef;
use zen_discord::components::{
    ActionRow, Button, ButtonStyle, ChannelKind, Component, Embed, FileUpload, MessageTemplate,
    Modal, SelectKind, SelectMenu, TextInputStyle,
};

pub struct RenderedMessage {
    pub content: Option<String>,
    pub embeds: Vec<CreateEmbed>,
    pub rows: Vec<CreateActionRow>,
    pub files: Vec<CreateAttachment>,
}

pub fn render(template: MessageTemplate) -> RenderedMessage {
    RenderedMessage {
        content: template.content,
        embeds: template.embeds.iter().map(embed).collect(),
        rows: template.rows.iter().map(action_row).collect(),
        files: template.files.into_iter().map(attachment).collect(),
    }
}

pub fn attachment(file: FileUpload) -> CreateAttachment {
    CreateAttachment::bytes(file.bytes, file.file_name)
}

pub fn embed(source: &Embed) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(title) = &source.title {
        embed = embed.title(title);
    }
    if let Some(description) = &source.description {
        embed = embed.description(description);
    }
    if let Some(colour) = source.colour {
        embed = embed.colour(colour.0);
    }
    if let Some(author) = &source.author {
        let mut builder = CreateEmbedAuthor::new(&author.name);
        if let Some(icon) = &author.icon_url {
            builder = builder.icon_url(icon);
        }
        embed = embed.author(builder);
    }
    for field in &source.fields {
        embed = embed.field(&field.name, &field.value, field.inline);
    }
    if let Some(footer) = &source.footer {
        let mut builder = CreateEmbedFooter::new(&footer.text);
        if let Some(icon) = &footer.icon_url {
            builder = builder.icon_url(icon);
        }
        embed = embed.footer(builder);
    }
    if let Some(url) = &source.thumbnail_url {
        embed = embed.thumbnail(url);
    }
    if let Some(url) = &source.image_url {
        embed = embed.image(url);
    }
    embed
}

fn action_row(row: &ActionRow) -> CreateActionRow {
    let select = row.components.iter().find_map(|component| match component {
        Component::Select(select) => Some(select),
        Component::Button(_) => None,
    });
    match select {
        Some(select) => CreateActionRow::SelectMenu(select_menu(select)),
        None => CreateActionRow::Buttons(
            row.components
                .iter()
                .filter_map(|component| match component {
                    Component::Button(button) => Some(self::button(button)),
                    Component::Select(_) => None,
                })
                .collect(),
        ),
    }
}

fn button(source: &Button) -> CreateButton {
    let style = match source.style {
        ButtonStyle::Primary => SerenityButtonStyle::Primary,
        ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
        ButtonStyle::Success => SerenityButtonStyle::Success,
        ButtonStyle::Danger => SerenityButtonStyle::Danger,
    };
    let mut button = CreateButton::new(&source.custom_id).style(style).disabled(source.disabled);
    if let Some(label) = &source.label {
        button = button.label(label);
    }
    if let Some(emoji) = &source.emoji {
        button = button.emoji(reaction(emoji));
    }
    button
}

pub fn reaction(emoji: &EmojiRef) -> ReactionType {
    match emoji {
        EmojiRef::Unicode { glyph } => ReactionType::Unicode(glyph.clone()),
        EmojiRef::Custom { name, id, animated } => ReactionType::Custom {
            animated: *animated,
            id: SerenityEmojiId::new(id.get()),
            name: Some(name.clone()),
        },
    }
}

fn select_menu(source: &SelectMenu) -> CreateSelectMenu {
    let kind = match &source.kind {
        SelectKind::Role => CreateSelectMenuKind::Role { default_roles: None },
        SelectKind::Channel { channel_kinds } => CreateSelectMenuKind::Channel {
            channel_types: Some(channel_kinds.iter().filter_map(|kind| channel_type(*kind)).collect()),
            default_channels: None,
        },
    };
    CreateSelectMenu::new(&source.custom_id, kind)
        .placeholder(&source.placeholder)
        .min_values(source.min_values)
        .max_values(source.max_values)
}

fn channel_type(kind: ChannelKind) -> Option<ChannelType> {
    match kind {
        ChannelKind::Text => Some(ChannelType::Text),
        ChannelKind::Category => Some(ChannelType::Category),
        ChannelKind::Other => None,
    }
}

pub fn modal(source: Modal) -> CreateModal {
    let rows = source
        .inputs
        .into_iter()
        .map(|input| {
            let style = match input.style {
                TextInputStyle::Short => InputTextStyle::Short,
                TextInputStyle::Paragraph => InputTextStyle::Paragraph,
            };
            let mut text = CreateInputText::new(style, input.label, input.custom_id)
                .required(input.required);
            if let Some(max_length) = input.max_length {
                text = text.max_length(max_length);
            }
            if let Some(value) = input.value {
                text = text.value(value);
            }
            CreateActionRow::InputText(text)
        })
        .collect();
    CreateModal::new(source.custom_id, source.title).components(rows)
}

pub fn interaction_message(template: MessageTemplate, ephemeral: bool) -> CreateInteractionResponseMessage {
    let rendered = render(template);
    let mut message = CreateInteractionResponseMessage::new()
        .embeds(rendered.embeds)
        .components(rendered.rows)
        .ephemeral(ephemeral);
    if let Some(content) = rendered.content {
        message = message.content(content);
    }
    for file in rendered.files {
        message = message.add_file(file);
    }
    message
}

pub fn followup(template: MessageTemplate, ephemeral: bool) -> CreateInteractionResponseFollowup {
    let rendered = render(template);
    let mut message = CreateInteractionResponseFollowup::new()
        .embeds(rendered.embeds)
        .components(rendered.rows)
        .ephemeral(ephemeral);
    if let Some(content) = rendered.content {
        message = message.content(content);
    }
    for file in rendered.files {
        message = message.add_file(file);
    }
    message
}

pub fn create_message(template: MessageTemplate) -> CreateMessage {
    let rendered = render(template);
    let mut message = CreateMessage::new().embeds(rendered.embeds).components(rendered.rows);
    if let Some(content) = rendered.content {
        message = message.content(content);
    }
    for file in rendered.files {
        message = message.add_file(file);
    }
    message
}

/// Edits replace content, embeds and components wholesale.
pub fn edit_message(template: MessageTemplate) -> EditMessage {
    let rendered = render(template);
    EditMessage::new()
        .content(rendered.content.unwrap_or_default())
        .embeds(rendered.embeds)
        .components(rendered.rows)
}

pub fn edit_response(template: MessageTemplate) -> EditInteractionResponse {
    let rendered = render(template);
    EditInteractionResponse::new()
        .content(rendered.content.unwrap_or_default())
        .embeds(rendered.embeds)
        .components(rendered.rows)
}

#[cfg(test)]
mod tests {
    use serenity::all::ReactionType;
    use zen_core::domain::ids::EmojiId;
    use zen_core::emojis::EmojiRef;

    use super::reaction;

    #[test]
    fn custom_emojis_keep_their_id_and_name() {
        let emoji = EmojiRef::Custom { name: "star".to_owned(), id: EmojiId(42), animated: false };
        match reaction(&emoji) {
            ReactionType::Custom { id, name, animated } => {
                assert_eq!(id.get(), 42);
                assert_eq!(name.as_deref(), Some("star"));
                assert!(!animated);
            }
            other => panic!("unexpected reaction {other:?}"),
        }
    }

    #[test]
    fn unicode_emojis_pass_through() {
        assert_eq!(reaction(&EmojiRef::unicode("⭐")), ReactionType::Unicode("⭐".to_owned()));
    }
}
