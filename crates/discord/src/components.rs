//! Platform-neutral message model: embeds, buttons, selects and modals.
//!
//! The gateway adapter translates these into serenity builders; services and
//! views only ever build [`MessageTemplate`] / [`Modal`] values.

use serde::Serialize;

use zen_core::emojis::EmojiRef;
use zen_core::domain::review::RatingTone;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Colour(pub u32);

impl Colour {
    pub const BLURPLE: Colour = Colour(0x5865F2);
    pub const BLUE: Colour = Colour(0x3498DB);
    pub const GREEN: Colour = Colour(0x2ECC71);
    pub const DARK_GREEN: Colour = Colour(0x1F8B4C);
    pub const ORANGE: Colour = Colour(0xE67E22);
    pub const RED: Colour = Colour(0xE74C3C);
    pub const PANEL: Colour = Colour(0x2F3136);

    pub fn for_tone(tone: RatingTone) -> Self {
        match tone {
            RatingTone::Success => Self::GREEN,
            RatingTone::Neutral => Self::ORANGE,
            RatingTone::Alert => Self::RED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedAuthor {
    pub name: String,
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedFooter {
    pub text: String,
    pub icon_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub colour: Option<Colour>,
    pub author: Option<EmbedAuthor>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<EmbedFooter>,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn colour(mut self, colour: Colour) -> Self {
        self.colour = Some(colour);
        self
    }

    pub fn author(mut self, name: impl Into<String>, icon_url: Option<String>) -> Self {
        self.author = Some(EmbedAuthor { name: name.into(), icon_url });
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline });
        self
    }

    pub fn footer(mut self, text: impl Into<String>, icon_url: Option<String>) -> Self {
        self.footer = Some(EmbedFooter { text: text.into(), icon_url });
        self
    }

    pub fn thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = url;
        self
    }

    pub fn image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|field| field.name == name).map(|field| field.value.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: Option<String>,
    pub emoji: Option<EmojiRef>,
    pub style: ButtonStyle,
    pub disabled: bool,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            label: Some(label.into()),
            emoji: None,
            style: ButtonStyle::Secondary,
            disabled: false,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn emoji(mut self, emoji: EmojiRef) -> Self {
        self.emoji = Some(emoji);
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Text,
    Category,
    Other,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectKind {
    Role,
    Channel { channel_kinds: Vec<ChannelKind> },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub kind: SelectKind,
    pub min_values: u8,
    pub max_values: u8,
}

impl SelectMenu {
    pub fn role(custom_id: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            custom_id: custom_id.into(),
            placeholder: placeholder.into(),
            kind: SelectKind::Role,
            min_values: 1,
            max_values: 1,
        }
    }

    pub fn channel(
        custom_id: impl Into<String>,
        placeholder: impl Into<String>,
        kind: ChannelKind,
    ) -> Self {
        Self {
            custom_id: custom_id.into(),
            placeholder: placeholder.into(),
            kind: SelectKind::Channel { channel_kinds: vec![kind] },
            min_values: 1,
            max_values: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Button(Button),
    Select(SelectMenu),
}

impl Component {
    pub fn custom_id(&self) -> &str {
        match self {
            Self::Button(button) => &button.custom_id,
            Self::Select(select) => &select.custom_id,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionRow {
    pub components: Vec<Component>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileUpload {
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { file_name: file_name.into(), bytes: bytes.into() }
    }

    pub fn attachment_url(&self) -> String {
        format!("attachment://{}", self.file_name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub content: Option<String>,
    pub embeds: Vec<Embed>,
    pub rows: Vec<ActionRow>,
    pub files: Vec<FileUpload>,
}

impl MessageTemplate {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: Some(content.into()), ..Self::default() }
    }

    pub fn components(&self) -> impl Iterator<Item = &Component> {
        self.rows.iter().flat_map(|row| row.components.iter())
    }

    pub fn find_button(&self, custom_id: &str) -> Option<&Button> {
        self.components().find_map(|component| match component {
            Component::Button(button) if button.custom_id == custom_id => Some(button),
            _ => None,
        })
    }
}

pub struct MessageBuilder {
    content: Option<String>,
    embeds: Vec<Embed>,
    rows: Vec<ActionRow>,
    files: Vec<FileUpload>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self { content: None, embeds: Vec::new(), rows: Vec::new(), files: Vec::new() }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    pub fn row<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut RowBuilder),
    {
        let mut builder = RowBuilder::default();
        build(&mut builder);
        if !builder.components.is_empty() {
            self.rows.push(ActionRow { components: builder.components });
        }
        self
    }

    pub fn file(mut self, file: Option<FileUpload>) -> Self {
        self.files.extend(file);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            content: self.content,
            embeds: self.embeds,
            rows: self.rows,
            files: self.files,
        }
    }
}

impl Default for MessageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default)]
pub struct RowBuilder {
    components: Vec<Component>,
}

impl RowBuilder {
    pub fn button(&mut self, button: Button) -> &mut Self {
        self.components.push(Component::Button(button));
        self
    }

    pub fn select(&mut self, select: SelectMenu) -> &mut Self {
        self.components.push(Component::Select(select));
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInputStyle {
    Short,
    Paragraph,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub style: TextInputStyle,
    pub required: bool,
    pub max_length: Option<u16>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Modal {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInput>,
}
