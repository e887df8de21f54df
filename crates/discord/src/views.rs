//! Every message the bot renders.
//!
//! Views are pure projections of state; services decide when to send them.

use zen_core::domain::ids::{ChannelId, UserId};
use zen_core::domain::review::Review;
use zen_core::domain::ticket::Ticket;
use zen_core::emojis::{EmojiKey, EmojiRegistry};
use zen_core::flows::feedback::{FeedbackSession, FeedbackState};
use zen_core::flows::wizard::{WizardStep, WIZARD_STEPS};

use crate::api::GuildProfile;
use crate::components::{
    Button, ButtonStyle, ChannelKind, Colour, Embed, FileUpload, MessageBuilder, MessageTemplate,
    Modal, SelectMenu, TextInput, TextInputStyle,
};
use crate::custom_ids::{self, ComponentAction, FeedbackControl, ModalAction};

pub const CLAIMED_BY_FIELD: &str = "Claimed by";
pub const SUPPORT_LINK: &str = "https://dsc.gg/zenstudios";
const SERVICE_HOURS: &str = "08:00 – 21:00";

fn guild_footer(embed: Embed, guild: &GuildProfile) -> Embed {
    embed.footer(guild.footer_text(), guild.icon_url.clone())
}

fn headline(emoji: impl std::fmt::Display, title: &str, body: &str) -> String {
    format!("## {emoji} `{title}`\n\n> {body}")
}

pub fn ticket_panel(
    guild: &GuildProfile,
    emojis: &EmojiRegistry,
    banner: Option<FileUpload>,
) -> MessageTemplate {
    let mut embed = Embed::new()
        .title("Support Center")
        .colour(Colour::PANEL)
        .description(
            "Welcome to our Support Center!\n\n\
             To start a **ticket**, click the button below.\n\
             A new channel will be created so you can talk directly with our team.",
        )
        .field("**Instructions**", "> - Describe your request clearly.\n> - Wait patiently.", false)
        .field("**Service hours**", format!("> `{SERVICE_HOURS}`"), false)
        .thumbnail(guild.icon_url.clone());
    embed = guild_footer(embed, guild);
    if let Some(banner) = &banner {
        embed = embed.image(banner.attachment_url());
    }

    MessageBuilder::new()
        .embed(embed)
        .row(|row| {
            row.button(
                Button::new(custom_ids::TICKET_OPEN, "Open Ticket")
                    .emoji(emojis.get(EmojiKey::Others)),
            );
        })
        .file(banner)
        .build()
}

/// The first message of a ticket channel. Re-rendered in place when the ticket is claimed.
pub fn ticket_welcome(
    guild: &GuildProfile,
    ticket: &Ticket,
    emojis: &EmojiRegistry,
    banner_name: Option<&str>,
) -> MessageTemplate {
    let mut embed = Embed::new()
        .title("Thank you for contacting support!")
        .colour(Colour::DARK_GREEN)
        .description(format!(
            "Thank you for your cooperation and patience, {owner}!\n\n\
             **In this ticket, include:**\n\
             - A clear description of the problem.\n\
             - Screenshots, logs or relevant evidence.\n\
             - Names of anyone involved (if any).\n\
             - What you have already tried.\n\n\
             **Process:**\n\
             - An agent will review and answer as soon as possible.\n\
             - We may ask for more information.\n\
             - Once solved, the ticket will be closed. For more help, open another ticket.",
            owner = ticket.owner_id.mention(),
        ))
        .thumbnail(guild.icon_url.clone());
    embed = guild_footer(embed, guild);
    if let Some(name) = banner_name {
        embed = embed.image(format!("attachment://{name}"));
    }
    if let Some(staff) = &ticket.claimed_by {
        embed = embed.field(CLAIMED_BY_FIELD, staff.mention(), false);
    }

    MessageBuilder::new()
        .content(ticket.owner_id.mention())
        .embed(embed)
        .row(|row| {
            row.button(
                Button::new(custom_ids::TICKET_CLOSE, "Close")
                    .style(ButtonStyle::Danger)
                    .emoji(emojis.get(EmojiKey::Cancel)),
            )
            .button(
                Button::new(custom_ids::TICKET_CLAIM, "Claim")
                    .style(ButtonStyle::Success)
                    .emoji(emojis.get(EmojiKey::Confirm))
                    .disabled(ticket.claimed_by.is_some()),
            )
            .button(Button::new(custom_ids::TICKET_INFO, "Info").emoji(emojis.get(EmojiKey::Info)));
        })
        .build()
}

pub fn ticket_created(emojis: &EmojiRegistry, channel: ChannelId) -> MessageTemplate {
    MessageTemplate::text(headline(
        emojis.get(EmojiKey::Confirm),
        "Ticket created!",
        &format!("Your channel is ready: {}", channel.mention()),
    ))
}

pub fn claim_announcement(emojis: &EmojiRegistry, staff: UserId) -> MessageTemplate {
    MessageTemplate::text(headline(
        emojis.get(EmojiKey::Confirm),
        "Ticket claimed!",
        &format!("Staff {} took responsibility for this ticket.", staff.mention()),
    ))
}

pub fn ticket_info(
    emojis: &EmojiRegistry,
    channel: ChannelId,
    ticket: Option<&Ticket>,
) -> MessageTemplate {
    let mut body = format!(
        "## {} `Ticket information`\n\n> **Channel:** {}\n> **ID:** `{}`",
        emojis.get(EmojiKey::Info),
        channel.mention(),
        channel
    );
    if let Some(ticket) = ticket {
        body.push_str(&format!(
            "\n> **Number:** `{}`\n> **Owner:** {}\n> **Status:** `{}`\n> **Handled by:** {}",
            ticket.number,
            ticket.owner_id.mention(),
            ticket.status.as_str(),
            ticket.handler_label(),
        ));
    }
    MessageTemplate::text(body)
}

pub fn closing_notice(emojis: &EmojiRegistry, delay_secs: u64) -> MessageTemplate {
    MessageTemplate::text(headline(
        emojis.get(EmojiKey::Cancel),
        "Closing ticket...",
        &format!("This channel will be deleted in {delay_secs} seconds."),
    ))
}

pub fn closure_summary(
    channel_name: &str,
    closed_by: UserId,
    owner: Option<UserId>,
    transcript: FileUpload,
) -> MessageTemplate {
    let owner = owner.map(UserId::mention).unwrap_or_else(|| "N/A".to_owned());
    MessageBuilder::new()
        .embed(
            Embed::new()
                .title(format!("Ticket closed: {channel_name}"))
                .colour(Colour::RED)
                .field("Closed by", closed_by.mention(), true)
                .field("Owner", owner, true),
        )
        .file(Some(transcript))
        .build()
}

/// The private rating panel, projected from the session state.
pub fn feedback_panel(
    session_id: &str,
    session: &FeedbackSession,
    guild: &GuildProfile,
    emojis: &EmojiRegistry,
) -> MessageTemplate {
    let mut embed = Embed::new()
        .title("Service finished")
        .description("Rate our service below.")
        .colour(Colour::BLUE);
    embed = match session.state {
        FeedbackState::Rating => embed.field("Handled by", session.staff.clone(), true),
        FeedbackState::Details | FeedbackState::Submitted => embed.field(
            "(2/2) Final details",
            "If you wish, leave a comment or image below and click **Finish**.",
            false,
        ),
    };
    embed = guild_footer(embed, guild);

    let control = |control| {
        ComponentAction::Feedback { session: session_id.to_owned(), control }.custom_id()
    };

    let builder = MessageBuilder::new().embed(embed);
    let builder = match session.state {
        FeedbackState::Rating => builder.row(|row| {
            for value in 1..=5 {
                row.button(
                    Button::new(control(FeedbackControl::Star(value)), value.to_string())
                        .emoji(emojis.get(EmojiKey::Star)),
                );
            }
        }),
        FeedbackState::Details => builder.row(|row| {
            let comment_style =
                if session.has_comment() { ButtonStyle::Success } else { ButtonStyle::Secondary };
            let (images_label, images_style) = if session.images.is_empty() {
                ("Attach Images".to_owned(), ButtonStyle::Secondary)
            } else {
                (format!("{} Images", session.images.len()), ButtonStyle::Success)
            };

            row.button(
                Button::new(control(FeedbackControl::Comment), "Comment")
                    .style(comment_style)
                    .emoji(emojis.get(EmojiKey::Notes)),
            )
            .button(
                Button::new(control(FeedbackControl::Images), images_label)
                    .style(images_style)
                    .emoji(emojis.get(EmojiKey::Photo)),
            )
            .button(
                Button::new(control(FeedbackControl::Finish), "Finish")
                    .style(ButtonStyle::Success)
                    .emoji(emojis.get(EmojiKey::Confirm)),
            );
        }),
        FeedbackState::Submitted => builder,
    };
    builder.build()
}

pub fn comment_form(session_id: &str, current: Option<&str>, max_chars: usize) -> Modal {
    Modal {
        custom_id: ModalAction::FeedbackComment { session: session_id.to_owned() }.custom_id(),
        title: "Leave your comment".to_owned(),
        inputs: vec![TextInput {
            custom_id: custom_ids::COMMENT_INPUT.to_owned(),
            label: "Comment".to_owned(),
            style: TextInputStyle::Paragraph,
            required: false,
            max_length: u16::try_from(max_chars).ok(),
            value: current.map(str::to_owned),
        }],
    }
}

pub fn comment_saved(emojis: &EmojiRegistry) -> MessageTemplate {
    MessageTemplate::text(format!("{} Comment saved!", emojis.get(EmojiKey::Notes)))
}

pub fn images_prompt(emojis: &EmojiRegistry, wait_secs: u64) -> MessageTemplate {
    MessageTemplate::text(format!(
        "{} **Send the images in this chat now ({wait_secs}s).**",
        emojis.get(EmojiKey::Photo)
    ))
}

pub fn images_saved(emojis: &EmojiRegistry) -> MessageTemplate {
    MessageTemplate::text(format!("{} Saved!", emojis.get(EmojiKey::Confirm)))
}

pub fn images_timed_out(emojis: &EmojiRegistry) -> MessageTemplate {
    MessageTemplate::text(format!("{} Time is up.", emojis.get(EmojiKey::Cancel)))
}

pub fn review_summary(
    review: &Review,
    reviewer_avatar: Option<String>,
    guild: &GuildProfile,
    emojis: &EmojiRegistry,
) -> MessageTemplate {
    let stars = emojis.get(EmojiKey::Star).to_string().repeat(usize::from(review.stars.value()));
    let mut embed = Embed::new()
        .title("New Review")
        .colour(Colour::for_tone(review.stars.tone()))
        .author(review.reviewer_name.clone(), reviewer_avatar)
        .field("Rating", stars, true)
        .field("Staff", review.staff.clone(), true)
        .field("Ticket", review.ticket.clone(), true)
        .description(format!("**Comment:**\n```{}```", review.comment_or_placeholder()));
    embed = guild_footer(embed, guild);
    if let Some(first) = review.images.first() {
        embed = embed.image(first.clone());
    }
    MessageBuilder::new().embed(embed).build()
}

pub fn review_thank_you(emojis: &EmojiRegistry) -> MessageTemplate {
    MessageBuilder::new()
        .embed(
            Embed::new()
                .title("Thank you!")
                .description(format!("{} Review sent.", emojis.get(EmojiKey::Confirm)))
                .colour(Colour::GREEN),
        )
        .build()
}

pub fn review_thread_name(review: &Review) -> String {
    format!("Review {}", review.id)
}

fn wizard_copy(step: WizardStep) -> String {
    match step {
        WizardStep::Welcome => format!(
            "## `👋` `Welcome to the setup`\n\n\
             Thank you for using the **Zen** ticket system!\n\n\
             **Support:** we would appreciate it if you joined our official server to help us \
             and receive updates: **{SUPPORT_LINK}**\n\n\
             > Click **Continue** to configure the bot's channels and roles."
        ),
        WizardStep::StaffRole => format!(
            "## `🛠️` `Configuration (2/{WIZARD_STEPS})`\n\n\
             Please select the **Staff Role** below.\n\n\
             > This role grants the matching members permission to view and reply in tickets."
        ),
        WizardStep::OpenCategory => format!(
            "## `📂` `Configuration (3/{WIZARD_STEPS})`\n\n\
             Now select the **Category** where new tickets will be created.\n\n\
             > Whenever a member opens a ticket from the panel, its text channel is created \
             inside this category."
        ),
        WizardStep::ClaimedCategory => format!(
            "## `🗂️` `Configuration (4/{WIZARD_STEPS})`\n\n\
             Select the **Category** tickets are moved to once claimed.\n\n\
             > When a staff member clicks 'Claim', the ticket leaves the open category and \
             moves here."
        ),
        WizardStep::TranscriptChannel => format!(
            "## `📜` `Configuration (5/{WIZARD_STEPS})`\n\n\
             Select the **Text Channel** where transcripts (logs) will be sent.\n\n\
             > When a ticket is closed, the bot exports an HTML file with the whole conversation."
        ),
        WizardStep::FeedbackChannel => format!(
            "## `⭐` `Configuration (6/{WIZARD_STEPS})`\n\n\
             Finally, select the **Text Channel** where reviews will be published.\n\n\
             > After a ticket closes the customer receives a rating form by DM. Stars and \
             comments show up here."
        ),
        WizardStep::Complete => "## `✅` `Setup complete!`\n\n\
             The system has been configured successfully.\n\n\
             > You can now use `/ticket_panel` to send the panel."
            .to_owned(),
    }
}

/// The wizard prompt for `step`; the completed wizard has no controls.
pub fn wizard_step(session_id: &str, step: WizardStep) -> MessageTemplate {
    let colour = if step.is_complete() { Colour::GREEN } else { Colour::BLUE };
    let builder = MessageBuilder::new().embed(Embed::new().description(wizard_copy(step)).colour(colour));

    let Some(number) = step.number() else {
        return builder.build();
    };
    let custom_id = ComponentAction::Wizard { session: session_id.to_owned(), step: number }.custom_id();

    builder
        .row(|row| {
            match step {
                WizardStep::Welcome => {
                    row.button(
                        Button::new(custom_id, "Continue setup")
                            .style(ButtonStyle::Primary)
                            .emoji(zen_core::emojis::EmojiRef::unicode("🚀")),
                    );
                }
                WizardStep::StaffRole => {
                    row.select(SelectMenu::role(custom_id, "Select the role..."));
                }
                WizardStep::OpenCategory | WizardStep::ClaimedCategory => {
                    row.select(SelectMenu::channel(
                        custom_id,
                        "Select the category...",
                        ChannelKind::Category,
                    ));
                }
                WizardStep::TranscriptChannel | WizardStep::FeedbackChannel => {
                    row.select(SelectMenu::channel(
                        custom_id,
                        "Select the channel...",
                        ChannelKind::Text,
                    ));
                }
                WizardStep::Complete => {}
            }
        })
        .build()
}

pub fn emoji_install_started(emojis: &EmojiRegistry) -> MessageTemplate {
    MessageTemplate::text(format!("{} Installing emojis...", emojis.get(EmojiKey::Loading)))
}

pub fn emoji_install_finished(installed: usize) -> MessageTemplate {
    MessageTemplate::text(format!("✅ **{installed}** emojis installed/updated!"))
}

pub fn panel_sent() -> MessageTemplate {
    MessageTemplate::text("Panel sent!")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use zen_core::domain::ids::{ChannelId, GuildId, UserId};
    use zen_core::domain::review::{Review, ReviewId, StarRating};
    use zen_core::domain::ticket::{StaffRef, Ticket, TicketNumber, TicketStatus};
    use zen_core::emojis::EmojiRegistry;
    use zen_core::flows::feedback::{FeedbackEvent, FeedbackSession};
    use zen_core::flows::wizard::WizardStep;

    use super::{
        feedback_panel, review_summary, ticket_panel, ticket_welcome, wizard_step, CLAIMED_BY_FIELD,
    };
    use crate::api::GuildProfile;
    use crate::components::{ButtonStyle, Colour, Component, FileUpload, SelectKind};
    use crate::custom_ids;

    fn guild() -> GuildProfile {
        GuildProfile { id: GuildId(1), name: "Zen".to_owned(), icon_url: None }
    }

    fn ticket() -> Ticket {
        Ticket {
            channel_id: ChannelId(10),
            channel_name: "ticket-alice".to_owned(),
            number: TicketNumber(3),
            owner_id: UserId(50),
            owner_name: "alice".to_owned(),
            category_id: Some(ChannelId(900)),
            status: TicketStatus::Open,
            claimed_by: None,
            welcome_message_id: None,
            opened_at: Utc::now(),
            closed_at: None,
        }
    }

    #[test]
    fn panel_attaches_banner_when_present() {
        let emojis = EmojiRegistry::default();
        let with_banner =
            ticket_panel(&guild(), &emojis, Some(FileUpload::new("banner-ticket.png", vec![1])));
        assert_eq!(with_banner.files.len(), 1);
        assert_eq!(
            with_banner.embeds[0].image_url.as_deref(),
            Some("attachment://banner-ticket.png")
        );
        assert!(with_banner.find_button(custom_ids::TICKET_OPEN).is_some());

        let without = ticket_panel(&guild(), &emojis, None);
        assert!(without.files.is_empty());
        assert_eq!(without.embeds[0].image_url, None);
        assert_eq!(
            without.embeds[0].footer.as_ref().map(|footer| footer.text.as_str()),
            Some("© Zen. All rights reserved.")
        );
    }

    #[test]
    fn claimed_welcome_shows_handler_and_disables_claim() {
        let emojis = EmojiRegistry::default();
        let mut ticket = ticket();
        let open = ticket_welcome(&guild(), &ticket, &emojis, None);
        assert_eq!(open.content.as_deref(), Some("<@50>"));
        assert!(!open.find_button(custom_ids::TICKET_CLAIM).expect("claim").disabled);
        assert_eq!(open.embeds[0].field_value(CLAIMED_BY_FIELD), None);

        ticket.claimed_by = Some(StaffRef { user_id: UserId(7), name: "mod".to_owned() });
        let claimed = ticket_welcome(&guild(), &ticket, &emojis, None);
        assert!(claimed.find_button(custom_ids::TICKET_CLAIM).expect("claim").disabled);
        assert_eq!(claimed.embeds[0].field_value(CLAIMED_BY_FIELD), Some("<@7>"));
    }

    #[test]
    fn feedback_panel_tracks_session_state() {
        let emojis = EmojiRegistry::default();
        let mut session = FeedbackSession::new(UserId(1), "alice", "ticket-alice", "<@7>");

        let rating = feedback_panel("s1", &session, &guild(), &emojis);
        assert_eq!(rating.components().count(), 5);
        assert!(rating.find_button("feedback:s1:star:5").is_some());

        session.apply(FeedbackEvent::RateService(4)).expect("rate");
        let details = feedback_panel("s1", &session, &guild(), &emojis);
        let images = details.find_button("feedback:s1:images").expect("images button");
        assert_eq!(images.label.as_deref(), Some("Attach Images"));
        assert_eq!(
            details.find_button("feedback:s1:comment").map(|button| button.style),
            Some(ButtonStyle::Secondary)
        );

        session.apply(FeedbackEvent::CommentSubmitted("Great!".to_owned())).expect("comment");
        session
            .apply(FeedbackEvent::ImagesAttached(vec!["a".to_owned(), "b".to_owned()]))
            .expect("images");
        let updated = feedback_panel("s1", &session, &guild(), &emojis);
        assert_eq!(
            updated.find_button("feedback:s1:images").and_then(|button| button.label.as_deref()),
            Some("2 Images")
        );
        assert_eq!(
            updated.find_button("feedback:s1:comment").map(|button| button.style),
            Some(ButtonStyle::Success)
        );
    }

    #[test]
    fn review_summary_colour_and_stars_follow_rating() {
        let emojis = EmojiRegistry::default();
        let review = Review {
            id: ReviewId("#abcdefg".to_owned()),
            reviewer_id: UserId(1),
            reviewer_name: "alice".to_owned(),
            stars: StarRating::new(4).expect("stars"),
            comment: None,
            images: vec!["https://cdn/1.png".to_owned(), "https://cdn/2.png".to_owned()],
            staff: "<@7>".to_owned(),
            ticket: "ticket-alice".to_owned(),
            created_at: Utc::now(),
        };

        let summary = review_summary(&review, None, &guild(), &emojis);
        let embed = &summary.embeds[0];
        assert_eq!(embed.colour, Some(Colour::ORANGE));
        assert_eq!(embed.field_value("Rating"), Some("⭐⭐⭐⭐"));
        assert_eq!(embed.image_url.as_deref(), Some("https://cdn/1.png"));
        assert!(embed.description.as_deref().unwrap_or_default().contains("No comment"));
    }

    #[test]
    fn wizard_steps_render_one_control_each() {
        let welcome = wizard_step("s", WizardStep::Welcome);
        assert!(welcome.find_button("wizard:s:1").is_some());

        let open_category = wizard_step("s", WizardStep::OpenCategory);
        let controls: Vec<&Component> = open_category.components().collect();
        assert_eq!(controls.len(), 1);
        match controls[0] {
            Component::Select(select) => {
                assert_eq!(select.custom_id, "wizard:s:3");
                assert!(matches!(select.kind, SelectKind::Channel { .. }));
            }
            other => panic!("unexpected control {other:?}"),
        }

        let done = wizard_step("s", WizardStep::Complete);
        assert_eq!(done.components().count(), 0);
        assert!(done.embeds[0].description.as_deref().unwrap_or_default().contains("/ticket_panel"));
    }
}
