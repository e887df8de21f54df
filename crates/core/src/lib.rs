pub mod config;
pub mod domain;
pub mod emojis;
pub mod errors;
pub mod flows;
pub mod transcript;

pub use domain::ids::{ChannelId, EmojiId, GuildId, MessageId, RoleId, UserId};
pub use domain::review::{RatingTone, Review, ReviewId, StarRating};
pub use domain::settings::{GuildSettings, SettingKey, TicketPrerequisites};
pub use domain::ticket::{StaffRef, Ticket, TicketNumber, TicketStatus};
pub use emojis::{EmojiKey, EmojiRef, EmojiRegistry};
pub use errors::{ApplicationError, DomainError, InteractionError};
pub use transcript::{Transcript, TranscriptMessage, TranscriptRenderer};
