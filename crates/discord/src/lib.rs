//! Discord Integration - ticket, setup and feedback flows
//!
//! This crate holds everything the bot does once an event arrives:
//! - **Gateway** (`gateway`) - event pump with reconnection and per-event tasks
//! - **Events** (`events`) - slash commands, buttons, selects, modals, DM attachments
//! - **Tickets** (`tickets`) - open, claim, close and info on ticket channels
//! - **Wizard** (`wizard`) - the six-step `/config_ticket` setup
//! - **Feedback** (`feedback`) - the rating panel sent after a ticket closes
//! - **Views** (`views`) - every embed, button row and modal the bot renders
//!
//! # Architecture
//!
//! ```text
//! Gateway → EventDispatcher → Handlers → Services → Stores (zen-db)
//!                                            ↓
//!                                  DiscordApi ← views
//! ```
//!
//! The services only talk to the platform through [`api::DiscordApi`]; `zen-server`
//! provides the serenity-backed implementation.
//!
//! # Key Types
//!
//! - `GatewayRunner` - event loop with reconnection logic
//! - `EventDispatcher` - routes events to handlers
//! - `Bot` - wires every service over one `BotContext`

pub mod api;
pub mod bot;
pub mod commands;
pub mod components;
pub mod context;
pub mod custom_ids;
pub mod emojis;
pub mod errors;
pub mod events;
pub mod feedback;
pub mod gateway;
pub mod outcome;
pub mod sessions;
pub mod tickets;
pub mod views;
pub mod waiter;
pub mod wizard;

#[cfg(test)]
pub(crate) mod testing;

pub use bot::Bot;
pub use context::BotContext;
