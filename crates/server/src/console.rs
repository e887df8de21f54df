//! Operator console read from stdin while the bot runs.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use zen_discord::BotContext;

use crate::status::{format_uptime, BotStatus};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[1;1H";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReloadTarget {
    Emojis,
    Config,
    All,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    Reload(ReloadTarget),
    Status,
    Clear,
    Stop,
    Unknown(String),
}

impl ConsoleCommand {
    /// `None` for blank lines.
    pub fn parse(line: &str) -> Option<Self> {
        let words: Vec<String> = line.split_whitespace().map(str::to_lowercase).collect();
        let words: Vec<&str> = words.iter().map(String::as_str).collect();
        let command = match words.as_slice() {
            [] => return None,
            ["help"] => Self::Help,
            ["reload", "emojis"] => Self::Reload(ReloadTarget::Emojis),
            ["reload", "config"] => Self::Reload(ReloadTarget::Config),
            ["reload"] | ["reload", "all"] => Self::Reload(ReloadTarget::All),
            ["status"] => Self::Status,
            ["clear"] => Self::Clear,
            ["stop"] | ["exit"] => Self::Stop,
            _ => Self::Unknown(line.trim().to_owned()),
        };
        Some(command)
    }
}

pub struct Console {
    context: BotContext,
    status: Arc<BotStatus>,
    shutdown: watch::Sender<bool>,
}

impl Console {
    pub fn new(context: BotContext, status: Arc<BotStatus>, shutdown: watch::Sender<bool>) -> Self {
        Self { context, status, shutdown }
    }

    /// Reads commands until stdin closes or `stop` is entered.
    pub async fn run(self) {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!("Console ready. Type `help` for commands.");

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(error) => {
                    warn!(event_name = "system.console.read_failed", error = %error, "console input failed");
                    break;
                }
            };
            let Some(command) = ConsoleCommand::parse(&line) else {
                continue;
            };

            let stop = command == ConsoleCommand::Stop;
            for output in self.execute(command).await {
                println!("{output}");
            }
            if stop {
                break;
            }
        }
    }

    pub async fn execute(&self, command: ConsoleCommand) -> Vec<String> {
        info!(event_name = "system.console.command", command = ?command, "console command received");
        match command {
            ConsoleCommand::Help => help(),
            ConsoleCommand::Reload(target) => self.reload(target).await,
            ConsoleCommand::Status => self.status().await,
            ConsoleCommand::Clear => vec![CLEAR_SCREEN.to_owned()],
            ConsoleCommand::Stop => {
                // Receivers may already be gone during shutdown.
                let _ = self.shutdown.send(true);
                vec!["Shutting down...".to_owned()]
            }
            ConsoleCommand::Unknown(input) => {
                vec![format!("Unknown command `{input}`. Type `help` for the list.")]
            }
        }
    }

    async fn reload(&self, target: ReloadTarget) -> Vec<String> {
        let mut output = Vec::new();
        if matches!(target, ReloadTarget::Emojis | ReloadTarget::All) {
            output.push(match self.context.reload_emojis().await {
                Ok(count) => format!("Emoji registry reloaded ({count} entries)."),
                Err(error) => format!("Emoji reload failed: {error}"),
            });
        }
        if matches!(target, ReloadTarget::Config | ReloadTarget::All) {
            output.push(match self.context.stores.settings.load().await {
                Ok(settings) => {
                    format!("Guild settings reloaded ({} keys set).", settings.entries().count())
                }
                Err(error) => format!("Settings reload failed: {error}"),
            });
        }
        output
    }

    async fn status(&self) -> Vec<String> {
        let active_tickets = match self.context.stores.tickets.count_active().await {
            Ok(count) => count.to_string(),
            Err(error) => format!("unavailable ({error})"),
        };
        vec![
            format!("Bot: {}", self.status.user_name().unwrap_or_else(|| "not logged in".to_owned())),
            format!(
                "Gateway: {}",
                if self.status.is_connected() { "connected" } else { "disconnected" }
            ),
            format!("Guilds: {}", self.status.guilds()),
            format!("Uptime: {}", format_uptime(self.status.uptime())),
            format!("Open tickets: {active_tickets}"),
            format!("Emojis loaded: {}", self.context.emojis.len()),
        ]
    }
}

fn help() -> Vec<String> {
    [
        "help            show this list",
        "reload emojis   re-read the emoji registry",
        "reload config   re-read the guild settings",
        "reload all      both of the above",
        "status          connection and ticket summary",
        "clear           clear the screen",
        "stop | exit     shut the bot down",
    ]
    .iter()
    .map(|line| (*line).to_owned())
    .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serenity::all::Http;
    use tokio::sync::watch;
    use zen_core::config::AppConfig;
    use zen_core::domain::settings::SettingKey;
    use zen_core::emojis::{EmojiKey, EmojiRef, EmojiRegistry};
    use zen_db::Stores;
    use zen_discord::BotContext;

    use super::{Console, ConsoleCommand, ReloadTarget};
    use crate::discord::SerenityApi;
    use crate::status::BotStatus;

    fn console(stores: Stores) -> (Console, watch::Receiver<bool>) {
        let context = BotContext::new(
            Arc::new(SerenityApi::new(Arc::new(Http::new("test-token")))),
            stores,
            EmojiRegistry::default(),
            AppConfig::default().tickets,
        );
        let (sender, receiver) = watch::channel(false);
        (Console::new(context, Arc::new(BotStatus::new()), sender), receiver)
    }

    #[test]
    fn parses_known_commands_case_insensitively() {
        assert_eq!(ConsoleCommand::parse("HELP"), Some(ConsoleCommand::Help));
        assert_eq!(
            ConsoleCommand::parse("reload  emojis"),
            Some(ConsoleCommand::Reload(ReloadTarget::Emojis))
        );
        assert_eq!(ConsoleCommand::parse("reload"), Some(ConsoleCommand::Reload(ReloadTarget::All)));
        assert_eq!(ConsoleCommand::parse("exit"), Some(ConsoleCommand::Stop));
        assert_eq!(ConsoleCommand::parse("   "), None);
        assert_eq!(
            ConsoleCommand::parse("reboot now"),
            Some(ConsoleCommand::Unknown("reboot now".to_owned()))
        );
    }

    #[tokio::test]
    async fn reload_emojis_picks_up_stored_references() {
        let stores = Stores::in_memory();
        stores.emojis.upsert("star", "<:star:42>").await.expect("store emoji");
        let (console, _) = console(stores);

        let output = console.execute(ConsoleCommand::Reload(ReloadTarget::Emojis)).await;

        assert_eq!(output, vec!["Emoji registry reloaded (1 entries).".to_owned()]);
        assert!(matches!(console.context.emoji(EmojiKey::Star), EmojiRef::Custom { .. }));
    }

    #[tokio::test]
    async fn reload_all_reports_settings_too() {
        let stores = Stores::in_memory();
        stores.settings.set(SettingKey::StaffRoleId, 1).await.expect("setting");
        let (console, _) = console(stores);

        let output = console.execute(ConsoleCommand::Reload(ReloadTarget::All)).await;

        assert_eq!(output.len(), 2);
        assert_eq!(output[1], "Guild settings reloaded (1 keys set).");
    }

    #[tokio::test]
    async fn stop_signals_shutdown() {
        let (console, receiver) = console(Stores::in_memory());

        console.execute(ConsoleCommand::Stop).await;

        assert!(*receiver.borrow());
    }

    #[tokio::test]
    async fn status_lists_open_tickets() {
        let (console, _) = console(Stores::in_memory());

        let output = console.execute(ConsoleCommand::Status).await;

        assert!(output.contains(&"Open tickets: 0".to_owned()));
        assert!(output.contains(&"Gateway: disconnected".to_owned()));
    }
}
