use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ids::GuildId;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub database: DatabaseConfig,
    pub tickets: TicketsConfig,
    pub server: ServerConfig,
    pub console: ConsoleConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub token: SecretString,
    /// Register slash commands on this guild only; global registration otherwise.
    pub guild_id: Option<GuildId>,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct TicketsConfig {
    pub close_delay_secs: u64,
    pub image_wait_secs: u64,
    pub wizard_timeout_secs: u64,
    pub history_scan_limit: u16,
    pub comment_max_chars: usize,
    pub assets_dir: PathBuf,
    pub banner_file: String,
    pub emoji_upload_pause_ms: u64,
}

impl TicketsConfig {
    pub fn close_delay(&self) -> Duration {
        Duration::from_secs(self.close_delay_secs)
    }

    pub fn image_wait(&self) -> Duration {
        Duration::from_secs(self.image_wait_secs)
    }

    pub fn wizard_timeout(&self) -> Duration {
        Duration::from_secs(self.wizard_timeout_secs)
    }

    pub fn emoji_upload_pause(&self) -> Duration {
        Duration::from_millis(self.emoji_upload_pause_ms)
    }

    pub fn banner_path(&self) -> PathBuf {
        self.assets_dir.join(&self.banner_file)
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub enabled: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub discord_token: Option<String>,
    pub guild_id: Option<GuildId>,
    pub console_enabled: Option<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    /// Skip the bot token check; used by offline CLI commands.
    pub allow_missing_token: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig { token: String::new().into(), guild_id: None },
            database: DatabaseConfig {
                url: "sqlite://zen.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            tickets: TicketsConfig {
                close_delay_secs: 5,
                image_wait_secs: 60,
                wizard_timeout_secs: 600,
                history_scan_limit: 50,
                comment_max_chars: 500,
                assets_dir: PathBuf::from("./emojis"),
                banner_file: "banner-ticket.png".to_string(),
                emoji_upload_pause_ms: 1000,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            console: ConsoleConfig { enabled: true },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("zen.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate(!options.allow_missing_token)?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(token) = discord.token {
                self.discord.token = token.into();
            }
            if let Some(guild_id) = discord.guild_id {
                self.discord.guild_id = Some(GuildId(guild_id));
            }
        }

        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(tickets) = patch.tickets {
            if let Some(value) = tickets.close_delay_secs {
                self.tickets.close_delay_secs = value;
            }
            if let Some(value) = tickets.image_wait_secs {
                self.tickets.image_wait_secs = value;
            }
            if let Some(value) = tickets.wizard_timeout_secs {
                self.tickets.wizard_timeout_secs = value;
            }
            if let Some(value) = tickets.history_scan_limit {
                self.tickets.history_scan_limit = value;
            }
            if let Some(value) = tickets.comment_max_chars {
                self.tickets.comment_max_chars = value;
            }
            if let Some(value) = tickets.assets_dir {
                self.tickets.assets_dir = value;
            }
            if let Some(value) = tickets.banner_file {
                self.tickets.banner_file = value;
            }
            if let Some(value) = tickets.emoji_upload_pause_ms {
                self.tickets.emoji_upload_pause_ms = value;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(console) = patch.console {
            if let Some(enabled) = console.enabled {
                self.console.enabled = enabled;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        let token = read_env("ZEN_DISCORD_TOKEN").or_else(|| read_env("DISCORD_TOKEN"));
        if let Some(value) = token {
            self.discord.token = value.into();
        }
        if let Some(value) = read_env("ZEN_DISCORD_GUILD_ID") {
            self.discord.guild_id = Some(GuildId(parse_u64("ZEN_DISCORD_GUILD_ID", &value)?));
        }

        if let Some(value) = read_env("ZEN_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ZEN_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_u32("ZEN_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ZEN_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ZEN_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ZEN_TICKETS_CLOSE_DELAY_SECS") {
            self.tickets.close_delay_secs = parse_u64("ZEN_TICKETS_CLOSE_DELAY_SECS", &value)?;
        }
        if let Some(value) = read_env("ZEN_TICKETS_IMAGE_WAIT_SECS") {
            self.tickets.image_wait_secs = parse_u64("ZEN_TICKETS_IMAGE_WAIT_SECS", &value)?;
        }
        if let Some(value) = read_env("ZEN_TICKETS_WIZARD_TIMEOUT_SECS") {
            self.tickets.wizard_timeout_secs =
                parse_u64("ZEN_TICKETS_WIZARD_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ZEN_TICKETS_ASSETS_DIR") {
            self.tickets.assets_dir = PathBuf::from(value);
        }

        if let Some(value) = read_env("ZEN_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ZEN_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_u16("ZEN_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("ZEN_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ZEN_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("ZEN_CONSOLE_ENABLED") {
            self.console.enabled = parse_bool("ZEN_CONSOLE_ENABLED", &value)?;
        }

        let log_level = read_env("ZEN_LOGGING_LEVEL").or_else(|| read_env("ZEN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("ZEN_LOGGING_FORMAT").or_else(|| read_env("ZEN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(token) = overrides.discord_token {
            self.discord.token = token.into();
        }
        if let Some(guild_id) = overrides.guild_id {
            self.discord.guild_id = Some(guild_id);
        }
        if let Some(enabled) = overrides.console_enabled {
            self.console.enabled = enabled;
        }
    }

    pub fn validate(&self, require_token: bool) -> Result<(), ConfigError> {
        if require_token {
            validate_discord(&self.discord)?;
        }
        validate_database(&self.database)?;
        validate_tickets(&self.tickets)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("zen.toml"), PathBuf::from("config/zen.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    let token = discord.token.expose_secret();
    if token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.token is required. Get it from https://discord.com/developers/applications > Your App > Bot > Reset Token".to_string(),
        ));
    }
    if token.trim().len() != token.len() {
        return Err(ConfigError::Validation(
            "discord.token must not contain leading or trailing whitespace".to_string(),
        ));
    }
    Ok(())
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_tickets(tickets: &TicketsConfig) -> Result<(), ConfigError> {
    let durations = [
        ("tickets.image_wait_secs", tickets.image_wait_secs),
        ("tickets.wizard_timeout_secs", tickets.wizard_timeout_secs),
    ];
    for (name, value) in durations {
        if value == 0 {
            return Err(ConfigError::Validation(format!("{name} must be greater than zero")));
        }
    }

    if tickets.history_scan_limit == 0 || tickets.history_scan_limit > 100 {
        return Err(ConfigError::Validation(
            "tickets.history_scan_limit must be in range 1..=100".to_string(),
        ));
    }

    if tickets.comment_max_chars == 0 || tickets.comment_max_chars > 4000 {
        return Err(ConfigError::Validation(
            "tickets.comment_max_chars must be in range 1..=4000".to_string(),
        ));
    }

    if tickets.banner_file.trim().is_empty() {
        return Err(ConfigError::Validation("tickets.banner_file must not be empty".to_string()));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    database: Option<DatabasePatch>,
    tickets: Option<TicketsPatch>,
    server: Option<ServerPatch>,
    console: Option<ConsolePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    token: Option<String>,
    guild_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TicketsPatch {
    close_delay_secs: Option<u64>,
    image_wait_secs: Option<u64>,
    wizard_timeout_secs: Option<u64>,
    history_scan_limit: Option<u16>,
    comment_max_chars: Option<usize>,
    assets_dir: Option<PathBuf>,
    banner_file: Option<String>,
    emoji_upload_pause_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConsolePatch {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
