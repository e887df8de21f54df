use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use zen_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    let options = LoadOptions { allow_missing_token: true, ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }
    lines.join("\n")
}

type Entry = (&'static str, String, &'static [&'static str]);

fn entry(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Entry {
    (key, value, env_keys)
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let guild_id = config.discord.guild_id.map_or_else(|| "<unset>".to_string(), |id| id.to_string());
    vec![
        entry(
            "discord.token",
            redact_token(config.discord.token.expose_secret()),
            &["ZEN_DISCORD_TOKEN", "DISCORD_TOKEN"],
        ),
        entry("discord.guild_id", guild_id, &["ZEN_DISCORD_GUILD_ID"]),
        entry("database.url", config.database.url.clone(), &["ZEN_DATABASE_URL"]),
        entry(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["ZEN_DATABASE_MAX_CONNECTIONS"],
        ),
        entry(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["ZEN_DATABASE_TIMEOUT_SECS"],
        ),
        entry(
            "tickets.close_delay_secs",
            config.tickets.close_delay_secs.to_string(),
            &["ZEN_TICKETS_CLOSE_DELAY_SECS"],
        ),
        entry(
            "tickets.image_wait_secs",
            config.tickets.image_wait_secs.to_string(),
            &["ZEN_TICKETS_IMAGE_WAIT_SECS"],
        ),
        entry(
            "tickets.wizard_timeout_secs",
            config.tickets.wizard_timeout_secs.to_string(),
            &["ZEN_TICKETS_WIZARD_TIMEOUT_SECS"],
        ),
        entry("tickets.history_scan_limit", config.tickets.history_scan_limit.to_string(), &[]),
        entry("tickets.comment_max_chars", config.tickets.comment_max_chars.to_string(), &[]),
        entry(
            "tickets.assets_dir",
            config.tickets.assets_dir.display().to_string(),
            &["ZEN_TICKETS_ASSETS_DIR"],
        ),
        entry("tickets.banner_file", config.tickets.banner_file.clone(), &[]),
        entry("server.bind_address", config.server.bind_address.clone(), &["ZEN_SERVER_BIND_ADDRESS"]),
        entry(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["ZEN_SERVER_HEALTH_CHECK_PORT"],
        ),
        entry("console.enabled", config.console.enabled.to_string(), &["ZEN_CONSOLE_ENABLED"]),
        entry("logging.level", config.logging.level.clone(), &["ZEN_LOGGING_LEVEL", "ZEN_LOG_LEVEL"]),
        entry(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ZEN_LOGGING_FORMAT", "ZEN_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    ["zen.toml", "config/zen.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Bot tokens keep only their length visible.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }
    format!("<redacted:{} chars>", trimmed.chars().count())
}

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, redact_token};

    #[test]
    fn tokens_never_leak() {
        assert_eq!(redact_token(""), "<empty>");
        let redacted = redact_token("MTA.secret.part");
        assert!(!redacted.contains("secret"));
        assert_eq!(redacted, "<redacted:15 chars>");
    }

    #[test]
    fn nested_keys_are_found_in_toml() {
        let doc: Value = "[discord]\nguild_id = 5\n".parse().expect("toml");
        assert!(contains_path(&doc, "discord.guild_id"));
        assert!(!contains_path(&doc, "discord.token"));
    }
}
