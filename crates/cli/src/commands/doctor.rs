use std::fs;

use secrecy::ExposeSecret;
use serde::Serialize;
use zen_core::config::{AppConfig, LoadOptions};
use zen_core::domain::settings::{GuildSettings, SettingKey};
use zen_db::Stores;

use crate::commands::{block_on, open_database, CommandResult};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn new(name: &'static str, status: CheckStatus, details: impl Into<String>) -> Self {
        Self { name, status, details: details.into() }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck::new(
                "config_validation",
                CheckStatus::Pass,
                "configuration loaded and validated",
            ));
            checks.push(check_token_shape(config.discord.token.expose_secret()));
            checks.push(check_assets(&config));
            checks.extend(check_database(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck::new("config_validation", CheckStatus::Fail, error.to_string()));
            for name in ["discord_token_format", "assets_directory", "database_connectivity", "guild_settings"] {
                checks.push(DoctorCheck::new(
                    name,
                    CheckStatus::Skipped,
                    "skipped because configuration did not load",
                ));
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = match (failed, warned) {
        (true, _) => (CheckStatus::Fail, "doctor: one or more readiness checks failed"),
        (false, true) => (CheckStatus::Warn, "doctor: ready, with warnings"),
        (false, false) => (CheckStatus::Pass, "doctor: all readiness checks passed"),
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

/// Bot tokens are three dot-separated segments.
fn check_token_shape(token: &str) -> DoctorCheck {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty()) {
        DoctorCheck::new("discord_token_format", CheckStatus::Pass, "token has the expected shape")
    } else {
        DoctorCheck::new(
            "discord_token_format",
            CheckStatus::Warn,
            "token does not look like a bot token (expected three dot-separated segments)",
        )
    }
}

fn check_assets(config: &AppConfig) -> DoctorCheck {
    let dir = &config.tickets.assets_dir;
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(error) => {
            return DoctorCheck::new(
                "assets_directory",
                CheckStatus::Warn,
                format!("`{}` is not readable ({error}); /setup_emojis will have nothing to install", dir.display()),
            );
        }
    };

    let emoji_files = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            let is_image = path
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| IMAGE_EXTENSIONS.contains(&extension.to_lowercase().as_str()));
            let is_banner = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.to_lowercase().contains("banner"));
            is_image && !is_banner
        })
        .count();
    let banner = if config.tickets.banner_path().exists() { "present" } else { "missing" };

    DoctorCheck::new(
        "assets_directory",
        CheckStatus::Pass,
        format!("{emoji_files} emoji image(s) in `{}`, banner {banner}", dir.display()),
    )
}

fn check_database(config: &AppConfig) -> Vec<DoctorCheck> {
    let result = block_on(async {
        let pool = open_database(config).await?;
        let settings = Stores::sql(pool.clone())
            .settings
            .load()
            .await
            .map_err(|error| ("query", error.to_string(), 7));
        pool.close().await;
        settings
    });

    match result.and_then(|settings| settings) {
        Ok(settings) => vec![
            DoctorCheck::new(
                "database_connectivity",
                CheckStatus::Pass,
                format!("connected and migrated `{}`", config.database.url),
            ),
            check_settings(&settings),
        ],
        Err((_, message, _)) => vec![
            DoctorCheck::new("database_connectivity", CheckStatus::Fail, message),
            DoctorCheck::new(
                "guild_settings",
                CheckStatus::Skipped,
                "skipped because the database is unavailable",
            ),
        ],
    }
}

fn check_settings(settings: &GuildSettings) -> DoctorCheck {
    let missing: Vec<&str> = SettingKey::ALL
        .into_iter()
        .filter(|key| settings.get(*key).is_none())
        .map(SettingKey::as_str)
        .collect();
    if missing.is_empty() {
        DoctorCheck::new("guild_settings", CheckStatus::Pass, "all support settings configured")
    } else {
        DoctorCheck::new(
            "guild_settings",
            CheckStatus::Warn,
            format!("not configured: {} (run /config_ticket)", missing.join(", ")),
        )
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
