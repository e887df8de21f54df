//! One-shot import of the flat files written by earlier bot versions.
//!
//! `config.json` and `emojis.json` are flat JSON objects, `ticket_count.txt`
//! holds a single integer and `reviews.json` maps review ids to records.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use zen_core::domain::ids::UserId;
use zen_core::domain::review::{Review, ReviewId, StarRating};
use zen_core::domain::settings::SettingKey;

use crate::repositories::{
    EmojiRepository, RepositoryError, ReviewRepository, SettingsRepository,
    TicketCounterRepository,
};

pub const CONFIG_FILE: &str = "config.json";
pub const EMOJIS_FILE: &str = "emojis.json";
pub const TICKET_COUNT_FILE: &str = "ticket_count.txt";
pub const REVIEWS_FILE: &str = "reviews.json";

const LEGACY_NO_COMMENT: &[&str] = &["Sem comentário", "No comment"];

#[derive(Debug, Error)]
pub enum LegacyImportError {
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not parse `{path}`: {message}")]
    Parse { path: PathBuf, message: String },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegacyImportReport {
    pub settings: usize,
    pub unknown_settings: Vec<String>,
    pub emojis: usize,
    pub ticket_counter: Option<u64>,
    pub reviews_imported: usize,
    pub reviews_skipped: usize,
}

pub struct LegacyStores<'a> {
    pub settings: &'a dyn SettingsRepository,
    pub emojis: &'a dyn EmojiRepository,
    pub counter: &'a dyn TicketCounterRepository,
    pub reviews: &'a dyn ReviewRepository,
}

#[derive(Debug, Deserialize)]
struct LegacyReview {
    user: String,
    stars: u8,
    #[serde(default)]
    comment: Option<String>,
    #[serde(default)]
    imgs: Vec<String>,
    #[serde(default)]
    staff: String,
    #[serde(default)]
    tid: String,
    #[serde(default)]
    date: Option<String>,
}

/// Imports every legacy file present in `dir`; missing files are skipped.
pub async fn import_directory(
    dir: &Path,
    stores: LegacyStores<'_>,
) -> Result<LegacyImportReport, LegacyImportError> {
    let mut report = LegacyImportReport::default();

    if let Some(raw) = read_optional(&dir.join(CONFIG_FILE)).await? {
        let entries: BTreeMap<String, serde_json::Value> =
            parse_json(&dir.join(CONFIG_FILE), &raw)?;
        for (key, value) in entries {
            let Ok(setting) = key.parse::<SettingKey>() else {
                report.unknown_settings.push(key);
                continue;
            };
            let Some(id) = json_id(&value) else {
                warn!(event_name = "legacy.config.invalid_value", key = %key, "skipping setting");
                continue;
            };
            stores.settings.set(setting, id).await?;
            report.settings += 1;
        }
    }

    if let Some(raw) = read_optional(&dir.join(EMOJIS_FILE)).await? {
        let entries: HashMap<String, String> = parse_json(&dir.join(EMOJIS_FILE), &raw)?;
        for (name, reference) in &entries {
            stores.emojis.upsert(name, reference).await?;
        }
        report.emojis = entries.len();
    }

    if let Some(raw) = read_optional(&dir.join(TICKET_COUNT_FILE)).await? {
        let value = raw.trim().parse::<u64>().map_err(|error| LegacyImportError::Parse {
            path: dir.join(TICKET_COUNT_FILE),
            message: error.to_string(),
        })?;
        stores.counter.reset_to(value).await?;
        report.ticket_counter = Some(value);
    }

    if let Some(raw) = read_optional(&dir.join(REVIEWS_FILE)).await? {
        let entries: BTreeMap<String, LegacyReview> = parse_json(&dir.join(REVIEWS_FILE), &raw)?;
        for (id, legacy) in entries {
            let Some(review) = convert_review(&id, legacy) else {
                warn!(event_name = "legacy.review.invalid", review_id = %id, "skipping review");
                report.reviews_skipped += 1;
                continue;
            };
            match stores.reviews.insert(review).await {
                Ok(()) => report.reviews_imported += 1,
                Err(RepositoryError::Conflict(_)) => report.reviews_skipped += 1,
                Err(error) => return Err(error.into()),
            }
        }
    }

    info!(
        event_name = "legacy.import.completed",
        settings = report.settings,
        emojis = report.emojis,
        reviews = report.reviews_imported,
        "legacy import completed"
    );
    Ok(report)
}

async fn read_optional(path: &Path) -> Result<Option<String>, LegacyImportError> {
    match tokio::fs::read_to_string(path).await {
        Ok(raw) => Ok(Some(raw)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(LegacyImportError::Read { path: path.to_path_buf(), source }),
    }
}

fn parse_json<T: DeserializeOwned>(path: &Path, raw: &str) -> Result<T, LegacyImportError> {
    serde_json::from_str(raw).map_err(|error| LegacyImportError::Parse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })
}

fn json_id(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::Number(number) => number.as_u64(),
        serde_json::Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn convert_review(id: &str, legacy: LegacyReview) -> Option<Review> {
    let id = ReviewId(id.to_owned());
    if !id.is_well_formed() {
        return None;
    }
    let stars = StarRating::new(legacy.stars).ok()?;
    let comment = legacy
        .comment
        .map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty() && !LEGACY_NO_COMMENT.contains(&text.as_str()));
    let created_at = legacy.date.as_deref().and_then(parse_legacy_date).unwrap_or_else(Utc::now);

    Some(Review {
        id,
        // Legacy records only kept the reviewer's name.
        reviewer_id: UserId(0),
        reviewer_name: legacy.user,
        stars,
        comment,
        images: legacy.imgs,
        staff: legacy.staff,
        ticket: legacy.tid,
        created_at,
    })
}

fn parse_legacy_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.with_timezone(&Utc)))
}
