use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use zen_core::domain::ids::EmojiId;
use zen_core::emojis::EmojiRef;
use zen_core::errors::InteractionError;

use crate::api::InteractionReply;
use crate::context::BotContext;
use crate::errors::ServiceResult;
use crate::events::SlashCommandEvent;
use crate::views;

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmojiInstallReport {
    pub installed: Vec<String>,
    pub already_present: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Uploads the images in the assets directory as guild emojis and records their references.
pub struct EmojiSetupService {
    ctx: BotContext,
}

impl EmojiSetupService {
    pub fn new(ctx: BotContext) -> Self {
        Self { ctx }
    }

    pub async fn install(&self, event: &SlashCommandEvent) -> ServiceResult<EmojiInstallReport> {
        let guild_id = event.guild_id.ok_or_else(|| {
            InteractionError::ConfigurationIncomplete("this command only works inside a server.".to_owned())
        })?;
        self.ctx.api.respond(&event.interaction, InteractionReply::Defer { ephemeral: true }).await?;

        let candidates = emoji_files(&self.ctx.tickets.assets_dir).await?;
        if let Err(error) = self
            .ctx
            .api
            .followup(&event.interaction, views::emoji_install_started(&self.ctx.emojis), true)
            .await
        {
            warn!(error = %error, "could not post emoji progress message");
        }

        let mut entries = self.ctx.stores.emojis.load_all().await?;
        let present: HashSet<EmojiId> =
            self.ctx.api.guild_emojis(guild_id).await?.into_iter().collect();
        let pause = self.ctx.tickets.emoji_upload_pause();
        let mut report = EmojiInstallReport::default();

        for (name, path) in candidates {
            let installed = entries
                .get(&name)
                .and_then(|reference| EmojiRef::parse(reference))
                .and_then(|emoji| emoji.custom_id())
                .is_some_and(|id| present.contains(&id));
            if installed {
                report.already_present.push(name);
                continue;
            }

            let image = match tokio::fs::read(&path).await {
                Ok(image) => image,
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "could not read emoji image");
                    report.failed.push((name, error.to_string()));
                    continue;
                }
            };
            let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

            match self.ctx.api.create_emoji(guild_id, &name, &file_name, image).await {
                Ok(emoji) => {
                    let reference = emoji.to_string();
                    self.ctx.stores.emojis.upsert(&name, &reference).await?;
                    info!(event_name = "emoji.installed", name = %name, reference = %reference, "emoji installed");
                    entries.insert(name.clone(), reference);
                    report.installed.push(name);
                    // Guild emoji uploads are heavily rate limited.
                    tokio::time::sleep(pause).await;
                }
                Err(error) => {
                    warn!(event_name = "emoji.install_failed", name = %name, error = %error, "emoji upload failed");
                    report.failed.push((name, error.to_string()));
                }
            }
        }

        self.ctx.emojis.reload(entries);
        self.ctx
            .api
            .followup(&event.interaction, views::emoji_install_finished(report.installed.len()), true)
            .await?;
        Ok(report)
    }
}

/// Image files eligible for upload, keyed by file stem and sorted by name.
async fn emoji_files(dir: &Path) -> Result<Vec<(String, PathBuf)>, InteractionError> {
    let mut reader = tokio::fs::read_dir(dir).await.map_err(|_| {
        InteractionError::ConfigurationIncomplete(format!("folder `{}` not found.", dir.display()))
    })?;

    let mut files = Vec::new();
    let mut seen_any = false;
    loop {
        let entry = match reader.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                warn!(dir = %dir.display(), error = %error, "could not list assets directory");
                break;
            }
        };
        seen_any = true;
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        if !IMAGE_EXTENSIONS.contains(&extension.as_str()) || stem.to_ascii_lowercase().contains("banner") {
            continue;
        }
        files.push((stem.to_owned(), path.clone()));
    }

    if !seen_any {
        return Err(InteractionError::ConfigurationIncomplete(format!(
            "folder `{}` is empty.",
            dir.display()
        )));
    }
    files.sort();
    Ok(files)
}
