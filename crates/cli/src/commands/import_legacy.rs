use std::path::Path;

use zen_db::{import_directory, LegacyImportReport, LegacyStores, Stores};

use crate::commands::{block_on, offline_config, open_database, CommandResult};

pub fn run(dir: &Path) -> CommandResult {
    if !dir.is_dir() {
        return CommandResult::failure(
            "import-legacy",
            "input",
            format!("`{}` is not a directory", dir.display()),
            6,
        );
    }

    let result = offline_config().and_then(|config| {
        block_on(async {
            let pool = open_database(&config).await?;
            let stores = Stores::sql(pool.clone());
            let report = import_directory(
                dir,
                LegacyStores {
                    settings: stores.settings.as_ref(),
                    emojis: stores.emojis.as_ref(),
                    counter: stores.counter.as_ref(),
                    reviews: stores.reviews.as_ref(),
                },
            )
            .await
            .map_err(|error| ("import", error.to_string(), 6));
            pool.close().await;
            report
        })?
    });

    match result {
        Ok(report) => CommandResult::success("import-legacy", summarize(&report)),
        Err(failure) => CommandResult::from_failure("import-legacy", failure),
    }
}

fn summarize(report: &LegacyImportReport) -> String {
    let mut summary = format!(
        "imported {} setting(s), {} emoji(s), {} review(s)",
        report.settings, report.emojis, report.reviews_imported
    );
    if let Some(counter) = report.ticket_counter {
        summary.push_str(&format!("; ticket counter set to {counter}"));
    }
    if report.reviews_skipped > 0 {
        summary.push_str(&format!("; {} review(s) already present", report.reviews_skipped));
    }
    if !report.unknown_settings.is_empty() {
        summary.push_str(&format!("; ignored keys: {}", report.unknown_settings.join(", ")));
    }
    summary
}
