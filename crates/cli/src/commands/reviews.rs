use zen_db::Stores;

use crate::commands::{block_on, offline_config, open_database, CommandResult};

pub fn run(limit: u32) -> CommandResult {
    let result = offline_config().and_then(|config| {
        block_on(async {
            let pool = open_database(&config).await?;
            let stores = Stores::sql(pool.clone());
            let reviews = stores
                .reviews
                .list(limit)
                .await
                .map_err(|error| ("query", error.to_string(), 7));
            pool.close().await;
            reviews
        })?
    });

    match result {
        Ok(reviews) => match serde_json::to_string_pretty(&reviews) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure("reviews", "serialization", error.to_string(), 8),
        },
        Err(failure) => CommandResult::from_failure("reviews", failure),
    }
}
