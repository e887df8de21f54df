use crate::commands::{block_on, offline_config, open_database, CommandResult, Failure};

pub fn run() -> CommandResult {
    let result = offline_config().and_then(|config| {
        block_on(async {
            let pool = open_database(&config).await?;
            pool.close().await;
            Ok::<(), Failure>(())
        })?
    });

    match result {
        Ok(()) => CommandResult::success("migrate", "applied pending migrations"),
        Err(failure) => CommandResult::from_failure("migrate", failure),
    }
}
