use crate::commands::{load_config, migrated_pool, runtime, CommandResult, StepFailure};

pub fn run() -> CommandResult {
    match apply() {
        Ok(0) => CommandResult::success("migrate", "schema already up to date"),
        Ok(applied) => {
            CommandResult::success("migrate", format!("applied {applied} pending migration(s)"))
        }
        Err(failure) => failure.into_result("migrate"),
    }
}

fn apply() -> Result<usize, StepFailure> {
    let config = load_config()?;
    let runtime = runtime()?;

    runtime.block_on(async {
        let (pool, applied) = migrated_pool(&config).await?;
        pool.close().await;
        Ok(applied)
    })
}
