//! Add command implementation.

use anyhow::Result;
use tracing::info;

use crate::cli::{OutputArgs, WhenArgs};
use crate::format::format_outcome;

use super::Context;

pub async fn cmd_add(
    ctx: &Context,
    steps: i64,
    when: &WhenArgs,
    output: &OutputArgs,
) -> Result<()> {
    let timestamp = ctx.timestamp(when)?;
    let repo = ctx.open_repository().await?;

    let outcome = repo.save_step(timestamp, steps).await?;
    info!("Saved {} steps for {} ({})", steps, outcome.date(), repo.durability());

    println!("{}", format_outcome(&outcome, ctx.format(output))?);
    repo.close().await?;
    Ok(())
}
