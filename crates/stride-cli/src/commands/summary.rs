//! Summary command implementation.

use anyhow::Result;
use stride_core::Period;

use crate::cli::{OutputArgs, WhenArgs};
use crate::format::format_summary;

use super::Context;

pub async fn cmd_summary(
    ctx: &Context,
    period: Period,
    when: &WhenArgs,
    goal: Option<u32>,
    output: &OutputArgs,
) -> Result<()> {
    let timestamp = ctx.timestamp(when)?;
    let goal = goal.or(ctx.config.daily_goal);
    let repo = ctx.open_repository().await?;

    let summary = repo.summary(period, timestamp, goal).await?;

    println!(
        "{}",
        format_summary(&period.to_string(), &summary, ctx.format(output))?
    );
    repo.close().await?;
    Ok(())
}
