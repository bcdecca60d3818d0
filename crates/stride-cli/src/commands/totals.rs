//! Day, week, year and range totals.

use anyhow::Result;
use stride_core::{Period, TimeWindow};

use crate::cli::{OutputArgs, RangeArgs, WhenArgs};
use crate::format::format_total;

use super::Context;

pub async fn cmd_total(
    ctx: &Context,
    period: Period,
    when: &WhenArgs,
    output: &OutputArgs,
) -> Result<()> {
    let timestamp = ctx.timestamp(when)?;
    let window = ctx.zone.window(period, timestamp)?;
    let repo = ctx.open_repository().await?;

    let total = repo.steps_for(period, timestamp).await?;

    println!(
        "{}",
        format_total(&period.to_string(), window, total, ctx.format(output))?
    );
    repo.close().await?;
    Ok(())
}

pub async fn cmd_range(ctx: &Context, range: &RangeArgs, output: &OutputArgs) -> Result<()> {
    let (start, end) = ctx.range(range)?;
    let repo = ctx.open_repository().await?;

    let total = repo.steps_between(start, end).await?;

    println!(
        "{}",
        format_total(
            "range",
            TimeWindow::from_seconds(start, end),
            total,
            ctx.format(output)
        )?
    );
    repo.close().await?;
    Ok(())
}
