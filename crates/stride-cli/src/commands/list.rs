//! List command implementation.

use anyhow::Result;

use crate::cli::{OutputArgs, RangeArgs};
use crate::format::format_records;

use super::Context;

pub async fn cmd_list(ctx: &Context, range: &RangeArgs, output: &OutputArgs) -> Result<()> {
    let (start, end) = ctx.range(range)?;
    let repo = ctx.open_repository().await?;

    let records = repo.records_between(start, end).await?;

    println!("{}", format_records(&records, ctx.format(output))?);
    repo.close().await?;
    Ok(())
}
