//! History command.

use anyhow::Result;
use bta_core::history;
use bta_core::Settings;
use clap::Args;

use super::open_db;
use crate::output;

#[derive(Args)]
pub struct HistoryArgs {
    /// User whose analyses to list
    pub user_id: String,

    /// Maximum number of records (at most 500)
    #[arg(short, long, default_value_t = history::DEFAULT_HISTORY_LIMIT)]
    pub limit: u32,

    /// Show one analysis in full instead of the table
    #[arg(long, value_name = "ID")]
    pub show: Option<i64>,
}

pub async fn execute(args: HistoryArgs, settings: Settings) -> Result<()> {
    let db = open_db(&settings)?;

    if let Some(id) = args.show {
        let record = history::get_analysis(&db, id)?;
        if record.user_id != args.user_id {
            anyhow::bail!("Analysis {} does not belong to {}", id, args.user_id);
        }
        output::print_record(&record);
        return Ok(());
    }

    let records = history::list_history(&db, &args.user_id, Some(args.limit))?;
    output::print_history_table(&args.user_id, &records);
    Ok(())
}
