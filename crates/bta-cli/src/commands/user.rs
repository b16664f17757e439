//! User management commands.

use anyhow::Result;
use bta_core::history;
use bta_core::Settings;
use clap::Subcommand;
use colored::Colorize;

use super::open_db;
use crate::output;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a user
    Create {
        /// Unique user id
        user_id: String,

        /// Contact email
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Show a user
    Show {
        /// User id
        user_id: String,
    },
}

pub async fn execute(cmd: UserCommands, settings: Settings) -> Result<()> {
    let db = open_db(&settings)?;

    match cmd {
        UserCommands::Create { user_id, email } => {
            let user = history::create_user(&db, &user_id, email.as_deref())?;
            println!("{} Created user: {}", "✓".green(), user.user_id.cyan());
        }
        UserCommands::Show { user_id } => {
            let user = history::get_user(&db, &user_id)?;
            output::print_user(&user);
        }
    }

    Ok(())
}
