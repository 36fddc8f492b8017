//! The `quizrun wrong` command.

use std::path::PathBuf;

use anyhow::Result;
use clap::Subcommand;
use comfy_table::{Cell, Table};

use quizrun_sources::config::load_config_from;

use super::open_store;

#[derive(Subcommand)]
pub enum WrongAction {
    /// List missed questions
    List {
        /// Print as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Forget every missed question
    Clear,
}

pub fn execute(action: WrongAction, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = open_store(&config);

    match action {
        WrongAction::List { json } => {
            let questions = store.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&questions)?);
                return Ok(());
            }
            if questions.is_empty() {
                println!("No wrong answers recorded.");
                return Ok(());
            }

            let mut table = Table::new();
            table.set_header(vec!["Id", "Category", "Difficulty", "Question", "Answer"]);
            for q in &questions {
                table.add_row(vec![
                    Cell::new(&q.id),
                    Cell::new(&q.category),
                    Cell::new(q.difficulty),
                    Cell::new(q.text.lines().next().unwrap_or_default()),
                    Cell::new(q.correct_option()),
                ]);
            }
            println!("{table}");
            println!("{} question(s) to review.", questions.len());
        }
        WrongAction::Clear => {
            store.clear()?;
            println!("Cleared wrong answers.");
        }
    }

    Ok(())
}
