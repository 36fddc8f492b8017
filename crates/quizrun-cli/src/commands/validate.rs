//! The `quizrun validate` command.

use std::path::PathBuf;

use anyhow::Result;

use quizrun_core::bank::QuestionBank;
use quizrun_core::parser;
use quizrun_sources::FileSource;

pub async fn execute(bank_path: PathBuf) -> Result<()> {
    let files = if bank_path.is_dir() {
        parser::find_bank_files(&bank_path)?
    } else {
        vec![bank_path]
    };
    anyhow::ensure!(!files.is_empty(), "no .json question banks found");

    let mut total_warnings = 0;

    for path in &files {
        let records = FileSource::new(path).fetch_records().await?;
        tracing::debug!(path = %path.display(), records = records.len(), "validating bank");
        let bank = QuestionBank::normalize(&records).bank;

        println!(
            "Bank: {} ({} questions, {} categories)",
            path.display(),
            bank.len(),
            bank.categories().len()
        );

        let warnings = parser::validate_records(&records);
        for w in &warnings {
            let prefix = match &w.id {
                Some(id) => format!("  [#{} {id}]", w.position + 1),
                None => format!("  [#{}]", w.position + 1),
            };
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All question banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
