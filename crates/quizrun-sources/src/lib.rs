//! quizrun-sources — Where question banks come from and where results go.
//!
//! Implements [`BankSource`] for local files and HTTP, the file-backed
//! [`KeyValueStore`](quizrun_core::traits::KeyValueStore) for the
//! wrong-answer store, and configuration loading.

pub mod config;
pub mod error;
pub mod file;
pub mod http;

use std::path::Path;

use anyhow::{Context, Result};
use futures::future::join_all;

use quizrun_core::bank::{QuestionBank, RejectedRecord};
use quizrun_core::parser::find_bank_files;
use quizrun_core::traits::BankSource;

pub use config::{load_config, load_config_from, QuizrunConfig, RunnerConfig};
pub use error::SourceError;
pub use file::{FileSource, JsonFileStore};
pub use http::HttpSource;

/// A merged bank plus the records that were skipped along the way.
#[derive(Debug, Default)]
pub struct LoadedBank {
    pub bank: QuestionBank,
    /// `(source description, rejection)` for every skipped record.
    pub rejected: Vec<(String, RejectedRecord)>,
}

/// Build sources for a location: an `http(s)://` URL, a directory (every
/// `.json` file under it, sorted), or a single file.
pub fn sources_for(location: &str) -> Result<Vec<Box<dyn BankSource>>> {
    if location.starts_with("http://") || location.starts_with("https://") {
        let source: Box<dyn BankSource> = Box::new(HttpSource::new(location)?);
        return Ok(vec![source]);
    }

    let path = Path::new(location);
    if path.is_dir() {
        let files = find_bank_files(path)?;
        if files.is_empty() {
            anyhow::bail!("no .json question banks under {}", path.display());
        }
        return Ok(files
            .into_iter()
            .map(|f| Box::new(FileSource::new(f)) as Box<dyn BankSource>)
            .collect());
    }

    let source: Box<dyn BankSource> = Box::new(FileSource::new(path));
    Ok(vec![source])
}

/// Fetch every source concurrently, normalize each, and merge in order.
///
/// Any fetch failure fails the whole load; nothing is partially returned.
pub async fn load_bank(sources: &[Box<dyn BankSource>]) -> Result<LoadedBank> {
    let fetched = join_all(sources.iter().map(|s| s.fetch())).await;

    let mut banks = Vec::with_capacity(sources.len());
    let mut rejected = Vec::new();
    for (source, result) in sources.iter().zip(fetched) {
        let origin = source.describe();
        let records =
            result.with_context(|| format!("failed to load question bank from {origin}"))?;
        let normalized = QuestionBank::normalize(&records);
        for r in &normalized.rejected {
            tracing::warn!(
                source = %origin,
                position = r.position,
                "skipping question record: {}",
                r.reason
            );
        }
        tracing::debug!(
            source = %origin,
            questions = normalized.bank.len(),
            "loaded question bank"
        );
        rejected.extend(normalized.rejected.into_iter().map(|r| (origin.clone(), r)));
        banks.push(normalized.bank);
    }

    Ok(LoadedBank {
        bank: QuestionBank::merge(banks),
        rejected,
    })
}

/// Load every configured location.
pub async fn load_locations(locations: &[String]) -> Result<LoadedBank> {
    let mut sources = Vec::new();
    for location in locations {
        sources.extend(sources_for(location)?);
    }
    if sources.is_empty() {
        anyhow::bail!("no question banks given");
    }
    load_bank(&sources).await
}
