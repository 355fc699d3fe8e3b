use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::formats::{PageResources, Resolution};
use crate::{Error, Result};

pub const PAGE_METADATA_FILE_NAME: &str = "page_metadata.json";

/// Resolutions a page needs saved (thumbnail plus low- or high-res) to count as downloaded.
pub const MIN_SAVED_RESOLUTIONS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOutcome {
    pub page_number: u32,
    pub succeeded: bool,
    pub resolutions_saved: BTreeSet<Resolution>,
    /// Found complete on disk, nothing was requested.
    pub from_cache: bool,
}

impl DownloadOutcome {
    pub fn downloaded(page_number: u32, resolutions_saved: BTreeSet<Resolution>) -> Self {
        Self {
            page_number,
            succeeded: resolutions_saved.len() >= MIN_SAVED_RESOLUTIONS,
            resolutions_saved,
            from_cache: false,
        }
    }

    pub fn cached(page_number: u32, resolutions_on_disk: BTreeSet<Resolution>) -> Self {
        Self {
            from_cache: true,
            ..Self::downloaded(page_number, resolutions_on_disk)
        }
    }

    pub fn status_line(&self) -> String {
        match (self.succeeded, self.from_cache) {
            (true, true) => format!("Page {} already downloaded", self.page_number),
            (true, false) => format!("Downloaded page {}", self.page_number),
            (false, _) => format!("Failed to download page {}", self.page_number),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total_succeeded: usize,
    pub failed_page_numbers: Vec<u32>,
    pub cancelled: bool,
}

impl Summary {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!("Downloaded {} pages.", self.total_succeeded)];
        if !self.failed_page_numbers.is_empty() {
            lines.push(format!(
                "Failed to download {} pages: {:?}",
                self.failed_page_numbers.len(),
                self.failed_page_numbers
            ));
        }
        if self.cancelled {
            lines.push("Download cancelled before all pages were processed.".to_owned());
        }
        lines
    }
}

/// Outcomes of one download run, in the order pages were processed.
#[derive(Debug, Default)]
pub struct SessionReport {
    outcomes: Vec<DownloadOutcome>,
    cancelled: bool,
}

impl SessionReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: DownloadOutcome) {
        if outcome.succeeded {
            tracing::info!(page = outcome.page_number, cached = outcome.from_cache, "page complete");
        } else {
            tracing::warn!(
                page = outcome.page_number,
                saved = ?outcome.resolutions_saved,
                "page incomplete"
            );
        }
        self.outcomes.push(outcome);
    }

    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    pub fn outcomes(&self) -> &[DownloadOutcome] {
        &self.outcomes
    }

    pub fn summarize(&self) -> Summary {
        Summary {
            total_succeeded: self.outcomes.iter().filter(|o| o.succeeded).count(),
            failed_page_numbers: self
                .outcomes
                .iter()
                .filter(|o| !o.succeeded)
                .map(|o| o.page_number)
                .collect(),
            cancelled: self.cancelled,
        }
    }

    /// Writes `page_metadata.json` so the edition can be reloaded without the network.
    pub fn persist_metadata(&self, cache_dir: &Path, pages: &[PageResources]) -> Result<PathBuf> {
        let path = cache_dir.join(PAGE_METADATA_FILE_NAME);
        let json = serde_json::to_vec_pretty(pages)?;
        std::fs::write(&path, json).map_err(|err| Error::fs(&path, err))?;
        tracing::debug!(path = %path.display(), pages = pages.len(), "wrote page metadata");
        Ok(path)
    }
}
