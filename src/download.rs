use tokio_util::sync::CancellationToken;

use crate::client::Session;
use crate::config::AppConfig;
use crate::edition::EditionSelector;
use crate::fetch::{FetchEngine, LowresMode};
use crate::formats::PageResources;
use crate::planner::{ExistingFiles, missing_pages, refresh_presence};
use crate::report::{DownloadOutcome, SessionReport, Summary};
use crate::{Error, Result};

/// Downloads one edition into the cache, skipping pages already complete on disk.
///
/// `on_outcome` sees every page outcome as soon as it is recorded. A TOC
/// failure aborts the run before anything is written.
pub async fn run(
    session: &Session,
    config: &AppConfig,
    selector: &EditionSelector,
    cancel: &CancellationToken,
    mut on_outcome: impl FnMut(&DownloadOutcome),
) -> Result<Summary> {
    let cache_dir = selector.cache_dir(&config.cache_dir);
    tracing::info!(edition = %selector, dir = %cache_dir.display(), "downloading edition");

    let toc = crate::toc::resolve_toc(session, &config.site_url, selector, &cache_dir).await?;

    let mut report = SessionReport::new();
    let mut pages: Vec<PageResources> = Vec::with_capacity(toc.pages.len());
    for entry in &toc.pages {
        if cancel.is_cancelled() {
            break;
        }
        tracing::debug!(page = entry.number, "retrieving page metadata");
        pages.push(
            crate::urls::build_page_urls(session, &config.site_url, selector, entry, &cache_dir)
                .await,
        );
    }

    let existing = ExistingFiles::scan(&cache_dir)?;
    refresh_presence(&mut pages, &existing);
    let pending = missing_pages(&pages, &existing)
        .into_iter()
        .map(|page| page.number)
        .collect::<Vec<_>>();
    tracing::info!(
        pages = pages.len(),
        pending = pending.len(),
        "planned downloads"
    );

    let lowres_mode = if config.http.always_fetch_lowres {
        LowresMode::Always
    } else {
        LowresMode::Fallback
    };
    let engine = FetchEngine::new(session)
        .with_highres_attempts(config.http.highres_attempts)
        .with_lowres_mode(lowres_mode);
    for page in &mut pages {
        if cancel.is_cancelled() {
            report.mark_cancelled();
            break;
        }

        let outcome = if pending.contains(&page.number) {
            match engine.fetch_and_save_page(page, cancel).await {
                Ok(outcome) => outcome,
                Err(Error::Cancelled) => {
                    report.mark_cancelled();
                    break;
                }
                Err(err) => return Err(err),
            }
        } else {
            DownloadOutcome::cached(page.number, existing.resolutions(page.number))
        };

        for resolution in &outcome.resolutions_saved {
            if let Some(resource) = page.resources.get_mut(*resolution) {
                resource.exists_on_disk = true;
            }
        }
        on_outcome(&outcome);
        report.record(outcome);
    }
    if cancel.is_cancelled() && report.outcomes().len() < toc.pages.len() {
        report.mark_cancelled();
    }

    report.persist_metadata(&cache_dir, &pages)?;

    let summary = report.summarize();
    tracing::info!(
        succeeded = summary.total_succeeded,
        failed = summary.failed_page_numbers.len(),
        cancelled = summary.cancelled,
        "edition done"
    );
    Ok(summary)
}
