use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;

use crate::client::Session;
use crate::edition::EditionSelector;
use crate::formats::{PageEntry, TableOfContents, TocEntryRecord};
use crate::{Error, Result};

pub const TOC_FILE_NAME: &str = "toc.json";

/// `{site}/Repository/{pub}/{edition}/{YYYYMMDD}`
pub fn repository_url(site_url: &str, selector: &EditionSelector) -> String {
    format!(
        "{}/Repository/{}/{}/{}",
        site_url.trim_end_matches('/'),
        selector.publication(),
        selector.edition(),
        selector.date_str()
    )
}

pub fn toc_url(site_url: &str, selector: &EditionSelector) -> String {
    format!("{}/{TOC_FILE_NAME}", repository_url(site_url, selector))
}

/// Fetches and validates the edition's table of contents, then creates `cache_dir`
/// and stores the body verbatim as `toc.json`.
///
/// Nothing touches the filesystem unless the TOC is usable. Not retried.
pub async fn resolve_toc(
    session: &Session,
    site_url: &str,
    selector: &EditionSelector,
    cache_dir: &Path,
) -> Result<TableOfContents> {
    let url = toc_url(site_url, selector);
    tracing::info!(%url, "fetching table of contents");

    let body = session
        .get_bytes(&url)
        .await
        .map_err(|failure| Error::TocFetch {
            url: url.clone(),
            reason: failure.to_string(),
        })?;

    let toc = parse_toc(&url, &body)?;
    tracing::info!(pages = toc.pages.len(), "table of contents resolved");

    std::fs::create_dir_all(cache_dir).map_err(|err| Error::fs(cache_dir, err))?;
    let toc_path = cache_dir.join(TOC_FILE_NAME);
    std::fs::write(&toc_path, &body).map_err(|err| Error::fs(&toc_path, err))?;

    Ok(toc)
}

pub fn parse_toc(url: &str, body: &[u8]) -> Result<TableOfContents> {
    let format_error = |reason: String| Error::TocFormat {
        url: url.to_owned(),
        reason,
    };

    let document: Value =
        serde_json::from_slice(body).map_err(|err| format_error(format!("invalid json: {err}")))?;
    let entries = document
        .get("toc")
        .ok_or_else(|| format_error("missing 'toc' key".to_owned()))?;
    let entries: Vec<TocEntryRecord> = serde_json::from_value(entries.clone())
        .map_err(|err| format_error(format!("invalid toc entries: {err}")))?;

    let mut seen = HashSet::new();
    let mut pages = Vec::with_capacity(entries.len());
    for entry in entries {
        let number = entry
            .page
            .parse()
            .ok_or_else(|| format_error(format!("invalid page number: {:?}", entry.page)))?;
        if !seen.insert(number) {
            return Err(format_error(format!("duplicate page number {number}")));
        }
        let folder = entry.page_folder.trim().trim_matches('/').to_owned();
        if folder.is_empty() {
            return Err(format_error(format!("page {number} has an empty page_folder")));
        }
        pages.push(PageEntry {
            number,
            title: entry.page_title.as_deref().unwrap_or_default().trim().to_owned(),
            folder,
        });
    }

    Ok(TableOfContents { pages })
}
